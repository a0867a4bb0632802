//! # Twinsync Engine
//!
//! Two-replica flag reconciliation for offline mail synchronization.
//!
//! Given two replicas of a mailbox and the shared state they last agreed on,
//! the engine finds what changed on each side, drops changes both sides made
//! identically, and propagates the rest to the opposite side and to the
//! shared state.
//!
//! ## Design Principles
//!
//! - **No IO**: replicas are reached through the [`Replica`] trait
//! - **Failure tolerant**: a failed replica write leaves the shared state
//!   untouched, so the next round finds and retries the same change
//! - **Sequential**: one round runs start to finish; the two sides only share
//!   the [`SharedState`] handle
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`Record`] is a message reduced to:
//! - A numeric id (the UID)
//! - Opaque content
//! - Boolean attributes from a fixed [`AttributeSchema`] (`read`, `important`)
//! - A change ledger of tri-state [`Change`]s since the last sync
//!
//! ### A round
//!
//! [`SyncEngine::run`] computes each side's changes against the shared state,
//! merges the two change sets, then applies left's changes to the right side
//! and right's changes to the left side. Changes made identically on both
//! sides only reach the shared state. Divergent changes are not resolved:
//! each side receives the other's value and the conflict is reported.
//!
//! ## Quick Start
//!
//! ```rust
//! use twinsync_engine::{AttributeSchema, MemoryReplica, SyncEngine, IMPORTANT, READ};
//!
//! let schema = AttributeSchema::default();
//!
//! // 1. Left knows a message, right is empty
//! let left = MemoryReplica::with_records("left", [schema.new_record(1, "1 body")]);
//! let right = MemoryReplica::new("right");
//!
//! // 2. First round copies it over
//! let mut engine = SyncEngine::new(left, right);
//! engine.run().unwrap();
//! assert!(engine.right().replica().get(1).is_some());
//!
//! // 3. Each side changes a different flag
//! let left = engine.left_mut().replica_mut().get_mut(1).unwrap();
//! left.mark(READ).unwrap();
//! let right = engine.right_mut().replica_mut().get_mut(1).unwrap();
//! right.mark(IMPORTANT).unwrap();
//!
//! // 4. Both sides end up with both flags
//! let report = engine.run().unwrap();
//! assert!(report.merge.conflicts.is_empty());
//! let merged = engine.right().replica().get(1).unwrap();
//! assert_eq!(merged.attribute(READ), Some(true));
//! assert_eq!(merged.attribute(IMPORTANT), Some(true));
//! ```
//!
//! ## Persistence
//!
//! The engine keeps nothing on disk. Use [`StateStore::export_snapshot`] and
//! [`StateStore::from_snapshot`] with [`StoreSnapshot`] to carry the shared
//! state between sessions.

pub mod change;
pub mod controller;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod record_set;
pub mod schema;
pub mod snapshot;
pub mod state;
pub mod store;

// Re-export main types at crate root
pub use change::{Change, ChangeSet};
pub use controller::{ApplyReport, SideController, WriteFailure};
pub use engine::{SyncEngine, SyncPhase, SyncReport};
pub use error::Error;
pub use reconcile::{Conflict, Deduplication, MergeReport};
pub use record::{DivergentChange, MergeOutcome, Record};
pub use record_set::RecordSet;
pub use schema::{AttributeSchema, IMPORTANT, READ};
pub use snapshot::{SnapshotRecord, StoreSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use state::{SharedState, StateStore};
pub use store::{MemoryReplica, Replica};

/// Type aliases for clarity
pub type RecordId = u64;
pub type AttributeName = String;

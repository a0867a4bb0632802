//! The sync engine - runs rounds between two sides.

use crate::{
    error::Result, ApplyReport, MergeReport, RecordId, Replica, SharedState, SideController,
    StateStore,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Where a round currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    #[default]
    Idle,
    ComputingLeft,
    ComputingRight,
    Merging,
    ApplyingLeft,
    ApplyingRight,
}

impl SyncPhase {
    /// The phase that follows this one in a round.
    pub fn next(self) -> Self {
        match self {
            SyncPhase::Idle => SyncPhase::ComputingLeft,
            SyncPhase::ComputingLeft => SyncPhase::ComputingRight,
            SyncPhase::ComputingRight => SyncPhase::Merging,
            SyncPhase::Merging => SyncPhase::ApplyingLeft,
            SyncPhase::ApplyingLeft => SyncPhase::ApplyingRight,
            SyncPhase::ApplyingRight => SyncPhase::Idle,
        }
    }
}

/// Outcome of one round.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Round number, starting at 1
    pub round: u64,
    /// Records found changed on the left replica
    pub from_left: Vec<RecordId>,
    /// Records found changed on the right replica
    pub from_right: Vec<RecordId>,
    pub merge: MergeReport,
    /// Right's changes applied to the left side
    pub left: ApplyReport,
    /// Left's changes applied to the right side
    pub right: ApplyReport,
}

impl SyncReport {
    /// Nothing changed on either side.
    pub fn is_quiet(&self) -> bool {
        self.from_left.is_empty() && self.from_right.is_empty()
    }

    pub fn failure_count(&self) -> usize {
        self.left.failures.len() + self.right.failures.len()
    }
}

/// Two sides and the shared state they agree on.
#[derive(Debug)]
pub struct SyncEngine<L, R> {
    left: SideController<L>,
    right: SideController<R>,
    state: SharedState,
    phase: SyncPhase,
    rounds: u64,
}

impl<L: Replica, R: Replica> SyncEngine<L, R> {
    /// Create an engine for a first sync: the shared state starts empty.
    pub fn new(left: L, right: R) -> Self {
        Self::with_state(left, right, StateStore::new())
    }

    /// Create an engine resuming from a known baseline.
    pub fn with_state(left: L, right: R, state: StateStore) -> Self {
        let state = SharedState::new(state);
        Self {
            left: SideController::new(left, state.clone()),
            right: SideController::new(right, state.clone()),
            state,
            phase: SyncPhase::Idle,
            rounds: 0,
        }
    }

    pub fn left(&self) -> &SideController<L> {
        &self.left
    }

    pub fn left_mut(&mut self) -> &mut SideController<L> {
        &mut self.left
    }

    pub fn right(&self) -> &SideController<R> {
        &self.right
    }

    pub fn right_mut(&mut self) -> &mut SideController<R> {
        &mut self.right
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Rounds completed so far.
    pub fn rounds(&self) -> u64 {
        self.rounds
    }

    /// Run one full round.
    ///
    /// Per-record write failures end up in the report and are retried by the
    /// next round. An error here means a caller bug, such as records of
    /// different ids being merged. The engine is back to
    /// [`SyncPhase::Idle`] either way.
    pub fn run(&mut self) -> Result<SyncReport> {
        let result = self.run_round();
        self.phase = SyncPhase::Idle;
        result
    }

    fn run_round(&mut self) -> Result<SyncReport> {
        self.advance();
        let mut left_changes = self.left.compute_changes()?;
        self.advance();
        let mut right_changes = self.right.compute_changes()?;

        self.advance();
        let merge = left_changes.merge_with(&mut right_changes)?;
        debug!(
            from_left = ?left_changes.ids(),
            from_right = ?right_changes.ids(),
            "changes found"
        );

        self.advance();
        let left = self.left.apply(&right_changes)?;
        self.advance();
        let right = self.right.apply(&left_changes)?;

        self.rounds += 1;
        let report = SyncReport {
            round: self.rounds,
            from_left: left_changes.ids(),
            from_right: right_changes.ids(),
            merge,
            left,
            right,
        };

        info!(
            round = report.round,
            from_left = report.from_left.len(),
            from_right = report.from_right.len(),
            deduplicated = report.merge.deduplicated.len(),
            conflicts = report.merge.conflicts.len(),
            failures = report.failure_count(),
            "sync round done"
        );

        Ok(report)
    }

    fn advance(&mut self) {
        self.phase = self.phase.next();
        debug!(phase = ?self.phase, "entering phase");
    }

    /// Log the records of both replicas and of the shared state.
    pub fn debug_dump(&self, title: &str) {
        let state = self.state.read();
        debug!(title, "sync engine dump");
        for (side, records) in [
            (self.left.name(), self.left.replica().search()),
            (self.right.name(), self.right.replica().search()),
            ("state", state.search()),
        ] {
            for record in records {
                debug!(
                    side,
                    id = record.id(),
                    attributes = ?record.attributes(),
                    content = record.content(),
                    "record"
                );
            }
        }
    }
}

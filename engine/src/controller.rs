//! Side controller - one replica plus the shared state.
//!
//! Each controller owns its replica and is a stranger to the other side: it
//! only sees the other side through the change sets the engine hands it.

use crate::{error::Result, Record, RecordId, RecordSet, Replica, SharedState};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// A record whose replica write failed this round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteFailure {
    pub id: RecordId,
    pub reason: String,
}

/// What happened while applying a change set to one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    /// Replica the changes were applied to
    pub side: String,
    /// Records written to the replica and the shared state
    pub written: Vec<RecordId>,
    /// Records with nothing for the replica; only the shared state advanced
    pub skipped: Vec<RecordId>,
    /// Records left untouched on both the replica and the shared state
    pub failures: Vec<WriteFailure>,
}

impl ApplyReport {
    fn new(side: impl Into<String>) -> Self {
        Self {
            side: side.into(),
            ..Self::default()
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Controller for one side of the sync.
#[derive(Debug)]
pub struct SideController<R> {
    replica: R,
    state: SharedState,
}

impl<R: Replica> SideController<R> {
    pub fn new(replica: R, state: SharedState) -> Self {
        Self { replica, state }
    }

    pub fn name(&self) -> &str {
        self.replica.name()
    }

    pub fn replica(&self) -> &R {
        &self.replica
    }

    /// Mutable access to the replica, for changes made outside of sync.
    pub fn replica_mut(&mut self) -> &mut R {
        &mut self.replica
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    /// Changes on this side since the last sync.
    ///
    /// Records unknown to the shared state come back flagged new. Records
    /// missing from the replica but still in the shared state are not
    /// reported: deletions are not detected.
    pub fn compute_changes(&self) -> Result<RecordSet> {
        let state = self.state.read();
        let mut changes = RecordSet::new();

        for record in self.replica.search() {
            let mut changed = record.clone();
            match state.get(record.id()) {
                Some(agreed) => {
                    if record.identical(agreed)? {
                        continue;
                    }
                    changed.learn_changes(agreed)?;
                }
                None => {
                    debug!(side = %self.name(), id = record.id(), "new record");
                    changed.mark_new();
                }
            }
            changes.insert(changed);
        }

        Ok(changes)
    }

    /// Apply the other side's changes to this replica and the shared state.
    ///
    /// A failed replica write is reported and skipped; the shared state keeps
    /// the old baseline for that record so the next round finds the same
    /// change again. Only non-transient errors abort the batch.
    pub fn apply(&mut self, incoming: &RecordSet) -> Result<ApplyReport> {
        let mut report = ApplyReport::new(self.name());

        for record in incoming {
            if !record.has_pending_changes() {
                trace!(side = %self.name(), id = record.id(), "nothing to write");
                self.state.write().update(record)?;
                report.skipped.push(record.id());
                continue;
            }

            match self.write(record) {
                Ok(()) => report.written.push(record.id()),
                Err(err) if err.is_transient() => {
                    warn!(side = %self.name(), id = record.id(), error = %err, "write failed, retrying next round");
                    report.failures.push(WriteFailure {
                        id: record.id(),
                        reason: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    fn write(&mut self, record: &Record) -> Result<()> {
        self.replica.update(record)?;
        self.state.write().update(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{AttributeSchema, IMPORTANT, READ};
    use crate::{Change, MemoryReplica, StateStore};

    fn message(id: RecordId) -> Record {
        AttributeSchema::default().new_record(id, format!("{} body", id))
    }

    fn controller(records: Vec<Record>, state: &SharedState) -> SideController<MemoryReplica> {
        SideController::new(MemoryReplica::with_records("left", records), state.clone())
    }

    #[test]
    fn compute_changes_flags_new_records() {
        let state = SharedState::default();
        let side = controller(vec![message(1), message(2)], &state);

        let changes = side.compute_changes().unwrap();

        assert_eq!(changes.ids(), vec![1, 2]);
        assert!(changes.iter().all(Record::is_new));
    }

    #[test]
    fn compute_changes_skips_identical_records() {
        let state = SharedState::new(StateStore::new());
        state.write().update(&message(1)).unwrap();
        let side = controller(vec![message(1)], &state);

        assert!(side.compute_changes().unwrap().is_empty());
    }

    #[test]
    fn compute_changes_learns_drift() {
        let state = SharedState::default();
        state.write().update(&message(1)).unwrap();
        let mut side = controller(vec![message(1)], &state);
        side.replica_mut().get_mut(1).unwrap().mark(READ).unwrap();

        let changes = side.compute_changes().unwrap();
        let record = changes.get(1).unwrap();

        assert!(!record.is_new());
        assert_eq!(record.changes().get(READ), Change::Set);
        assert_eq!(record.changes().get(IMPORTANT), Change::Unchanged);
        // The replica itself carries no ledger
        assert!(side.replica().get(1).unwrap().changes().is_empty());
    }

    #[test]
    fn compute_changes_ignores_deletions() {
        let state = SharedState::default();
        state.write().update(&message(9)).unwrap();
        let side = controller(vec![], &state);

        assert!(side.compute_changes().unwrap().is_empty());
    }

    #[test]
    fn apply_writes_replica_then_state() {
        let state = SharedState::default();
        let mut side = controller(vec![], &state);
        let mut incoming = message(1);
        incoming.mark(IMPORTANT).unwrap();
        incoming.mark_new();
        let batch: RecordSet = [incoming].into_iter().collect();

        let report = side.apply(&batch).unwrap();

        assert_eq!(report.written, vec![1]);
        assert_eq!(side.replica().get(1).unwrap().attribute(IMPORTANT), Some(true));
        assert_eq!(state.read().get(1).unwrap().attribute(IMPORTANT), Some(true));
    }

    #[test]
    fn apply_continues_after_failure() {
        let state = SharedState::default();
        let mut side = controller(vec![], &state);
        side.replica_mut().fail_next_update_of(1);

        let batch: RecordSet = [message(1), message(2)]
            .into_iter()
            .map(|mut r| {
                r.mark_new();
                r
            })
            .collect();

        let report = side.apply(&batch).unwrap();

        assert_eq!(report.written, vec![2]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, 1);
        assert!(report.has_failures());
        assert!(side.replica().get(1).is_none());
        assert!(state.read().get(1).is_none());
        assert!(state.read().get(2).is_some());
    }

    #[test]
    fn apply_skips_replica_for_deduplicated_records() {
        let state = SharedState::default();
        state.write().update(&message(1)).unwrap();
        let mut side = controller(vec![message(1)], &state);

        let mut ours = message(1);
        let mut theirs = message(1);
        ours.record_change(READ, Change::Set).unwrap();
        theirs.record_change(READ, Change::Set).unwrap();
        ours.merge(&mut theirs).unwrap();
        let batch: RecordSet = [ours].into_iter().collect();

        let report = side.apply(&batch).unwrap();

        assert_eq!(report.skipped, vec![1]);
        assert_eq!(side.replica().write_count(), 0);
        assert_eq!(state.read().get(1).unwrap().attribute(READ), Some(true));
    }
}

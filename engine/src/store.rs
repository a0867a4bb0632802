//! Replica stores - one side's live data.
//!
//! [`Replica`] is the seam to a real driver (an IMAP account, a maildir).
//! [`MemoryReplica`] keeps everything in memory and can be told to fail
//! writes, which is what the tests and the runner use.

use crate::{
    error::Result, AttributeSchema, Error, Record, RecordId, RecordSet, StoreSnapshot,
};
use std::collections::HashMap;
use tracing::trace;

/// One side's live data as seen by the engine.
pub trait Replica {
    /// Name used in logs and errors ("left", "right", an account name).
    fn name(&self) -> &str;

    /// The live records, not a copy.
    fn search(&self) -> &RecordSet;

    /// Write a record coming from the other side.
    ///
    /// Known ids are patched with the record's changes, unseen ids are
    /// created from the full record. A failed write must leave the replica
    /// exactly as it was.
    fn update(&mut self, record: &Record) -> Result<()>;
}

/// How a scheduled write failure behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    /// Fail this many more times, then succeed
    Times(u32),
    Always,
}

/// In-memory replica.
#[derive(Debug, Clone)]
pub struct MemoryReplica {
    name: String,
    records: RecordSet,
    failures: HashMap<RecordId, FailureMode>,
    /// Successful writes since creation
    writes: u64,
}

impl MemoryReplica {
    /// Create an empty replica.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RecordSet::new(),
            failures: HashMap::new(),
            writes: 0,
        }
    }

    /// Create a replica holding settled copies of `records`.
    pub fn with_records(name: impl Into<String>, records: impl IntoIterator<Item = Record>) -> Self {
        let mut replica = Self::new(name);
        for record in records {
            replica.write_from_outside(record);
        }
        replica
    }

    /// Restore a replica from a snapshot.
    pub fn from_snapshot(
        name: impl Into<String>,
        snapshot: &StoreSnapshot,
        schema: &AttributeSchema,
    ) -> Result<Self> {
        let records = snapshot.to_records(schema)?;
        Ok(Self::with_records(name, records))
    }

    /// Export the replica's records.
    pub fn export_snapshot(&self, schema: &AttributeSchema) -> StoreSnapshot {
        StoreSnapshot::from_records(schema, self.records.iter())
    }

    /// Store a record as if a user changed it, bypassing sync.
    pub fn write_from_outside(&mut self, record: Record) {
        self.records.insert(record.settled());
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Mutable access for changes made outside of sync.
    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.records.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful writes made through [`Replica::update`].
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Make the next write of `id` fail.
    pub fn fail_next_update_of(&mut self, id: RecordId) {
        let mode = match self.failures.get(&id) {
            Some(FailureMode::Times(n)) => FailureMode::Times(n + 1),
            Some(FailureMode::Always) => FailureMode::Always,
            None => FailureMode::Times(1),
        };
        self.failures.insert(id, mode);
    }

    /// Make every write of `id` fail until [`Self::clear_failures`].
    pub fn fail_always(&mut self, id: RecordId) {
        self.failures.insert(id, FailureMode::Always);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    fn take_failure(&mut self, id: RecordId) -> Option<Error> {
        let exhausted = match self.failures.get_mut(&id)? {
            FailureMode::Always => false,
            FailureMode::Times(n) => {
                *n -= 1;
                *n == 0
            }
        };
        if exhausted {
            self.failures.remove(&id);
        }
        Some(Error::WriteFailed {
            replica: self.name.clone(),
            id,
            reason: "injected write failure".to_string(),
        })
    }
}

impl Replica for MemoryReplica {
    fn name(&self) -> &str {
        &self.name
    }

    fn search(&self) -> &RecordSet {
        &self.records
    }

    fn update(&mut self, record: &Record) -> Result<()> {
        if let Some(err) = self.take_failure(record.id()) {
            return Err(err);
        }

        match self.records.get_mut(record.id()) {
            Some(existing) => record.apply_to(existing)?,
            None if record.has_pending_changes() => {
                self.records.insert(record.settled());
            }
            None => {
                trace!(replica = %self.name, id = record.id(), "already up to date");
                return Ok(());
            }
        }

        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{IMPORTANT, READ};
    use crate::Change;

    fn message(id: RecordId) -> Record {
        AttributeSchema::default().new_record(id, format!("{} body", id))
    }

    #[test]
    fn update_inserts_new_record_in_full() {
        let mut replica = MemoryReplica::new("left");
        let mut incoming = message(1);
        incoming.mark(IMPORTANT).unwrap();
        incoming.mark_new();

        replica.update(&incoming).unwrap();

        let stored = replica.get(1).unwrap();
        assert_eq!(stored.attribute(IMPORTANT), Some(true));
        assert!(!stored.is_new());
        assert!(stored.changes().is_empty());
        assert_eq!(replica.write_count(), 1);
    }

    #[test]
    fn update_patches_existing_record() {
        let mut current = message(1);
        current.mark(IMPORTANT).unwrap();
        let mut replica = MemoryReplica::with_records("left", [current]);

        let mut incoming = message(1);
        incoming.record_change(READ, Change::Set).unwrap();
        replica.update(&incoming).unwrap();

        let stored = replica.get(1).unwrap();
        assert_eq!(stored.attribute(READ), Some(true));
        assert_eq!(stored.attribute(IMPORTANT), Some(true));
    }

    #[test]
    fn update_ignores_unknown_record_without_changes() {
        let mut replica = MemoryReplica::new("right");
        replica.update(&message(1)).unwrap();

        assert!(replica.is_empty());
        assert_eq!(replica.write_count(), 0);
    }

    #[test]
    fn failed_write_leaves_replica_untouched() {
        let mut replica = MemoryReplica::with_records("left", [message(1)]);
        replica.fail_next_update_of(1);

        let mut incoming = message(1);
        incoming.record_change(READ, Change::Set).unwrap();

        let err = replica.update(&incoming).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(replica.get(1).unwrap().attribute(READ), Some(false));
        assert_eq!(replica.write_count(), 0);

        // One-shot failure: the retry goes through
        replica.update(&incoming).unwrap();
        assert_eq!(replica.get(1).unwrap().attribute(READ), Some(true));
    }

    #[test]
    fn fail_always_until_cleared() {
        let mut replica = MemoryReplica::new("left");
        replica.fail_always(2);
        let mut incoming = message(2);
        incoming.mark_new();

        assert!(replica.update(&incoming).is_err());
        assert!(replica.update(&incoming).is_err());

        replica.clear_failures();
        assert!(replica.update(&incoming).is_ok());
        assert!(replica.get(2).is_some());
    }

    #[test]
    fn write_from_outside_settles_record() {
        let mut record = message(1);
        record.mark_new();
        let mut replica = MemoryReplica::new("left");
        replica.write_from_outside(record);

        assert!(!replica.get(1).unwrap().is_new());
        assert_eq!(replica.write_count(), 0);
    }

    #[test]
    fn search_returns_live_records() {
        let mut replica = MemoryReplica::with_records("left", [message(1)]);
        replica.get_mut(1).unwrap().mark(READ).unwrap();

        let live = replica.search().get(1).unwrap();
        assert_eq!(live.attribute(READ), Some(true));
    }
}

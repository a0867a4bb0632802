//! Shared state store - the last state both replicas agreed on.

use crate::{error::Result, AttributeSchema, Record, RecordId, RecordSet, StoreSnapshot};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The synchronization baseline.
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    records: RecordSet,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore the baseline from a snapshot.
    pub fn from_snapshot(snapshot: &StoreSnapshot, schema: &AttributeSchema) -> Result<Self> {
        let records = snapshot.to_records(schema)?;
        Ok(Self {
            records: records.into_iter().collect(),
        })
    }

    pub fn export_snapshot(&self, schema: &AttributeSchema) -> StoreSnapshot {
        StoreSnapshot::from_records(schema, self.records.iter())
    }

    /// The live baseline records.
    pub fn search(&self) -> &RecordSet {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record a change that was written to a replica.
    ///
    /// Known ids get both ledgers of `record`; unseen ids store a settled
    /// copy. Only call this once the replica write succeeded.
    pub fn update(&mut self, record: &Record) -> Result<()> {
        match self.records.get_mut(record.id()) {
            Some(existing) => record.apply_state_changes_to(existing)?,
            None => {
                self.records.insert(record.settled());
            }
        }
        Ok(())
    }
}

/// Handle to the one [`StateStore`] both sides read and write.
///
/// Cloning the handle shares the store. Access goes through a lock so the
/// two sides can later run on separate threads; each update touches a single
/// entry and leaves the map consistent, so a poisoned lock is recovered.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    inner: Arc<RwLock<StateStore>>,
}

impl SharedState {
    pub fn new(store: StateStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, StateStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, StateStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether two handles point at the same store.
    pub fn same_store(&self, other: &SharedState) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

//! Identity-keyed collection of records.

use crate::{Record, RecordId};
use std::collections::HashMap;

/// Records keyed by id, iterated in insertion order.
///
/// Every stored record is owned by the set. Callers hand over a value
/// (cloning their own copy first when they keep one), so mutating a record in
/// one set never shows through another.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any record with the same id in place.
    ///
    /// Returns the replaced record.
    pub fn insert(&mut self, record: Record) -> Option<Record> {
        match self.index.get(&record.id()) {
            Some(&slot) => Some(std::mem::replace(&mut self.records[slot], record)),
            None => {
                self.index.insert(record.id(), self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.index.get(&id).map(|&slot| &self.records[slot])
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Record> {
        self.index.get(&id).map(|&slot| &mut self.records[slot])
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Record> {
        self.records.iter_mut()
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(Record::id).collect()
    }
}

impl FromIterator<Record> for RecordSet {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut set = RecordSet::new();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

impl IntoIterator for RecordSet {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

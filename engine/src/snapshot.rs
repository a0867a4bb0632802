//! Snapshot types for persisting and restoring stores.
//!
//! Snapshots are the bridge between in-memory stores and whatever persistence
//! the caller owns. Only settled state is captured: attribute values and
//! content, never change ledgers.

use crate::{error::Result, AttributeName, AttributeSchema, Error, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One record inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub content: String,
    pub attributes: BTreeMap<AttributeName, bool>,
}

/// A point-in-time snapshot of a replica or of the shared state.
///
/// Uses BTreeMap instead of HashMap for deterministic serialization order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Attribute names every record carries
    pub attributes: Vec<AttributeName>,
    /// Records by id
    pub records: BTreeMap<RecordId, SnapshotRecord>,
}

impl StoreSnapshot {
    /// Create an empty snapshot for a schema.
    pub fn new(schema: &AttributeSchema) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            attributes: schema.names().cloned().collect(),
            records: BTreeMap::new(),
        }
    }

    /// Capture settled copies of `records`.
    pub fn from_records<'a>(
        schema: &AttributeSchema,
        records: impl IntoIterator<Item = &'a Record>,
    ) -> Self {
        let mut snapshot = Self::new(schema);
        for record in records {
            snapshot.add_record(record);
        }
        snapshot
    }

    pub fn add_record(&mut self, record: &Record) {
        self.records.insert(
            record.id(),
            SnapshotRecord {
                content: record.content().to_string(),
                attributes: record.attributes().clone(),
            },
        );
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Validate the snapshot against a schema.
    pub fn validate(&self, schema: &AttributeSchema) -> Result<()> {
        let declared = AttributeSchema::new(self.attributes.iter().cloned());
        if &declared != schema {
            return Err(Error::SchemaMismatch {
                expected: schema.names().cloned().collect(),
                actual: self.attributes.clone(),
            });
        }

        for record in self.records.values() {
            schema.validate_attributes(&record.attributes)?;
        }

        Ok(())
    }

    /// Validate and turn the snapshot back into settled records, in id order.
    pub fn to_records(&self, schema: &AttributeSchema) -> Result<Vec<Record>> {
        self.validate(schema)?;
        Ok(self
            .records
            .iter()
            .map(|(id, record)| {
                Record::with_attributes(*id, record.content.clone(), record.attributes.clone())
            })
            .collect())
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (expected {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        Ok(snapshot)
    }
}

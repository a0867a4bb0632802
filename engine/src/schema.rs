//! Attribute schema.
//!
//! The set of boolean attributes a record carries is fixed up front; the
//! engine never discovers attributes from the data it syncs.

use crate::{error::Result, AttributeName, Error, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The "seen" flag of a message.
pub const READ: &str = "read";
/// The "flagged" flag of a message.
pub const IMPORTANT: &str = "important";

/// Known boolean attributes of every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeSchema {
    attributes: BTreeSet<AttributeName>,
}

impl AttributeSchema {
    /// Create a schema from attribute names. Duplicates collapse.
    pub fn new<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<AttributeName>,
    {
        Self {
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder-style method to add an attribute.
    pub fn with_attribute(mut self, attribute: impl Into<AttributeName>) -> Self {
        self.attributes.insert(attribute.into());
        self
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.attributes.contains(attribute)
    }

    /// Attribute names in order.
    pub fn names(&self) -> impl Iterator<Item = &AttributeName> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Create a record with every attribute false.
    pub fn new_record(&self, id: RecordId, content: impl Into<String>) -> Record {
        let attributes = self
            .attributes
            .iter()
            .map(|name| (name.clone(), false))
            .collect();
        Record::with_attributes(id, content, attributes)
    }

    /// Check that an attribute map carries exactly this schema's attributes.
    pub fn validate_attributes(&self, attributes: &BTreeMap<AttributeName, bool>) -> Result<()> {
        if attributes.len() == self.attributes.len()
            && attributes.keys().all(|name| self.attributes.contains(name))
        {
            return Ok(());
        }

        Err(Error::SchemaMismatch {
            expected: self.attributes.iter().cloned().collect(),
            actual: attributes.keys().cloned().collect(),
        })
    }

    pub fn validate_record(&self, record: &Record) -> Result<()> {
        self.validate_attributes(record.attributes())
    }
}

impl Default for AttributeSchema {
    /// The mailbox flags: `important` and `read`.
    fn default() -> Self {
        Self::new([IMPORTANT, READ])
    }
}

//! Tri-state attribute changes and the per-record change ledger.

use crate::AttributeName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happened to a boolean attribute since the last sync.
///
/// `Unset` is a change to `false`, which is why this is not an `Option<bool>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Change {
    /// No change since the last sync
    #[default]
    Unchanged,
    /// The attribute turned true
    Set,
    /// The attribute turned false
    Unset,
}

impl Change {
    /// The change that brings an attribute to `value`.
    pub fn from_value(value: bool) -> Self {
        if value {
            Change::Set
        } else {
            Change::Unset
        }
    }

    /// The value this change writes, or `None` for `Unchanged`.
    pub fn value(self) -> Option<bool> {
        match self {
            Change::Unchanged => None,
            Change::Set => Some(true),
            Change::Unset => Some(false),
        }
    }

    pub fn is_unchanged(self) -> bool {
        self == Change::Unchanged
    }
}

impl std::fmt::Display for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Change::Unchanged => write!(f, "unchanged"),
            Change::Set => write!(f, "set"),
            Change::Unset => write!(f, "unset"),
        }
    }
}

/// Attribute-level delta of a record.
///
/// Only real changes are stored; an attribute that is absent reads as
/// [`Change::Unchanged`], so an empty ledger is an all-`Unchanged` ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    entries: BTreeMap<AttributeName, Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change recorded for an attribute.
    pub fn get(&self, attribute: &str) -> Change {
        self.entries
            .get(attribute)
            .copied()
            .unwrap_or(Change::Unchanged)
    }

    /// Record a change. Recording `Unchanged` clears the entry.
    pub fn record(&mut self, attribute: impl Into<AttributeName>, change: Change) {
        let attribute = attribute.into();
        if change.is_unchanged() {
            self.entries.remove(&attribute);
        } else {
            self.entries.insert(attribute, change);
        }
    }

    pub fn clear_attribute(&mut self, attribute: &str) {
        self.entries.remove(attribute);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// True when every attribute is `Unchanged`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Attributes with a real change, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttributeName, Change)> {
        self.entries.iter().map(|(name, change)| (name, *change))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeName> {
        self.entries.keys()
    }
}

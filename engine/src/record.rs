//! Record types for synchronized items.

use crate::{error::Result, AttributeName, Change, ChangeSet, Error, RecordId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// A synchronizable item: a mailbox message reduced to its flags.
///
/// Records compare and order by `id` only. Two records with the same id but
/// different flags are "equal" as map keys; use [`Record::identical`] to
/// compare their state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    id: RecordId,
    /// Opaque payload, never interpreted by the engine
    content: String,
    /// Full current state of every attribute
    attributes: BTreeMap<AttributeName, bool>,
    /// Delta to push to the other replica
    #[serde(default, skip_serializing_if = "ChangeSet::is_empty")]
    changes: ChangeSet,
    /// Delta destined only for the shared state
    #[serde(default, skip_serializing_if = "ChangeSet::is_empty")]
    state_changes: ChangeSet,
    /// No counterpart in the shared state yet
    #[serde(default)]
    is_new: bool,
}

/// A change both sides want with different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivergentChange {
    pub attribute: AttributeName,
    pub ours: Change,
    pub theirs: Change,
}

/// What [`Record::merge`] did to a pair of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Identical changes moved to the state-only ledger
    pub deduplicated: Vec<(AttributeName, Change)>,
    /// Conflicting changes left queued on both sides
    pub divergent: Vec<DivergentChange>,
}

impl Record {
    /// Create a settled record from a full attribute map.
    pub fn with_attributes(
        id: RecordId,
        content: impl Into<String>,
        attributes: BTreeMap<AttributeName, bool>,
    ) -> Self {
        Self {
            id,
            content: content.into(),
            attributes,
            changes: ChangeSet::new(),
            state_changes: ChangeSet::new(),
            is_new: false,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn attributes(&self) -> &BTreeMap<AttributeName, bool> {
        &self.attributes
    }

    /// Current value of an attribute, `None` if the record does not carry it.
    pub fn attribute(&self, name: &str) -> Option<bool> {
        self.attributes.get(name).copied()
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn state_changes(&self) -> &ChangeSet {
        &self.state_changes
    }

    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Flag the record as unknown to the shared state.
    pub fn mark_new(&mut self) {
        self.is_new = true;
    }

    /// Change the current value of a known attribute.
    pub fn set_attribute(&mut self, name: &str, value: bool) -> Result<()> {
        match self.attributes.get_mut(name) {
            Some(current) => {
                *current = value;
                Ok(())
            }
            None => Err(Error::UnknownAttribute(name.to_string())),
        }
    }

    pub fn mark(&mut self, name: &str) -> Result<()> {
        self.set_attribute(name, true)
    }

    pub fn unmark(&mut self, name: &str) -> Result<()> {
        self.set_attribute(name, false)
    }

    /// Queue a change reported directly by a driver, moving the attribute
    /// to the value the change writes.
    pub fn record_change(&mut self, name: &str, change: Change) -> Result<()> {
        let current = self
            .attributes
            .get_mut(name)
            .ok_or_else(|| Error::UnknownAttribute(name.to_string()))?;
        if let Some(value) = change.value() {
            *current = value;
        }
        self.changes.record(name, change);
        Ok(())
    }

    fn ensure_same_id(&self, other: &Record) -> Result<()> {
        if self.id == other.id {
            Ok(())
        } else {
            Err(Error::IdentityMismatch {
                expected: self.id,
                actual: other.id,
            })
        }
    }

    /// Compare attribute state with another copy of the same record.
    pub fn identical(&self, other: &Record) -> Result<bool> {
        self.ensure_same_id(other)?;
        Ok(self.attributes == other.attributes)
    }

    /// Learn what changed since `reference`, the last agreed copy.
    ///
    /// Changes describe where this record is now, not how it got there.
    pub fn learn_changes(&mut self, reference: &Record) -> Result<()> {
        self.ensure_same_id(reference)?;

        let names: BTreeSet<AttributeName> = self
            .attributes
            .keys()
            .chain(reference.attributes.keys())
            .cloned()
            .collect();

        for name in names {
            let current = self.attribute(&name);
            if current == reference.attribute(&name) {
                continue;
            }
            let value = current.unwrap_or(false);
            debug!(id = self.id, attribute = %name, value, "learning change");
            self.changes.record(name, Change::from_value(value));
        }

        Ok(())
    }

    /// Patch `target` with this record's changes. New records are written
    /// wholesale by the store, so they patch nothing.
    pub fn apply_to(&self, target: &mut Record) -> Result<()> {
        self.ensure_same_id(target)?;
        if self.is_new {
            return Ok(());
        }
        patch(&self.changes, target);
        Ok(())
    }

    /// Patch a shared state copy: driver changes first, then state-only ones.
    pub fn apply_state_changes_to(&self, target: &mut Record) -> Result<()> {
        self.ensure_same_id(target)?;
        if self.is_new {
            return Ok(());
        }
        patch(&self.changes, target);
        patch(&self.state_changes, target);
        Ok(())
    }

    /// Whether a driver has anything to write for this record.
    pub fn has_pending_changes(&self) -> bool {
        self.is_new || !self.changes.is_empty()
    }

    /// Resolve concurrent changes against the other side's copy, in place on
    /// both records.
    ///
    /// A change made identically on both sides is dropped from both driver
    /// ledgers and kept once in this record's state-only ledger. Divergent
    /// changes stay queued on both sides and are reported.
    pub fn merge(&mut self, other: &mut Record) -> Result<MergeOutcome> {
        self.ensure_same_id(other)?;

        let names: BTreeSet<AttributeName> = self
            .changes
            .attributes()
            .chain(other.changes.attributes())
            .cloned()
            .collect();

        let mut outcome = MergeOutcome::default();
        for name in names {
            let ours = self.changes.get(&name);
            let theirs = other.changes.get(&name);

            if ours == theirs {
                if ours.is_unchanged() {
                    continue;
                }
                debug!(id = self.id, attribute = %name, change = %ours, "ignoring change made on both sides");
                self.changes.clear_attribute(&name);
                other.changes.clear_attribute(&name);
                self.state_changes.record(name.clone(), ours);
                outcome.deduplicated.push((name, ours));
            } else if !ours.is_unchanged() && !theirs.is_unchanged() {
                outcome.divergent.push(DivergentChange {
                    attribute: name,
                    ours,
                    theirs,
                });
            }
        }

        Ok(outcome)
    }

    /// Drop both ledgers and the new flag once the record is durably stored.
    pub fn settle(&mut self) {
        self.changes.clear();
        self.state_changes.clear();
        self.is_new = false;
    }

    /// A settled copy, the form records take inside a store.
    pub fn settled(&self) -> Record {
        let mut copy = self.clone();
        copy.settle();
        copy
    }
}

fn patch(changes: &ChangeSet, target: &mut Record) {
    for (name, change) in changes.iter() {
        if let Some(value) = change.value() {
            target.attributes.insert(name.clone(), value);
        }
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

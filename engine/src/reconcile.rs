//! Conflict resolution between the two sides' change sets.
//!
//! # Algorithm
//!
//! 1. Walk the left change set and look up each id on the right
//! 2. Merge every pair of records present on both sides, in place on both
//! 3. Changes made identically on both sides become state-only changes
//! 4. Divergent changes are reported and left queued on both sides
//!
//! Records present on one side only are never touched. There is no
//! tie-break for divergent changes: each side receives the other's value.

use crate::{error::Result, AttributeName, Change, RecordId, RecordSet};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// An attribute both sides changed to different values since the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    pub id: RecordId,
    pub attribute: AttributeName,
    /// Change found on the left replica
    pub left: Change,
    /// Change found on the right replica
    pub right: Change,
}

/// A change both sides made identically; only the shared state learns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deduplication {
    pub id: RecordId,
    pub attribute: AttributeName,
    pub change: Change,
}

/// Result of merging two change sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub deduplicated: Vec<Deduplication>,
    pub conflicts: Vec<Conflict>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.deduplicated.is_empty() && self.conflicts.is_empty()
    }
}

impl RecordSet {
    /// Merge this change set with the other side's, mutating both.
    ///
    /// One pass is enough: each [`crate::Record::merge`] call updates the
    /// record on both sides.
    pub fn merge_with(&mut self, other: &mut RecordSet) -> Result<MergeReport> {
        let mut report = MergeReport::default();

        for ours in self.iter_mut() {
            let id = ours.id();
            let Some(theirs) = other.get_mut(id) else {
                continue;
            };
            let outcome = ours.merge(theirs)?;

            report
                .deduplicated
                .extend(outcome.deduplicated.into_iter().map(|(attribute, change)| {
                    Deduplication {
                        id,
                        attribute,
                        change,
                    }
                }));

            for divergent in outcome.divergent {
                warn!(
                    id,
                    attribute = %divergent.attribute,
                    left = %divergent.ours,
                    right = %divergent.theirs,
                    "divergent changes left unresolved"
                );
                report.conflicts.push(Conflict {
                    id,
                    attribute: divergent.attribute,
                    left: divergent.ours,
                    right: divergent.theirs,
                });
            }
        }

        Ok(report)
    }
}

//! Error types for the twinsync engine.

use crate::{AttributeName, RecordId};
use thiserror::Error;

/// All possible errors from the twinsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Programming errors
    #[error("identity mismatch: expected record {expected}, got {actual}")]
    IdentityMismatch { expected: RecordId, actual: RecordId },

    // Replica errors
    #[error("write to {replica} failed for record {id}: {reason}")]
    WriteFailed {
        replica: String,
        id: RecordId,
        reason: String,
    },

    // Validation errors
    #[error("unknown attribute: {0}")]
    UnknownAttribute(AttributeName),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("attribute schema mismatch: expected {expected:?}, got {actual:?}")]
    SchemaMismatch {
        expected: Vec<AttributeName>,
        actual: Vec<AttributeName>,
    },
}

impl Error {
    /// Whether the error is a transient replica write failure.
    ///
    /// Transient failures are retried naturally by the next round; anything
    /// else is a caller bug.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::WriteFailed { .. })
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::IdentityMismatch {
            expected: 1,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "identity mismatch: expected record 1, got 2"
        );

        let err = Error::WriteFailed {
            replica: "left".into(),
            id: 7,
            reason: "connection reset".into(),
        };
        assert_eq!(
            err.to_string(),
            "write to left failed for record 7: connection reset"
        );

        let err = Error::UnknownAttribute("flagged".into());
        assert_eq!(err.to_string(), "unknown attribute: flagged");
    }

    #[test]
    fn only_write_failures_are_transient() {
        let write = Error::WriteFailed {
            replica: "right".into(),
            id: 1,
            reason: "timeout".into(),
        };
        assert!(write.is_transient());

        let mismatch = Error::IdentityMismatch {
            expected: 1,
            actual: 2,
        };
        assert!(!mismatch.is_transient());
    }
}

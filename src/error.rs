//! Errors that stop a reconciliation run.

use crate::types::{ChangeSide, ObjectId, Stage};

/// Error type for reconciliation.
///
/// Recoverable conditions are never returned here; they surface as
/// [`Diagnostic`](crate::types::Diagnostic)s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// An identifier in the change universe matched no classification rule.
    #[error("Invariant violation for object {object_id}: {detail}")]
    InvariantViolation {
        /// Offending identifier.
        object_id: ObjectId,
        /// What went wrong.
        detail: String,
    },
    /// An identifier appears in more than one collection of a change-set.
    #[error("Object {object_id} appears more than once in the {side} change-set")]
    DuplicateChangeEntry {
        /// Change-set holding the duplicate.
        side: ChangeSide,
        /// Duplicated identifier.
        object_id: ObjectId,
    },
    /// The caller's deadline passed.
    #[error("Deadline exceeded after {stage} stage")]
    DeadlineExceeded {
        /// Last completed stage.
        stage: Stage,
    },
    /// The caller cancelled the run.
    #[error("Run cancelled after {stage} stage")]
    Cancelled {
        /// Last completed stage.
        stage: Stage,
    },
}

impl ReconcileError {
    /// Whether the error indicates a bug upstream rather than a caller limit.
    pub fn is_invariant(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolation { .. } | Self::DuplicateChangeEntry { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ReconcileError::DuplicateChangeEntry {
            side: ChangeSide::Vendor,
            object_id: ObjectId::new("X"),
        };
        assert_eq!(
            err.to_string(),
            "Object X appears more than once in the vendor change-set"
        );
        assert!(err.is_invariant());

        let err = ReconcileError::DeadlineExceeded { stage: Stage::Ordering };
        assert_eq!(err.to_string(), "Deadline exceeded after ordering stage");
        assert!(!err.is_invariant());
    }
}

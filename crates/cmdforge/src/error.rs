//! Error types for cmdforge

use thiserror::Error;

/// Result type alias for cmdforge operations
pub type CmdResult<T> = Result<T, CmdError>;

/// Errors raised while building or rendering a command.
///
/// Every error is synchronous: it surfaces at the offending builder call or at
/// render time and is never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CmdError {
    /// A clause was added out of construction order.
    #[error("{clause} must be added before {after}")]
    State {
        clause: &'static str,
        after: &'static str,
    },

    /// The backend cannot express the requested construct.
    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// UPDATE/DELETE without a filter and without the explicit opt-in.
    #[error("refusing {operation} without a filter; pass allow_empty_filter to override")]
    EmptyFilter { operation: &'static str },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CmdError {
    /// Create a construction-order error.
    pub fn state(clause: &'static str, after: &'static str) -> Self {
        Self::State { clause, after }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(backend: &'static str, operation: &'static str) -> Self {
        Self::Unsupported { backend, operation }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Check if this is a construction-order error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Check if this is an unsupported-operation error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// Check if this is an empty-filter guard error
    pub fn is_empty_filter(&self) -> bool {
        matches!(self, Self::EmptyFilter { .. })
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_message_names_both_clauses() {
        let err = CmdError::state("condition", "GROUP BY");
        assert!(err.is_state());
        assert_eq!(err.to_string(), "condition must be added before GROUP BY");
    }

    #[test]
    fn unsupported_message() {
        let err = CmdError::unsupported("document store", "nested condition groups");
        assert!(err.is_unsupported());
        assert_eq!(
            err.to_string(),
            "document store does not support nested condition groups"
        );
    }

    #[test]
    fn empty_filter_message() {
        let err = CmdError::EmptyFilter { operation: "DELETE" };
        assert!(err.is_empty_filter());
        assert!(err.to_string().contains("DELETE"));
        assert!(!err.is_validation());
    }
}

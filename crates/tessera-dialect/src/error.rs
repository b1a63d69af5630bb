//! Dialect error types.

use thiserror::Error;

/// Errors raised by dialect operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DialectError {
    /// The dialect cannot perform the requested operation at all.
    #[error("unsupported on {dialect}: {operation}")]
    Unsupported {
        /// Dialect display name.
        dialect: &'static str,
        /// What was asked for.
        operation: String,
    },

    /// Inputs failed structural validation (empty column or parameter
    /// lists and similar).
    #[error("invalid dialect input: {0}")]
    Validation(String),

    /// Paired inputs disagreed in length.
    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// The owning context or engine has been disposed.
    #[error("dialect engine has been disposed")]
    Disposed,
}

impl DialectError {
    /// Build an [`DialectError::Unsupported`] for a named operation.
    #[must_use]
    pub fn unsupported(dialect: &'static str, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            dialect,
            operation: operation.into(),
        }
    }
}

/// Result alias for dialect operations.
pub type Result<T> = std::result::Result<T, DialectError>;

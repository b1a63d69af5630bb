//! The central error surface for the data-access core.

use thiserror::Error;

/// Errors surfaced by contexts, containers, transactions, and the entity
/// layer built on top of them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration or registration is structurally invalid (missing
    /// table annotation, duplicate columns, bad primary-key ordering).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The operation is not supported in this context or on this dialect
    /// (write on a read-only context, MERGE without support, session
    /// last-id on Oracle).
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The object is in the wrong state (double commit, disposed context,
    /// nested transaction).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A caller-supplied argument is invalid (empty id collection, name
    /// collision, parameter count beyond the dialect cap).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An optimistic-concurrency version check matched zero rows.
    #[error("optimistic concurrency failure: {0}")]
    OptimisticConcurrency(String),

    /// Command creation or driver execution failed.
    #[error("connection failure: {message}")]
    ConnectionFailure {
        /// Provider error code, when the driver surfaced one.
        code: Option<String>,
        /// Driver message.
        message: String,
    },

    /// Admission control timed out.
    #[error(transparent)]
    PoolSaturated(#[from] tessera_pool::PoolError),

    /// Value coercion failed.
    #[error(transparent)]
    TypeCoercion(#[from] tessera_types::TypeError),

    /// Dialect-level failure.
    #[error(transparent)]
    Dialect(#[from] tessera_dialect::DialectError),

    /// A single-row load found nothing, surfaced only at caller-facing
    /// edges; internal lookups return `Option` instead.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation was cancelled through its token.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Build a [`Error::ConnectionFailure`] from a driver code and message.
    #[must_use]
    pub fn connection(code: Option<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            code,
            message: message.into(),
        }
    }

    /// Whether the failure may clear on retry. Validation-shaped errors
    /// never do.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailure { .. } | Self::Cancelled => true,
            Self::PoolSaturated(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Whether this is a validation-shaped error the caller must fix.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::InvalidArgument(_) | Self::UnsupportedOperation(_)
        )
    }
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Pool governor error types.

use thiserror::Error;

/// Errors raised by the pool governor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PoolError {
    /// Construction parameters were invalid.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// An acquire timed out; the pool is saturated.
    ///
    /// Carries the governor's opaque hash so operators can correlate
    /// saturation reports with a specific pool instance.
    #[error("pool saturated (pool {pool_hash:#x})")]
    Saturated {
        /// Opaque identity hash of the saturated governor.
        pool_hash: u64,
    },

    /// The caller's cancellation token fired.
    #[error("pool operation cancelled")]
    Cancelled,

    /// A drain wait timed out before `in_use` reached zero.
    #[error("drain wait timed out")]
    DrainTimedOut,

    /// The governor's semaphore was closed during an acquire.
    #[error("pool closed")]
    Closed,
}

impl PoolError {
    /// Whether the error may clear on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Saturated { .. } | Self::DrainTimedOut)
    }
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturated_carries_hash() {
        let err = PoolError::Saturated { pool_hash: 0xBEEF };
        assert!(err.to_string().contains("0xbeef"));
        assert!(err.is_transient());
    }

    #[test]
    fn test_cancelled_is_not_transient() {
        assert!(!PoolError::Cancelled.is_transient());
        assert!(!PoolError::InvalidConfig("x".into()).is_transient());
    }
}

//! Type system error types.

use thiserror::Error;

/// Errors raised while coercing values or configuring parameters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TypeError {
    /// A value could not be converted to the requested target type.
    #[error("cannot coerce {source_type} to {target}")]
    IncompatibleCast {
        /// Type name of the source value.
        source_type: &'static str,
        /// Description of the requested target.
        target: String,
    },

    /// A database NULL arrived for a target that does not admit null.
    #[error("null value for non-nullable target {target}")]
    UnexpectedNull {
        /// Description of the requested target.
        target: String,
    },

    /// A numeric value does not fit the target type.
    #[error("value {value} out of range for {target}")]
    OutOfRange {
        /// Rendered source value.
        value: String,
        /// Description of the requested target.
        target: String,
    },

    /// Text input did not match the expected format.
    #[error("invalid {what}: {input:?}")]
    InvalidFormat {
        /// What was being parsed.
        what: &'static str,
        /// The offending input, possibly truncated.
        input: String,
    },

    /// A byte payload had the wrong length.
    #[error("invalid length for {what}: expected {expected}, got {actual}")]
    InvalidLength {
        /// What was being constructed.
        what: &'static str,
        /// Expected byte count description.
        expected: &'static str,
        /// Actual byte count.
        actual: usize,
    },

    /// An enum member was not found.
    #[error("unknown member {input:?} for enum {enum_name}")]
    UnknownEnumMember {
        /// The logical enum name.
        enum_name: String,
        /// The value that failed to resolve.
        input: String,
    },

    /// JSON arriving from a stream source failed to parse.
    ///
    /// Invalid JSON from a *string* source is logged and read as null
    /// instead; only stream sources surface the failure.
    #[error("invalid JSON from stream source: {0}")]
    InvalidJson(String),
}

impl TypeError {
    /// Build an [`TypeError::IncompatibleCast`] from a source value name and
    /// target description.
    #[must_use]
    pub fn cast(source_type: &'static str, target: impl Into<String>) -> Self {
        Self::IncompatibleCast {
            source_type,
            target: target.into(),
        }
    }

    /// Build an [`TypeError::InvalidFormat`] with the input truncated to a
    /// loggable size.
    #[must_use]
    pub fn format(what: &'static str, input: &str) -> Self {
        let mut input = input.to_owned();
        if input.len() > 128 {
            input.truncate(128);
        }
        Self::InvalidFormat { what, input }
    }
}

/// Result alias for type system operations.
pub type Result<T> = std::result::Result<T, TypeError>;

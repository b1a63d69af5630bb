//! Provider-agnostic logical type tags and generic wire-level type tags.

use core::fmt;

/// The provider-agnostic type tag attached to entity columns and used as
/// half of the type-mapping registry key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LogicalType {
    /// Boolean.
    Boolean,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Fixed-point decimal.
    Decimal,
    /// Unicode text.
    Text,
    /// Raw bytes.
    Binary,
    /// GUID / UUID.
    Uuid,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with a UTC offset.
    DateTimeOffset,
    /// JSON document carried as text.
    Json,
    /// Host address with optional prefix.
    Inet,
    /// Network in CIDR notation.
    Cidr,
    /// MAC address.
    MacAddress,
    /// Planar spatial value.
    Geometry,
    /// Geodetic spatial value.
    Geography,
    /// Range over 32-bit integers.
    IntRange,
    /// Range over 64-bit integers.
    BigIntRange,
    /// Range over decimals.
    NumericRange,
    /// Range over timestamps.
    TimestampRange,
    /// PostgreSQL-style month/day/microsecond interval.
    Interval,
    /// Oracle year-to-month interval.
    IntervalYearMonth,
    /// Oracle day-to-second interval.
    IntervalDaySecond,
    /// 8-byte row-version concurrency token.
    RowVersion,
    /// PostgreSQL `hstore` map.
    HStore,
    /// Binary large object.
    Blob,
    /// Character large object.
    Clob,
    /// Array with the given element type.
    Array(Box<LogicalType>),
}

impl LogicalType {
    /// Whether this tag describes one of the advanced value-object types
    /// (network, spatial, range, interval, row-version, hstore, LOB).
    #[must_use]
    pub fn is_advanced(&self) -> bool {
        matches!(
            self,
            Self::Inet
                | Self::Cidr
                | Self::MacAddress
                | Self::Geometry
                | Self::Geography
                | Self::IntRange
                | Self::BigIntRange
                | Self::NumericRange
                | Self::TimestampRange
                | Self::Interval
                | Self::IntervalYearMonth
                | Self::IntervalDaySecond
                | Self::RowVersion
                | Self::HStore
                | Self::Blob
                | Self::Clob
                | Self::Array(_)
        )
    }

    /// The array element type, when this is an array tag.
    #[must_use]
    pub fn element(&self) -> Option<&LogicalType> {
        match self {
            Self::Array(el) => Some(el),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(el) => write!(f, "Array<{el}>"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Generic wire-level parameter type tags, the lowest common denominator a
/// driver understands before provider-specific configuration applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DbType {
    /// Provider decides from the value.
    #[default]
    Object,
    /// Boolean.
    Boolean,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 32-bit floating point.
    Single,
    /// 64-bit floating point.
    Double,
    /// Fixed-point decimal.
    Decimal,
    /// Unicode text.
    String,
    /// Raw bytes.
    Binary,
    /// GUID / UUID.
    Guid,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Date and time without offset.
    DateTime,
    /// Date and time with a UTC offset.
    DateTimeOffset,
    /// JSON text.
    Json,
}

//! The tagged value union flowing between callers, parameters, and readers.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::hstore::HStore;
use crate::interval::{IntervalDaySecond, IntervalYearMonth, PostgresInterval};
use crate::net::{Cidr, Inet, MacAddress};
use crate::range::Range;
use crate::rowversion::RowVersion;
use crate::spatial::{Geography, Geometry};

/// A database value of any supported kind, including NULL.
///
/// Every parameter value and every reader cell is represented as a
/// `DbValue`; coercions translate between raw driver shapes and the
/// canonical variants here.
#[derive(Debug, Clone, PartialEq, Default)]
#[non_exhaustive]
pub enum DbValue {
    /// Database NULL.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 32-bit floating point.
    Float32(f32),
    /// 64-bit floating point.
    Float64(f64),
    /// Fixed-point decimal.
    Decimal(rust_decimal::Decimal),
    /// Unicode text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// GUID / UUID.
    Uuid(uuid::Uuid),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
    /// Date and time with a UTC offset.
    DateTimeOffset(DateTime<FixedOffset>),
    /// JSON document carried as raw text.
    Json(String),
    /// Host address.
    Inet(Inet),
    /// Network in CIDR notation.
    Cidr(Cidr),
    /// MAC address.
    MacAddress(MacAddress),
    /// Planar spatial value.
    Geometry(Geometry),
    /// Geodetic spatial value.
    Geography(Geography),
    /// Month/day/microsecond interval.
    Interval(PostgresInterval),
    /// Year-to-month interval.
    IntervalYearMonth(IntervalYearMonth),
    /// Day-to-second interval.
    IntervalDaySecond(IntervalDaySecond),
    /// Range value; bounds are themselves `DbValue`s.
    Range(Box<Range<DbValue>>),
    /// Row-version concurrency token.
    RowVersion(RowVersion),
    /// `hstore` key/value map.
    HStore(HStore),
    /// Array of values sharing one element type.
    Array(Vec<DbValue>),
}

impl DbValue {
    /// Whether this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The value widened to `i64`, for any integral variant.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value widened to `f64`, for any floating variant.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a string slice, for text-carrying variants.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) | Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// The value as bytes, if it is binary.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// A short static name for the variant, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float32(_) => "float32",
            Self::Float64(_) => "float64",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::DateTimeOffset(_) => "datetimeoffset",
            Self::Json(_) => "json",
            Self::Inet(_) => "inet",
            Self::Cidr(_) => "cidr",
            Self::MacAddress(_) => "macaddress",
            Self::Geometry(_) => "geometry",
            Self::Geography(_) => "geography",
            Self::Interval(_) => "interval",
            Self::IntervalYearMonth(_) => "interval_year_month",
            Self::IntervalDaySecond(_) => "interval_day_second",
            Self::Range(_) => "range",
            Self::RowVersion(_) => "rowversion",
            Self::HStore(_) => "hstore",
            Self::Array(_) => "array",
        }
    }
}

impl std::fmt::Display for DbValue {
    /// Human-readable rendering, used for range bounds and diagnostics.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str(""),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Text(v) | Self::Json(v) => f.write_str(v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Self::Uuid(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Time(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::DateTimeOffset(v) => write!(f, "{v}"),
            Self::Inet(v) => write!(f, "{v}"),
            Self::Cidr(v) => write!(f, "{v}"),
            Self::MacAddress(v) => write!(f, "{v}"),
            Self::Geometry(v) => write!(f, "geometry(srid={})", v.srid()),
            Self::Geography(v) => write!(f, "geography(srid={})", v.srid()),
            Self::Interval(v) => write!(f, "{v}"),
            Self::IntervalYearMonth(v) => write!(f, "{v}"),
            Self::IntervalDaySecond(v) => write!(f, "{v}"),
            Self::Range(v) => write!(f, "{v}"),
            Self::RowVersion(v) => write!(f, "{v}"),
            Self::HStore(v) => write!(f, "{v}"),
            Self::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<bool> for DbValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i16> for DbValue {
    fn from(v: i16) -> Self {
        Self::Int16(v)
    }
}

impl From<i32> for DbValue {
    fn from(v: i32) -> Self {
        Self::Int32(v)
    }
}

impl From<i64> for DbValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for DbValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}

impl From<f64> for DbValue {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<String> for DbValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for DbValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Bytes> for DbValue {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<uuid::Uuid> for DbValue {
    fn from(v: uuid::Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<rust_decimal::Decimal> for DbValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<NaiveDate> for DbValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveDateTime> for DbValue {
    fn from(v: NaiveDateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<DateTime<FixedOffset>> for DbValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::DateTimeOffset(v)
    }
}

impl<T: Into<DbValue>> From<Option<T>> for DbValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

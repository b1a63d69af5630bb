//! Bidirectional value coercions.
//!
//! The registry holds an insertion-ordered list of coercions. Reads walk the
//! list in order and the first coercion that claims the (value, target) pair
//! wins; writes dispatch by the identity of the value being bound. Both
//! mutation paths bump the registry's version stamp so cached bindings held
//! elsewhere invalidate by comparison, never by callback.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use parking_lot::RwLock;

use crate::error::TypeError;
use crate::interval::{IntervalDaySecond, IntervalYearMonth, PostgresInterval};
use crate::logical::{DbType, LogicalType};
use crate::net::{Cidr, Inet, MacAddress};
use crate::param::Parameter;
use crate::range::Range;
use crate::rowversion::RowVersion;
use crate::spatial::{Geography, Geometry};
use crate::value::DbValue;

/// How date/time values crossing the boundary are normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeMappingPolicy {
    /// Keep an offset when the source carries one; naive sources are
    /// assumed UTC when an offset target demands one.
    #[default]
    PreferDateTimeOffset,
    /// Convert everything to UTC wall-clock time; unspecified inputs are
    /// treated as already-UTC.
    ForceUtcDateTime,
}

/// Result of offering a (value, target) pair to a single coercion.
#[derive(Debug)]
pub enum CoercionOutcome {
    /// This coercion does not handle the pair; try the next one.
    NotApplicable,
    /// Converted successfully.
    Coerced(DbValue),
    /// This coercion owns the pair but the value is invalid for it.
    Failed(TypeError),
}

/// A single bidirectional coercion.
pub trait Coercion: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Attempt to convert a raw reader value into the canonical value for
    /// `target`.
    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome;

    /// Attempt to rewrite a parameter so its value is in the shape the
    /// provider expects. Returns `true` when this coercion claimed the
    /// value.
    fn try_write(&self, _value: &DbValue, _param: &mut Parameter) -> bool {
        false
    }
}

/// Insertion-ordered coercion registry with a monotonic version stamp.
pub struct CoercionRegistry {
    coercions: RwLock<Vec<Arc<dyn Coercion>>>,
    version: AtomicU64,
}

impl CoercionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            coercions: RwLock::new(Vec::new()),
            version: AtomicU64::new(1),
        }
    }

    /// A registry pre-loaded with the built-in coercions, in the order the
    /// read path consults them.
    #[must_use]
    pub fn with_defaults(policy: TimeMappingPolicy) -> Self {
        let registry = Self::new();
        registry.register(Arc::new(IdentityCoercion));
        registry.register(Arc::new(BoolCoercion));
        registry.register(Arc::new(IntegralCoercion));
        registry.register(Arc::new(GuidCoercion));
        registry.register(Arc::new(DateTimeCoercion { policy }));
        registry.register(Arc::new(JsonCoercion));
        registry.register(Arc::new(NetworkCoercion));
        registry.register(Arc::new(SpatialCoercion));
        registry.register(Arc::new(RangeCoercion));
        registry.register(Arc::new(IntervalCoercion));
        registry.register(Arc::new(RowVersionCoercion));
        registry.register(Arc::new(TextFallbackCoercion));
        registry
    }

    /// Append a coercion and bump the version stamp.
    pub fn register(&self, coercion: Arc<dyn Coercion>) {
        tracing::debug!(coercion = coercion.name(), "registering coercion");
        self.coercions.write().push(coercion);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// The current version stamp. Monotonically increasing.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Convert a raw reader value into the canonical value for `target`.
    ///
    /// NULL handling happens before any coercion runs: a null raw value is
    /// accepted for nullable targets and rejected otherwise.
    ///
    /// # Errors
    ///
    /// Fails when a coercion owns the pair but the value is invalid, when a
    /// null arrives for a non-nullable target, or when no coercion claims
    /// the pair at all.
    pub fn read_as(
        &self,
        raw: &DbValue,
        target: &LogicalType,
        nullable: bool,
    ) -> Result<DbValue, TypeError> {
        if raw.is_null() {
            return if nullable {
                Ok(DbValue::Null)
            } else {
                Err(TypeError::UnexpectedNull {
                    target: target.to_string(),
                })
            };
        }
        for coercion in self.coercions.read().iter() {
            match coercion.try_read(raw, target) {
                CoercionOutcome::NotApplicable => {}
                CoercionOutcome::Coerced(v) => return Ok(v),
                CoercionOutcome::Failed(e) => return Err(e),
            }
        }
        Err(TypeError::cast(raw.type_name(), target.to_string()))
    }

    /// Rewrite a parameter's value into provider shape. Returns `true`
    /// when some coercion claimed it; `false` leaves the parameter as-is.
    pub fn write_param(&self, param: &mut Parameter) -> bool {
        let value = param.value.clone();
        for coercion in self.coercions.read().iter() {
            if coercion.try_write(&value, param) {
                return true;
            }
        }
        false
    }
}

impl Default for CoercionRegistry {
    fn default() -> Self {
        Self::with_defaults(TimeMappingPolicy::default())
    }
}

/// A registered enum column: logical name plus member name/value pairs.
///
/// Enum cells coerce from the member value (integral), the member name
/// (case-insensitive text), or digit text that parses to a member value.
/// Unknown members are rejected in every direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMapping {
    name: String,
    members: Vec<(String, i64)>,
}

impl EnumMapping {
    /// Create an enum mapping from `(name, value)` member pairs.
    #[must_use]
    pub fn new(name: impl Into<String>, members: Vec<(String, i64)>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    /// The logical enum name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member value for a case-insensitive name.
    #[must_use]
    pub fn value_of(&self, member: &str) -> Option<i64> {
        self.members
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(member))
            .map(|(_, v)| *v)
    }

    /// Member name for a value.
    #[must_use]
    pub fn name_of(&self, value: i64) -> Option<&str> {
        self.members
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| n.as_str())
    }

    /// Coerce a raw cell into a member value.
    ///
    /// # Errors
    ///
    /// Unknown members (by value or by name) and non-enum shapes fail.
    pub fn coerce(&self, raw: &DbValue) -> Result<i64, TypeError> {
        let unknown = |input: String| TypeError::UnknownEnumMember {
            enum_name: self.name.clone(),
            input,
        };
        match raw {
            DbValue::Int16(_) | DbValue::Int32(_) | DbValue::Int64(_) => {
                let v = raw.as_i64().unwrap_or_default();
                if self.name_of(v).is_some() {
                    Ok(v)
                } else {
                    Err(unknown(v.to_string()))
                }
            }
            DbValue::Text(s) => {
                let s = s.trim();
                if let Some(v) = self.value_of(s) {
                    return Ok(v);
                }
                // Digit text resolves through the numeric member table.
                if let Ok(v) = s.parse::<i64>() {
                    if self.name_of(v).is_some() {
                        return Ok(v);
                    }
                }
                Err(unknown(s.to_owned()))
            }
            other => Err(TypeError::cast(other.type_name(), format!("enum {}", self.name))),
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in coercions
// ---------------------------------------------------------------------------

/// Source already in the canonical shape for the target.
struct IdentityCoercion;

impl Coercion for IdentityCoercion {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let matches = matches!(
            (raw, target),
            (DbValue::Bool(_), LogicalType::Boolean)
                | (DbValue::Int16(_), LogicalType::Int16)
                | (DbValue::Int32(_), LogicalType::Int32)
                | (DbValue::Int64(_), LogicalType::Int64)
                | (DbValue::Float32(_), LogicalType::Float32)
                | (DbValue::Float64(_), LogicalType::Float64)
                | (DbValue::Decimal(_), LogicalType::Decimal)
                | (DbValue::Text(_), LogicalType::Text)
                | (DbValue::Bytes(_), LogicalType::Binary)
                | (DbValue::Uuid(_), LogicalType::Uuid)
                | (DbValue::Date(_), LogicalType::Date)
                | (DbValue::Time(_), LogicalType::Time)
                | (DbValue::DateTime(_), LogicalType::DateTime)
                | (DbValue::DateTimeOffset(_), LogicalType::DateTimeOffset)
                | (DbValue::Json(_), LogicalType::Json)
                | (DbValue::Inet(_), LogicalType::Inet)
                | (DbValue::Cidr(_), LogicalType::Cidr)
                | (DbValue::MacAddress(_), LogicalType::MacAddress)
                | (DbValue::Geometry(_), LogicalType::Geometry)
                | (DbValue::Geography(_), LogicalType::Geography)
                | (DbValue::Interval(_), LogicalType::Interval)
                | (DbValue::IntervalYearMonth(_), LogicalType::IntervalYearMonth)
                | (DbValue::IntervalDaySecond(_), LogicalType::IntervalDaySecond)
                | (DbValue::RowVersion(_), LogicalType::RowVersion)
                | (DbValue::HStore(_), LogicalType::HStore)
                | (DbValue::Array(_), LogicalType::Array(_))
        );
        if matches {
            CoercionOutcome::Coerced(raw.clone())
        } else {
            CoercionOutcome::NotApplicable
        }
    }
}

/// Booleans from text, characters, and numerics.
struct BoolCoercion;

impl Coercion for BoolCoercion {
    fn name(&self) -> &'static str {
        "bool"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        if *target != LogicalType::Boolean {
            return CoercionOutcome::NotApplicable;
        }
        match raw {
            DbValue::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    return CoercionOutcome::Coerced(DbValue::Bool(true));
                }
                if s.eq_ignore_ascii_case("false") {
                    return CoercionOutcome::Coerced(DbValue::Bool(false));
                }
                if s.len() == 1 {
                    match s.chars().next() {
                        Some('t' | 'T' | 'y' | 'Y' | '1') => {
                            return CoercionOutcome::Coerced(DbValue::Bool(true));
                        }
                        Some('f' | 'F' | 'n' | 'N' | '0') => {
                            return CoercionOutcome::Coerced(DbValue::Bool(false));
                        }
                        _ => {}
                    }
                }
                // Numeric text: "1.5" is truthy, "0.0" is falsy.
                if let Ok(n) = s.parse::<f64>() {
                    return CoercionOutcome::Coerced(DbValue::Bool(n != 0.0));
                }
                CoercionOutcome::Failed(TypeError::format("boolean", s))
            }
            DbValue::Int16(_) | DbValue::Int32(_) | DbValue::Int64(_) => {
                CoercionOutcome::Coerced(DbValue::Bool(raw.as_i64().unwrap_or_default() != 0))
            }
            DbValue::Float32(_) | DbValue::Float64(_) => {
                CoercionOutcome::Coerced(DbValue::Bool(raw.as_f64().unwrap_or_default() != 0.0))
            }
            DbValue::Decimal(d) => CoercionOutcome::Coerced(DbValue::Bool(!d.is_zero())),
            _ => CoercionOutcome::NotApplicable,
        }
    }
}

/// Integral conversions with range checks.
struct IntegralCoercion;

impl Coercion for IntegralCoercion {
    fn name(&self) -> &'static str {
        "integral"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let Some(v) = raw.as_i64() else {
            return CoercionOutcome::NotApplicable;
        };
        let out_of_range = |target: &str| {
            CoercionOutcome::Failed(TypeError::OutOfRange {
                value: v.to_string(),
                target: target.to_owned(),
            })
        };
        match target {
            LogicalType::Int16 => match i16::try_from(v) {
                Ok(v) => CoercionOutcome::Coerced(DbValue::Int16(v)),
                Err(_) => out_of_range("Int16"),
            },
            LogicalType::Int32 => match i32::try_from(v) {
                Ok(v) => CoercionOutcome::Coerced(DbValue::Int32(v)),
                Err(_) => out_of_range("Int32"),
            },
            LogicalType::Int64 => CoercionOutcome::Coerced(DbValue::Int64(v)),
            LogicalType::Float64 => CoercionOutcome::Coerced(DbValue::Float64(v as f64)),
            LogicalType::Decimal => {
                CoercionOutcome::Coerced(DbValue::Decimal(rust_decimal::Decimal::from(v)))
            }
            _ => CoercionOutcome::NotApplicable,
        }
    }
}

/// GUIDs from text and 16-byte payloads.
struct GuidCoercion;

impl Coercion for GuidCoercion {
    fn name(&self) -> &'static str {
        "guid"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        if *target != LogicalType::Uuid {
            return CoercionOutcome::NotApplicable;
        }
        match raw {
            DbValue::Text(s) => match uuid::Uuid::parse_str(s.trim()) {
                Ok(u) => CoercionOutcome::Coerced(DbValue::Uuid(u)),
                Err(_) => CoercionOutcome::Failed(TypeError::format("uuid", s)),
            },
            DbValue::Bytes(b) => match <[u8; 16]>::try_from(b.as_ref()) {
                Ok(arr) => CoercionOutcome::Coerced(DbValue::Uuid(uuid::Uuid::from_bytes(arr))),
                Err(_) => CoercionOutcome::Failed(TypeError::InvalidLength {
                    what: "uuid",
                    expected: "16 bytes",
                    actual: b.len(),
                }),
            },
            _ => CoercionOutcome::NotApplicable,
        }
    }
}

/// Date/time normalisation under a [`TimeMappingPolicy`].
struct DateTimeCoercion {
    policy: TimeMappingPolicy,
}

impl Coercion for DateTimeCoercion {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        match target {
            LogicalType::DateTime => match raw {
                DbValue::DateTimeOffset(dto) => {
                    CoercionOutcome::Coerced(DbValue::DateTime(dto.with_timezone(&Utc).naive_utc()))
                }
                DbValue::Text(s) => match parse_datetime_text(s) {
                    Some(ParsedMoment::Naive(n)) => CoercionOutcome::Coerced(DbValue::DateTime(n)),
                    Some(ParsedMoment::Offset(dto)) => CoercionOutcome::Coerced(
                        DbValue::DateTime(dto.with_timezone(&Utc).naive_utc()),
                    ),
                    None => CoercionOutcome::Failed(TypeError::format("datetime", s)),
                },
                _ => CoercionOutcome::NotApplicable,
            },
            LogicalType::DateTimeOffset => match raw {
                DbValue::DateTime(naive) => {
                    // Unspecified inputs are treated as UTC under both
                    // policies; ForceUtcDateTime additionally pins the
                    // rendered offset to zero.
                    let utc = naive.and_utc();
                    CoercionOutcome::Coerced(DbValue::DateTimeOffset(utc.fixed_offset()))
                }
                DbValue::DateTimeOffset(dto) => match self.policy {
                    TimeMappingPolicy::PreferDateTimeOffset => {
                        CoercionOutcome::Coerced(raw.clone())
                    }
                    TimeMappingPolicy::ForceUtcDateTime => CoercionOutcome::Coerced(
                        DbValue::DateTimeOffset(dto.with_timezone(&Utc).fixed_offset()),
                    ),
                },
                DbValue::Text(s) => match parse_datetime_text(s) {
                    Some(ParsedMoment::Naive(n)) => {
                        CoercionOutcome::Coerced(DbValue::DateTimeOffset(n.and_utc().fixed_offset()))
                    }
                    Some(ParsedMoment::Offset(dto)) => {
                        let out = match self.policy {
                            TimeMappingPolicy::PreferDateTimeOffset => dto,
                            TimeMappingPolicy::ForceUtcDateTime => {
                                dto.with_timezone(&Utc).fixed_offset()
                            }
                        };
                        CoercionOutcome::Coerced(DbValue::DateTimeOffset(out))
                    }
                    None => CoercionOutcome::Failed(TypeError::format("datetimeoffset", s)),
                },
                _ => CoercionOutcome::NotApplicable,
            },
            _ => CoercionOutcome::NotApplicable,
        }
    }
}

enum ParsedMoment {
    Naive(NaiveDateTime),
    Offset(DateTime<FixedOffset>),
}

fn parse_datetime_text(s: &str) -> Option<ParsedMoment> {
    let s = s.trim();
    if let Ok(dto) = DateTime::parse_from_rfc3339(s) {
        return Some(ParsedMoment::Offset(dto));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ParsedMoment::Naive(n));
        }
    }
    None
}

/// JSON normalisation.
///
/// Empty or whitespace input reads as NULL. Invalid JSON from a string
/// source is logged and reads as NULL; invalid JSON from a byte (stream)
/// source is an error.
struct JsonCoercion;

impl Coercion for JsonCoercion {
    fn name(&self) -> &'static str {
        "json"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        if *target != LogicalType::Json {
            return CoercionOutcome::NotApplicable;
        }
        match raw {
            DbValue::Text(s) | DbValue::Json(s) => {
                if s.trim().is_empty() {
                    return CoercionOutcome::Coerced(DbValue::Null);
                }
                if serde_json::from_str::<serde_json::Value>(s).is_err() {
                    tracing::warn!(len = s.len(), "invalid JSON from string source, reading as null");
                    return CoercionOutcome::Coerced(DbValue::Null);
                }
                CoercionOutcome::Coerced(DbValue::Json(s.clone()))
            }
            DbValue::Bytes(b) => {
                if b.iter().all(|c| c.is_ascii_whitespace()) {
                    return CoercionOutcome::Coerced(DbValue::Null);
                }
                match std::str::from_utf8(b) {
                    Ok(s) if serde_json::from_str::<serde_json::Value>(s).is_ok() => {
                        CoercionOutcome::Coerced(DbValue::Json(s.to_owned()))
                    }
                    Ok(_) | Err(_) => CoercionOutcome::Failed(TypeError::InvalidJson(
                        "stream payload is not valid JSON".to_owned(),
                    )),
                }
            }
            _ => CoercionOutcome::NotApplicable,
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        if let DbValue::Json(text) = value {
            param.db_type = DbType::Json;
            param.value = DbValue::Json(text.clone());
            true
        } else {
            false
        }
    }
}

/// Network value objects from canonical text.
struct NetworkCoercion;

impl Coercion for NetworkCoercion {
    fn name(&self) -> &'static str {
        "network"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let DbValue::Text(s) = raw else {
            return CoercionOutcome::NotApplicable;
        };
        match target {
            LogicalType::Inet => match Inet::from_str(s) {
                Ok(v) => CoercionOutcome::Coerced(DbValue::Inet(v)),
                Err(e) => CoercionOutcome::Failed(e),
            },
            LogicalType::Cidr => match Cidr::from_str(s) {
                Ok(v) => CoercionOutcome::Coerced(DbValue::Cidr(v)),
                Err(e) => CoercionOutcome::Failed(e),
            },
            LogicalType::MacAddress => match MacAddress::from_str(s) {
                Ok(v) => CoercionOutcome::Coerced(DbValue::MacAddress(v)),
                Err(e) => CoercionOutcome::Failed(e),
            },
            _ => CoercionOutcome::NotApplicable,
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        let text = match value {
            DbValue::Inet(v) => v.to_string(),
            DbValue::Cidr(v) => v.to_string(),
            DbValue::MacAddress(v) => v.to_string(),
            _ => return false,
        };
        param.db_type = DbType::String;
        param.value = DbValue::Text(text);
        true
    }
}

/// Spatial payloads from WKT, GeoJSON, and WKB sources.
struct SpatialCoercion;

impl Coercion for SpatialCoercion {
    fn name(&self) -> &'static str {
        "spatial"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let geography = match target {
            LogicalType::Geometry => false,
            LogicalType::Geography => true,
            _ => return CoercionOutcome::NotApplicable,
        };
        let built = match raw {
            DbValue::Text(s) => {
                let s = s.trim_start();
                if s.starts_with('{') {
                    if geography {
                        Geography::from_geo_json(s).map(DbValue::Geography)
                    } else {
                        Geometry::from_geo_json(s).map(DbValue::Geometry)
                    }
                } else if geography {
                    Geography::from_wkt(s).map(DbValue::Geography)
                } else {
                    Geometry::from_wkt(s).map(DbValue::Geometry)
                }
            }
            DbValue::Bytes(b) => {
                if geography {
                    Geography::from_wkb(b.clone()).map(DbValue::Geography)
                } else {
                    Geometry::from_wkb(b.clone()).map(DbValue::Geometry)
                }
            }
            _ => return CoercionOutcome::NotApplicable,
        };
        match built {
            Ok(v) => CoercionOutcome::Coerced(v),
            Err(e) => CoercionOutcome::Failed(e),
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        let (wkb, wkt) = match value {
            DbValue::Geometry(g) => (g.wkb().cloned(), g.wkt().map(str::to_owned)),
            DbValue::Geography(g) => (
                g.geometry().wkb().cloned(),
                g.geometry().wkt().map(str::to_owned),
            ),
            _ => return false,
        };
        if let Some(wkb) = wkb {
            param.db_type = DbType::Binary;
            param.value = DbValue::Bytes(wkb);
        } else if let Some(wkt) = wkt {
            param.db_type = DbType::String;
            param.value = DbValue::Text(wkt);
        } else {
            param.db_type = DbType::Object;
        }
        true
    }
}

/// Ranges from canonical text.
struct RangeCoercion;

impl RangeCoercion {
    fn parse_range<T>(s: &str, wrap: fn(T) -> DbValue) -> Result<DbValue, TypeError>
    where
        T: FromStr,
    {
        let range: Range<T> = s.parse()?;
        Ok(DbValue::Range(Box::new(Range::new(
            range.lower.map(wrap),
            range.upper.map(wrap),
            range.lower_inclusive,
            range.upper_inclusive,
        ))))
    }
}

impl Coercion for RangeCoercion {
    fn name(&self) -> &'static str {
        "range"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let DbValue::Text(s) = raw else {
            return CoercionOutcome::NotApplicable;
        };
        let result = match target {
            LogicalType::IntRange => Self::parse_range::<i32>(s, DbValue::Int32),
            LogicalType::BigIntRange => Self::parse_range::<i64>(s, DbValue::Int64),
            LogicalType::NumericRange => {
                Self::parse_range::<rust_decimal::Decimal>(s, DbValue::Decimal)
            }
            LogicalType::TimestampRange => {
                Self::parse_range::<NaiveDateTime>(s, DbValue::DateTime)
            }
            _ => return CoercionOutcome::NotApplicable,
        };
        match result {
            Ok(v) => CoercionOutcome::Coerced(v),
            Err(e) => CoercionOutcome::Failed(e),
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        if let DbValue::Range(r) = value {
            param.db_type = DbType::String;
            param.value = DbValue::Text(r.to_string());
            true
        } else {
            false
        }
    }
}

/// Intervals from ISO-8601 text; invalid input yields the zero interval.
struct IntervalCoercion;

impl Coercion for IntervalCoercion {
    fn name(&self) -> &'static str {
        "interval"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        let text = match raw {
            DbValue::Text(s) => Some(s.as_str()),
            _ => None,
        };
        match target {
            LogicalType::Interval => match text {
                Some(s) => {
                    CoercionOutcome::Coerced(DbValue::Interval(PostgresInterval::parse_lossy(s)))
                }
                None => CoercionOutcome::NotApplicable,
            },
            LogicalType::IntervalYearMonth => match text {
                Some(s) => CoercionOutcome::Coerced(DbValue::IntervalYearMonth(
                    IntervalYearMonth::parse_lossy(s),
                )),
                None => CoercionOutcome::NotApplicable,
            },
            LogicalType::IntervalDaySecond => match text {
                Some(s) => CoercionOutcome::Coerced(DbValue::IntervalDaySecond(
                    IntervalDaySecond::parse_lossy(s),
                )),
                None => CoercionOutcome::NotApplicable,
            },
            _ => CoercionOutcome::NotApplicable,
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        let text = match value {
            DbValue::Interval(v) => v.to_string(),
            DbValue::IntervalYearMonth(v) => v.to_string(),
            DbValue::IntervalDaySecond(v) => v.to_string(),
            _ => return false,
        };
        param.db_type = DbType::String;
        param.value = DbValue::Text(text);
        true
    }
}

/// Row versions from 8-byte payloads and 64-bit counters.
struct RowVersionCoercion;

impl Coercion for RowVersionCoercion {
    fn name(&self) -> &'static str {
        "rowversion"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        if *target != LogicalType::RowVersion {
            return CoercionOutcome::NotApplicable;
        }
        match raw {
            DbValue::Bytes(b) => match RowVersion::from_bytes(b) {
                Ok(rv) => CoercionOutcome::Coerced(DbValue::RowVersion(rv)),
                Err(e) => CoercionOutcome::Failed(e),
            },
            DbValue::Int64(v) => {
                CoercionOutcome::Coerced(DbValue::RowVersion(RowVersion::from(*v)))
            }
            _ => CoercionOutcome::NotApplicable,
        }
    }

    fn try_write(&self, value: &DbValue, param: &mut Parameter) -> bool {
        if let DbValue::RowVersion(rv) = value {
            param.db_type = DbType::Binary;
            param.value = DbValue::Bytes(rv.to_bytes());
            true
        } else {
            false
        }
    }
}

/// Last resort: anything renders to text when text was asked for.
struct TextFallbackCoercion;

impl Coercion for TextFallbackCoercion {
    fn name(&self) -> &'static str {
        "text-fallback"
    }

    fn try_read(&self, raw: &DbValue, target: &LogicalType) -> CoercionOutcome {
        if *target == LogicalType::Text {
            CoercionOutcome::Coerced(DbValue::Text(raw.to_string()))
        } else {
            CoercionOutcome::NotApplicable
        }
    }
}

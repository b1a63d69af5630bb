//! # tessera-types
//!
//! Logical type model, rich value objects, and the two-tier type registry
//! used by the tessera data-access core.
//!
//! This crate is the leaf of the workspace: it knows nothing about dialects,
//! connections, or SQL. It provides:
//!
//! - [`DbValue`], the tagged union every parameter and reader cell flows
//!   through, plus [`LogicalType`] (provider-agnostic tags) and [`DbType`]
//!   (generic wire-level tags).
//! - Value objects for advanced provider types: network addresses
//!   ([`Inet`], [`Cidr`], [`MacAddress`]), spatial payloads ([`Geometry`],
//!   [`Geography`]), [`Range`] values, the three interval kinds,
//!   [`RowVersion`] tokens, [`HStore`] maps, and LOB streams.
//! - [`CoercionRegistry`], an insertion-ordered list of bidirectional
//!   coercions applied to reader values, and [`TypeMappingRegistry`], the
//!   `(logical type, provider)` table that configures driver parameters.
//!   Both publish a monotonic version stamp; cached bindings are invalidated
//!   by stamp comparison, never by callback.
//!
//! ## Type Mappings
//!
//! | Logical type | Canonical Rust value |
//! |--------------|----------------------|
//! | `Boolean` | `bool` |
//! | `Int16`/`Int32`/`Int64` | `i16`/`i32`/`i64` |
//! | `Decimal` | `rust_decimal::Decimal` |
//! | `Text` | `String` |
//! | `Binary` | `bytes::Bytes` |
//! | `Uuid` | `uuid::Uuid` |
//! | `Date`/`Time`/`DateTime` | `chrono` naive types |
//! | `DateTimeOffset` | `chrono::DateTime<FixedOffset>` |
//! | `Json` | raw JSON text |
//! | `Inet`/`Cidr`/`MacAddress` | value objects in [`net`] |
//! | `Geometry`/`Geography` | value objects in [`spatial`] |
//! | `RowVersion` | 8-byte token |

pub mod coerce;
pub mod error;
pub mod hstore;
pub mod interval;
pub mod lob;
pub mod logical;
pub mod mapping;
pub mod net;
pub mod param;
pub mod provider;
pub mod range;
pub mod rowversion;
pub mod spatial;
pub mod value;

pub use coerce::{Coercion, CoercionOutcome, CoercionRegistry, EnumMapping, TimeMappingPolicy};
pub use error::TypeError;
pub use hstore::HStore;
pub use interval::{IntervalDaySecond, IntervalYearMonth, PostgresInterval};
pub use lob::{BlobStream, ClobStream};
pub use logical::{DbType, LogicalType};
pub use mapping::{
    CachedParamConfig, ConfigureFn, ProviderTypeMapping, TypeMappingRegistry, default_registry,
};
pub use net::{Cidr, Inet, MacAddress};
pub use param::{ParamDirection, Parameter};
pub use provider::SupportedDatabase;
pub use range::Range;
pub use rowversion::RowVersion;
pub use spatial::{Geography, Geometry};
pub use value::DbValue;

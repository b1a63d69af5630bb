//! # tessera-dialect
//!
//! Per-provider SQL dialect behaviour for the tessera data-access core.
//!
//! Each supported database family gets a static [`DialectDescriptor`]
//! (markers, quoting, limits, capability flags, generated-key plan,
//! session-setting templates) plus a [`Dialect`] implementation for the
//! behaviour that depends on the live product: version queries and banner
//! parsing, SQL-standard compliance judgement, and unique-violation
//! matching.
//!
//! [`DialectEngine`] binds a dialect to the detected state of one product.
//! Engines initialise lazily on first connection; before initialisation,
//! version-gated capabilities report their conservative values.

pub mod compliance;
pub mod descriptor;
pub mod dialect;
pub mod dialects;
pub mod engine;
pub mod error;
pub mod version;

pub use compliance::SqlStandardLevel;
pub use descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
pub use dialect::{Dialect, RowLimitSyntax};
pub use dialects::create_dialect;
pub use engine::DialectEngine;
pub use error::DialectError;
pub use version::{DbVersion, extract_version_token};

pub use tessera_types::SupportedDatabase;

//! The SQL-92 fallback dialect for unidentified products.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: '?',
    supports_named_parameters: false,
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 999,
    max_output_parameters: 0,
    parameter_name_max_length: 0,
    supports_prepared_statements: false,
    proc_wrapping_style: ProcWrappingStyle::Call,
    max_pool_size_setting: None,
    features: FeatureFlags {
        merge: false,
        window_functions: false,
        ctes: false,
        savepoints: false,
        insert_returning: false,
        json_types: false,
        array_types: false,
        identity_columns: false,
    },
    generated_key_plan: GeneratedKeyPlan::CorrelationToken,
    session_settings: SessionSettings::NONE,
};

/// The catch-all fallback dialect. Everything beyond SQL-92 is
/// unsupported and fails gracefully instead of emitting speculative SQL.
pub struct UnknownDialect;

impl Dialect for UnknownDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::Unknown
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        // Nothing is safe to probe on an unidentified product.
        ""
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        extract_version_token(banner)
    }

    fn determine_standard_compliance(&self, _version: Option<&DbVersion>) -> SqlStandardLevel {
        SqlStandardLevel::Sql92
    }

    fn is_unique_violation(&self, _code: Option<&str>, message: &str) -> bool {
        message.to_ascii_lowercase().contains("unique")
    }

    fn compatibility_warning(&self) -> Option<&'static str> {
        Some(
            "database product could not be identified; falling back to \
             conservative SQL-92 behaviour. Vendor features (MERGE, \
             RETURNING, JSON, arrays) are disabled.",
        )
    }
}

//! DuckDB dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: '$',
    supports_named_parameters: true,
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 65_535,
    max_output_parameters: 0,
    parameter_name_max_length: 255,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::Call,
    max_pool_size_setting: None,
    features: FeatureFlags {
        merge: false,
        window_functions: true,
        ctes: true,
        savepoints: false,
        insert_returning: true,
        json_types: true,
        array_types: true,
        identity_columns: false,
    },
    generated_key_plan: GeneratedKeyPlan::Returning,
    session_settings: SessionSettings::NONE,
};

/// DuckDB.
pub struct DuckDbDialect;

impl Dialect for DuckDbDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::DuckDb
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT version()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // "v0.9.2" or "v1.1.3 19864453f7"
        let trimmed = banner.trim();
        let rest = trimmed.strip_prefix('v').unwrap_or(trimmed);
        extract_version_token(rest)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(_) => SqlStandardLevel::Sql2011,
            None => SqlStandardLevel::Sql2003,
        }
    }

    fn is_unique_violation(&self, _code: Option<&str>, message: &str) -> bool {
        message.contains("Duplicate key") || message.contains("violates unique constraint")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DialectError;

    #[test]
    fn test_parse_version() {
        let v = DuckDbDialect.parse_version("v0.9.2").unwrap();
        assert_eq!((v.major, v.minor, v.build), (0, 9, Some(2)));
    }

    #[test]
    fn test_no_session_scoped_last_id() {
        assert!(matches!(
            DuckDbDialect.last_inserted_id_query(),
            Err(DialectError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_dollar_marker() {
        assert_eq!(DESCRIPTOR.parameter_marker, '$');
        assert!(DESCRIPTOR.supports_named_parameters);
    }
}

//! Firebird dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::{Dialect, RowLimitSyntax};
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: '@',
    supports_named_parameters: true,
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 1_499,
    max_output_parameters: 10,
    parameter_name_max_length: 31,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::ExecuteProcedure,
    max_pool_size_setting: Some("MaxPoolSize"),
    features: FeatureFlags {
        // MERGE exists from 2.1 but stays off until version detection
        // confirms it.
        merge: false,
        window_functions: false,
        ctes: true,
        savepoints: true,
        insert_returning: true,
        json_types: false,
        array_types: false,
        identity_columns: false,
    },
    generated_key_plan: GeneratedKeyPlan::Returning,
    // Firebird has no session-level read-only enforcement; the same
    // (empty) batch applies to both intents.
    session_settings: SessionSettings::NONE,
};

/// Firebird.
pub struct FirebirdDialect;

impl Dialect for FirebirdDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::Firebird
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT rdb$get_context('SYSTEM', 'ENGINE_VERSION') FROM rdb$database"
    }

    fn secondary_version_query(&self) -> Option<&'static str> {
        Some("SELECT mon$server_version FROM mon$database")
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // ENGINE_VERSION returns "3.0.10"; the monitor table returns
        // platform banners like "WI-V3.0.10.33601 Firebird 3.0".
        extract_version_token(banner)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(4, 0) => SqlStandardLevel::Sql2011,
            Some(v) if v.at_least(3, 0) => SqlStandardLevel::Sql2008,
            Some(v) if v.at_least(2, 1) => SqlStandardLevel::Sql2003,
            Some(_) => SqlStandardLevel::Sql99,
            None => SqlStandardLevel::Sql92,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        code == Some("335544665")
            || message.contains("violation of PRIMARY or UNIQUE KEY constraint")
    }

    // last_inserted_id_query: default Err. Keys come from generators
    // (`GEN_ID`), which need the generator's name.

    fn row_limit_syntax(&self) -> RowLimitSyntax {
        RowLimitSyntax::Rows
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            merge: version.at_least(2, 1),
            window_functions: version.at_least(3, 0),
            identity_columns: version.at_least(3, 0),
            ..DESCRIPTOR.features
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::DialectError;

    #[test]
    fn test_parse_engine_version() {
        let v = FirebirdDialect.parse_version("3.0.10").unwrap();
        assert_eq!((v.major, v.minor, v.build), (3, 0, Some(10)));
    }

    #[test]
    fn test_parse_monitor_banner() {
        let v = FirebirdDialect
            .parse_version("WI-V3.0.10.33601 Firebird 3.0")
            .unwrap();
        assert_eq!((v.major, v.minor), (3, 0));
    }

    #[test]
    fn test_secondary_probe_exists() {
        assert!(FirebirdDialect.secondary_version_query().is_some());
    }

    #[test]
    fn test_merge_conservative_until_detection() {
        let d = FirebirdDialect;
        assert!(!DESCRIPTOR.features.merge);
        assert!(d.features_for_version(&DbVersion::new(2, 1)).merge);
        assert!(!d.features_for_version(&DbVersion::new(2, 0)).merge);
    }

    #[test]
    fn test_session_settings_same_for_both_intents() {
        assert_eq!(
            DESCRIPTOR.session_settings.read_write,
            DESCRIPTOR.session_settings.read_only
        );
    }

    #[test]
    fn test_last_inserted_id_requires_generator() {
        assert!(matches!(
            FirebirdDialect.last_inserted_id_query(),
            Err(DialectError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_rows_limit() {
        assert_eq!(FirebirdDialect.row_limit_syntax(), RowLimitSyntax::Rows);
    }
}

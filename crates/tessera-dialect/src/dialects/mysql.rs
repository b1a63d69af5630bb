//! MySQL dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: '@',
    supports_named_parameters: true,
    quote_prefix: "`",
    quote_suffix: "`",
    composite_identifier_separator: '.',
    max_parameter_limit: 65_535,
    max_output_parameters: 255,
    parameter_name_max_length: 64,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::Call,
    max_pool_size_setting: Some("Maximum Pool Size"),
    features: FeatureFlags {
        merge: false,
        // Window functions and CTEs are 8.0 features; conservative until
        // the live version is known.
        window_functions: false,
        ctes: false,
        savepoints: true,
        insert_returning: false,
        json_types: false,
        array_types: false,
        identity_columns: true,
    },
    generated_key_plan: GeneratedKeyPlan::SessionScopedFunction,
    session_settings: SessionSettings {
        read_write: "SET SESSION sql_mode = 'STRICT_ALL_TABLES'",
        read_only: "SET SESSION sql_mode = 'STRICT_ALL_TABLES';\nSET SESSION TRANSACTION READ ONLY",
    },
};

/// MySQL.
pub struct MySqlDialect;

impl Dialect for MySqlDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::MySql
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT VERSION()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // VERSION() returns "8.0.35" or "8.0.35-0ubuntu0.22.04.1".
        if banner.contains("MariaDB") {
            return None;
        }
        extract_version_token(banner)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(8, 0) => SqlStandardLevel::Sql2011,
            Some(v) if v.at_least(5, 7) => SqlStandardLevel::Sql2008,
            Some(_) => SqlStandardLevel::Sql2003,
            None => SqlStandardLevel::Sql92,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        code == Some("1062") || message.contains("Duplicate entry")
    }

    fn last_inserted_id_query(&self) -> Result<&'static str> {
        Ok("SELECT LAST_INSERT_ID()")
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            window_functions: version.at_least(8, 0),
            ctes: version.at_least(8, 0),
            json_types: version.at_least(5, 7),
            ..DESCRIPTOR.features
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_banner() {
        let v = MySqlDialect.parse_version("8.0.35-0ubuntu0.22.04.1").unwrap();
        assert_eq!((v.major, v.minor, v.build), (8, 0, Some(35)));
    }

    #[test]
    fn test_mariadb_banner_is_not_mysql() {
        assert!(MySqlDialect
            .parse_version("5.5.5-10.6.7-MariaDB")
            .is_none());
    }

    #[test]
    fn test_version_gated_features() {
        let d = MySqlDialect;
        let v8 = d.features_for_version(&DbVersion::new(8, 0));
        assert!(v8.ctes && v8.window_functions && v8.json_types);
        let v56 = d.features_for_version(&DbVersion::new(5, 6));
        assert!(!v56.ctes && !v56.json_types);
    }

    #[test]
    fn test_last_inserted_id() {
        assert_eq!(
            MySqlDialect.last_inserted_id_query().unwrap(),
            "SELECT LAST_INSERT_ID()"
        );
    }

    #[test]
    fn test_unique_violation() {
        assert!(MySqlDialect.is_unique_violation(Some("1062"), ""));
        assert!(MySqlDialect.is_unique_violation(
            None,
            "Duplicate entry 'a' for key 'users.name'"
        ));
    }
}

//! SQLite dialect.

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
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 999,
    max_output_parameters: 0,
    parameter_name_max_length: 255,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::Call,
    max_pool_size_setting: None,
    features: FeatureFlags {
        merge: false,
        window_functions: false,
        ctes: true,
        savepoints: true,
        // RETURNING needs 3.35+; conservative until the version probe.
        insert_returning: false,
        json_types: false,
        array_types: false,
        identity_columns: true,
    },
    generated_key_plan: GeneratedKeyPlan::SessionScopedFunction,
    session_settings: SessionSettings {
        read_write: "",
        read_only: "PRAGMA query_only = ON",
    },
};

/// SQLite.
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::Sqlite
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT sqlite_version()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        extract_version_token(banner)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(3, 35) => SqlStandardLevel::Sql2008,
            Some(v) if v.at_least(3, 8) => SqlStandardLevel::Sql2003,
            Some(_) => SqlStandardLevel::Sql99,
            None => SqlStandardLevel::Sql92,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        matches!(code, Some("2067" | "1555")) || message.contains("UNIQUE constraint failed")
    }

    fn last_inserted_id_query(&self) -> Result<&'static str> {
        Ok("SELECT last_insert_rowid()")
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            insert_returning: version.at_least(3, 35),
            window_functions: version.at_least(3, 25),
            json_types: version.at_least(3, 38),
            ..DESCRIPTOR.features
        }
    }

    fn key_plan_for_version(&self, version: &DbVersion) -> GeneratedKeyPlan {
        // The capability probe decides per connection: 3.35+ upgrades
        // from the session-scoped rowid function to RETURNING.
        if version.at_least(3, 35) {
            GeneratedKeyPlan::Returning
        } else {
            GeneratedKeyPlan::SessionScopedFunction
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let v = SqliteDialect.parse_version("3.42.0").unwrap();
        assert_eq!((v.major, v.minor), (3, 42));
    }

    #[test]
    fn test_returning_gate() {
        let d = SqliteDialect;
        assert_eq!(
            d.key_plan_for_version(&DbVersion::new(3, 35)),
            GeneratedKeyPlan::Returning
        );
        assert_eq!(
            d.key_plan_for_version(&DbVersion::new(3, 34)),
            GeneratedKeyPlan::SessionScopedFunction
        );
        assert!(!DESCRIPTOR.features.insert_returning);
        assert!(d.features_for_version(&DbVersion::new(3, 35)).insert_returning);
    }

    #[test]
    fn test_read_only_pragma() {
        assert_eq!(DESCRIPTOR.session_settings.read_only, "PRAGMA query_only = ON");
        assert_eq!(DESCRIPTOR.session_settings.read_write, "");
    }

    #[test]
    fn test_no_pooling_setting() {
        assert!(DESCRIPTOR.max_pool_size_setting.is_none());
    }

    #[test]
    fn test_unique_violation() {
        assert!(SqliteDialect.is_unique_violation(None, "UNIQUE constraint failed: users.name"));
        assert!(SqliteDialect.is_unique_violation(Some("2067"), ""));
        assert!(SqliteDialect.is_unique_violation(Some("1555"), ""));
    }
}

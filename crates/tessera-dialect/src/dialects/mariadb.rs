//! MariaDB dialect. MySQL family behaviours with MariaDB versioning and
//! the 10.5+ `INSERT ... RETURNING` upgrade.

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

/// MariaDB.
pub struct MariaDbDialect;

impl Dialect for MariaDbDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::MariaDb
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT VERSION()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // Replication-compatibility banners look like
        // "5.5.5-10.6.7-MariaDB-1:10.6.7+maria~focal"; the real version
        // follows the first dash.
        let banner = banner.trim();
        let meat = match banner.strip_prefix("5.5.5-") {
            Some(rest) => rest,
            None => banner,
        };
        if !banner.contains("MariaDB") {
            return None;
        }
        extract_version_token(meat)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(10, 5) => SqlStandardLevel::Sql2011,
            Some(v) if v.at_least(10, 2) => SqlStandardLevel::Sql2008,
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
            window_functions: version.at_least(10, 2),
            ctes: version.at_least(10, 2),
            json_types: version.at_least(10, 2),
            insert_returning: version.at_least(10, 5),
            ..DESCRIPTOR.features
        }
    }

    fn key_plan_for_version(&self, version: &DbVersion) -> GeneratedKeyPlan {
        if version.at_least(10, 5) {
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
    fn test_parse_replication_banner() {
        let v = MariaDbDialect
            .parse_version("5.5.5-10.6.7-MariaDB-1:10.6.7+maria~focal")
            .unwrap();
        assert_eq!((v.major, v.minor, v.build), (10, 6, Some(7)));
    }

    #[test]
    fn test_parse_plain_banner() {
        let v = MariaDbDialect.parse_version("10.11.2-MariaDB").unwrap();
        assert_eq!((v.major, v.minor), (10, 11));
    }

    #[test]
    fn test_rejects_plain_mysql() {
        assert!(MariaDbDialect.parse_version("8.0.35").is_none());
    }

    #[test]
    fn test_returning_upgrade_on_10_5() {
        let d = MariaDbDialect;
        assert_eq!(
            d.key_plan_for_version(&DbVersion::new(10, 5)),
            GeneratedKeyPlan::Returning
        );
        assert_eq!(
            d.key_plan_for_version(&DbVersion::new(10, 4)),
            GeneratedKeyPlan::SessionScopedFunction
        );
    }
}

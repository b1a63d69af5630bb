//! SQL Server dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::version::{DbVersion, extract_version_token};
use crate::dialect::RowLimitSyntax;

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: '@',
    supports_named_parameters: true,
    quote_prefix: "[",
    quote_suffix: "]",
    composite_identifier_separator: '.',
    max_parameter_limit: 2_100,
    max_output_parameters: 1_024,
    parameter_name_max_length: 128,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::Exec,
    max_pool_size_setting: Some("Max Pool Size"),
    features: FeatureFlags {
        merge: true,
        window_functions: true,
        ctes: true,
        savepoints: true,
        insert_returning: true,
        json_types: false,
        array_types: false,
        identity_columns: true,
    },
    generated_key_plan: GeneratedKeyPlan::OutputInserted,
    session_settings: SessionSettings {
        read_write: "SET ARITHABORT ON",
        // No session-level read-only enforcement; the same batch applies.
        read_only: "SET ARITHABORT ON",
    },
};

/// Microsoft SQL Server.
pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::SqlServer
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT @@VERSION"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // "Microsoft SQL Server 2019 (RTM) - 15.0.2000.5 (X64) ..."
        // The marketing year comes first; the engine version follows the
        // dash.
        let idx = banner.find(" - ")?;
        extract_version_token(&banner[idx..])
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(13, 0) => SqlStandardLevel::Sql2016,
            Some(v) if v.at_least(11, 0) => SqlStandardLevel::Sql2011,
            Some(v) if v.at_least(10, 0) => SqlStandardLevel::Sql2008,
            Some(_) => SqlStandardLevel::Sql2003,
            None => SqlStandardLevel::Sql2003,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        matches!(code, Some("2627" | "2601"))
            || message.contains("Violation of UNIQUE KEY constraint")
            || message.contains("Cannot insert duplicate key")
    }

    fn last_inserted_id_query(&self) -> Result<&'static str> {
        // OUTPUT INSERTED is the primary plan; SCOPE_IDENTITY stays
        // available as the session-scoped fallback.
        Ok("SELECT SCOPE_IDENTITY()")
    }

    fn row_limit_syntax(&self) -> RowLimitSyntax {
        RowLimitSyntax::TopPrefix
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            // JSON functions arrived with SQL Server 2016 (13.x).
            json_types: version.at_least(13, 0),
            ..DESCRIPTOR.features
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_banner_takes_engine_version() {
        let v = SqlServerDialect
            .parse_version("Microsoft SQL Server 2019 (RTM) - 15.0.2000.5 (X64)")
            .unwrap();
        assert_eq!((v.major, v.minor), (15, 0));
        assert_eq!(v.build, Some(2000));
    }

    #[test]
    fn test_compliance() {
        let d = SqlServerDialect;
        assert_eq!(
            d.determine_standard_compliance(Some(&DbVersion::new(15, 0))),
            SqlStandardLevel::Sql2016
        );
        assert_eq!(
            d.determine_standard_compliance(Some(&DbVersion::new(10, 50))),
            SqlStandardLevel::Sql2008
        );
    }

    #[test]
    fn test_top_row_limit() {
        assert_eq!(SqlServerDialect.row_limit_syntax(), RowLimitSyntax::TopPrefix);
    }

    #[test]
    fn test_session_settings_identical_both_ways() {
        assert_eq!(
            DESCRIPTOR.session_settings.read_write,
            DESCRIPTOR.session_settings.read_only
        );
    }

    #[test]
    fn test_unique_violation() {
        let d = SqlServerDialect;
        assert!(d.is_unique_violation(Some("2627"), ""));
        assert!(d.is_unique_violation(Some("2601"), ""));
        assert!(d.is_unique_violation(None, "Cannot insert duplicate key row"));
    }
}

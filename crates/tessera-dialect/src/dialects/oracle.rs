//! Oracle dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::{Dialect, RowLimitSyntax};
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: ':',
    supports_named_parameters: true,
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 1_000,
    max_output_parameters: 1_024,
    parameter_name_max_length: 30,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::Oracle,
    max_pool_size_setting: Some("Max Pool Size"),
    features: FeatureFlags {
        merge: true,
        window_functions: true,
        ctes: true,
        savepoints: true,
        insert_returning: true,
        json_types: false,
        array_types: false,
        identity_columns: false,
    },
    generated_key_plan: GeneratedKeyPlan::PrefetchSequence,
    session_settings: SessionSettings {
        read_write: "ALTER SESSION SET NLS_DATE_FORMAT = 'YYYY-MM-DD'",
        read_only: "ALTER SESSION SET NLS_DATE_FORMAT = 'YYYY-MM-DD';\nALTER SESSION SET READ ONLY",
    },
};

/// Oracle Database.
pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::Oracle
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT * FROM v$version WHERE banner LIKE 'Oracle%'"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // "Oracle Database 19c Enterprise Edition Release 19.0.0.0.0 - Production"
        if !banner.contains("Oracle") {
            return None;
        }
        let rest = match banner.find("Release") {
            Some(idx) => &banner[idx..],
            None => banner,
        };
        extract_version_token(rest)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(19, 0) => SqlStandardLevel::Sql2016,
            Some(v) if v.at_least(12, 0) => SqlStandardLevel::Sql2008,
            Some(v) if v.at_least(10, 0) => SqlStandardLevel::Sql2003,
            Some(v) if v.at_least(9, 0) => SqlStandardLevel::Sql99,
            Some(_) => SqlStandardLevel::Sql92,
            None => SqlStandardLevel::Sql2003,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        code == Some("1") || message.contains("ORA-00001")
    }

    // last_inserted_id_query: default Err. Keys come from sequences;
    // a session-scoped function does not exist.

    fn row_limit_syntax(&self) -> RowLimitSyntax {
        RowLimitSyntax::FetchFirst
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            // Identity columns and native JSON arrived with 12c / 21c.
            identity_columns: version.at_least(12, 0),
            json_types: version.at_least(21, 0),
            ..DESCRIPTOR.features
        }
    }
}

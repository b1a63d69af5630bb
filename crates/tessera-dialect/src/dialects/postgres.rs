//! PostgreSQL dialect.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
use crate::error::Result;
use crate::version::{DbVersion, extract_version_token};

static DESCRIPTOR: DialectDescriptor = DialectDescriptor {
    parameter_marker: ':',
    supports_named_parameters: true,
    quote_prefix: "\"",
    quote_suffix: "\"",
    composite_identifier_separator: '.',
    max_parameter_limit: 65_535,
    max_output_parameters: 0,
    parameter_name_max_length: 63,
    supports_prepared_statements: true,
    proc_wrapping_style: ProcWrappingStyle::PostgreSql,
    max_pool_size_setting: Some("Maximum Pool Size"),
    features: FeatureFlags {
        merge: true,
        window_functions: true,
        ctes: true,
        savepoints: true,
        insert_returning: true,
        json_types: true,
        array_types: true,
        identity_columns: true,
    },
    generated_key_plan: GeneratedKeyPlan::Returning,
    session_settings: SessionSettings {
        read_write: "SET standard_conforming_strings = on",
        read_only: "SET standard_conforming_strings = on;\nSET TRANSACTION READ ONLY",
    },
};

/// PostgreSQL.
pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::PostgreSql
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT version()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // "PostgreSQL 15.4 on x86_64-pc-linux-gnu, compiled by gcc ..."
        let rest = banner.trim().strip_prefix("PostgreSQL")?;
        extract_version_token(rest)
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(13, 0) => SqlStandardLevel::Sql2016,
            Some(v) if v.at_least(10, 0) => SqlStandardLevel::Sql2011,
            Some(v) if v.at_least(9, 0) => SqlStandardLevel::Sql2008,
            Some(_) => SqlStandardLevel::Sql2003,
            None => SqlStandardLevel::Sql2003,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        code == Some("23505") || message.contains("duplicate key value violates unique constraint")
    }

    fn last_inserted_id_query(&self) -> Result<&'static str> {
        // lastval() is session-scoped; RETURNING remains the primary plan.
        Ok("SELECT lastval()")
    }

    fn features_for_version(&self, version: &DbVersion) -> FeatureFlags {
        FeatureFlags {
            // MERGE landed in PostgreSQL 15.
            merge: version.at_least(15, 0),
            ..DESCRIPTOR.features
        }
    }
}

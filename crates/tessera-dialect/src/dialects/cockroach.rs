//! CockroachDB dialect. PostgreSQL wire family with its own versioning
//! and a narrower feature set.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{
    DialectDescriptor, FeatureFlags, GeneratedKeyPlan, ProcWrappingStyle, SessionSettings,
};
use crate::dialect::Dialect;
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
        // CockroachDB has no MERGE; UPSERT is its native spelling.
        merge: false,
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
        read_write: "",
        read_only: "SET TRANSACTION READ ONLY",
    },
};

/// CockroachDB.
pub struct CockroachDialect;

impl Dialect for CockroachDialect {
    fn database(&self) -> SupportedDatabase {
        SupportedDatabase::CockroachDb
    }

    fn descriptor(&self) -> &DialectDescriptor {
        &DESCRIPTOR
    }

    fn version_query(&self) -> &'static str {
        "SELECT version()"
    }

    fn parse_version(&self, banner: &str) -> Option<DbVersion> {
        // "CockroachDB CCL v23.1.10 (x86_64-pc-linux-gnu, ...)"
        let idx = banner.find("CockroachDB")?;
        let rest = &banner[idx..];
        let v_idx = rest.find('v')?;
        extract_version_token(&rest[v_idx..])
    }

    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel {
        match version {
            Some(v) if v.at_least(22, 0) => SqlStandardLevel::Sql2016,
            Some(_) => SqlStandardLevel::Sql2011,
            None => SqlStandardLevel::Sql2003,
        }
    }

    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        code == Some("23505") || message.contains("duplicate key value violates unique constraint")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_banner() {
        let v = CockroachDialect
            .parse_version("CockroachDB CCL v23.1.10 (x86_64-pc-linux-gnu)")
            .unwrap();
        assert_eq!((v.major, v.minor, v.build), (23, 1, Some(10)));
    }

    #[test]
    fn test_no_merge() {
        assert!(!DESCRIPTOR.features.merge);
    }

    #[test]
    fn test_compliance() {
        let d = CockroachDialect;
        assert_eq!(
            d.determine_standard_compliance(Some(&DbVersion::new(23, 1))),
            SqlStandardLevel::Sql2016
        );
        assert_eq!(
            d.determine_standard_compliance(None),
            SqlStandardLevel::Sql2003
        );
    }
}

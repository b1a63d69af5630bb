//! The dialect trait: dynamic per-provider behaviour.

use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{DialectDescriptor, FeatureFlags, GeneratedKeyPlan};
use crate::error::{DialectError, Result};
use crate::version::DbVersion;

/// How a dialect limits a lookup to a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimitSyntax {
    /// `LIMIT 1` appended after the WHERE clause.
    Limit,
    /// `SELECT TOP 1 ...` with an `ORDER BY` on the key (SQL Server).
    TopPrefix,
    /// `FETCH FIRST 1 ROWS ONLY` (Oracle 12c+).
    FetchFirst,
    /// `ROWS 1` (Firebird).
    Rows,
}

/// Dynamic behaviour for one provider family.
///
/// The static behaviour table lives in [`DialectDescriptor`]; this trait
/// covers everything that depends on the live product: version queries and
/// banner parsing, compliance judgement, unique-violation matching, and
/// version-gated capability upgrades.
pub trait Dialect: Send + Sync {
    /// The provider this dialect serves.
    fn database(&self) -> SupportedDatabase;

    /// The static behaviour table.
    fn descriptor(&self) -> &DialectDescriptor;

    /// The fixed query that returns the product banner.
    ///
    /// Empty for the fallback dialect, which has nothing safe to probe.
    fn version_query(&self) -> &'static str;

    /// A fallback probe used when the primary version query fails
    /// (e.g. the Firebird monitor table).
    fn secondary_version_query(&self) -> Option<&'static str> {
        None
    }

    /// Extract a version from the banner text. Unparseable banners yield
    /// `None` and the dialect falls back to its conservative baseline.
    fn parse_version(&self, banner: &str) -> Option<DbVersion>;

    /// Judge the SQL standard revision for a detected version. `None`
    /// means the version is unknown and the dialect's baseline applies.
    fn determine_standard_compliance(&self, version: Option<&DbVersion>) -> SqlStandardLevel;

    /// Whether a driver failure is a unique-constraint violation.
    fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool;

    /// The session-scoped last-inserted-id query, for dialects that have
    /// one. Oracle and Firebird require generator-specific syntax and
    /// fail here.
    fn last_inserted_id_query(&self) -> Result<&'static str> {
        Err(DialectError::unsupported(
            self.database().name(),
            "session-scoped last-inserted-id query",
        ))
    }

    /// Single-row limiting syntax for lookups.
    fn row_limit_syntax(&self) -> RowLimitSyntax {
        RowLimitSyntax::Limit
    }

    /// Capability flags once the live version is known. The default keeps
    /// the descriptor's conservative values.
    fn features_for_version(&self, _version: &DbVersion) -> FeatureFlags {
        self.descriptor().features
    }

    /// Generated-key plan once the live version is known. The default
    /// keeps the descriptor's plan.
    fn key_plan_for_version(&self, _version: &DbVersion) -> GeneratedKeyPlan {
        self.descriptor().generated_key_plan
    }

    /// A human-readable warning advertised by fallback dialects.
    fn compatibility_warning(&self) -> Option<&'static str> {
        None
    }
}

//! The dialect engine: a dialect plus its lazily-detected product state.

use std::sync::Arc;

use parking_lot::RwLock;
use tessera_types::SupportedDatabase;

use crate::compliance::SqlStandardLevel;
use crate::descriptor::{DialectDescriptor, FeatureFlags, GeneratedKeyPlan};
use crate::dialect::{Dialect, RowLimitSyntax};
use crate::dialects::create_dialect;
use crate::error::{DialectError, Result};
use crate::version::DbVersion;

#[derive(Debug, Default)]
struct EngineState {
    initialized: bool,
    disposed: bool,
    product_banner: Option<String>,
    version: Option<DbVersion>,
    features: Option<FeatureFlags>,
    key_plan: Option<GeneratedKeyPlan>,
}

/// A dialect bound to the lazily-detected state of one live product.
///
/// Engines initialise on first connection: the owning context runs
/// [`DialectEngine::version_query`] (falling back to
/// [`DialectEngine::secondary_version_query`]) and feeds the banner to
/// [`DialectEngine::initialize_from_banner`]. Before that, version-gated
/// capability reads report the descriptor's conservative values.
pub struct DialectEngine {
    dialect: Arc<dyn Dialect>,
    state: RwLock<EngineState>,
}

impl DialectEngine {
    /// Build the engine for a provider.
    #[must_use]
    pub fn new(database: SupportedDatabase) -> Self {
        Self::from_dialect(create_dialect(database))
    }

    /// Build the engine around an explicit dialect (used by tests and by
    /// providers registered out of tree).
    #[must_use]
    pub fn from_dialect(dialect: Arc<dyn Dialect>) -> Self {
        Self {
            dialect,
            state: RwLock::new(EngineState::default()),
        }
    }

    /// The provider this engine serves.
    #[must_use]
    pub fn database(&self) -> SupportedDatabase {
        self.dialect.database()
    }

    /// The static behaviour table.
    #[must_use]
    pub fn descriptor(&self) -> &DialectDescriptor {
        self.dialect.descriptor()
    }

    /// The underlying dialect.
    #[must_use]
    pub fn dialect(&self) -> &Arc<dyn Dialect> {
        &self.dialect
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state.read().disposed {
            Err(DialectError::Disposed)
        } else {
            Ok(())
        }
    }

    /// Mark the engine disposed. Subsequent operations fail with
    /// [`DialectError::Disposed`].
    pub fn dispose(&self) {
        self.state.write().disposed = true;
    }

    // -- initialisation -----------------------------------------------------

    /// Whether version detection has completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state.read().initialized
    }

    /// Feed the product banner obtained from the version query.
    ///
    /// Unparseable banners still complete initialisation; the version
    /// stays unknown and capability reads keep their conservative values.
    pub fn initialize_from_banner(&self, banner: &str) {
        let version = self.dialect.parse_version(banner);
        let mut state = self.state.write();
        state.product_banner = Some(banner.to_owned());
        if let Some(v) = &version {
            state.features = Some(self.dialect.features_for_version(v));
            state.key_plan = Some(self.dialect.key_plan_for_version(v));
        } else {
            tracing::debug!(
                dialect = self.dialect.database().name(),
                "version banner did not parse, keeping conservative capabilities"
            );
        }
        state.version = version;
        state.initialized = true;
    }

    /// Record that every version probe failed. The product string is the
    /// empty string from here on, never an error.
    pub fn initialize_exhausted(&self) {
        let mut state = self.state.write();
        state.product_banner = Some(String::new());
        state.initialized = true;
    }

    /// The detected product banner. Empty when detection was exhausted,
    /// `None` before initialisation.
    #[must_use]
    pub fn product_banner(&self) -> Option<String> {
        self.state.read().product_banner.clone()
    }

    /// The detected version, when one parsed.
    #[must_use]
    pub fn version(&self) -> Option<DbVersion> {
        self.state.read().version
    }

    /// The fixed version query for this dialect.
    #[must_use]
    pub fn version_query(&self) -> &'static str {
        self.dialect.version_query()
    }

    /// The fallback version probe, when the dialect has one.
    #[must_use]
    pub fn secondary_version_query(&self) -> Option<&'static str> {
        self.dialect.secondary_version_query()
    }

    // -- capability reads ---------------------------------------------------

    /// Effective capability flags: version-upgraded after initialisation,
    /// the descriptor's conservative values before.
    #[must_use]
    pub fn features(&self) -> FeatureFlags {
        self.state
            .read()
            .features
            .unwrap_or(self.dialect.descriptor().features)
    }

    /// Effective generated-key plan.
    #[must_use]
    pub fn generated_key_plan(&self) -> GeneratedKeyPlan {
        self.state
            .read()
            .key_plan
            .unwrap_or(self.dialect.descriptor().generated_key_plan)
    }

    /// Whether `MERGE` may be emitted.
    #[must_use]
    pub fn supports_merge(&self) -> bool {
        self.features().merge
    }

    /// Whether an insert-returning clause may be emitted.
    #[must_use]
    pub fn supports_insert_returning(&self) -> bool {
        self.features().insert_returning
    }

    /// The SQL standard level for the current (possibly unknown) version.
    #[must_use]
    pub fn standard_compliance(&self) -> SqlStandardLevel {
        self.dialect
            .determine_standard_compliance(self.state.read().version.as_ref())
    }

    /// The fallback compatibility warning, when this dialect has one.
    #[must_use]
    pub fn compatibility_warning(&self) -> Option<&'static str> {
        self.dialect.compatibility_warning()
    }

    // -- SQL fragments ------------------------------------------------------

    /// Quote an identifier, splitting composites on the dialect separator.
    ///
    /// Empty input yields an empty token.
    #[must_use]
    pub fn wrap_object(&self, name: &str) -> String {
        let d = self.dialect.descriptor();
        if name.is_empty() {
            return String::new();
        }
        name.split(d.composite_identifier_separator)
            .map(|segment| d.quote_segment(segment))
            .collect::<Vec<_>>()
            .join(&d.composite_identifier_separator.to_string())
    }

    /// Render the marker token for a logical parameter name.
    ///
    /// Named dialects emit the marker followed by a dialect-safe
    /// identifier truncated to the descriptor's length cap; positional
    /// dialects emit the bare positional token.
    #[must_use]
    pub fn parameter_marker_for(&self, logical_name: &str) -> String {
        let d = self.dialect.descriptor();
        if !d.supports_named_parameters {
            return d.parameter_marker.to_string();
        }
        let mut safe: String = logical_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if d.parameter_name_max_length > 0 {
            safe.truncate(d.parameter_name_max_length);
        }
        format!("{}{safe}", d.parameter_marker)
    }

    /// Render the insert-returning clause for a key column, per the
    /// effective generated-key plan. Empty when the dialect cannot return
    /// generated keys inline.
    #[must_use]
    pub fn render_insert_returning(&self, column_sql: &str) -> String {
        if !self.supports_insert_returning() {
            return String::new();
        }
        match self.generated_key_plan() {
            GeneratedKeyPlan::Returning => format!("RETURNING {column_sql}"),
            GeneratedKeyPlan::OutputInserted => format!("OUTPUT INSERTED.{column_sql}"),
            GeneratedKeyPlan::PrefetchSequence => format!("RETURNING {column_sql} INTO ?"),
            GeneratedKeyPlan::SessionScopedFunction | GeneratedKeyPlan::CorrelationToken => {
                String::new()
            }
        }
    }

    /// The session-scoped last-inserted-id query.
    ///
    /// # Errors
    ///
    /// Fails on dialects whose keys require generator-specific syntax
    /// (Oracle, Firebird) and on the fallback dialect.
    pub fn get_last_inserted_id_query(&self) -> Result<&'static str> {
        self.ensure_live()?;
        self.dialect.last_inserted_id_query()
    }

    /// Build a single-row natural-key lookup.
    ///
    /// # Errors
    ///
    /// Empty column or parameter lists fail validation; mismatched counts
    /// fail as an argument error.
    pub fn get_natural_key_lookup_query(
        &self,
        table: &str,
        id_column: &str,
        key_columns: &[&str],
        param_names: &[&str],
    ) -> Result<String> {
        self.ensure_live()?;
        if key_columns.is_empty() || param_names.is_empty() {
            return Err(DialectError::Validation(
                "natural-key lookup requires at least one column and parameter".into(),
            ));
        }
        if key_columns.len() != param_names.len() {
            return Err(DialectError::ArgumentMismatch(format!(
                "{} key columns but {} parameters",
                key_columns.len(),
                param_names.len()
            )));
        }
        let id_sql = self.wrap_object(id_column);
        let table_sql = self.wrap_object(table);
        let predicates = key_columns
            .iter()
            .zip(param_names.iter())
            .map(|(col, param)| {
                format!("{} = {}", self.wrap_object(col), self.parameter_marker_for(param))
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        Ok(match self.dialect.row_limit_syntax() {
            RowLimitSyntax::TopPrefix => format!(
                "SELECT TOP 1 {id_sql} FROM {table_sql} WHERE {predicates} ORDER BY {id_sql}"
            ),
            RowLimitSyntax::FetchFirst => format!(
                "SELECT {id_sql} FROM {table_sql} WHERE {predicates} FETCH FIRST 1 ROWS ONLY"
            ),
            RowLimitSyntax::Rows => {
                format!("SELECT {id_sql} FROM {table_sql} WHERE {predicates} ROWS 1")
            }
            RowLimitSyntax::Limit => {
                format!("SELECT {id_sql} FROM {table_sql} WHERE {predicates} LIMIT 1")
            }
        })
    }

    /// The semicolon-separated session-setting batch for a read intent.
    #[must_use]
    pub fn get_connection_session_settings(&self, read_only: bool) -> String {
        let settings = &self.dialect.descriptor().session_settings;
        let batch = if read_only {
            settings.read_only
        } else {
            settings.read_write
        };
        batch.to_owned()
    }

    /// Whether a driver failure is a unique-constraint violation.
    #[must_use]
    pub fn is_unique_violation(&self, code: Option<&str>, message: &str) -> bool {
        self.dialect.is_unique_violation(code, message)
    }
}

impl std::fmt::Debug for DialectEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("DialectEngine")
            .field("database", &self.dialect.database())
            .field("initialized", &state.initialized)
            .field("version", &state.version)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_object_composites() {
        let pg = DialectEngine::new(SupportedDatabase::PostgreSql);
        assert_eq!(pg.wrap_object("public.users"), "\"public\".\"users\"");
        assert_eq!(pg.wrap_object(""), "");

        let ms = DialectEngine::new(SupportedDatabase::SqlServer);
        assert_eq!(ms.wrap_object("dbo.users"), "[dbo].[users]");

        let my = DialectEngine::new(SupportedDatabase::MySql);
        assert_eq!(my.wrap_object("users"), "`users`");
    }

    #[test]
    fn test_parameter_marker_named_and_positional() {
        let ms = DialectEngine::new(SupportedDatabase::SqlServer);
        assert_eq!(ms.parameter_marker_for("p0"), "@p0");

        let ora = DialectEngine::new(SupportedDatabase::Oracle);
        assert_eq!(ora.parameter_marker_for("p0"), ":p0");

        let unknown = DialectEngine::new(SupportedDatabase::Unknown);
        assert_eq!(unknown.parameter_marker_for("anything"), "?");
    }

    #[test]
    fn test_parameter_name_truncation() {
        let ora = DialectEngine::new(SupportedDatabase::Oracle);
        let long = "p".repeat(64);
        let rendered = ora.parameter_marker_for(&long);
        assert_eq!(rendered.len(), 1 + 30);
    }

    #[test]
    fn test_parameter_name_sanitised() {
        let pg = DialectEngine::new(SupportedDatabase::PostgreSql);
        assert_eq!(pg.parameter_marker_for("p 0; DROP"), ":p0DROP");
    }

    #[test]
    fn test_render_insert_returning_per_plan() {
        let pg = DialectEngine::new(SupportedDatabase::PostgreSql);
        assert_eq!(pg.render_insert_returning("\"id\""), "RETURNING \"id\"");

        let ms = DialectEngine::new(SupportedDatabase::SqlServer);
        assert_eq!(ms.render_insert_returning("[id]"), "OUTPUT INSERTED.[id]");

        let ora = DialectEngine::new(SupportedDatabase::Oracle);
        assert_eq!(ora.render_insert_returning("\"id\""), "RETURNING \"id\" INTO ?");

        let my = DialectEngine::new(SupportedDatabase::MySql);
        assert_eq!(my.render_insert_returning("`id`"), "");
    }

    #[test]
    fn test_returning_nonempty_iff_supported() {
        for db in SupportedDatabase::ALL {
            let engine = DialectEngine::new(db);
            let rendered = engine.render_insert_returning("id");
            assert_eq!(
                !rendered.is_empty(),
                engine.supports_insert_returning(),
                "{db}: rendered={rendered:?}"
            );
        }
    }

    #[test]
    fn test_sqlite_plan_upgrade_after_probe() {
        let engine = DialectEngine::new(SupportedDatabase::Sqlite);
        assert_eq!(
            engine.generated_key_plan(),
            GeneratedKeyPlan::SessionScopedFunction
        );
        assert!(!engine.supports_insert_returning());

        engine.initialize_from_banner("3.42.0");
        assert_eq!(engine.generated_key_plan(), GeneratedKeyPlan::Returning);
        assert!(engine.supports_insert_returning());
        assert_eq!(engine.render_insert_returning("\"id\""), "RETURNING \"id\"");
    }

    #[test]
    fn test_sqlite_old_version_keeps_rowid_plan() {
        let engine = DialectEngine::new(SupportedDatabase::Sqlite);
        engine.initialize_from_banner("3.30.1");
        assert_eq!(
            engine.generated_key_plan(),
            GeneratedKeyPlan::SessionScopedFunction
        );
    }

    #[test]
    fn test_unparseable_banner_stays_conservative() {
        let engine = DialectEngine::new(SupportedDatabase::Sqlite);
        engine.initialize_from_banner("not a version at all");
        assert!(engine.is_initialized());
        assert_eq!(engine.version(), None);
        assert!(!engine.supports_insert_returning());
    }

    #[test]
    fn test_exhausted_probe_yields_empty_banner() {
        let engine = DialectEngine::new(SupportedDatabase::Firebird);
        engine.initialize_exhausted();
        assert_eq!(engine.product_banner().as_deref(), Some(""));
        assert!(engine.is_initialized());
    }

    #[test]
    fn test_natural_key_lookup_tie_breaks() {
        let lookup = |db| {
            DialectEngine::new(db)
                .get_natural_key_lookup_query("users", "id", &["email"], &["p0"])
                .unwrap()
        };
        assert_eq!(
            lookup(SupportedDatabase::SqlServer),
            "SELECT TOP 1 [id] FROM [users] WHERE [email] = @p0 ORDER BY [id]"
        );
        assert_eq!(
            lookup(SupportedDatabase::Oracle),
            "SELECT \"id\" FROM \"users\" WHERE \"email\" = :p0 FETCH FIRST 1 ROWS ONLY"
        );
        assert_eq!(
            lookup(SupportedDatabase::Firebird),
            "SELECT \"id\" FROM \"users\" WHERE \"email\" = @p0 ROWS 1"
        );
        assert_eq!(
            lookup(SupportedDatabase::PostgreSql),
            "SELECT \"id\" FROM \"users\" WHERE \"email\" = :p0 LIMIT 1"
        );
    }

    #[test]
    fn test_natural_key_lookup_validation() {
        let engine = DialectEngine::new(SupportedDatabase::PostgreSql);
        assert!(matches!(
            engine.get_natural_key_lookup_query("users", "id", &[], &[]),
            Err(DialectError::Validation(_))
        ));
        assert!(matches!(
            engine.get_natural_key_lookup_query("users", "id", &["a", "b"], &["p0"]),
            Err(DialectError::ArgumentMismatch(_))
        ));
    }

    #[test]
    fn test_session_settings_read_intent() {
        let ora = DialectEngine::new(SupportedDatabase::Oracle);
        assert!(ora
            .get_connection_session_settings(true)
            .contains("ALTER SESSION SET READ ONLY"));
        assert!(!ora
            .get_connection_session_settings(false)
            .contains("READ ONLY"));

        let sqlite = DialectEngine::new(SupportedDatabase::Sqlite);
        assert_eq!(
            sqlite.get_connection_session_settings(true),
            "PRAGMA query_only = ON"
        );

        let fb = DialectEngine::new(SupportedDatabase::Firebird);
        assert_eq!(
            fb.get_connection_session_settings(true),
            fb.get_connection_session_settings(false)
        );
    }

    #[test]
    fn test_disposed_engine_fails() {
        let engine = DialectEngine::new(SupportedDatabase::MySql);
        engine.dispose();
        assert!(matches!(
            engine.get_last_inserted_id_query(),
            Err(DialectError::Disposed)
        ));
        assert!(matches!(
            engine.get_natural_key_lookup_query("t", "id", &["a"], &["p"]),
            Err(DialectError::Disposed)
        ));
    }

    #[test]
    fn test_oracle_compliance_through_engine() {
        let engine = DialectEngine::new(SupportedDatabase::Oracle);
        assert_eq!(engine.standard_compliance(), SqlStandardLevel::Sql2003);
        engine.initialize_from_banner("Oracle Database 19c Release 19.0.0.0.0");
        assert_eq!(engine.standard_compliance(), SqlStandardLevel::Sql2016);
    }

    #[test]
    fn test_unknown_warns_and_stays_sql92() {
        let engine = DialectEngine::new(SupportedDatabase::Unknown);
        assert!(engine.compatibility_warning().is_some());
        assert_eq!(engine.standard_compliance(), SqlStandardLevel::Sql92);
    }
}

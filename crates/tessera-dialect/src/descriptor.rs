//! The static per-provider behaviour table.

/// How stored-procedure invocations are wrapped for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcWrappingStyle {
    /// `EXEC name @p1, @p2` (SQL Server).
    Exec,
    /// `{CALL name(?, ?)}` (ODBC-style call escape).
    Call,
    /// `BEGIN name(:p1); END;` (Oracle anonymous block).
    Oracle,
    /// `SELECT * FROM name(:p1)` (PostgreSQL set-returning call).
    PostgreSql,
    /// `EXECUTE PROCEDURE name(?)` (Firebird).
    ExecuteProcedure,
}

/// The per-dialect strategy for retrieving an auto-assigned key after
/// insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedKeyPlan {
    /// Fetch the next sequence value first and bind it as the id
    /// parameter (Oracle).
    PrefetchSequence,
    /// `OUTPUT INSERTED.<id>` in the insert itself (SQL Server).
    OutputInserted,
    /// `RETURNING <id>` appended to the insert.
    Returning,
    /// Run the dialect's session-scoped last-id function on the same
    /// connection after the insert.
    SessionScopedFunction,
    /// Write a caller-supplied correlation column and look the row up
    /// afterwards (fallback dialect).
    CorrelationToken,
}

/// Capability flags for a provider.
///
/// Version-gated flags hold the conservative pre-initialisation value;
/// the engine upgrades them once the live version is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// `MERGE` statement support.
    pub merge: bool,
    /// Window function support.
    pub window_functions: bool,
    /// Common table expressions.
    pub ctes: bool,
    /// Savepoints inside transactions.
    pub savepoints: bool,
    /// `INSERT ... RETURNING` (or the provider's equivalent).
    pub insert_returning: bool,
    /// Native JSON column types.
    pub json_types: bool,
    /// Native array column types.
    pub array_types: bool,
    /// Identity / auto-increment columns.
    pub identity_columns: bool,
}

/// Session-setting statement batches, keyed by context read intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Batch applied to read-write connections.
    pub read_write: &'static str,
    /// Batch applied to read-only connections.
    pub read_only: &'static str,
}

impl SessionSettings {
    /// A dialect with no session-setting statements.
    pub const NONE: Self = Self {
        read_write: "",
        read_only: "",
    };
}

/// The static behaviour descriptor for one provider.
///
/// Everything here is known without a live connection. Dynamic behaviour
/// (version queries, banner parsing, violation matching) lives on the
/// [`crate::Dialect`] trait.
#[derive(Debug, Clone)]
pub struct DialectDescriptor {
    /// Parameter marker character (`@`, `:`, `?`, `$`).
    pub parameter_marker: char,
    /// Whether parameters are addressed by name; positional dialects
    /// ignore names in rendered SQL.
    pub supports_named_parameters: bool,
    /// Identifier quote prefix.
    pub quote_prefix: &'static str,
    /// Identifier quote suffix.
    pub quote_suffix: &'static str,
    /// Separator between composite identifier segments.
    pub composite_identifier_separator: char,
    /// Maximum bound parameters in a single command.
    pub max_parameter_limit: usize,
    /// Maximum output-direction parameters in a single command.
    pub max_output_parameters: usize,
    /// Maximum parameter name length; longer names are truncated.
    pub parameter_name_max_length: usize,
    /// Whether the provider supports server-side prepared statements.
    pub supports_prepared_statements: bool,
    /// Stored-procedure wrapping style.
    pub proc_wrapping_style: ProcWrappingStyle,
    /// Connection-string key controlling the driver pool ceiling, when
    /// the provider has one.
    pub max_pool_size_setting: Option<&'static str>,
    /// Capability flags (conservative pre-initialisation values).
    pub features: FeatureFlags,
    /// Generated-key retrieval plan.
    pub generated_key_plan: GeneratedKeyPlan,
    /// Session-setting batches.
    pub session_settings: SessionSettings,
}

impl DialectDescriptor {
    /// Quote a single identifier segment, doubling embedded quote
    /// suffixes.
    #[must_use]
    pub fn quote_segment(&self, segment: &str) -> String {
        let escaped = if self.quote_suffix.is_empty() {
            segment.to_owned()
        } else {
            segment.replace(
                self.quote_suffix,
                &format!("{0}{0}", self.quote_suffix),
            )
        };
        format!("{}{}{}", self.quote_prefix, escaped, self.quote_suffix)
    }
}

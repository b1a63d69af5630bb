//! The SQL container: a mutable query buffer plus its parameter table,
//! materialising driver-ready commands.

use std::collections::HashMap;
use std::sync::Arc;

use tessera_dialect::ProcWrappingStyle;
use tessera_types::{DbType, DbValue, LogicalType, ParamDirection, Parameter};
use tokio_util::sync::CancellationToken;

use crate::context::DatabaseContext;
use crate::driver::{CommandKind, DriverCommand, RowSet};
use crate::error::{Error, Result};
use crate::mode::ExecutionType;
use crate::tracked::TrackedConnection;

/// A mutable, single-thread-affine query builder.
///
/// The parameter table is keyed by the marker-stripped, case-preserved
/// name; `@p0`, `:p0`, `?p0`, and `$p0` all address the parameter `p0`.
/// Output-direction parameters are budgeted against the dialect's cap.
///
/// Containers are not `Sync` by contract: one container belongs to one
/// task. Independent containers may execute concurrently against the same
/// context, which routes them through its mode strategy.
pub struct SqlContainer {
    context: Arc<DatabaseContext>,
    bound: Option<Arc<TrackedConnection>>,
    query: String,
    params: Vec<Parameter>,
    index: HashMap<String, usize>,
    has_where_appended: bool,
    generated_names: u32,
}

impl SqlContainer {
    /// Create an empty container borrowing from a context.
    #[must_use]
    pub fn new(context: Arc<DatabaseContext>) -> Self {
        Self {
            context,
            bound: None,
            query: String::new(),
            params: Vec::new(),
            index: HashMap::new(),
            has_where_appended: false,
            generated_names: 0,
        }
    }

    /// Create a container bound to a transaction's connection. Executions
    /// use that connection and never release it.
    #[must_use]
    pub(crate) fn bound_to(
        context: Arc<DatabaseContext>,
        connection: Arc<TrackedConnection>,
    ) -> Self {
        let mut container = Self::new(context);
        container.bound = Some(connection);
        container
    }

    /// The owning context.
    #[must_use]
    pub fn context(&self) -> &Arc<DatabaseContext> {
        &self.context
    }

    /// The current query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether a WHERE clause was already appended.
    #[must_use]
    pub fn has_where_appended(&self) -> bool {
        self.has_where_appended
    }

    /// Append raw SQL.
    pub fn append_query(&mut self, text: &str) -> &mut Self {
        self.query.push_str(text);
        self
    }

    /// Append a predicate, emitting `WHERE` the first time and `AND`
    /// afterwards.
    pub fn append_where(&mut self, predicate: &str) -> &mut Self {
        if self.has_where_appended {
            self.query.push_str(" AND ");
        } else {
            self.query.push_str(" WHERE ");
            self.has_where_appended = true;
        }
        self.query.push_str(predicate);
        self
    }

    /// The marker token for a parameter name, per the owning dialect.
    #[must_use]
    pub fn marker_for(&self, name: &str) -> String {
        self.context.dialect().parameter_marker_for(name)
    }

    /// Strip a recognised marker prefix; case is preserved.
    fn normalize_name(name: &str) -> &str {
        name.strip_prefix(['@', ':', '?', '$']).unwrap_or(name)
    }

    fn next_generated_name(&mut self) -> String {
        loop {
            let candidate = format!("p{}", self.generated_names);
            self.generated_names += 1;
            if !self.index.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    /// Add an anonymous input parameter; a unique name is generated and
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates the same validation as named insertion.
    pub fn add_parameter(&mut self, db_type: DbType, value: DbValue) -> Result<String> {
        self.add_parameter_with_direction(None, db_type, value, ParamDirection::Input)
    }

    /// Add a named input parameter.
    ///
    /// # Errors
    ///
    /// Fails when the normalised name already exists.
    pub fn add_named_parameter(
        &mut self,
        name: &str,
        db_type: DbType,
        value: DbValue,
    ) -> Result<String> {
        self.add_parameter_with_direction(Some(name), db_type, value, ParamDirection::Input)
    }

    /// Add a parameter with an explicit direction, validating the
    /// dialect's output budget. Returns the normalised name.
    ///
    /// # Errors
    ///
    /// Duplicate names fail as [`Error::InvalidArgument`]; output-shaped
    /// directions fail when the budget is zero or exhausted.
    pub fn add_parameter_with_direction(
        &mut self,
        name: Option<&str>,
        db_type: DbType,
        value: DbValue,
        direction: ParamDirection,
    ) -> Result<String> {
        if direction.counts_against_output_budget() {
            let budget = self.context.dialect().descriptor().max_output_parameters;
            let used = self
                .params
                .iter()
                .filter(|p| p.direction.counts_against_output_budget())
                .count();
            if budget == 0 || used >= budget {
                return Err(Error::InvalidArgument(format!(
                    "output parameter budget exceeded ({used} of {budget})"
                )));
            }
        }
        let name = match name {
            Some(n) => {
                let normalized = Self::normalize_name(n);
                if normalized.is_empty() {
                    return Err(Error::InvalidArgument("empty parameter name".into()));
                }
                if self.index.contains_key(normalized) {
                    return Err(Error::InvalidArgument(format!(
                        "parameter {normalized:?} already exists"
                    )));
                }
                normalized.to_owned()
            }
            None => self.next_generated_name(),
        };
        let mut param = Parameter::input(name.clone(), db_type, value).with_direction(direction);
        param.db_type = db_type;
        self.index.insert(name.clone(), self.params.len());
        self.params.push(param);
        Ok(name)
    }

    /// Add a parameter configured for the live provider through the
    /// context's type registry. Returns the normalised name.
    ///
    /// # Errors
    ///
    /// Same validation as [`SqlContainer::add_parameter_with_direction`].
    pub fn add_typed_parameter(
        &mut self,
        name: Option<&str>,
        logical: &LogicalType,
        value: DbValue,
    ) -> Result<String> {
        let mut param = Parameter::default();
        self.context.types().configure_parameter_enhanced(
            &mut param,
            logical,
            value,
            self.context.database(),
        );
        let name =
            self.add_parameter_with_direction(name, param.db_type, param.value.clone(), ParamDirection::Input)?;
        // Carry over the provider refinements the registry produced.
        if let Some(idx) = self.index.get(&name) {
            let stored = &mut self.params[*idx];
            stored.size = param.size;
            stored.udt_name = param.udt_name;
            stored.provider_type_code = param.provider_type_code;
            stored.array_element = param.array_element;
        }
        Ok(name)
    }

    /// Number of bound parameters.
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }

    /// The parameters, in insertion order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Look up a parameter value; any marker prefix is accepted.
    #[must_use]
    pub fn get_parameter_value(&self, name: &str) -> Option<&DbValue> {
        let normalized = Self::normalize_name(name);
        self.index.get(normalized).map(|idx| &self.params[*idx].value)
    }

    /// Overwrite a parameter value; any marker prefix is accepted.
    ///
    /// # Errors
    ///
    /// Fails when the parameter does not exist.
    pub fn set_parameter_value(&mut self, name: &str, value: DbValue) -> Result<()> {
        let normalized = Self::normalize_name(name);
        match self.index.get(normalized) {
            Some(idx) => {
                self.params[*idx].value = value;
                Ok(())
            }
            None => Err(Error::InvalidArgument(format!(
                "no parameter named {normalized:?}"
            ))),
        }
    }

    /// Materialise a driver command from the current buffer and table.
    #[must_use]
    pub fn create_command(&self, kind: CommandKind) -> DriverCommand {
        DriverCommand {
            text: self.query.clone(),
            kind,
            parameters: self.params.clone(),
        }
    }

    /// Wrap the buffer (a procedure name) per the dialect's wrapping
    /// style, rendering the current parameters as markers.
    ///
    /// # Errors
    ///
    /// Capture-return is unsupported on the PostgreSQL and Firebird
    /// wrappers.
    pub fn wrap_for_stored_proc(&self, capture_return: bool) -> Result<String> {
        let dialect = self.context.dialect();
        let style = dialect.descriptor().proc_wrapping_style;
        let name = self.query.trim();
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "stored-procedure name is empty".into(),
            ));
        }
        let markers: Vec<String> = self
            .params
            .iter()
            .filter(|p| p.direction != ParamDirection::ReturnValue)
            .map(|p| dialect.parameter_marker_for(p.name.as_deref().unwrap_or_default()))
            .collect();
        let args = markers.join(", ");
        Ok(match style {
            ProcWrappingStyle::Exec => {
                if capture_return {
                    let ret = dialect.parameter_marker_for("ret");
                    format!("EXEC {ret} = {name} {args}")
                } else if args.is_empty() {
                    format!("EXEC {name}")
                } else {
                    format!("EXEC {name} {args}")
                }
            }
            ProcWrappingStyle::Call => {
                if capture_return {
                    format!("{{? = CALL {name}({args})}}")
                } else {
                    format!("{{CALL {name}({args})}}")
                }
            }
            ProcWrappingStyle::Oracle => {
                if capture_return {
                    let ret = dialect.parameter_marker_for("ret");
                    format!("BEGIN {ret} := {name}({args}); END;")
                } else {
                    format!("BEGIN {name}({args}); END;")
                }
            }
            ProcWrappingStyle::PostgreSql => {
                if capture_return {
                    return Err(Error::UnsupportedOperation(
                        "capture-return is not supported by the PostgreSQL wrapper".into(),
                    ));
                }
                format!("SELECT * FROM {name}({args})")
            }
            ProcWrappingStyle::ExecuteProcedure => {
                if capture_return {
                    return Err(Error::UnsupportedOperation(
                        "capture-return is not supported by EXECUTE PROCEDURE".into(),
                    ));
                }
                if args.is_empty() {
                    format!("EXECUTE PROCEDURE {name}")
                } else {
                    format!("EXECUTE PROCEDURE {name} ({args})")
                }
            }
        })
    }

    /// Empty the buffer and the parameter table.
    pub fn clear(&mut self) {
        self.query.clear();
        self.params.clear();
        self.index.clear();
        self.has_where_appended = false;
        self.generated_names = 0;
    }

    async fn run<T, F>(
        &self,
        exec_type: ExecutionType,
        cancel: &CancellationToken,
        op: F,
    ) -> Result<T>
    where
        F: AsyncFnOnce(&TrackedConnection, DriverCommand) -> Result<T>,
    {
        self.context.ensure_live()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let _permit = match self.context.admission() {
            Some(governor) => Some(governor.acquire(cancel).await?),
            None => None,
        };
        let command = self.create_command(CommandKind::Text);
        if let Some(bound) = &self.bound {
            // Transaction-owned connection: the transaction releases it.
            return op(bound.as_ref(), command).await;
        }
        let connection = self.context.strategy().get_connection(exec_type).await?;
        let result = tokio::select! {
            () = cancel.cancelled() => Err(Error::Cancelled),
            out = op(connection.as_ref(), command) => out,
        };
        self.context.strategy().release(Some(connection)).await;
        result
    }

    /// Execute the buffer as a statement, returning affected rows.
    ///
    /// # Errors
    ///
    /// Driver failures surface as [`Error::ConnectionFailure`].
    pub async fn execute_non_query_async(&self, cancel: &CancellationToken) -> Result<u64> {
        self.run(ExecutionType::Write, cancel, async |conn, cmd| {
            Ok(conn.execute(&cmd).await?)
        })
        .await
    }

    /// Execute the buffer and return the first cell of the first row.
    ///
    /// # Errors
    ///
    /// An empty result set fails with [`Error::NotFound`].
    pub async fn execute_scalar_async(&self, cancel: &CancellationToken) -> Result<DbValue> {
        self.run(ExecutionType::Read, cancel, async |conn, cmd| {
            conn.scalar(&cmd)
                .await?
                .ok_or_else(|| Error::NotFound("scalar query returned no rows".into()))
        })
        .await
    }

    /// Execute the buffer as a query, materialising the full result set.
    /// The borrowed connection is released before the rows are returned.
    ///
    /// # Errors
    ///
    /// Driver failures surface as [`Error::ConnectionFailure`].
    pub async fn execute_reader_async(&self, cancel: &CancellationToken) -> Result<RowSet> {
        self.run(ExecutionType::Read, cancel, async |conn, cmd| {
            Ok(conn.query(&cmd).await?)
        })
        .await
    }
}

impl std::fmt::Debug for SqlContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlContainer")
            .field("query_len", &self.query.len())
            .field("parameters", &self.params.len())
            .field("bound", &self.bound.is_some())
            .finish()
    }
}

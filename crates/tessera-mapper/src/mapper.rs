//! The entity mapper: SQL synthesis and result binding for one
//! registered record shape.

use std::marker::PhantomData;
use std::sync::Arc;

use tessera_core::container::SqlContainer;
use tessera_core::context::DatabaseContext;
use tessera_core::driver::{CommandKind, DriverCommand, RowSet};
use tessera_core::error::{Error, Result};
use tessera_core::mode::ExecutionType;
use tessera_core::tracked::TrackedConnection;
use tessera_dialect::GeneratedKeyPlan;
use tessera_types::{DbValue, LogicalType};
use tokio_util::sync::CancellationToken;

use crate::entity::Entity;
use crate::table::{AuditRole, ColumnInfo, TableInfo};

/// Alias used for the incoming row in MERGE upserts.
const UPSERT_SOURCE_ALIAS: &str = "src";

/// Schema-driven CRUD for one entity shape.
///
/// Registration happens at construction: the entity's table definition is
/// validated and cached. All SQL synthesis goes through the owning
/// context's dialect and type registry.
pub struct EntityMapper<E: Entity> {
    context: Arc<DatabaseContext>,
    info: Arc<TableInfo>,
    _marker: PhantomData<fn() -> E>,
}

impl<E: Entity + Default> EntityMapper<E> {
    /// Register the entity shape against a context.
    ///
    /// # Errors
    ///
    /// Registration-rule violations surface as
    /// [`Error::InvalidConfiguration`].
    pub fn new(context: Arc<DatabaseContext>) -> Result<Self> {
        let info = Arc::new(E::table().build()?);
        tracing::debug!(table = %info.name, columns = info.columns.len(), "entity registered");
        Ok(Self {
            context,
            info,
            _marker: PhantomData,
        })
    }

    /// The validated table metadata.
    #[must_use]
    pub fn info(&self) -> &TableInfo {
        &self.info
    }

    /// The owning context.
    #[must_use]
    pub fn context(&self) -> &Arc<DatabaseContext> {
        &self.context
    }

    fn wrap(&self, name: &str) -> String {
        self.context.dialect().wrap_object(name)
    }

    /// The dialect-quoted reference to an incoming MERGE column, e.g.
    /// `"src"."name"`.
    #[must_use]
    pub fn upsert_incoming_column(&self, column: &str) -> String {
        format!("{}.{}", self.wrap(UPSERT_SOURCE_ALIAS), self.wrap(column))
    }

    fn single_key(&self) -> Result<&ColumnInfo> {
        let keys = self.info.key_columns();
        match keys.as_slice() {
            [single] => Ok(single),
            _ => Err(Error::UnsupportedOperation(format!(
                "table {:?} has a composite key; id-list operations need a single key column",
                self.info.name
            ))),
        }
    }

    fn check_parameter_cap(&self, count: usize) -> Result<()> {
        let cap = self.context.dialect().descriptor().max_parameter_limit;
        if count > cap {
            return Err(Error::InvalidArgument(format!(
                "too many parameters: {count} exceeds the dialect limit of {cap}"
            )));
        }
        Ok(())
    }

    fn version_initial(column: &ColumnInfo) -> DbValue {
        match column.logical_type {
            LogicalType::Int16 => DbValue::Int16(1),
            LogicalType::Int64 => DbValue::Int64(1),
            _ => DbValue::Int32(1),
        }
    }

    /// Stamp create-time audit values onto the record.
    fn stamp_audit_values(&self, entity: &mut E) {
        let audit = self.context.audit();
        let user = audit.current_user();
        let now = audit.now();
        for column in &self.info.columns {
            match column.audit_role {
                Some(role) if role.is_user() => {
                    entity.set(&column.name, DbValue::Text(user.clone()));
                }
                Some(_) => entity.set(&column.name, DbValue::DateTime(now)),
                None => {}
            }
        }
    }

    /// Stamp create-time audit and version values onto the record.
    fn stamp_create_values(&self, entity: &mut E) {
        self.stamp_audit_values(entity);
        for column in &self.info.columns {
            if column.is_version {
                entity.set(&column.name, Self::version_initial(column));
            }
        }
    }

    fn insert_columns(&self) -> Vec<&ColumnInfo> {
        self.info
            .columns
            .iter()
            .filter(|c| c.insertable && !(c.is_id && !c.id_writable))
            .collect()
    }

    /// Synthesise the INSERT for an entity. Audit and version values are
    /// stamped on the record first so the bound parameters and the record
    /// agree.
    ///
    /// # Errors
    ///
    /// Fails on read-only contexts.
    pub fn build_create(&self, entity: &mut E) -> Result<SqlContainer> {
        let token = self.correlation_token(self.context.dialect().generated_key_plan());
        self.build_create_with_token(entity, token.as_deref())
    }

    fn build_create_with_token(
        &self,
        entity: &mut E,
        correlation_token: Option<&str>,
    ) -> Result<SqlContainer> {
        self.context.strategy().assert_is_write_connection()?;
        self.stamp_create_values(entity);

        let mut container = SqlContainer::new(Arc::clone(&self.context));
        let plan = self.context.dialect().generated_key_plan();
        let mut columns = self.insert_columns();
        // Oracle prefetches the key and binds it like a normal column.
        if plan == GeneratedKeyPlan::PrefetchSequence {
            if let Some(id) = self.info.id_column() {
                if !id.id_writable {
                    columns.insert(0, id);
                }
            }
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut markers = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = match correlation_token {
                Some(token) if Some(&column.name) == self.info.correlation_column.as_ref() => {
                    DbValue::Text(token.to_owned())
                }
                _ => entity.get(&column.name),
            };
            let param = container.add_typed_parameter(None, &column.logical_type, value)?;
            names.push(self.wrap(&column.name));
            markers.push(container.marker_for(&param));
        }

        let table = self.wrap(&self.info.name);
        let id_sql = self.info.id_column().map(|c| self.wrap(&c.name));
        let returning = id_sql
            .as_deref()
            .map(|id| self.context.dialect().render_insert_returning(id))
            .unwrap_or_default();

        container.append_query(&format!(
            "INSERT INTO {table} ({})",
            names.join(", ")
        ));
        if plan == GeneratedKeyPlan::OutputInserted && !returning.is_empty() {
            container.append_query(&format!(" {returning}"));
        }
        container.append_query(&format!(" VALUES ({})", markers.join(", ")));
        if plan != GeneratedKeyPlan::OutputInserted && !returning.is_empty() {
            container.append_query(&format!(" {returning}"));
        }
        Ok(container)
    }

    fn correlation_token(&self, plan: GeneratedKeyPlan) -> Option<String> {
        if plan == GeneratedKeyPlan::CorrelationToken
            && self.info.correlation_column.is_some()
            && self.info.id_column().is_some_and(|c| !c.id_writable)
        {
            Some(uuid::Uuid::new_v4().to_string())
        } else {
            None
        }
    }

    /// Insert the entity and populate its generated key per the dialect's
    /// plan. The session-scoped follow-up runs on the same connection as
    /// the insert.
    ///
    /// # Errors
    ///
    /// Driver failures surface as [`Error::ConnectionFailure`].
    pub async fn create_async(&self, entity: &mut E, cancel: &CancellationToken) -> Result<()> {
        self.context.ensure_live()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let _permit = match self.context.admission() {
            Some(governor) => Some(governor.acquire(cancel).await?),
            None => None,
        };
        let connection = self
            .context
            .strategy()
            .get_connection(ExecutionType::Write)
            .await?;
        let result = self.create_on(entity, &connection).await;
        self.context.strategy().release(Some(connection)).await;
        result
    }

    async fn create_on(&self, entity: &mut E, connection: &TrackedConnection) -> Result<()> {
        let plan = self.context.dialect().generated_key_plan();
        let id_column = self.info.id_column().cloned();
        let populate_id = id_column.as_ref().is_some_and(|c| !c.id_writable);

        if plan == GeneratedKeyPlan::PrefetchSequence && populate_id {
            let sequence = format!("{}_seq", self.info.name);
            let command = DriverCommand {
                text: format!("SELECT {}.NEXTVAL FROM dual", self.wrap(&sequence)),
                ..DriverCommand::default()
            };
            match connection.scalar(&command).await? {
                Some(next) if !next.is_null() => {
                    if let Some(id) = &id_column {
                        self.set_coerced(entity, id, next)?;
                    }
                }
                _ => {}
            }
        }

        let correlation_token = self.correlation_token(plan);
        let container = self.build_create_with_token(entity, correlation_token.as_deref())?;
        let command = container.create_command(CommandKind::Text);

        match plan {
            GeneratedKeyPlan::Returning | GeneratedKeyPlan::OutputInserted if populate_id => {
                let rows = connection.query(&command).await?;
                // The generated key populates only a single-row insert.
                if rows.len() == 1 {
                    if let (Some(id), Some(cell)) =
                        (&id_column, rows.rows.first().and_then(|r| r.first()))
                    {
                        if !cell.is_null() {
                            self.set_coerced(entity, id, cell.clone())?;
                        }
                    }
                }
            }
            GeneratedKeyPlan::SessionScopedFunction if populate_id => {
                let affected = connection.execute(&command).await?;
                if affected == 1 {
                    let query = self.context.dialect().get_last_inserted_id_query()?;
                    let follow_up = DriverCommand {
                        text: query.to_owned(),
                        ..DriverCommand::default()
                    };
                    // A null scalar leaves the id at its default.
                    match connection.scalar(&follow_up).await? {
                        Some(value) if !value.is_null() => {
                            if let Some(id) = &id_column {
                                self.set_coerced(entity, id, value)?;
                            }
                        }
                        _ => {}
                    }
                }
            }
            GeneratedKeyPlan::CorrelationToken if populate_id => {
                let affected = connection.execute(&command).await?;
                if affected == 1 {
                    if let (Some(token), Some(corr), Some(id)) = (
                        correlation_token,
                        self.info.correlation_column.clone(),
                        &id_column,
                    ) {
                        let lookup = self.context.dialect().get_natural_key_lookup_query(
                            &self.info.name,
                            &id.name,
                            &[corr.as_str()],
                            &["corr"],
                        )?;
                        let command = DriverCommand {
                            text: lookup,
                            parameters: vec![tessera_types::Parameter::input(
                                "corr",
                                tessera_types::DbType::String,
                                DbValue::Text(token),
                            )],
                            ..DriverCommand::default()
                        };
                        match connection.scalar(&command).await? {
                            Some(value) if !value.is_null() => {
                                self.set_coerced(entity, id, value)?;
                            }
                            _ => {}
                        }
                    }
                }
            }
            _ => {
                connection.execute(&command).await?;
            }
        }
        Ok(())
    }

    fn set_coerced(&self, entity: &mut E, column: &ColumnInfo, raw: DbValue) -> Result<()> {
        let coerced = self.context.types().coercions().read_as(
            &raw,
            &column.logical_type,
            column.nullable,
        )?;
        entity.set(&column.name, coerced);
        Ok(())
    }

    /// Synthesise a SELECT of all mapped columns for a set of ids.
    ///
    /// # Errors
    ///
    /// An empty id collection fails as [`Error::InvalidArgument`]; a
    /// parameter count beyond the dialect cap fails with a dedicated
    /// too-many-parameters error.
    pub fn build_retrieve(&self, ids: &[DbValue], alias: Option<&str>) -> Result<SqlContainer> {
        if ids.is_empty() {
            return Err(Error::InvalidArgument("empty id collection".into()));
        }
        self.check_parameter_cap(ids.len())?;
        let key = self.single_key()?.clone();

        let mut container = SqlContainer::new(Arc::clone(&self.context));
        let prefix = alias.map(|a| format!("{}.", self.wrap(a))).unwrap_or_default();
        let columns: Vec<String> = self
            .info
            .columns
            .iter()
            .map(|c| format!("{prefix}{}", self.wrap(&c.name)))
            .collect();
        let table = self.wrap(&self.info.name);
        let from = match alias {
            Some(a) => format!("{table} {}", self.wrap(a)),
            None => table,
        };
        container.append_query(&format!(
            "SELECT {} FROM {from}",
            columns.join(", ")
        ));
        let mut markers = Vec::with_capacity(ids.len());
        for id in ids {
            let param = container.add_typed_parameter(None, &key.logical_type, id.clone())?;
            markers.push(container.marker_for(&param));
        }
        container.append_where(&format!(
            "{prefix}{} IN ({})",
            self.wrap(&key.name),
            markers.join(", ")
        ));
        Ok(container)
    }

    /// Materialise at most one entity; `None` when the result is empty,
    /// the first row when there are several.
    ///
    /// # Errors
    ///
    /// Coercion failures surface as [`Error::TypeCoercion`].
    pub async fn load_single_async(
        &self,
        container: &SqlContainer,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let rows = container.execute_reader_async(cancel).await?;
        match rows.rows.first() {
            Some(_) => Ok(Some(self.bind_row(&rows, 0)?)),
            None => Ok(None),
        }
    }

    /// Materialise the full result sequence.
    ///
    /// # Errors
    ///
    /// Coercion failures surface as [`Error::TypeCoercion`].
    pub async fn load_list_async(
        &self,
        container: &SqlContainer,
        cancel: &CancellationToken,
    ) -> Result<Vec<E>> {
        let rows = container.execute_reader_async(cancel).await?;
        (0..rows.len()).map(|i| self.bind_row(&rows, i)).collect()
    }

    /// Convenience: retrieve one entity by id.
    ///
    /// # Errors
    ///
    /// Propagates build and execution failures; absence is `Ok(None)`.
    pub async fn retrieve_one_async(
        &self,
        id: DbValue,
        cancel: &CancellationToken,
    ) -> Result<Option<E>> {
        let container = self.build_retrieve(&[id], None)?;
        self.load_single_async(&container, cancel).await
    }

    fn bind_row(&self, rows: &RowSet, row: usize) -> Result<E> {
        let coercions = self.context.types().coercions();
        let mut entity = E::default();
        for column in &self.info.columns {
            let Some(raw) = rows.cell(row, &column.name) else {
                continue;
            };
            let value = if let Some(mapping) = &column.enum_mapping {
                if raw.is_null() && column.nullable {
                    DbValue::Null
                } else {
                    DbValue::Int64(mapping.coerce(raw)?)
                }
            } else {
                coercions.read_as(raw, &column.logical_type, column.nullable)?
            };
            entity.set(&column.name, value);
        }
        Ok(entity)
    }

    fn update_columns(&self) -> Vec<&ColumnInfo> {
        self.info
            .columns
            .iter()
            .filter(|c| {
                c.updatable
                    && !c.is_id
                    && !c.is_version
                    && c.pk_order.is_none()
                    && !c.audit_role.is_some_and(AuditRole::is_created)
            })
            .collect()
    }

    /// Synthesise the UPDATE for an entity.
    ///
    /// With `load_original`, the current row is fetched and only columns
    /// whose values differ are emitted; a missing original row fails.
    /// NULL values render as literal `= NULL` instead of binding a
    /// parameter. A version column adds the optimistic-concurrency WHERE
    /// clause and increments in the SET clause.
    ///
    /// # Errors
    ///
    /// Fails on read-only contexts, when the original row is missing, or
    /// when nothing is left to update.
    pub async fn build_update_async(
        &self,
        entity: &E,
        load_original: bool,
        cancel: &CancellationToken,
    ) -> Result<SqlContainer> {
        self.context.strategy().assert_is_write_connection()?;
        let key = self.single_key()?.clone();
        let key_value = entity.get(&key.name);

        let original: Option<E> = if load_original {
            let found = self
                .retrieve_one_async(key_value.clone(), cancel)
                .await?;
            match found {
                Some(row) => Some(row),
                None => {
                    return Err(Error::InvalidState(format!(
                        "original row not found for update on {:?}",
                        self.info.name
                    )));
                }
            }
        } else {
            None
        };

        let audit = self.context.audit();
        let mut container = SqlContainer::new(Arc::clone(&self.context));
        let mut sets = Vec::new();
        for column in self.update_columns() {
            let value = match column.audit_role {
                Some(role) if role.is_user() => DbValue::Text(audit.current_user()),
                Some(_) => DbValue::DateTime(audit.now()),
                None => entity.get(&column.name),
            };
            if column.audit_role.is_none() {
                if let Some(original) = &original {
                    if original.get(&column.name) == value {
                        continue;
                    }
                }
            }
            let wrapped = self.wrap(&column.name);
            if value.is_null() {
                // NULL bypasses binding entirely and renders literally.
                sets.push(format!("{wrapped} = NULL"));
            } else {
                let param =
                    container.add_typed_parameter(None, &column.logical_type, value)?;
                sets.push(format!("{wrapped} = {}", container.marker_for(&param)));
            }
        }
        if sets.is_empty() {
            return Err(Error::InvalidArgument("no updatable changes".into()));
        }

        let version = self.info.version_column().cloned();
        if let Some(version) = &version {
            let old = entity.get(&version.name);
            let next = DbValue::Int64(old.as_i64().unwrap_or_default() + 1);
            let param = container.add_typed_parameter(
                Some("new_version"),
                &version.logical_type,
                next,
            )?;
            sets.push(format!(
                "{} = {}",
                self.wrap(&version.name),
                container.marker_for(&param)
            ));
        }

        container.append_query(&format!(
            "UPDATE {} SET {}",
            self.wrap(&self.info.name),
            sets.join(", ")
        ));
        let key_param = container.add_typed_parameter(
            Some("key"),
            &key.logical_type,
            key_value,
        )?;
        container.append_where(&format!(
            "{} = {}",
            self.wrap(&key.name),
            container.marker_for(&key_param)
        ));
        if let Some(version) = &version {
            let old_param = container.add_typed_parameter(
                Some("old_version"),
                &version.logical_type,
                entity.get(&version.name),
            )?;
            let predicate = format!(
                "{} = {}",
                self.wrap(&version.name),
                container.marker_for(&old_param)
            );
            container.append_where(&predicate);
        }
        Ok(container)
    }

    /// Execute an update built from the entity.
    ///
    /// # Errors
    ///
    /// Zero affected rows with a version column surface as
    /// [`Error::OptimisticConcurrency`].
    pub async fn update_async(
        &self,
        entity: &mut E,
        load_original: bool,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let container = self.build_update_async(entity, load_original, cancel).await?;
        let affected = container.execute_non_query_async(cancel).await?;
        if affected == 0 {
            if let Some(version) = self.info.version_column() {
                return Err(Error::OptimisticConcurrency(format!(
                    "version mismatch on {:?} ({} column)",
                    self.info.name, version.name
                )));
            }
        }
        if affected > 0 {
            if let Some(version) = self.info.version_column() {
                let old = entity.get(&version.name).as_i64().unwrap_or_default();
                entity.set(&version.name, DbValue::Int64(old + 1));
            }
        }
        Ok(affected)
    }

    /// Synthesise an upsert.
    ///
    /// Dialects with `MERGE` get a single MERGE statement sourcing the
    /// incoming row through the `src` alias. Everything else falls back
    /// to an INSERT whose unique-violation is handled by
    /// [`EntityMapper::upsert_async`].
    ///
    /// # Errors
    ///
    /// Fails on read-only contexts.
    pub fn build_upsert(&self, entity: &mut E) -> Result<SqlContainer> {
        self.context.strategy().assert_is_write_connection()?;
        if !self.context.dialect().supports_merge() {
            return self.build_upsert_insert(entity);
        }
        self.stamp_audit_values(entity);
        let key = self.single_key()?.clone();

        let mut container = SqlContainer::new(Arc::clone(&self.context));
        let columns = self.insert_columns();
        let mut select_items = Vec::with_capacity(columns.len());
        for column in &columns {
            let param = container.add_typed_parameter(
                None,
                &column.logical_type,
                entity.get(&column.name),
            )?;
            select_items.push(format!(
                "{} AS {}",
                container.marker_for(&param),
                self.wrap(&column.name)
            ));
        }
        // A writable key may not be in the insert set; make sure the
        // source row carries it for the ON clause.
        if !columns.iter().any(|c| c.name == key.name) {
            let param = container.add_typed_parameter(
                None,
                &key.logical_type,
                entity.get(&key.name),
            )?;
            select_items.push(format!(
                "{} AS {}",
                container.marker_for(&param),
                self.wrap(&key.name)
            ));
        }

        let source_select = match self.context.database() {
            tessera_types::SupportedDatabase::Oracle => {
                format!("SELECT {} FROM dual", select_items.join(", "))
            }
            _ => format!("SELECT {}", select_items.join(", ")),
        };

        let table = self.wrap(&self.info.name);
        let src = self.wrap(UPSERT_SOURCE_ALIAS);
        let on = format!(
            "{table}.{} = {}",
            self.wrap(&key.name),
            self.upsert_incoming_column(&key.name)
        );
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| c.name != key.name && !c.audit_role.is_some_and(AuditRole::is_created))
            .map(|c| {
                format!(
                    "{} = {}",
                    self.wrap(&c.name),
                    self.upsert_incoming_column(&c.name)
                )
            })
            .collect();
        let insert_names: Vec<String> = columns.iter().map(|c| self.wrap(&c.name)).collect();
        let insert_values: Vec<String> = columns
            .iter()
            .map(|c| self.upsert_incoming_column(&c.name))
            .collect();

        container.append_query(&format!(
            "MERGE INTO {table} USING ({source_select}) {src} ON ({on}) \
             WHEN MATCHED THEN UPDATE SET {} \
             WHEN NOT MATCHED THEN INSERT ({}) VALUES ({})",
            updates.join(", "),
            insert_names.join(", "),
            insert_values.join(", ")
        ));
        Ok(container)
    }

    /// The no-MERGE upsert arm: an INSERT that carries the key, so the
    /// unique violation identifies an existing row to update.
    fn build_upsert_insert(&self, entity: &mut E) -> Result<SqlContainer> {
        // The record may target an existing row; its version is the
        // caller's business here, only audit values are stamped.
        self.stamp_audit_values(entity);
        let key = self.single_key()?.clone();
        let mut columns = self.insert_columns();
        if !columns.iter().any(|c| c.name == key.name) {
            if let Some(found) = self.info.column(&key.name) {
                columns.insert(0, found);
            }
        }
        let mut container = SqlContainer::new(Arc::clone(&self.context));
        let mut names = Vec::with_capacity(columns.len());
        let mut markers = Vec::with_capacity(columns.len());
        for column in &columns {
            let param = container.add_typed_parameter(
                None,
                &column.logical_type,
                entity.get(&column.name),
            )?;
            names.push(self.wrap(&column.name));
            markers.push(container.marker_for(&param));
        }
        container.append_query(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.wrap(&self.info.name),
            names.join(", "),
            markers.join(", ")
        ));
        Ok(container)
    }

    /// Execute an upsert: MERGE where supported, otherwise an INSERT
    /// attempt followed by an UPDATE when the insert hits a unique
    /// violation.
    ///
    /// # Errors
    ///
    /// Non-unique-violation failures propagate unchanged.
    pub async fn upsert_async(&self, entity: &mut E, cancel: &CancellationToken) -> Result<u64> {
        let container = self.build_upsert(entity)?;
        if self.context.dialect().supports_merge() {
            return container.execute_non_query_async(cancel).await;
        }
        match container.execute_non_query_async(cancel).await {
            Ok(affected) => Ok(affected),
            Err(Error::ConnectionFailure { code, message })
                if self
                    .context
                    .dialect()
                    .is_unique_violation(code.as_deref(), &message) =>
            {
                tracing::debug!(table = %self.info.name, "insert hit unique violation, updating");
                self.update_async(entity, false, cancel).await
            }
            Err(e) => Err(e),
        }
    }

    /// Synthesise a DELETE for a set of ids. Same validation as
    /// retrieval.
    ///
    /// # Errors
    ///
    /// Empty collections and parameter counts beyond the dialect cap
    /// fail as [`Error::InvalidArgument`].
    pub fn build_delete(&self, ids: &[DbValue]) -> Result<SqlContainer> {
        self.context.strategy().assert_is_write_connection()?;
        if ids.is_empty() {
            return Err(Error::InvalidArgument("empty id collection".into()));
        }
        self.check_parameter_cap(ids.len())?;
        let key = self.single_key()?.clone();

        let mut container = SqlContainer::new(Arc::clone(&self.context));
        container.append_query(&format!("DELETE FROM {}", self.wrap(&self.info.name)));
        let mut markers = Vec::with_capacity(ids.len());
        for id in ids {
            let param = container.add_typed_parameter(None, &key.logical_type, id.clone())?;
            markers.push(container.marker_for(&param));
        }
        container.append_where(&format!(
            "{} IN ({})",
            self.wrap(&key.name),
            markers.join(", ")
        ));
        Ok(container)
    }

    /// Delete by ids, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Propagates build and execution failures.
    pub async fn delete_async(&self, ids: &[DbValue], cancel: &CancellationToken) -> Result<u64> {
        let container = self.build_delete(ids)?;
        container.execute_non_query_async(cancel).await
    }
}

impl<E: Entity> std::fmt::Debug for EntityMapper<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMapper")
            .field("table", &self.info.name)
            .field("columns", &self.info.columns.len())
            .finish()
    }
}

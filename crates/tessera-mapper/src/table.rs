//! Table metadata: column descriptors, registration rules, and the
//! builder that enforces them.

use tessera_core::error::{Error, Result};
use tessera_types::{EnumMapping, LogicalType};

/// Audit role of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditRole {
    /// Set once at insert time.
    CreatedBy,
    /// Set once at insert time.
    CreatedOn,
    /// Refreshed on every update.
    LastUpdatedBy,
    /// Refreshed on every update.
    LastUpdatedOn,
}

impl AuditRole {
    /// Whether this role is written only at creation.
    #[must_use]
    pub fn is_created(self) -> bool {
        matches!(self, Self::CreatedBy | Self::CreatedOn)
    }

    /// Whether this role carries a user value (vs a timestamp).
    #[must_use]
    pub fn is_user(self) -> bool {
        matches!(self, Self::CreatedBy | Self::LastUpdatedBy)
    }
}

/// One mapped column.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column name as it appears in SQL.
    pub name: String,
    /// Provider-agnostic type tag.
    pub logical_type: LogicalType,
    /// Resolved ordinal; explicit values win, the rest are auto-assigned.
    pub ordinal: u32,
    /// Whether NULL is admissible.
    pub nullable: bool,
    /// Whether the column participates in INSERT.
    pub insertable: bool,
    /// Whether the column participates in UPDATE.
    pub updatable: bool,
    /// Whether this is the surrogate row id.
    pub is_id: bool,
    /// Whether a surrogate id is caller-writable (no generated-key plan).
    pub id_writable: bool,
    /// Primary-key order for composite keys; `None` for non-key columns.
    pub pk_order: Option<u32>,
    /// Whether this is the optimistic-concurrency version column.
    pub is_version: bool,
    /// Enum mapping, for enum-tagged columns.
    pub enum_mapping: Option<EnumMapping>,
    /// Whether the column carries JSON.
    pub is_json: bool,
    /// Audit role, when the column is audit-managed.
    pub audit_role: Option<AuditRole>,
}

impl ColumnInfo {
    fn new(name: String, logical_type: LogicalType) -> Self {
        Self {
            name,
            logical_type,
            ordinal: 0,
            nullable: false,
            insertable: true,
            updatable: true,
            is_id: false,
            id_writable: false,
            pk_order: None,
            is_version: false,
            enum_mapping: None,
            is_json: false,
            audit_role: None,
        }
    }
}

/// Validated table metadata.
#[derive(Debug, Clone)]
pub struct TableInfo {
    /// Table name, possibly schema-qualified.
    pub name: String,
    /// Columns in ordinal order.
    pub columns: Vec<ColumnInfo>,
    /// Index of the surrogate id column.
    pub id: Option<usize>,
    /// Indices of primary-key columns, in key order.
    pub primary_keys: Vec<usize>,
    /// Index of the version column.
    pub version: Option<usize>,
    /// Derived: whether any audit column exists.
    pub has_audit_columns: bool,
    /// Column used by the correlation-token generated-key plan.
    pub correlation_column: Option<String>,
}

impl TableInfo {
    /// The surrogate id column, if one exists.
    #[must_use]
    pub fn id_column(&self) -> Option<&ColumnInfo> {
        self.id.map(|i| &self.columns[i])
    }

    /// The version column, if one exists.
    #[must_use]
    pub fn version_column(&self) -> Option<&ColumnInfo> {
        self.version.map(|i| &self.columns[i])
    }

    /// The key columns: the surrogate id, or the ordered primary keys.
    #[must_use]
    pub fn key_columns(&self) -> Vec<&ColumnInfo> {
        if let Some(id) = self.id_column() {
            vec![id]
        } else {
            self.primary_keys.iter().map(|i| &self.columns[*i]).collect()
        }
    }

    /// Look up a column by case-insensitive name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Builder for [`TableInfo`]. Validation runs at [`TableInfoBuilder::build`],
/// mirroring registration-time annotation parsing.
#[derive(Debug, Default)]
pub struct TableInfoBuilder {
    name: Option<String>,
    columns: Vec<ColumnInfo>,
    correlation_column: Option<String>,
}

/// Builder for one column, consumed back into its table builder.
#[derive(Debug)]
pub struct ColumnBuilder {
    table: TableInfoBuilder,
    column: ColumnInfo,
}

impl TableInfoBuilder {
    /// Start a builder for a table.
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            columns: Vec::new(),
            correlation_column: None,
        }
    }

    /// Start a builder with no table annotation; `build` will reject it.
    #[must_use]
    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Begin a column.
    #[must_use]
    pub fn column(self, name: impl Into<String>, logical_type: LogicalType) -> ColumnBuilder {
        ColumnBuilder {
            table: self,
            column: ColumnInfo::new(name.into(), logical_type),
        }
    }

    /// Name the column used by the correlation-token key plan.
    #[must_use]
    pub fn correlation_column(mut self, name: impl Into<String>) -> Self {
        self.correlation_column = Some(name.into());
        self
    }

    /// Validate and produce the table metadata.
    ///
    /// # Errors
    ///
    /// Every registration rule violation surfaces as
    /// [`Error::InvalidConfiguration`]: missing table annotation, no
    /// columns, `Id` marked as primary key, more than one `Id` or
    /// `Version`, no key at all, duplicate names (case-insensitive),
    /// duplicate explicit ordinals, or non-contiguous key orders.
    pub fn build(self) -> Result<TableInfo> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfiguration("table annotation is missing".into()))?;
        if self.columns.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "no columns found on table {name:?}"
            )));
        }

        let mut columns = self.columns;

        // Case-insensitive name uniqueness.
        let mut seen = std::collections::HashSet::new();
        for c in &columns {
            if !seen.insert(c.name.to_ascii_lowercase()) {
                return Err(Error::InvalidConfiguration(format!(
                    "duplicate column name {:?} on table {name:?}",
                    c.name
                )));
            }
        }

        // Id / primary-key shape.
        let id_count = columns.iter().filter(|c| c.is_id).count();
        if id_count > 1 {
            return Err(Error::InvalidConfiguration(format!(
                "too many columns: {id_count} row-id columns on table {name:?}"
            )));
        }
        if let Some(bad) = columns.iter().find(|c| c.is_id && c.pk_order.is_some()) {
            return Err(Error::InvalidConfiguration(format!(
                "primary key on row-id column {:?}",
                bad.name
            )));
        }
        let version_count = columns.iter().filter(|c| c.is_version).count();
        if version_count > 1 {
            return Err(Error::InvalidConfiguration(format!(
                "too many columns: {version_count} version columns on table {name:?}"
            )));
        }

        // Primary-key orders must be >= 1 and contiguous.
        let mut pk: Vec<(u32, usize)> = columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.pk_order.map(|o| (o, i)))
            .collect();
        pk.sort_unstable();
        for (expected, (order, idx)) in pk.iter().enumerate() {
            if *order == 0 {
                return Err(Error::InvalidConfiguration(format!(
                    "primary-key order must be at least 1 on column {:?}",
                    columns[*idx].name
                )));
            }
            if *order != (expected as u32) + 1 {
                return Err(Error::InvalidConfiguration(format!(
                    "primary-key orders are not contiguous on table {name:?}"
                )));
            }
        }

        if id_count == 0 && pk.is_empty() {
            return Err(Error::InvalidConfiguration(format!(
                "table {name:?} has no key: an Id or PrimaryKey column is required"
            )));
        }

        // Explicit ordinals win; zeros are auto-assigned after them.
        let mut used = std::collections::HashSet::new();
        for c in &columns {
            if c.ordinal != 0 && !used.insert(c.ordinal) {
                return Err(Error::InvalidConfiguration(format!(
                    "duplicate explicit ordinal {} on table {name:?}",
                    c.ordinal
                )));
            }
        }
        let mut next = 1u32;
        for c in &mut columns {
            if c.ordinal == 0 {
                while used.contains(&next) {
                    next += 1;
                }
                c.ordinal = next;
                used.insert(next);
            }
        }
        columns.sort_by_key(|c| c.ordinal);

        let id = columns.iter().position(|c| c.is_id);
        let version = columns.iter().position(|c| c.is_version);
        let mut primary_keys: Vec<(u32, usize)> = columns
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.pk_order.map(|o| (o, i)))
            .collect();
        primary_keys.sort_unstable();
        let has_audit_columns = columns.iter().any(|c| c.audit_role.is_some());

        Ok(TableInfo {
            name,
            id,
            version,
            primary_keys: primary_keys.into_iter().map(|(_, i)| i).collect(),
            has_audit_columns,
            correlation_column: self.correlation_column,
            columns,
        })
    }
}

impl ColumnBuilder {
    /// Set an explicit ordinal (non-zero). Zero means auto-assign.
    #[must_use]
    pub fn ordinal(mut self, ordinal: u32) -> Self {
        self.column.ordinal = ordinal;
        self
    }

    /// Mark nullable.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.column.nullable = true;
        self
    }

    /// Exclude from INSERT.
    #[must_use]
    pub fn non_insertable(mut self) -> Self {
        self.column.insertable = false;
        self
    }

    /// Exclude from UPDATE.
    #[must_use]
    pub fn non_updatable(mut self) -> Self {
        self.column.updatable = false;
        self
    }

    /// Mark as the surrogate row id (database-generated).
    #[must_use]
    pub fn id(mut self) -> Self {
        self.column.is_id = true;
        self.column.updatable = false;
        self
    }

    /// Mark as a caller-writable surrogate id.
    #[must_use]
    pub fn writable_id(mut self) -> Self {
        self.column.is_id = true;
        self.column.id_writable = true;
        self.column.updatable = false;
        self
    }

    /// Mark as primary-key member with an explicit order (1-based).
    #[must_use]
    pub fn primary_key(mut self, order: u32) -> Self {
        self.column.pk_order = Some(order);
        self
    }

    /// Mark as the optimistic-concurrency version column.
    #[must_use]
    pub fn version(mut self) -> Self {
        self.column.is_version = true;
        self
    }

    /// Attach an enum mapping.
    #[must_use]
    pub fn enum_column(mut self, mapping: EnumMapping) -> Self {
        self.column.enum_mapping = Some(mapping);
        self
    }

    /// Mark as a JSON column.
    #[must_use]
    pub fn json(mut self) -> Self {
        self.column.is_json = true;
        self
    }

    /// Attach an audit role.
    #[must_use]
    pub fn audit(mut self, role: AuditRole) -> Self {
        self.column.audit_role = Some(role);
        self
    }

    /// Finish the column and return to the table builder.
    #[must_use]
    pub fn done(mut self) -> TableInfoBuilder {
        self.table.columns.push(self.column);
        self.table
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user_table() -> TableInfoBuilder {
        TableInfoBuilder::table("users")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("name", LogicalType::Text)
            .done()
            .column("version", LogicalType::Int32)
            .version()
            .done()
    }

    #[test]
    fn test_valid_table_builds() {
        let info = user_table().build().unwrap();
        assert_eq!(info.name, "users");
        assert_eq!(info.columns.len(), 3);
        assert!(info.id_column().is_some());
        assert!(info.version_column().is_some());
        assert!(!info.has_audit_columns);
    }

    #[test]
    fn test_missing_table_annotation() {
        let err = TableInfoBuilder::unnamed()
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("table annotation"));
    }

    #[test]
    fn test_no_columns() {
        let err = TableInfoBuilder::table("empty").build().unwrap_err();
        assert!(err.to_string().contains("no columns found"));
    }

    #[test]
    fn test_primary_key_on_id_rejected() {
        let err = TableInfoBuilder::table("t")
            .column("id", LogicalType::Int64)
            .id()
            .primary_key(1)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("primary key on row-id column"));
    }

    #[test]
    fn test_too_many_ids() {
        let err = TableInfoBuilder::table("t")
            .column("a", LogicalType::Int64)
            .id()
            .done()
            .column("b", LogicalType::Int64)
            .id()
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("too many columns"));
    }

    #[test]
    fn test_too_many_versions() {
        let err = TableInfoBuilder::table("t")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("v1", LogicalType::Int32)
            .version()
            .done()
            .column("v2", LogicalType::Int32)
            .version()
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("too many columns"));
    }

    #[test]
    fn test_key_required() {
        let err = TableInfoBuilder::table("t")
            .column("name", LogicalType::Text)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("no key"));
    }

    #[test]
    fn test_duplicate_names_case_insensitive() {
        let err = TableInfoBuilder::table("t")
            .column("Name", LogicalType::Text)
            .primary_key(1)
            .done()
            .column("name", LogicalType::Text)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate column name"));
    }

    #[test]
    fn test_composite_key_orders_contiguous() {
        let err = TableInfoBuilder::table("t")
            .column("a", LogicalType::Int32)
            .primary_key(1)
            .done()
            .column("b", LogicalType::Int32)
            .primary_key(3)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not contiguous"));
    }

    #[test]
    fn test_zero_key_order_rejected() {
        let err = TableInfoBuilder::table("t")
            .column("a", LogicalType::Int32)
            .primary_key(0)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_composite_key_ordering() {
        let info = TableInfoBuilder::table("t")
            .column("b", LogicalType::Int32)
            .primary_key(2)
            .done()
            .column("a", LogicalType::Int32)
            .primary_key(1)
            .done()
            .build()
            .unwrap();
        let keys: Vec<&str> = info.key_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn test_explicit_ordinals_win() {
        let info = TableInfoBuilder::table("t")
            .column("late", LogicalType::Text)
            .ordinal(2)
            .done()
            .column("early", LogicalType::Int64)
            .id()
            .ordinal(1)
            .done()
            .column("auto", LogicalType::Text)
            .done()
            .build()
            .unwrap();
        let names: Vec<&str> = info.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["early", "late", "auto"]);
        assert_eq!(info.columns[2].ordinal, 3);
    }

    #[test]
    fn test_duplicate_explicit_ordinals_rejected() {
        let err = TableInfoBuilder::table("t")
            .column("a", LogicalType::Int64)
            .id()
            .ordinal(1)
            .done()
            .column("b", LogicalType::Text)
            .ordinal(1)
            .done()
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate explicit ordinal"));
    }

    #[test]
    fn test_audit_derivation() {
        let info = TableInfoBuilder::table("t")
            .column("id", LogicalType::Int64)
            .id()
            .done()
            .column("created_by", LogicalType::Text)
            .audit(AuditRole::CreatedBy)
            .done()
            .build()
            .unwrap();
        assert!(info.has_audit_columns);
    }
}

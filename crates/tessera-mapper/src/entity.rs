//! The entity trait: associates a record shape with its table metadata
//! and exposes field access by column name.

use tessera_types::DbValue;

use crate::table::TableInfoBuilder;

/// A record shape mapped to a table.
///
/// Implementations describe their shape with a [`TableInfoBuilder`] (the
/// registration rules are enforced when the mapper builds it) and expose
/// their fields by column name. Column names passed to [`Entity::get`]
/// and [`Entity::set`] are always the declared spellings.
///
/// # Example
///
/// ```rust,ignore
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for User {
///     fn table() -> TableInfoBuilder {
///         TableInfoBuilder::table("users")
///             .column("id", LogicalType::Int64).id().done()
///             .column("name", LogicalType::Text).done()
///     }
///
///     fn get(&self, column: &str) -> DbValue {
///         match column {
///             "id" => self.id.into(),
///             "name" => self.name.clone().into(),
///             _ => DbValue::Null,
///         }
///     }
///
///     fn set(&mut self, column: &str, value: DbValue) {
///         match (column, value) {
///             ("id", DbValue::Int64(v)) => self.id = v,
///             ("name", DbValue::Text(v)) => self.name = v,
///             _ => {}
///         }
///     }
/// }
/// ```
pub trait Entity: Send {
    /// The table shape. Validation happens when the mapper registers it.
    fn table() -> TableInfoBuilder
    where
        Self: Sized;

    /// Read a field by column name. Unknown columns read as NULL.
    fn get(&self, column: &str) -> DbValue;

    /// Write a field by column name. Unknown columns are ignored.
    fn set(&mut self, column: &str, value: DbValue);
}

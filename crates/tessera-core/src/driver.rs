//! The driver abstraction: the narrow seam physical database drivers
//! implement.
//!
//! The core never links a driver library. It talks to connections through
//! these object-safe traits; `tessera-testing` provides an in-memory
//! implementation and production drivers adapt their native clients.

use async_trait::async_trait;
use tessera_types::{DbValue, Parameter};
use thiserror::Error;

/// Failure surfaced by a driver implementation.
#[derive(Debug, Error, Clone)]
#[error("driver error{}: {message}", code.as_deref().map(|c| format!(" {c}")).unwrap_or_default())]
pub struct DriverError {
    /// Provider-specific error code, when one exists.
    pub code: Option<String>,
    /// Driver message.
    pub message: String,
}

impl DriverError {
    /// Build a driver error from a message alone.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Build a driver error with a provider code.
    #[must_use]
    pub fn coded(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl From<DriverError> for crate::error::Error {
    fn from(e: DriverError) -> Self {
        crate::error::Error::ConnectionFailure {
            code: e.code,
            message: e.message,
        }
    }
}

/// Whether command text is a raw batch or a stored-procedure name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommandKind {
    /// Raw SQL text.
    #[default]
    Text,
    /// A stored procedure addressed by name.
    StoredProcedure,
}

/// A fully materialised, driver-ready command.
#[derive(Debug, Clone, Default)]
pub struct DriverCommand {
    /// Command text (SQL batch or procedure name).
    pub text: String,
    /// Text vs stored procedure.
    pub kind: CommandKind,
    /// Bound parameters, in insertion order.
    pub parameters: Vec<Parameter>,
}

/// A materialised result set.
///
/// Rows are pulled eagerly by the executing container so the borrowed
/// connection can be released deterministically before the caller starts
/// consuming rows.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Column names, in select order.
    pub columns: Vec<String>,
    /// Row data; each row matches `columns` positionally.
    pub rows: Vec<Vec<DbValue>>,
}

impl RowSet {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by case-insensitive name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// A single cell, by row index and case-insensitive column name.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&DbValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }
}

/// One physical connection as the driver exposes it.
///
/// Implementations are internally synchronised: the mode strategies hand
/// shared handles to persistent connections across operations.
#[async_trait]
pub trait DriverConnection: Send + Sync {
    /// Execute a statement, returning the affected-row count.
    async fn execute(&self, command: &DriverCommand) -> Result<u64, DriverError>;

    /// Execute a query, materialising the full result set.
    async fn query(&self, command: &DriverCommand) -> Result<RowSet, DriverError>;

    /// Execute a query and return the first cell of the first row, or
    /// `None` for an empty result.
    async fn scalar(&self, command: &DriverCommand) -> Result<Option<DbValue>, DriverError> {
        let rows = self.query(command).await?;
        Ok(rows.rows.first().and_then(|r| r.first().cloned()))
    }

    /// Close the connection. Idempotent.
    async fn close(&self) -> Result<(), DriverError>;

    /// Whether the connection is currently open.
    fn is_open(&self) -> bool;
}

/// Opens physical connections for one provider.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Open a connection for the given connection string.
    async fn open(&self, connection_string: &str) -> Result<Box<dyn DriverConnection>, DriverError>;

    /// The invariant provider name this factory serves (used to resolve
    /// the dialect).
    fn provider_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_rendering() {
        assert_eq!(
            DriverError::coded("23505", "duplicate key").to_string(),
            "driver error 23505: duplicate key"
        );
        assert_eq!(
            DriverError::message("boom").to_string(),
            "driver error: boom"
        );
    }

    #[test]
    fn test_rowset_lookup() {
        let rows = RowSet {
            columns: vec!["Id".into(), "Name".into()],
            rows: vec![vec![DbValue::Int32(1), DbValue::from("a")]],
        };
        assert_eq!(rows.column_index("id"), Some(0));
        assert_eq!(rows.cell(0, "NAME"), Some(&DbValue::from("a")));
        assert_eq!(rows.cell(1, "Name"), None);
        assert_eq!(rows.cell(0, "missing"), None);
    }
}

//! One module per supported provider family.

mod cockroach;
mod duckdb;
mod firebird;
mod mariadb;
mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;
mod unknown;

use std::sync::Arc;

use tessera_types::SupportedDatabase;

use crate::dialect::Dialect;

pub use cockroach::CockroachDialect;
pub use duckdb::DuckDbDialect;
pub use firebird::FirebirdDialect;
pub use mariadb::MariaDbDialect;
pub use mysql::MySqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;
pub use unknown::UnknownDialect;

/// Build the dialect for a provider.
#[must_use]
pub fn create_dialect(database: SupportedDatabase) -> Arc<dyn Dialect> {
    match database {
        SupportedDatabase::PostgreSql => Arc::new(PostgresDialect),
        SupportedDatabase::CockroachDb => Arc::new(CockroachDialect),
        SupportedDatabase::MySql => Arc::new(MySqlDialect),
        SupportedDatabase::MariaDb => Arc::new(MariaDbDialect),
        SupportedDatabase::SqlServer => Arc::new(SqlServerDialect),
        SupportedDatabase::Oracle => Arc::new(OracleDialect),
        SupportedDatabase::Sqlite => Arc::new(SqliteDialect),
        SupportedDatabase::Firebird => Arc::new(FirebirdDialect),
        SupportedDatabase::DuckDb => Arc::new(DuckDbDialect),
        // SupportedDatabase is non_exhaustive; new providers start as the
        // fallback until a dialect lands.
        _ => Arc::new(UnknownDialect),
    }
}

//! Supported database providers.

use core::fmt;

/// The database families tessera knows how to talk to.
///
/// `Unknown` is the SQL-92 fallback used when the live product cannot be
/// identified; behaviours beyond SQL-92 are unsupported there and fail
/// gracefully rather than emitting speculative SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum SupportedDatabase {
    /// Unidentified product; conservative SQL-92 behaviour.
    #[default]
    Unknown,
    /// PostgreSQL.
    PostgreSql,
    /// CockroachDB (PostgreSQL wire family).
    CockroachDb,
    /// MySQL.
    MySql,
    /// MariaDB (MySQL family, distinct versioning).
    MariaDb,
    /// Microsoft SQL Server.
    SqlServer,
    /// Oracle Database.
    Oracle,
    /// SQLite.
    Sqlite,
    /// Firebird.
    Firebird,
    /// DuckDB.
    DuckDb,
}

impl SupportedDatabase {
    /// All known providers, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Unknown,
        Self::PostgreSql,
        Self::CockroachDb,
        Self::MySql,
        Self::MariaDb,
        Self::SqlServer,
        Self::Oracle,
        Self::Sqlite,
        Self::Firebird,
        Self::DuckDb,
    ];

    /// Resolve a provider from an invariant registration name.
    ///
    /// Matching is case-insensitive and accepts the common driver aliases
    /// (`postgres`, `npgsql`, `mariadb`, `mssql`, ...). Unrecognised names
    /// resolve to [`SupportedDatabase::Unknown`].
    #[must_use]
    pub fn from_provider_name(name: &str) -> Self {
        let lowered = name.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "postgresql" | "postgres" | "npgsql" | "pgsql" => Self::PostgreSql,
            "cockroachdb" | "cockroach" | "crdb" => Self::CockroachDb,
            "mysql" => Self::MySql,
            "mariadb" => Self::MariaDb,
            "sqlserver" | "mssql" | "system.data.sqlclient" | "microsoft.data.sqlclient" => {
                Self::SqlServer
            }
            "oracle" | "oracle.manageddataaccess.client" => Self::Oracle,
            "sqlite" | "sqlite3" | "microsoft.data.sqlite" => Self::Sqlite,
            "firebird" | "firebirdsql" | "fbclient" => Self::Firebird,
            "duckdb" => Self::DuckDb,
            _ => Self::Unknown,
        }
    }

    /// Whether this provider belongs to the PostgreSQL wire family.
    #[must_use]
    pub fn is_postgres_family(self) -> bool {
        matches!(self, Self::PostgreSql | Self::CockroachDb)
    }

    /// Whether this provider belongs to the MySQL family.
    #[must_use]
    pub fn is_mysql_family(self) -> bool {
        matches!(self, Self::MySql | Self::MariaDb)
    }

    /// Canonical display name of the provider.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::PostgreSql => "PostgreSQL",
            Self::CockroachDb => "CockroachDB",
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::SqlServer => "SQL Server",
            Self::Oracle => "Oracle",
            Self::Sqlite => "SQLite",
            Self::Firebird => "Firebird",
            Self::DuckDb => "DuckDB",
        }
    }
}

impl fmt::Display for SupportedDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

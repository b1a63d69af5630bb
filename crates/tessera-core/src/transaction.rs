//! Transaction contexts.
//!
//! A transaction borrows a connection from its context and must reach a
//! terminal state (committed or rolled back) exactly once. Dropping an
//! un-terminated transaction records a rollback and issues a best-effort
//! rollback statement when a runtime is available.

use std::sync::Arc;

use parking_lot::Mutex;
use tessera_types::SupportedDatabase;
use tokio_util::sync::CancellationToken;

use crate::container::SqlContainer;
use crate::context::DatabaseContext;
use crate::driver::DriverCommand;
use crate::error::{Error, Result};
use crate::mode::ExecutionType;
use crate::tracked::TrackedConnection;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed data is visible (the common default).
    #[default]
    ReadCommitted,
    /// Rows read stay stable for the transaction.
    RepeatableRead,
    /// Full isolation.
    Serializable,
    /// Row-versioned point-in-time view (SQL Server).
    Snapshot,
}

impl IsolationLevel {
    /// The level name as rendered in SQL.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
            Self::Snapshot => "SNAPSHOT",
        }
    }
}

/// Caller-facing isolation intents, mapped to the closest level each
/// dialect supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationProfile {
    /// Consistent reads without blocking writers.
    #[default]
    SafeNonBlockingReads,
    /// Full serialisable consistency.
    StrictConsistency,
    /// Fastest available semantics, accepting read anomalies.
    FastWithRisks,
}

impl IsolationProfile {
    /// Resolve the profile against a provider. Unsupported levels map to
    /// the nearest supported neighbour.
    #[must_use]
    pub fn resolve(self, database: SupportedDatabase) -> IsolationLevel {
        match self {
            Self::SafeNonBlockingReads => match database {
                SupportedDatabase::SqlServer => IsolationLevel::Snapshot,
                // MVCC engines give non-blocking reads at READ COMMITTED.
                _ => IsolationLevel::ReadCommitted,
            },
            Self::StrictConsistency => IsolationLevel::Serializable,
            Self::FastWithRisks => match database {
                SupportedDatabase::SqlServer
                | SupportedDatabase::MySql
                | SupportedDatabase::MariaDb => IsolationLevel::ReadUncommitted,
                // PostgreSQL treats READ UNCOMMITTED as READ COMMITTED;
                // emit the level it actually honours.
                _ => IsolationLevel::ReadCommitted,
            },
        }
    }
}

#[derive(Debug, Default)]
struct TxState {
    committed: bool,
    rolled_back: bool,
    rollback_on_dispose: bool,
}

/// A borrowed transaction. Single-thread-affine; completion flags are
/// observed after the owning task reaches a terminal operation.
pub struct TransactionContext {
    context: Arc<DatabaseContext>,
    connection: Arc<TrackedConnection>,
    read_only: bool,
    isolation: IsolationLevel,
    state: Mutex<TxState>,
}

impl DatabaseContext {
    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// A read-only context rejects `read_only = false` before any
    /// connection work; a second concurrent transaction on one context
    /// fails as [`Error::InvalidState`].
    pub async fn begin_transaction(
        self: &Arc<Self>,
        profile: IsolationProfile,
        read_only: bool,
        cancel: &CancellationToken,
    ) -> Result<TransactionContext> {
        self.ensure_live()?;
        if self.is_read_only() && !read_only {
            return Err(Error::UnsupportedOperation(
                "read-write transaction on a read-only context".into(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if !self.try_enter_transaction() {
            return Err(Error::InvalidState(
                "a transaction is already active on this context".into(),
            ));
        }
        let exec_type = if read_only {
            ExecutionType::Read
        } else {
            ExecutionType::Write
        };
        let connection = match self.strategy().get_connection(exec_type).await {
            Ok(conn) => conn,
            Err(e) => {
                self.exit_transaction();
                return Err(e);
            }
        };
        let isolation = profile.resolve(self.database());
        let tx = TransactionContext {
            context: Arc::clone(self),
            connection,
            read_only,
            isolation,
            state: Mutex::new(TxState::default()),
        };
        if let Err(e) = tx.execute_batch(&begin_sql(self.database(), isolation, read_only)).await {
            self.strategy().release(Some(Arc::clone(&tx.connection))).await;
            self.exit_transaction();
            // Drop without the rollback warning; nothing ever began.
            tx.state.lock().rolled_back = true;
            return Err(e);
        }
        tracing::debug!(isolation = isolation.name(), read_only, "transaction begun");
        Ok(tx)
    }
}

impl TransactionContext {
    /// The resolved isolation level.
    #[must_use]
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    /// Whether this transaction was opened read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Whether `commit` completed.
    #[must_use]
    pub fn was_committed(&self) -> bool {
        self.state.lock().committed
    }

    /// Whether the transaction rolled back (explicitly or on drop).
    #[must_use]
    pub fn was_rolled_back(&self) -> bool {
        self.state.lock().rolled_back
    }

    /// Whether a terminal state was reached.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        let state = self.state.lock();
        state.committed || state.rolled_back
    }

    /// Mark the transaction for rollback on disposal without rolling back
    /// now, so the caller can still inspect state after a failure.
    pub fn mark_rollback_on_dispose(&self) {
        self.state.lock().rollback_on_dispose = true;
    }

    /// Whether a failure marked this transaction for disposal rollback.
    #[must_use]
    pub fn is_rollback_pending(&self) -> bool {
        self.state.lock().rollback_on_dispose
    }

    /// A container bound to this transaction's connection.
    #[must_use]
    pub fn container(&self) -> SqlContainer {
        SqlContainer::bound_to(Arc::clone(&self.context), Arc::clone(&self.connection))
    }

    async fn execute_batch(&self, batch: &str) -> Result<()> {
        for statement in batch.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let command = DriverCommand {
                text: statement.to_owned(),
                ..DriverCommand::default()
            };
            self.connection.execute(&command).await?;
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        let state = self.state.lock();
        if state.committed {
            Err(Error::InvalidState("transaction already committed".into()))
        } else if state.rolled_back {
            Err(Error::InvalidState("transaction already rolled back".into()))
        } else {
            Ok(())
        }
    }

    /// Commit.
    ///
    /// # Errors
    ///
    /// A second terminal operation fails as [`Error::InvalidState`].
    pub async fn commit(&self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.execute_batch("COMMIT").await?;
        self.state.lock().committed = true;
        self.finish().await;
        Ok(())
    }

    /// Roll back.
    ///
    /// # Errors
    ///
    /// A second terminal operation fails as [`Error::InvalidState`].
    pub async fn rollback(&self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_open()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.execute_batch("ROLLBACK").await?;
        self.state.lock().rolled_back = true;
        self.finish().await;
        Ok(())
    }

    /// Best-effort switch of the open transaction to read-only. Dialects
    /// that cannot change read-only state mid-transaction report `false`;
    /// failures are swallowed.
    pub async fn try_enter_read_only_transaction(&self) -> bool {
        if self.ensure_open().is_err() {
            return false;
        }
        let statement = match self.context.database() {
            SupportedDatabase::PostgreSql
            | SupportedDatabase::CockroachDb
            | SupportedDatabase::MySql
            | SupportedDatabase::MariaDb => "SET TRANSACTION READ ONLY",
            _ => return false,
        };
        match self.execute_batch(statement).await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "read-only switch failed, continuing read-write");
                false
            }
        }
    }

    async fn finish(&self) {
        self.context
            .strategy()
            .release(Some(Arc::clone(&self.connection)))
            .await;
        self.context.exit_transaction();
    }
}

impl Drop for TransactionContext {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        if state.committed || state.rolled_back {
            return;
        }
        state.rolled_back = true;
        drop(state);
        tracing::warn!("transaction dropped without terminal state, rolling back");
        self.context.exit_transaction();
        let connection = Arc::clone(&self.connection);
        let persistent = connection.is_persistent();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                let command = DriverCommand {
                    text: "ROLLBACK".to_owned(),
                    ..DriverCommand::default()
                };
                if let Err(e) = connection.execute(&command).await {
                    tracing::warn!(error = %e, "disposal rollback failed");
                }
                if persistent {
                    connection.unlatch();
                } else {
                    let _ = connection.close().await;
                }
            });
        }
    }
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TransactionContext")
            .field("isolation", &self.isolation)
            .field("read_only", &self.read_only)
            .field("committed", &state.committed)
            .field("rolled_back", &state.rolled_back)
            .finish()
    }
}

/// Render the dialect's transaction-begin batch.
fn begin_sql(database: SupportedDatabase, isolation: IsolationLevel, read_only: bool) -> String {
    match database {
        SupportedDatabase::SqlServer => format!(
            "SET TRANSACTION ISOLATION LEVEL {};\nBEGIN TRANSACTION",
            isolation.name()
        ),
        SupportedDatabase::MySql | SupportedDatabase::MariaDb => {
            let start = if read_only {
                "START TRANSACTION READ ONLY"
            } else {
                "START TRANSACTION"
            };
            format!(
                "SET TRANSACTION ISOLATION LEVEL {};\n{start}",
                isolation.name()
            )
        }
        SupportedDatabase::PostgreSql
        | SupportedDatabase::CockroachDb
        | SupportedDatabase::DuckDb => {
            let mut sql = format!("BEGIN ISOLATION LEVEL {}", isolation.name());
            if read_only {
                sql.push_str(" READ ONLY");
            }
            sql
        }
        SupportedDatabase::Oracle => {
            if read_only {
                "SET TRANSACTION READ ONLY".to_owned()
            } else {
                format!("SET TRANSACTION ISOLATION LEVEL {}", isolation.name())
            }
        }
        SupportedDatabase::Firebird => "SET TRANSACTION".to_owned(),
        _ => "BEGIN".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_resolution() {
        assert_eq!(
            IsolationProfile::SafeNonBlockingReads.resolve(SupportedDatabase::SqlServer),
            IsolationLevel::Snapshot
        );
        assert_eq!(
            IsolationProfile::SafeNonBlockingReads.resolve(SupportedDatabase::PostgreSql),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            IsolationProfile::StrictConsistency.resolve(SupportedDatabase::Sqlite),
            IsolationLevel::Serializable
        );
        // PostgreSQL has no real READ UNCOMMITTED; nearest neighbour.
        assert_eq!(
            IsolationProfile::FastWithRisks.resolve(SupportedDatabase::PostgreSql),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            IsolationProfile::FastWithRisks.resolve(SupportedDatabase::MySql),
            IsolationLevel::ReadUncommitted
        );
    }

    #[test]
    fn test_begin_sql_per_family() {
        assert!(begin_sql(SupportedDatabase::SqlServer, IsolationLevel::Snapshot, false)
            .contains("BEGIN TRANSACTION"));
        assert_eq!(
            begin_sql(SupportedDatabase::PostgreSql, IsolationLevel::Serializable, true),
            "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY"
        );
        assert!(begin_sql(SupportedDatabase::MySql, IsolationLevel::ReadCommitted, true)
            .contains("START TRANSACTION READ ONLY"));
        assert_eq!(
            begin_sql(SupportedDatabase::Oracle, IsolationLevel::ReadCommitted, true),
            "SET TRANSACTION READ ONLY"
        );
        assert_eq!(
            begin_sql(SupportedDatabase::Unknown, IsolationLevel::ReadCommitted, false),
            "BEGIN"
        );
    }
}

//! Tracked connections: driver connections plus lifecycle bookkeeping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tessera_dialect::DialectEngine;
use tessera_types::DbValue;

use crate::driver::{DriverCommand, DriverConnection, DriverError, RowSet};
use crate::error::Result;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A driver connection wrapped with the bookkeeping the mode strategies
/// need: whether session settings were applied, whether the connection is
/// persistent (pinned by its strategy), and an in-use latch for pinned
/// connections shared across operations.
pub struct TrackedConnection {
    inner: Box<dyn DriverConnection>,
    id: u64,
    persistent: bool,
    settings_applied: AtomicBool,
    in_use: AtomicBool,
    opened_at: Instant,
}

impl TrackedConnection {
    /// Wrap a freshly opened driver connection.
    #[must_use]
    pub fn new(inner: Box<dyn DriverConnection>, persistent: bool) -> Self {
        Self {
            inner,
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            persistent,
            settings_applied: AtomicBool::new(false),
            in_use: AtomicBool::new(false),
            opened_at: Instant::now(),
        }
    }

    /// Unique id for logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether this connection is pinned by its mode strategy.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether session settings ran on this physical connection.
    ///
    /// Operational connections always carry the settings; the bootstrap
    /// connection used for product detection legitimately may not.
    #[must_use]
    pub fn settings_applied(&self) -> bool {
        self.settings_applied.load(Ordering::Acquire)
    }

    /// Age of the physical connection.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        self.opened_at.elapsed()
    }

    /// Try to latch the connection for one operation. Returns `false`
    /// when another operation holds it.
    pub(crate) fn try_latch(&self) -> bool {
        self.in_use
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the operation latch.
    pub(crate) fn unlatch(&self) {
        self.in_use.store(false, Ordering::Release);
    }

    /// Apply the dialect's session settings exactly once per physical
    /// connection. Empty batches no-op cleanly, which also covers
    /// connections from foreign factories that understand no settings.
    pub async fn apply_session_settings(
        &self,
        dialect: &DialectEngine,
        read_only: bool,
    ) -> Result<()> {
        if self.settings_applied.load(Ordering::Acquire) {
            return Ok(());
        }
        let batch = dialect.get_connection_session_settings(read_only);
        for statement in batch.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let command = DriverCommand {
                text: statement.to_owned(),
                ..DriverCommand::default()
            };
            self.inner.execute(&command).await?;
        }
        self.settings_applied.store(true, Ordering::Release);
        tracing::trace!(connection = self.id, read_only, "session settings applied");
        Ok(())
    }

    /// Execute a statement, returning affected rows.
    pub async fn execute(&self, command: &DriverCommand) -> std::result::Result<u64, DriverError> {
        self.inner.execute(command).await
    }

    /// Execute a query, materialising the result set.
    pub async fn query(&self, command: &DriverCommand) -> std::result::Result<RowSet, DriverError> {
        self.inner.query(command).await
    }

    /// Execute a query for a single scalar.
    pub async fn scalar(
        &self,
        command: &DriverCommand,
    ) -> std::result::Result<Option<DbValue>, DriverError> {
        self.inner.scalar(command).await
    }

    /// Close the underlying connection.
    pub async fn close(&self) -> std::result::Result<(), DriverError> {
        self.inner.close().await
    }

    /// Whether the underlying connection is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

impl std::fmt::Debug for TrackedConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackedConnection")
            .field("id", &self.id)
            .field("persistent", &self.persistent)
            .field("settings_applied", &self.settings_applied())
            .finish()
    }
}

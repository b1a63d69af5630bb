//! Connection modes: the rules governing physical-connection lifecycle
//! within a context.

use std::sync::Arc;

use tessera_dialect::DialectEngine;
use tokio::sync::Mutex;

use crate::driver::ConnectionFactory;
use crate::error::{Error, Result};
use crate::tracked::TrackedConnection;

/// The connection-lifecycle mode of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbMode {
    /// Open a fresh connection per operation; close on release.
    #[default]
    Standard,
    /// Keep one pinned connection warm for the context's lifetime;
    /// traffic borrows it when idle and falls back to fresh connections.
    KeepAlive,
    /// Pin one writer connection; reads borrow fresh connections.
    SingleWriter,
    /// Exactly one connection serves all traffic. Not combinable with a
    /// read-only context.
    SingleConnection,
}

/// Read intent of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadWriteMode {
    /// Reads and writes allowed.
    #[default]
    ReadWrite,
    /// Reads only; write assertions fail.
    ReadOnly,
}

impl ReadWriteMode {
    /// Whether this context may issue writes.
    #[must_use]
    pub fn allows_writes(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

/// Classification of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionType {
    /// The operation only reads.
    Read,
    /// The operation may write.
    Write,
}

/// The mode strategy: supplies tracked connections per operation and owns
/// any pinned connection for the context's lifetime.
///
/// Session settings are applied before a connection is handed out, so
/// every operational connection carries them exactly once. The bootstrap
/// connection used for product detection bypasses this path.
pub struct ModeStrategy {
    mode: DbMode,
    read_write: ReadWriteMode,
    factory: Arc<dyn ConnectionFactory>,
    connection_string: String,
    dialect: Arc<DialectEngine>,
    pinned: Mutex<Option<Arc<TrackedConnection>>>,
}

impl ModeStrategy {
    /// Build a strategy, validating the mode / read-intent combination.
    ///
    /// # Errors
    ///
    /// `SingleConnection` with a read-only context fails here: the single
    /// pinned connection cannot also be a write sink.
    pub fn new(
        mode: DbMode,
        read_write: ReadWriteMode,
        factory: Arc<dyn ConnectionFactory>,
        connection_string: String,
        dialect: Arc<DialectEngine>,
    ) -> Result<Self> {
        if mode == DbMode::SingleConnection && read_write == ReadWriteMode::ReadOnly {
            return Err(Error::UnsupportedOperation(
                "SingleConnection mode cannot serve a read-only context".into(),
            ));
        }
        Ok(Self {
            mode,
            read_write,
            factory,
            connection_string,
            dialect,
            pinned: Mutex::new(None),
        })
    }

    /// The configured mode.
    #[must_use]
    pub fn mode(&self) -> DbMode {
        self.mode
    }

    /// The configured read intent.
    #[must_use]
    pub fn read_write_mode(&self) -> ReadWriteMode {
        self.read_write
    }

    /// Assert the context may issue writes.
    ///
    /// # Errors
    ///
    /// Fails on read-only contexts.
    pub fn assert_is_write_connection(&self) -> Result<()> {
        if self.read_write.allows_writes() {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(
                "write operation on a read-only context".into(),
            ))
        }
    }

    /// Assert the context may issue reads. Always satisfiable today; kept
    /// as the symmetric guard for future write-only contexts.
    pub fn assert_is_read_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn open_fresh(&self, persistent: bool) -> Result<Arc<TrackedConnection>> {
        let raw = self.factory.open(&self.connection_string).await?;
        let tracked = Arc::new(TrackedConnection::new(raw, persistent));
        let read_only = self.read_write == ReadWriteMode::ReadOnly;
        tracked
            .apply_session_settings(&self.dialect, read_only)
            .await?;
        tracing::debug!(
            connection = tracked.id(),
            persistent,
            mode = ?self.mode,
            "connection opened"
        );
        Ok(tracked)
    }

    async fn pinned_connection(&self) -> Result<Arc<TrackedConnection>> {
        let mut slot = self.pinned.lock().await;
        if let Some(existing) = slot.as_ref() {
            if existing.is_open() {
                return Ok(Arc::clone(existing));
            }
        }
        let fresh = self.open_fresh(true).await?;
        *slot = Some(Arc::clone(&fresh));
        Ok(fresh)
    }

    /// Supply a tracked connection for one operation.
    ///
    /// # Errors
    ///
    /// Propagates factory and session-setting failures, and write
    /// assertions on read-only contexts.
    pub async fn get_connection(
        &self,
        exec_type: ExecutionType,
    ) -> Result<Arc<TrackedConnection>> {
        if exec_type == ExecutionType::Write {
            self.assert_is_write_connection()?;
        } else {
            self.assert_is_read_connection()?;
        }
        match self.mode {
            DbMode::Standard => self.open_fresh(false).await,
            DbMode::KeepAlive => {
                let pinned = self.pinned_connection().await?;
                // The pinned connection serves either classification while
                // idle; busy traffic borrows a fresh connection.
                if pinned.try_latch() {
                    Ok(pinned)
                } else {
                    self.open_fresh(false).await
                }
            }
            DbMode::SingleWriter => match exec_type {
                ExecutionType::Write => {
                    let pinned = self.pinned_connection().await?;
                    pinned.try_latch();
                    Ok(pinned)
                }
                ExecutionType::Read => self.open_fresh(false).await,
            },
            DbMode::SingleConnection => {
                let pinned = self.pinned_connection().await?;
                pinned.try_latch();
                Ok(pinned)
            }
        }
    }

    /// Release a connection obtained from [`ModeStrategy::get_connection`].
    ///
    /// Non-persistent connections are closed and dropped; persistent
    /// connections are unlatched and stay warm. Releasing nothing is a
    /// no-op, as is handing the pinned connection back to itself.
    pub async fn release(&self, connection: Option<Arc<TrackedConnection>>) {
        let Some(connection) = connection else {
            return;
        };
        if connection.is_persistent() {
            connection.unlatch();
            return;
        }
        if let Err(e) = connection.close().await {
            tracing::warn!(connection = connection.id(), error = %e, "close failed on release");
        }
    }

    /// Close and drop any pinned connection. Called on context disposal.
    pub async fn dispose(&self) {
        let mut slot = self.pinned.lock().await;
        if let Some(pinned) = slot.take() {
            if let Err(e) = pinned.close().await {
                tracing::warn!(connection = pinned.id(), error = %e, "pinned close failed");
            }
        }
    }
}

impl std::fmt::Debug for ModeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeStrategy")
            .field("mode", &self.mode)
            .field("read_write", &self.read_write)
            .finish()
    }
}

//! Database contexts: one addressable unit tying a dialect, a mode
//! strategy, a connection factory, and the type registries together.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tessera_dialect::DialectEngine;
use tessera_types::{SupportedDatabase, TypeMappingRegistry};
use tokio_util::sync::CancellationToken;

use crate::connection_string::{
    APPLICATION_NAME_KEY, apply_default_application_name, strip_max_pool_size_if_unsupported,
};
use crate::driver::{ConnectionFactory, DriverCommand};
use crate::error::{Error, Result};
use crate::mode::{DbMode, ModeStrategy, ReadWriteMode};

/// The default application name stamped on connection strings that carry
/// none.
pub const DEFAULT_APPLICATION_NAME: &str = "tessera";

/// Configuration for one database context.
#[derive(Debug, Clone, Default)]
pub struct DatabaseContextConfiguration {
    /// Provider connection string (or raw file path / memory marker).
    pub connection_string: String,
    /// Invariant provider name; resolves the dialect.
    pub provider_name: String,
    /// Connection-lifecycle mode.
    pub db_mode: DbMode,
    /// Read intent.
    pub read_write_mode: ReadWriteMode,
    /// Optional admission-control ceiling on concurrent operations.
    /// `None` leaves the context ungoverned.
    pub max_concurrent_operations: Option<usize>,
    /// How long a governed operation may wait for admission.
    pub admission_timeout: Option<std::time::Duration>,
}

impl DatabaseContextConfiguration {
    /// Start from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection string.
    #[must_use]
    pub fn connection_string(mut self, value: impl Into<String>) -> Self {
        self.connection_string = value.into();
        self
    }

    /// Set the provider name.
    #[must_use]
    pub fn provider_name(mut self, value: impl Into<String>) -> Self {
        self.provider_name = value.into();
        self
    }

    /// Set the connection mode.
    #[must_use]
    pub fn db_mode(mut self, mode: DbMode) -> Self {
        self.db_mode = mode;
        self
    }

    /// Set the read intent.
    #[must_use]
    pub fn read_write_mode(mut self, mode: ReadWriteMode) -> Self {
        self.read_write_mode = mode;
        self
    }

    /// Cap concurrent operations through an admission governor.
    #[must_use]
    pub fn max_concurrent_operations(mut self, limit: usize) -> Self {
        self.max_concurrent_operations = Some(limit);
        self
    }

    /// Set the admission wait limit.
    #[must_use]
    pub fn admission_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.admission_timeout = Some(timeout);
        self
    }
}

/// Supplies ambient audit values (acting user, clock) for entity writes.
pub trait AuditValueResolver: Send + Sync {
    /// The acting user recorded in audit columns.
    fn current_user(&self) -> String;

    /// The timestamp recorded in audit columns.
    fn now(&self) -> chrono::NaiveDateTime {
        chrono::Utc::now().naive_utc()
    }
}

/// Default resolver: records the process identity as `system`.
pub struct SystemAuditResolver;

impl AuditValueResolver for SystemAuditResolver {
    fn current_user(&self) -> String {
        "system".to_owned()
    }
}

/// One database context: the addressable unit a tenant maps to.
///
/// Free-threaded: reads are lock-free and registration-style mutations are
/// internally synchronised. Containers and transactions borrow from the
/// context; persistent connections are owned by its mode strategy.
pub struct DatabaseContext {
    config: DatabaseContextConfiguration,
    database: SupportedDatabase,
    dialect: Arc<DialectEngine>,
    strategy: ModeStrategy,
    factory: Arc<dyn ConnectionFactory>,
    types: Arc<TypeMappingRegistry>,
    audit: Arc<dyn AuditValueResolver>,
    admission: Option<tessera_pool::PoolGovernor>,
    disposed: AtomicBool,
    active_transaction: AtomicBool,
}

impl DatabaseContext {
    /// Build a context from configuration.
    ///
    /// The connection string is normalised on the way in: a default
    /// application name is applied (existing names are preserved) and
    /// pooling keys are stripped for dialects without a pooling setting.
    ///
    /// # Errors
    ///
    /// Fails when the mode / read-intent combination is invalid.
    pub fn new(
        config: DatabaseContextConfiguration,
        factory: Arc<dyn ConnectionFactory>,
        types: Arc<TypeMappingRegistry>,
    ) -> Result<Arc<Self>> {
        Self::with_audit_resolver(config, factory, types, Arc::new(SystemAuditResolver))
    }

    /// Build a context with an explicit audit resolver.
    ///
    /// # Errors
    ///
    /// Fails when the mode / read-intent combination is invalid.
    pub fn with_audit_resolver(
        config: DatabaseContextConfiguration,
        factory: Arc<dyn ConnectionFactory>,
        types: Arc<TypeMappingRegistry>,
        audit: Arc<dyn AuditValueResolver>,
    ) -> Result<Arc<Self>> {
        let database = SupportedDatabase::from_provider_name(&config.provider_name);
        let dialect = Arc::new(DialectEngine::new(database));

        let mut connection_string = apply_default_application_name(
            &config.connection_string,
            APPLICATION_NAME_KEY,
            DEFAULT_APPLICATION_NAME,
        );
        connection_string = strip_max_pool_size_if_unsupported(
            &connection_string,
            dialect.descriptor().max_pool_size_setting,
            "Max Pool Size",
        );

        let strategy = ModeStrategy::new(
            config.db_mode,
            config.read_write_mode,
            Arc::clone(&factory),
            connection_string,
            Arc::clone(&dialect),
        )?;
        let admission = match config.max_concurrent_operations {
            Some(limit) => {
                let mut governor_config =
                    tessera_pool::PoolGovernorConfig::new().max_permits(limit);
                if let Some(timeout) = config.admission_timeout {
                    governor_config = governor_config.acquire_timeout(timeout);
                }
                let governor = tessera_pool::PoolGovernor::new(governor_config)
                    .map_err(|e| Error::InvalidConfiguration(e.to_string()))?;
                Some(governor)
            }
            None => None,
        };
        tracing::debug!(provider = %database, mode = ?config.db_mode, "context created");
        Ok(Arc::new(Self {
            config,
            database,
            dialect,
            strategy,
            factory,
            types,
            audit,
            admission,
            disposed: AtomicBool::new(false),
            active_transaction: AtomicBool::new(false),
        }))
    }

    /// The resolved provider.
    #[must_use]
    pub fn database(&self) -> SupportedDatabase {
        self.database
    }

    /// The dialect engine.
    #[must_use]
    pub fn dialect(&self) -> &Arc<DialectEngine> {
        &self.dialect
    }

    /// The mode strategy.
    #[must_use]
    pub fn strategy(&self) -> &ModeStrategy {
        &self.strategy
    }

    /// The type-mapping registry this context binds parameters through.
    #[must_use]
    pub fn types(&self) -> &Arc<TypeMappingRegistry> {
        &self.types
    }

    /// The audit-value resolver.
    #[must_use]
    pub fn audit(&self) -> &Arc<dyn AuditValueResolver> {
        &self.audit
    }

    /// The admission governor, when the context is governed.
    #[must_use]
    pub fn admission(&self) -> Option<&tessera_pool::PoolGovernor> {
        self.admission.as_ref()
    }

    /// The configuration this context was built from.
    #[must_use]
    pub fn config(&self) -> &DatabaseContextConfiguration {
        &self.config
    }

    /// Whether this context is read-only.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.config.read_write_mode == ReadWriteMode::ReadOnly
    }

    /// Fail when the context has been disposed.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] after disposal.
    pub fn ensure_live(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            Err(Error::InvalidState("context has been disposed".into()))
        } else {
            Ok(())
        }
    }

    /// Run product/version detection if it has not happened yet.
    ///
    /// Detection uses a bootstrap connection that deliberately skips
    /// session settings. The primary version query is tried first, then
    /// the dialect's secondary probe; when both fail the engine records an
    /// empty product string rather than propagating.
    pub async fn initialize(&self, cancel: &CancellationToken) -> Result<()> {
        self.ensure_live()?;
        if self.dialect.is_initialized() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let query = self.dialect.version_query();
        if query.is_empty() {
            self.dialect.initialize_exhausted();
            return Ok(());
        }
        let bootstrap = match self.factory.open(&self.strategy_connection_string()).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(error = %e, "bootstrap connection failed, product unknown");
                self.dialect.initialize_exhausted();
                return Ok(());
            }
        };
        let mut banner = self.probe(&*bootstrap, query).await;
        if banner.is_none() {
            if let Some(secondary) = self.dialect.secondary_version_query() {
                banner = self.probe(&*bootstrap, secondary).await;
            }
        }
        let _ = bootstrap.close().await;
        match banner {
            Some(banner) => self.dialect.initialize_from_banner(&banner),
            None => self.dialect.initialize_exhausted(),
        }
        Ok(())
    }

    async fn probe(&self, conn: &dyn crate::driver::DriverConnection, query: &str) -> Option<String> {
        let command = DriverCommand {
            text: query.to_owned(),
            ..DriverCommand::default()
        };
        match conn.scalar(&command).await {
            Ok(Some(value)) if !value.is_null() => Some(value.to_string()),
            Ok(_) => None,
            Err(e) => {
                // Secondary-probe fallthrough: failures are swallowed and
                // detection degrades to the empty product string.
                tracing::debug!(error = %e, query, "version probe failed");
                None
            }
        }
    }

    fn strategy_connection_string(&self) -> String {
        // Bootstrap connections reuse the normalised string held by the
        // strategy's configuration source.
        apply_default_application_name(
            &self.config.connection_string,
            APPLICATION_NAME_KEY,
            DEFAULT_APPLICATION_NAME,
        )
    }

    /// Claim the context's single transaction slot.
    pub(crate) fn try_enter_transaction(&self) -> bool {
        self.active_transaction
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the transaction slot.
    pub(crate) fn exit_transaction(&self) {
        self.active_transaction.store(false, Ordering::Release);
    }

    /// Dispose the context: close pinned connections and poison the
    /// dialect engine. Idempotent.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.strategy.dispose().await;
        self.dialect.dispose();
        tracing::debug!(provider = %self.database, "context disposed");
    }
}

impl std::fmt::Debug for DatabaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseContext")
            .field("database", &self.database)
            .field("mode", &self.config.db_mode)
            .field("read_write", &self.config.read_write_mode)
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

/// The shared default type registry handle, for callers that do not
/// thread their own.
#[must_use]
pub fn shared_type_registry() -> Arc<TypeMappingRegistry> {
    static REGISTRY: once_cell::sync::Lazy<Arc<TypeMappingRegistry>> =
        once_cell::sync::Lazy::new(|| Arc::new(TypeMappingRegistry::with_defaults()));
    Arc::clone(&REGISTRY)
}

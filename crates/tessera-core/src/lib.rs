//! # tessera-core
//!
//! The connection-lifecycle and execution core of tessera.
//!
//! A [`DatabaseContext`] ties a dialect engine, a connection-mode
//! strategy, a connection factory, and the type registries into one
//! addressable unit; a [`TenantContextRegistry`] caches one context per
//! tenant key. [`SqlContainer`] builds parameterised commands against a
//! context (or a [`TransactionContext`]) and executes them through the
//! strategy's tracked connections.
//!
//! Physical drivers stay out of this crate: they implement the small
//! [`ConnectionFactory`] / [`DriverConnection`] seam in [`driver`].

pub mod connection_string;
pub mod container;
pub mod context;
pub mod driver;
pub mod error;
pub mod mode;
pub mod tenant;
pub mod tracked;
pub mod transaction;

pub use connection_string::{
    APPLICATION_NAME_KEY, ConnectionString, append_application_name_suffix,
    apply_default_application_name, is_raw_connection_string, remerge_credentials,
    set_max_pool_size, strip_max_pool_size_if_unsupported,
};
pub use container::SqlContainer;
pub use context::{
    AuditValueResolver, DEFAULT_APPLICATION_NAME, DatabaseContext, DatabaseContextConfiguration,
    SystemAuditResolver, shared_type_registry,
};
pub use driver::{
    CommandKind, ConnectionFactory, DriverCommand, DriverConnection, DriverError, RowSet,
};
pub use error::{Error, Result};
pub use mode::{DbMode, ExecutionType, ModeStrategy, ReadWriteMode};
pub use tenant::{TenantConfiguration, TenantContextRegistry};
pub use tracked::TrackedConnection;
pub use transaction::{IsolationLevel, IsolationProfile, TransactionContext};

pub use tessera_dialect::{DialectEngine, SupportedDatabase};
pub use tessera_pool::{PoolError, PoolGovernor, PoolGovernorConfig, PoolPermit};

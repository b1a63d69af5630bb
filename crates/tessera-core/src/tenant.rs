//! The tenant registry: one context per tenant key.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tessera_types::TypeMappingRegistry;

use crate::context::{DatabaseContext, DatabaseContextConfiguration};
use crate::driver::ConnectionFactory;
use crate::error::{Error, Result};

/// Configuration for one tenant.
#[derive(Debug, Clone)]
pub struct TenantConfiguration {
    /// Tenant key.
    pub name: String,
    /// The tenant's database configuration.
    pub configuration: DatabaseContextConfiguration,
}

impl TenantConfiguration {
    /// Create a tenant configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, configuration: DatabaseContextConfiguration) -> Self {
        Self {
            name: name.into(),
            configuration,
        }
    }
}

/// Caches one [`DatabaseContext`] per tenant key with insert-once
/// semantics: concurrent lookups for a new key resolve to the same
/// instance via a double check under the construction lock.
pub struct TenantContextRegistry {
    configurations: HashMap<String, TenantConfiguration>,
    factory: Arc<dyn ConnectionFactory>,
    types: Arc<TypeMappingRegistry>,
    contexts: RwLock<HashMap<String, Arc<DatabaseContext>>>,
    construction: Mutex<()>,
}

impl TenantContextRegistry {
    /// Build a registry over a set of tenant configurations.
    #[must_use]
    pub fn new(
        configurations: impl IntoIterator<Item = TenantConfiguration>,
        factory: Arc<dyn ConnectionFactory>,
        types: Arc<TypeMappingRegistry>,
    ) -> Self {
        Self {
            configurations: configurations
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
            factory,
            types,
            contexts: RwLock::new(HashMap::new()),
            construction: Mutex::new(()),
        }
    }

    /// Known tenant keys.
    #[must_use]
    pub fn tenant_names(&self) -> Vec<String> {
        self.configurations.keys().cloned().collect()
    }

    /// Get (or lazily construct) the context for a tenant.
    ///
    /// # Errors
    ///
    /// Unknown tenants fail as [`Error::InvalidArgument`]; construction
    /// failures propagate.
    pub fn get_context(&self, tenant: &str) -> Result<Arc<DatabaseContext>> {
        if let Some(existing) = self.contexts.read().get(tenant) {
            return Ok(Arc::clone(existing));
        }
        let _guard = self.construction.lock();
        // Double check: another caller may have built it while we waited.
        if let Some(existing) = self.contexts.read().get(tenant) {
            return Ok(Arc::clone(existing));
        }
        let config = self.configurations.get(tenant).ok_or_else(|| {
            Error::InvalidArgument(format!("unknown tenant {tenant:?}"))
        })?;
        tracing::debug!(tenant, "constructing tenant context");
        let context = DatabaseContext::new(
            config.configuration.clone(),
            Arc::clone(&self.factory),
            Arc::clone(&self.types),
        )?;
        self.contexts
            .write()
            .insert(tenant.to_owned(), Arc::clone(&context));
        Ok(context)
    }

    /// Number of constructed contexts.
    #[must_use]
    pub fn constructed_count(&self) -> usize {
        self.contexts.read().len()
    }

    /// Dispose every constructed context. Individual failures are logged
    /// and swallowed so one misbehaving tenant cannot block teardown.
    pub async fn dispose(&self) {
        let drained: Vec<(String, Arc<DatabaseContext>)> =
            self.contexts.write().drain().collect();
        for (tenant, context) in drained {
            // A panicking driver close must not take the teardown loop
            // down with it.
            let outcome = tokio::spawn({
                let context = Arc::clone(&context);
                async move { context.dispose().await }
            })
            .await;
            if let Err(e) = outcome {
                tracing::warn!(tenant, error = %e, "tenant context disposal failed");
            }
        }
    }
}

impl std::fmt::Debug for TenantContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantContextRegistry")
            .field("tenants", &self.configurations.len())
            .field("constructed", &self.constructed_count())
            .finish()
    }
}

//! The `(logical type, provider)` parameter-mapping registry and its cached
//! configuration hot path.
//!
//! ## Lifecycle
//!
//! 1. First configuration of a `(logical type, provider)` pair resolves the
//!    mapping and publishes a cache entry stamped with the registry version.
//! 2. Subsequent configurations reuse the entry while the stamp matches.
//! 3. `register` bumps the version; the next lookup observes the stale stamp
//!    and re-resolves. Missing mappings are cached too, so repeated misses
//!    stay cheap.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::coerce::{CoercionRegistry, TimeMappingPolicy};
use crate::logical::{DbType, LogicalType};
use crate::param::Parameter;
use crate::provider::SupportedDatabase;
use crate::value::DbValue;

/// Default capacity of the parameter-configuration cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Provider-specific parameter refinement callback.
pub type ConfigureFn = Arc<dyn Fn(&mut Parameter, &DbValue) + Send + Sync>;

/// How a logical type binds on one provider.
#[derive(Clone)]
pub struct ProviderTypeMapping {
    /// Generic wire-level type tag to assign.
    pub db_type: DbType,
    /// Size hint to assign, when fixed for the type.
    pub size: Option<usize>,
    /// User-defined type name, for providers that dispatch on it.
    pub udt_name: Option<String>,
    /// Raw provider type code, when the driver needs one pinned.
    pub provider_type_code: Option<i32>,
    /// Optional refinement callback run after the static fields apply.
    pub configure: Option<ConfigureFn>,
}

impl ProviderTypeMapping {
    /// A mapping that assigns only a generic type tag.
    #[must_use]
    pub fn simple(db_type: DbType) -> Self {
        Self {
            db_type,
            size: None,
            udt_name: None,
            provider_type_code: None,
            configure: None,
        }
    }

    /// Set the UDT name.
    #[must_use]
    pub fn with_udt(mut self, udt: impl Into<String>) -> Self {
        self.udt_name = Some(udt.into());
        self
    }

    /// Set the provider type code.
    #[must_use]
    pub fn with_type_code(mut self, code: i32) -> Self {
        self.provider_type_code = Some(code);
        self
    }

    /// Set the refinement callback.
    #[must_use]
    pub fn with_configure(mut self, f: ConfigureFn) -> Self {
        self.configure = Some(f);
        self
    }
}

impl std::fmt::Debug for ProviderTypeMapping {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTypeMapping")
            .field("db_type", &self.db_type)
            .field("size", &self.size)
            .field("udt_name", &self.udt_name)
            .field("provider_type_code", &self.provider_type_code)
            .field("configure", &self.configure.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// A cached `(mapping, version)` pair. `mapping == None` records a verified
/// miss so lookups for unmapped pairs stay allocation-free.
#[derive(Clone)]
pub struct CachedParamConfig {
    /// The resolved mapping, or `None` for a cached miss.
    pub mapping: Option<Arc<ProviderTypeMapping>>,
    /// Registry version at resolve time.
    pub version: u64,
}

/// The process-scope mapping registry.
///
/// Free-threaded for reads; registration takes the write lock and bumps the
/// version stamp, invalidating every cached binding by comparison.
pub struct TypeMappingRegistry {
    table: RwLock<HashMap<(LogicalType, SupportedDatabase), Arc<ProviderTypeMapping>>>,
    cache: Mutex<LruCache<(LogicalType, SupportedDatabase), CachedParamConfig>>,
    coercions: CoercionRegistry,
    version: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TypeMappingRegistry {
    /// An empty registry with the given coercion registry and cache size.
    ///
    /// # Panics
    ///
    /// Panics if `cache_capacity` is zero.
    #[must_use]
    pub fn new(coercions: CoercionRegistry, cache_capacity: usize) -> Self {
        assert!(cache_capacity > 0, "cache_capacity must be greater than 0");
        #[allow(clippy::expect_used)]
        let capacity = NonZeroUsize::new(cache_capacity).expect("cache_capacity > 0");
        Self {
            table: RwLock::new(HashMap::new()),
            cache: Mutex::new(LruCache::new(capacity)),
            coercions,
            version: AtomicU64::new(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A registry pre-loaded with the built-in mappings for every provider.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new(
            CoercionRegistry::with_defaults(TimeMappingPolicy::default()),
            DEFAULT_CACHE_CAPACITY,
        );
        registry.register_builtin_mappings();
        registry
    }

    /// The coercion registry this registry reads and writes through.
    #[must_use]
    pub fn coercions(&self) -> &CoercionRegistry {
        &self.coercions
    }

    /// The current version stamp. Monotonically increasing; combined with
    /// the coercion registry's stamp so either table invalidates caches.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire) + self.coercions.version()
    }

    /// Register (or replace) the mapping for a `(logical type, provider)`
    /// pair, bumping the version stamp.
    pub fn register(
        &self,
        logical: LogicalType,
        provider: SupportedDatabase,
        mapping: ProviderTypeMapping,
    ) {
        tracing::debug!(logical = %logical, provider = %provider, "registering type mapping");
        self.table
            .write()
            .insert((logical, provider), Arc::new(mapping));
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Look up the mapping for a pair, bypassing the cache.
    #[must_use]
    pub fn lookup(
        &self,
        logical: &LogicalType,
        provider: SupportedDatabase,
    ) -> Option<Arc<ProviderTypeMapping>> {
        self.table.read().get(&(logical.clone(), provider)).cloned()
    }

    /// Cache hit count.
    #[must_use]
    pub fn cache_hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Cache miss count.
    #[must_use]
    pub fn cache_misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Configure a parameter for a provider using the cached hot path.
    ///
    /// Returns `true` when a mapping applied; `false` when the pair has no
    /// mapping (the miss itself is cached). Null values bind as database
    /// NULL either way.
    pub fn try_configure_parameter(
        &self,
        param: &mut Parameter,
        logical: &LogicalType,
        value: DbValue,
        provider: SupportedDatabase,
    ) -> bool {
        let entry = self.cached_entry(logical, provider);
        let Some(mapping) = entry.mapping else {
            param.value = value;
            return false;
        };
        param.db_type = mapping.db_type;
        if mapping.size.is_some() {
            param.size = mapping.size;
        }
        if mapping.udt_name.is_some() {
            param.udt_name = mapping.udt_name.clone();
        }
        if mapping.provider_type_code.is_some() {
            param.provider_type_code = mapping.provider_type_code;
        }
        if let LogicalType::Array(el) = logical {
            param.array_element = Some((**el).clone());
        }
        if let Some(configure) = &mapping.configure {
            configure(param, &value);
        }
        param.value = value;
        if !param.value.is_null() {
            // Advanced value objects rewrite themselves into provider shape.
            self.coercions.write_param(param);
        }
        true
    }

    /// Configure a parameter with the full fallback chain: the mapping
    /// registry first, then provider defaults for built-in scalar shapes,
    /// then generic binding from the value's own shape.
    pub fn configure_parameter_enhanced(
        &self,
        param: &mut Parameter,
        logical: &LogicalType,
        value: DbValue,
        provider: SupportedDatabase,
    ) {
        if self.try_configure_parameter(param, logical, value.clone(), provider) {
            return;
        }
        if provider_parameter_factory(param, &value, provider) {
            param.value = value;
            self.coercions.write_param(param);
            return;
        }
        param.db_type = generic_db_type(&value);
        param.value = value;
        self.coercions.write_param(param);
    }

    fn cached_entry(
        &self,
        logical: &LogicalType,
        provider: SupportedDatabase,
    ) -> CachedParamConfig {
        let current = self.version();
        let key = (logical.clone(), provider);
        {
            let mut cache = self.cache.lock();
            if let Some(entry) = cache.get(&key) {
                if entry.version == current {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.clone();
                }
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let entry = CachedParamConfig {
            mapping: self.lookup(logical, provider),
            version: current,
        };
        self.cache.lock().put(key, entry.clone());
        entry
    }

    fn register_builtin_mappings(&self) {
        use DbType as D;
        use LogicalType as L;
        let scalars: [(L, D); 16] = [
            (L::Boolean, D::Boolean),
            (L::Int16, D::Int16),
            (L::Int32, D::Int32),
            (L::Int64, D::Int64),
            (L::Float32, D::Single),
            (L::Float64, D::Double),
            (L::Decimal, D::Decimal),
            (L::Text, D::String),
            (L::Binary, D::Binary),
            (L::Uuid, D::Guid),
            (L::Date, D::Date),
            (L::Time, D::Time),
            (L::DateTime, D::DateTime),
            (L::DateTimeOffset, D::DateTimeOffset),
            (L::Json, D::Json),
            (L::RowVersion, D::Binary),
        ];
        for provider in SupportedDatabase::ALL {
            for (logical, db_type) in &scalars {
                self.register(
                    logical.clone(),
                    provider,
                    ProviderTypeMapping::simple(*db_type),
                );
            }
        }
        // PostgreSQL-family extension types dispatch by UDT name.
        for provider in [SupportedDatabase::PostgreSql, SupportedDatabase::CockroachDb] {
            self.register(
                L::Inet,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("inet"),
            );
            self.register(
                L::Cidr,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("cidr"),
            );
            self.register(
                L::MacAddress,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("macaddr"),
            );
            self.register(
                L::Interval,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("interval"),
            );
            self.register(
                L::IntRange,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("int4range"),
            );
            self.register(
                L::BigIntRange,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("int8range"),
            );
            self.register(
                L::NumericRange,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("numrange"),
            );
            self.register(
                L::TimestampRange,
                provider,
                ProviderTypeMapping::simple(D::String).with_udt("tsrange"),
            );
            self.register(
                L::Geometry,
                provider,
                ProviderTypeMapping::simple(D::Binary).with_udt("geometry"),
            );
            self.register(
                L::Geography,
                provider,
                ProviderTypeMapping::simple(D::Binary).with_udt("geography"),
            );
        }
        self.register(
            L::HStore,
            SupportedDatabase::PostgreSql,
            ProviderTypeMapping::simple(D::String).with_udt("hstore"),
        );
        // Oracle interval kinds.
        self.register(
            L::IntervalYearMonth,
            SupportedDatabase::Oracle,
            ProviderTypeMapping::simple(D::String).with_udt("INTERVAL YEAR TO MONTH"),
        );
        self.register(
            L::IntervalDaySecond,
            SupportedDatabase::Oracle,
            ProviderTypeMapping::simple(D::String).with_udt("INTERVAL DAY TO SECOND"),
        );
        // SQL Server spatial UDTs.
        self.register(
            L::Geometry,
            SupportedDatabase::SqlServer,
            ProviderTypeMapping::simple(D::Binary).with_udt("geometry"),
        );
        self.register(
            L::Geography,
            SupportedDatabase::SqlServer,
            ProviderTypeMapping::simple(D::Binary).with_udt("geography"),
        );
    }
}

impl std::fmt::Debug for TypeMappingRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeMappingRegistry")
            .field("mappings", &self.table.read().len())
            .field("version", &self.version())
            .finish()
    }
}

/// Provider defaults for built-in scalar shapes when no explicit mapping
/// exists. Mirrors what each driver would infer on its own.
fn provider_parameter_factory(
    param: &mut Parameter,
    value: &DbValue,
    provider: SupportedDatabase,
) -> bool {
    let db_type = generic_db_type(value);
    if db_type == DbType::Object {
        return false;
    }
    param.db_type = db_type;
    // SQLite and DuckDB take everything as dynamic values; a size hint
    // would be meaningless there.
    if !matches!(
        provider,
        SupportedDatabase::Sqlite | SupportedDatabase::DuckDb
    ) {
        if let DbValue::Text(s) = value {
            param.size = Some(s.len().max(1));
        }
    }
    true
}

/// Map a value's own shape to a generic type tag.
fn generic_db_type(value: &DbValue) -> DbType {
    match value {
        DbValue::Bool(_) => DbType::Boolean,
        DbValue::Int16(_) => DbType::Int16,
        DbValue::Int32(_) => DbType::Int32,
        DbValue::Int64(_) => DbType::Int64,
        DbValue::Float32(_) => DbType::Single,
        DbValue::Float64(_) => DbType::Double,
        DbValue::Decimal(_) => DbType::Decimal,
        DbValue::Text(_) => DbType::String,
        DbValue::Bytes(_) | DbValue::RowVersion(_) => DbType::Binary,
        DbValue::Uuid(_) => DbType::Guid,
        DbValue::Date(_) => DbType::Date,
        DbValue::Time(_) => DbType::Time,
        DbValue::DateTime(_) => DbType::DateTime,
        DbValue::DateTimeOffset(_) => DbType::DateTimeOffset,
        DbValue::Json(_) => DbType::Json,
        DbValue::Inet(_)
        | DbValue::Cidr(_)
        | DbValue::MacAddress(_)
        | DbValue::Interval(_)
        | DbValue::IntervalYearMonth(_)
        | DbValue::IntervalDaySecond(_)
        | DbValue::Range(_)
        | DbValue::HStore(_) => DbType::String,
        _ => DbType::Object,
    }
}

/// The shared process-wide registry, for callers that do not thread an
/// explicit handle. Every public API also accepts a registry reference.
#[must_use]
pub fn default_registry() -> &'static TypeMappingRegistry {
    static REGISTRY: Lazy<TypeMappingRegistry> = Lazy::new(TypeMappingRegistry::with_defaults);
    &REGISTRY
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_scalar_mapping() {
        let r = TypeMappingRegistry::with_defaults();
        let mut p = Parameter::default();
        assert!(r.try_configure_parameter(
            &mut p,
            &LogicalType::Int32,
            DbValue::Int32(9),
            SupportedDatabase::PostgreSql,
        ));
        assert_eq!(p.db_type, DbType::Int32);
        assert_eq!(p.value, DbValue::Int32(9));
    }

    #[test]
    fn test_udt_mapping_applies() {
        let r = TypeMappingRegistry::with_defaults();
        let mut p = Parameter::default();
        let inet: crate::net::Inet = "10.0.0.1/8".parse().unwrap();
        assert!(r.try_configure_parameter(
            &mut p,
            &LogicalType::Inet,
            DbValue::Inet(inet),
            SupportedDatabase::PostgreSql,
        ));
        assert_eq!(p.udt_name.as_deref(), Some("inet"));
        // The write coercion rendered the value to provider text.
        assert_eq!(p.value, DbValue::Text("10.0.0.1/8".into()));
    }

    #[test]
    fn test_miss_is_cached() {
        let r = TypeMappingRegistry::with_defaults();
        let mut p = Parameter::default();
        let missing = LogicalType::HStore; // only mapped for PostgreSQL
        assert!(!r.try_configure_parameter(
            &mut p,
            &missing,
            DbValue::Null,
            SupportedDatabase::Sqlite,
        ));
        let misses = r.cache_misses();
        assert!(!r.try_configure_parameter(
            &mut p,
            &missing,
            DbValue::Null,
            SupportedDatabase::Sqlite,
        ));
        assert_eq!(r.cache_misses(), misses);
        assert!(r.cache_hits() > 0);
    }

    #[test]
    fn test_reregistration_invalidates_cache() {
        let r = TypeMappingRegistry::with_defaults();
        let mut p = Parameter::default();
        r.try_configure_parameter(
            &mut p,
            &LogicalType::Text,
            DbValue::from("x"),
            SupportedDatabase::MySql,
        );
        assert_eq!(p.db_type, DbType::String);

        // Replace the mapping; the stamped cache entry must not be reused.
        r.register(
            LogicalType::Text,
            SupportedDatabase::MySql,
            ProviderTypeMapping::simple(DbType::Binary),
        );
        let mut p2 = Parameter::default();
        r.try_configure_parameter(
            &mut p2,
            &LogicalType::Text,
            DbValue::from("x"),
            SupportedDatabase::MySql,
        );
        assert_eq!(p2.db_type, DbType::Binary);
    }

    #[test]
    fn test_enhanced_falls_back_to_value_shape() {
        let r = TypeMappingRegistry::new(CoercionRegistry::default(), 8);
        let mut p = Parameter::default();
        r.configure_parameter_enhanced(
            &mut p,
            &LogicalType::Text,
            DbValue::from("hello"),
            SupportedDatabase::SqlServer,
        );
        assert_eq!(p.db_type, DbType::String);
        assert_eq!(p.size, Some(5));
    }

    #[test]
    fn test_enhanced_no_size_hint_for_sqlite() {
        let r = TypeMappingRegistry::new(CoercionRegistry::default(), 8);
        let mut p = Parameter::default();
        r.configure_parameter_enhanced(
            &mut p,
            &LogicalType::Text,
            DbValue::from("hello"),
            SupportedDatabase::Sqlite,
        );
        assert_eq!(p.size, None);
    }

    #[test]
    fn test_null_binds_as_null() {
        let r = TypeMappingRegistry::with_defaults();
        let mut p = Parameter::default();
        assert!(r.try_configure_parameter(
            &mut p,
            &LogicalType::Text,
            DbValue::Null,
            SupportedDatabase::Oracle,
        ));
        assert!(p.value.is_null());
        assert_eq!(p.db_type, DbType::String);
    }

    #[test]
    fn test_array_element_recorded() {
        let r = TypeMappingRegistry::with_defaults();
        r.register(
            LogicalType::Array(Box::new(LogicalType::Int32)),
            SupportedDatabase::PostgreSql,
            ProviderTypeMapping::simple(DbType::Object),
        );
        let mut p = Parameter::default();
        assert!(r.try_configure_parameter(
            &mut p,
            &LogicalType::Array(Box::new(LogicalType::Int32)),
            DbValue::Array(vec![DbValue::Int32(1)]),
            SupportedDatabase::PostgreSql,
        ));
        assert_eq!(p.array_element, Some(LogicalType::Int32));
    }
}

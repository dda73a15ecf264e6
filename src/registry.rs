//! Template-keyed registry of pools

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::metrics::PoolMetrics;
use crate::pool::{InstanceHandle, Pool};
use crate::template::{Poolable, Template};

#[cfg(feature = "prometheus")]
use crate::metrics::MetricsExporter;

/// Type-erased view of a `Pool<P>` so pools of different templates share one map.
pub(crate) trait ErasedPool: Send + Sync {
    fn key(&self) -> &str;

    fn instance_type(&self) -> TypeId;

    fn release_erased(&self, index: usize) -> PoolResult<()>;

    fn visit_erased(&self, index: usize, f: &mut dyn FnMut(&mut dyn Any)) -> PoolResult<()>;

    fn metrics_snapshot(&self) -> PoolMetrics;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<P: Template> ErasedPool for Pool<P> {
    fn key(&self) -> &str {
        self.identity()
    }

    fn instance_type(&self) -> TypeId {
        TypeId::of::<P::Instance>()
    }

    fn release_erased(&self, index: usize) -> PoolResult<()> {
        self.release_index(index)
    }

    fn visit_erased(&self, index: usize, f: &mut dyn FnMut(&mut dyn Any)) -> PoolResult<()> {
        self.with_index(index, |instance| f(instance))
    }

    fn metrics_snapshot(&self) -> PoolMetrics {
        self.get_metrics()
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Owner of every pool, keyed by template identity
///
/// Pools are created lazily on the first acquire for a template and are
/// never removed. The registry is an ordinary value: construct one per
/// session and share it by reference or `Arc`.
///
/// All failures are logged through `tracing` and returned to the caller.
/// Call sites that cannot act on an error can use [`PoolRegistry::try_acquire`]
/// and [`PoolRegistry::try_release`].
///
/// # Examples
///
/// ```
/// use spawn_pool::{PoolRegistry, Poolable, Template};
///
/// #[derive(Clone)]
/// struct Prefab(&'static str);
///
/// struct Enemy;
/// impl Poolable for Enemy {}
///
/// impl Template for Prefab {
///     type Instance = Enemy;
///     type Placement = ();
///     fn identity(&self) -> &str { self.0 }
///     fn instantiate(&self, _: Option<&()>) -> Enemy { Enemy }
/// }
///
/// let registry = PoolRegistry::new();
/// let goblin = Prefab("goblin");
///
/// let enemy = registry.acquire_with_size(&goblin, 4).unwrap();
/// assert_eq!(enemy.identity(), "goblin");
///
/// registry.release(&enemy).unwrap();
/// assert_eq!(registry.acquire(&goblin).unwrap(), enemy);
/// assert_eq!(registry.len(), 1);
/// ```
pub struct PoolRegistry {
    pools: DashMap<Arc<str>, Arc<dyn ErasedPool>>,
    config: PoolConfiguration,
}

impl PoolRegistry {
    /// Create an empty registry with default configuration
    pub fn new() -> Self {
        Self::with_configuration(PoolConfiguration::default())
    }

    /// Create an empty registry whose lazily created pools use `config`
    pub fn with_configuration(config: PoolConfiguration) -> Self {
        Self {
            pools: DashMap::new(),
            config,
        }
    }

    pub fn configuration(&self) -> &PoolConfiguration {
        &self.config
    }

    /// Acquire an instance of `template`, creating its pool with the
    /// configured default size if this is the first request for its identity.
    pub fn acquire<P: Template + Clone>(&self, template: &P) -> PoolResult<InstanceHandle<P::Instance>> {
        self.acquire_with_size(template, self.config.default_initial_size)
    }

    /// Like [`PoolRegistry::acquire`], pre-creating `initial_size` instances
    /// if the pool does not exist yet. The size is ignored for existing pools.
    pub fn acquire_with_size<P: Template + Clone>(
        &self,
        template: &P,
        initial_size: usize,
    ) -> PoolResult<InstanceHandle<P::Instance>> {
        let pool = self.pool_for(template, initial_size)?;
        Ok(pool.acquire())
    }

    /// Acquire, logging and discarding any error
    pub fn try_acquire<P: Template + Clone>(&self, template: &P) -> Option<InstanceHandle<P::Instance>> {
        self.acquire(template).ok()
    }

    /// Return an instance to the pool registered under its identity.
    pub fn release<I: Poolable>(&self, handle: &InstanceHandle<I>) -> PoolResult<()> {
        let pool = self.route(handle)?;
        pool.release_erased(handle.index())
    }

    /// Release, logging and discarding any error. Returns whether it succeeded.
    pub fn try_release<I: Poolable>(&self, handle: &InstanceHandle<I>) -> bool {
        self.release(handle).is_ok()
    }

    /// Run `f` on the instance behind `handle`, routed by its identity.
    ///
    /// The owning pool stays locked while `f` runs.
    pub fn with_instance<I: Poolable, R>(
        &self,
        handle: &InstanceHandle<I>,
        f: impl FnOnce(&mut I) -> R,
    ) -> PoolResult<R> {
        let pool = self.route(handle)?;

        let mut f = Some(f);
        let mut output = None;
        pool.visit_erased(handle.index(), &mut |instance: &mut dyn Any| {
            if let (Some(f), Some(instance)) = (f.take(), instance.downcast_mut::<I>()) {
                output = Some(f(instance));
            }
        })?;

        output.ok_or_else(|| Self::type_mismatch(handle.identity()))
    }

    /// Register a pre-built pool, e.g. one with a placement context.
    ///
    /// Fails if a pool already exists under the same identity.
    #[tracing::instrument(level = "debug", skip(self, pool), fields(key = %pool.identity()))]
    pub fn register<P: Template>(&self, pool: Pool<P>) -> PoolResult<Arc<Pool<P>>> {
        let key: Arc<str> = Arc::from(pool.identity());
        if key.is_empty() {
            warn!("cannot register a pool with an empty identity");
            return Err(PoolError::MissingIdentity);
        }

        match self.pools.entry(Arc::clone(&key)) {
            Entry::Occupied(_) => {
                warn!(key = %key, "pool already registered");
                Err(PoolError::PoolExists { key: key.to_string() })
            }
            Entry::Vacant(entry) => {
                let pool = Arc::new(pool);
                entry.insert(Arc::clone(&pool) as Arc<dyn ErasedPool>);
                info!(key = %key, instances = pool.len(), "registered pool");
                Ok(pool)
            }
        }
    }

    /// Typed access to the pool registered under `key`
    pub fn get_pool<P: Template>(&self, key: &str) -> PoolResult<Arc<Pool<P>>> {
        let pool = self.lookup(key)?;
        Self::downcast(pool, key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pools.contains_key(key)
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Registered identities, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pools.iter().map(|entry| entry.key().to_string()).collect();
        keys.sort();
        keys
    }

    /// Metrics for every pool, sorted by identity
    pub fn metrics_snapshot(&self) -> Vec<(String, PoolMetrics)> {
        let pools: Vec<Arc<dyn ErasedPool>> = self.pools.iter().map(|entry| Arc::clone(entry.value())).collect();

        let mut snapshot: Vec<(String, PoolMetrics)> = pools
            .iter()
            .map(|pool| (pool.key().to_string(), pool.metrics_snapshot()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));
        snapshot
    }

    /// Export metrics as a map of `"<pool>.<metric>"` to value
    pub fn export_metrics(&self) -> HashMap<String, String> {
        let mut exported = HashMap::new();
        for (key, metrics) in self.metrics_snapshot() {
            for (name, value) in metrics.export() {
                exported.insert(format!("{key}.{name}"), value);
            }
        }
        exported
    }

    /// Export every pool's metrics in Prometheus format
    #[cfg(feature = "prometheus")]
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> PoolResult<String> {
        let snapshot = self.metrics_snapshot();
        MetricsExporter::export_prometheus_all(snapshot.iter().map(|(key, metrics)| (key.as_str(), metrics)), tags)
    }

    fn pool_for<P: Template + Clone>(&self, template: &P, initial_size: usize) -> PoolResult<Arc<Pool<P>>> {
        let key = template.identity();
        if key.is_empty() {
            warn!("cannot pool a template with an empty identity");
            return Err(PoolError::MissingIdentity);
        }

        // Separate statement: the shard read lock must be gone before `entry`.
        let existing = self.pools.get(key).map(|entry| Arc::clone(entry.value()));

        let pool = match existing {
            Some(pool) => pool,
            None => {
                // Built outside the map so hooks may call back into the registry.
                let fresh: Arc<dyn ErasedPool> =
                    Arc::new(Pool::with_options(template.clone(), initial_size, None, &self.config));

                match self.pools.entry(Arc::from(key)) {
                    Entry::Occupied(entry) => {
                        debug!(key = %key, "pool created concurrently, discarding spare");
                        Arc::clone(entry.get())
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(Arc::clone(&fresh));
                        info!(key = %key, initial_size, "created pool on first acquire");
                        fresh
                    }
                }
            }
        };

        Self::downcast(pool, key)
    }

    fn route<I: Poolable>(&self, handle: &InstanceHandle<I>) -> PoolResult<Arc<dyn ErasedPool>> {
        let key = handle.identity();
        if key.is_empty() {
            warn!(index = handle.index(), "cannot route an instance with an empty identity");
            return Err(PoolError::MissingIdentity);
        }

        let pool = self.lookup(key)?;
        if pool.instance_type() != TypeId::of::<I>() {
            return Err(Self::type_mismatch(key));
        }

        Ok(pool)
    }

    fn lookup(&self, key: &str) -> PoolResult<Arc<dyn ErasedPool>> {
        match self.pools.get(key).map(|entry| Arc::clone(entry.value())) {
            Some(pool) => Ok(pool),
            None => {
                warn!(key = %key, "no pool registered for this identity");
                Err(PoolError::NoSuchPool { key: key.to_string() })
            }
        }
    }

    fn downcast<P: Template>(pool: Arc<dyn ErasedPool>, key: &str) -> PoolResult<Arc<Pool<P>>> {
        pool.into_any()
            .downcast::<Pool<P>>()
            .map_err(|_| Self::type_mismatch(key))
    }

    fn type_mismatch(key: &str) -> PoolError {
        warn!(key = %key, "pool holds a different template type");
        PoolError::TypeMismatch { key: key.to_string() }
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.keys())
            .field("config", &self.config)
            .finish()
    }
}

//! Pool of reusable instances produced from one template

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::config::{PoolConfiguration, SearchStrategy};
use crate::errors::{PoolError, PoolResult};
use crate::health::HealthStatus;
use crate::metrics::{MetricsTracker, PoolMetrics};
use crate::template::{Poolable, Template};

#[cfg(feature = "prometheus")]
use crate::metrics::MetricsExporter;

/// Reference to a pooled instance, handed out by acquire and given back to release.
///
/// The handle carries the identity of the template that produced the
/// instance, which is how the registry routes a release to the right pool.
/// Handles stay valid for the lifetime of the pool because instances are
/// never removed.
pub struct InstanceHandle<I> {
    identity: Arc<str>,
    index: usize,
    _instance: PhantomData<fn() -> I>,
}

impl<I> InstanceHandle<I> {
    pub(crate) fn new(identity: Arc<str>, index: usize) -> Self {
        Self {
            identity,
            index,
            _instance: PhantomData,
        }
    }

    /// Identity of the template the instance was created from
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Position of the instance in its pool, in creation order
    pub fn index(&self) -> usize {
        self.index
    }
}

impl<I> Clone for InstanceHandle<I> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.identity), self.index)
    }
}

impl<I> fmt::Debug for InstanceHandle<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("identity", &self.identity)
            .field("index", &self.index)
            .finish()
    }
}

impl<I> PartialEq for InstanceHandle<I> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.identity == other.identity
    }
}

impl<I> Eq for InstanceHandle<I> {}

impl<I> Hash for InstanceHandle<I> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
        self.index.hash(state);
    }
}

struct Slot<I> {
    instance: I,
    in_pool: bool,
}

struct Slots<I> {
    entries: Vec<Slot<I>>,
    // Only maintained under `SearchStrategy::FreeList`.
    free: Vec<usize>,
}

/// A growable set of reusable instances of one template
///
/// Instances are created up front or on demand and are never destroyed by
/// the pool. Acquire hands out a free instance (spawning it), release marks
/// it free again (despawning it).
///
/// # Examples
///
/// ```
/// use spawn_pool::{Pool, Poolable, Template};
///
/// #[derive(Default)]
/// struct Bullet {
///     visible: bool,
/// }
///
/// impl Poolable for Bullet {
///     fn on_spawn(&mut self) {
///         self.visible = true;
///     }
///     fn on_despawn(&mut self) {
///         self.visible = false;
///     }
/// }
///
/// struct BulletTemplate;
///
/// impl Template for BulletTemplate {
///     type Instance = Bullet;
///     type Placement = ();
///     fn identity(&self) -> &str { "bullet" }
///     fn instantiate(&self, _: Option<&()>) -> Bullet { Bullet::default() }
/// }
///
/// let pool = Pool::new(BulletTemplate, 1);
///
/// let first = pool.acquire();
/// assert!(pool.with_instance(&first, |bullet| bullet.visible).unwrap());
///
/// pool.release(&first).unwrap();
/// let second = pool.acquire();
/// assert_eq!(first, second);
/// assert_eq!(pool.len(), 1);
/// ```
pub struct Pool<P: Template> {
    template: P,
    placement: Option<P::Placement>,
    identity: Arc<str>,
    strategy: SearchStrategy,
    high_utilization_threshold: f64,
    slots: Mutex<Slots<P::Instance>>,
    metrics: MetricsTracker,
}

impl<P: Template> Pool<P> {
    /// Create a pool with `initial_size` despawned instances and default configuration
    pub fn new(template: P, initial_size: usize) -> Self {
        Self::with_options(template, initial_size, None, &PoolConfiguration::default())
    }

    /// Create a pool with a placement context and explicit configuration
    pub fn with_options(
        template: P,
        initial_size: usize,
        placement: Option<P::Placement>,
        config: &PoolConfiguration,
    ) -> Self {
        let identity: Arc<str> = Arc::from(template.identity());

        let mut entries = Vec::with_capacity(initial_size);
        for _ in 0..initial_size {
            let mut instance = template.instantiate(placement.as_ref());
            instance.on_despawn();
            entries.push(Slot {
                instance,
                in_pool: true,
            });
        }

        // Reversed so that pops hand out instances in creation order
        let free = match config.search_strategy {
            SearchStrategy::FreeList => (0..initial_size).rev().collect(),
            SearchStrategy::LinearScan => Vec::new(),
        };

        let metrics = MetricsTracker::new();
        metrics.total_created.fetch_add(initial_size, Ordering::Relaxed);

        debug!(pool = %identity, initial_size, strategy = ?config.search_strategy, "created pool");

        Self {
            template,
            placement,
            identity,
            strategy: config.search_strategy,
            high_utilization_threshold: config.high_utilization_threshold,
            slots: Mutex::new(Slots { entries, free }),
            metrics,
        }
    }

    /// Check out a free instance, creating one if none is available.
    ///
    /// Never blocks and never returns an instance that is already checked
    /// out. `on_spawn` has run on the instance by the time this returns.
    pub fn acquire(&self) -> InstanceHandle<P::Instance> {
        let mut slots = self.slots.lock();

        let index = match self.take_free(&mut slots) {
            Some(index) => index,
            None => {
                let instance = self.template.instantiate(self.placement.as_ref());
                slots.entries.push(Slot {
                    instance,
                    in_pool: true,
                });
                MetricsTracker::increment(&self.metrics.total_created);
                debug!(pool = %self.identity, instances = slots.entries.len(), "no free instance, grew pool");
                slots.entries.len() - 1
            }
        };

        let slot = &mut slots.entries[index];
        slot.in_pool = false;
        slot.instance.on_spawn();

        MetricsTracker::increment(&self.metrics.total_acquired);
        trace!(pool = %self.identity, index, "acquired instance");

        InstanceHandle::new(Arc::clone(&self.identity), index)
    }

    /// Mark an instance free again and despawn it.
    ///
    /// Releasing an instance that is already free succeeds and despawns it
    /// again. Whether the handle came from this pool is not checked beyond
    /// its index; routing by identity is the registry's job.
    pub fn release(&self, handle: &InstanceHandle<P::Instance>) -> PoolResult<()> {
        self.release_index(handle.index())
    }

    /// Run `f` on the instance behind `handle`.
    ///
    /// The pool stays locked while `f` runs, so `f` must not call back into
    /// the same pool.
    pub fn with_instance<R>(
        &self,
        handle: &InstanceHandle<P::Instance>,
        f: impl FnOnce(&mut P::Instance) -> R,
    ) -> PoolResult<R> {
        self.with_index(handle.index(), f)
    }

    /// Whether the instance behind `handle` is currently free
    pub fn is_free(&self, handle: &InstanceHandle<P::Instance>) -> PoolResult<bool> {
        let slots = self.slots.lock();
        match slots.entries.get(handle.index()) {
            Some(slot) => Ok(slot.in_pool),
            None => Err(self.unknown_instance(handle.index())),
        }
    }

    /// Template identity, used as the registry key
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Template every instance of this pool was created from
    pub fn template(&self) -> &P {
        &self.template
    }

    /// Placement context passed to `instantiate`, if any
    pub fn placement(&self) -> Option<&P::Placement> {
        self.placement.as_ref()
    }

    /// Free-instance lookup this pool was built with
    pub fn search_strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// Number of instances ever created by this pool
    pub fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Instances the next acquire could return without creating a new one
    pub fn free_count(&self) -> usize {
        self.slots
            .lock()
            .entries
            .iter()
            .filter(|slot| slot.in_pool && !slot.instance.is_destroyed())
            .count()
    }

    /// Instances currently handed out
    pub fn checked_out_count(&self) -> usize {
        self.slots.lock().entries.iter().filter(|slot| !slot.in_pool).count()
    }

    /// Get pool metrics
    pub fn get_metrics(&self) -> PoolMetrics {
        let slots = self.slots.lock();

        let mut checked_out = 0;
        let mut free = 0;
        let mut destroyed = 0;
        for slot in &slots.entries {
            let is_destroyed = slot.instance.is_destroyed();
            if is_destroyed {
                destroyed += 1;
            }
            if !slot.in_pool {
                checked_out += 1;
            } else if !is_destroyed {
                free += 1;
            }
        }

        self.metrics.get_metrics(checked_out, free, destroyed, slots.entries.len())
    }

    /// Export metrics
    pub fn export_metrics(&self) -> HashMap<String, String> {
        self.get_metrics().export()
    }

    /// Export metrics in Prometheus format, labelled with this pool's identity
    #[cfg(feature = "prometheus")]
    pub fn export_metrics_prometheus(&self, tags: Option<&HashMap<String, String>>) -> PoolResult<String> {
        MetricsExporter::export_prometheus(&self.get_metrics(), &self.identity, tags)
    }

    /// Get health status
    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus::from_metrics(&self.get_metrics(), self.high_utilization_threshold)
    }

    pub(crate) fn release_index(&self, index: usize) -> PoolResult<()> {
        let mut slots = self.slots.lock();

        let Some(slot) = slots.entries.get_mut(index) else {
            return Err(self.unknown_instance(index));
        };

        let was_free = slot.in_pool;
        slot.in_pool = true;
        slot.instance.on_despawn();

        if was_free {
            MetricsTracker::increment(&self.metrics.redundant_releases);
            debug!(pool = %self.identity, index, "released an instance that was already free");
        } else if self.strategy == SearchStrategy::FreeList {
            slots.free.push(index);
        }

        MetricsTracker::increment(&self.metrics.total_released);
        trace!(pool = %self.identity, index, "released instance");

        Ok(())
    }

    pub(crate) fn with_index<R>(&self, index: usize, f: impl FnOnce(&mut P::Instance) -> R) -> PoolResult<R> {
        let mut slots = self.slots.lock();
        match slots.entries.get_mut(index) {
            Some(slot) => Ok(f(&mut slot.instance)),
            None => Err(self.unknown_instance(index)),
        }
    }

    fn take_free(&self, slots: &mut Slots<P::Instance>) -> Option<usize> {
        let mut skipped = 0;

        let found = match self.strategy {
            SearchStrategy::LinearScan => slots.entries.iter().position(|slot| {
                if !slot.in_pool {
                    return false;
                }
                if slot.instance.is_destroyed() {
                    skipped += 1;
                    return false;
                }
                true
            }),
            SearchStrategy::FreeList => {
                let mut found = None;
                // Destroyed entries popped here are dropped from the stack for good.
                while let Some(index) = slots.free.pop() {
                    let Some(slot) = slots.entries.get(index) else {
                        continue;
                    };
                    if slot.instance.is_destroyed() {
                        skipped += 1;
                    } else if slot.in_pool {
                        found = Some(index);
                        break;
                    }
                }
                found
            }
        };

        if skipped > 0 {
            self.metrics.stale_skipped.fetch_add(skipped, Ordering::Relaxed);
            debug!(pool = %self.identity, skipped, "skipped destroyed instances");
        }

        found
    }

    fn unknown_instance(&self, index: usize) -> PoolError {
        warn!(pool = %self.identity, index, "no instance at this index");
        PoolError::UnknownInstance {
            key: self.identity.to_string(),
            index,
        }
    }
}

impl<P: Template> fmt::Debug for Pool<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("identity", &self.identity)
            .field("strategy", &self.strategy)
            .field("instances", &self.len())
            .finish()
    }
}

//! Metrics collection and export for pools

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "prometheus")]
use crate::errors::{PoolError, PoolResult};

/// Point-in-time metrics for one pool
///
/// # Examples
///
/// ```
/// use spawn_pool::{Pool, Poolable, Template};
///
/// struct Spark;
/// impl Poolable for Spark {}
///
/// struct SparkTemplate;
/// impl Template for SparkTemplate {
///     type Instance = Spark;
///     type Placement = ();
///     fn identity(&self) -> &str { "spark" }
///     fn instantiate(&self, _: Option<&()>) -> Spark { Spark }
/// }
///
/// let pool = Pool::new(SparkTemplate, 2);
/// let _spark = pool.acquire();
///
/// let metrics = pool.get_metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.checked_out, 1);
/// assert_eq!(metrics.free, 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolMetrics {
    /// Successful acquire calls
    pub total_acquired: usize,

    /// Successful release calls, redundant ones included
    pub total_released: usize,

    /// Instances created, both up front and on demand
    pub total_created: usize,

    /// Releases of an instance that was already free
    pub redundant_releases: usize,

    /// Destroyed instances passed over while looking for a free one
    pub stale_skipped: usize,

    /// Instances currently owned by the pool
    pub instances: usize,

    /// Instances currently handed out
    pub checked_out: usize,

    /// Instances the next acquire may return
    pub free: usize,

    /// Instances the engine reports as destroyed
    pub destroyed: usize,

    /// Checked-out share of the usable instances, i.e. checked-out plus
    /// free (0.0 to 1.0). Destroyed free instances do not count.
    pub utilization: f64,
}

impl PoolMetrics {
    /// Export metrics as a HashMap
    pub fn export(&self) -> HashMap<String, String> {
        let mut metrics = HashMap::new();
        metrics.insert("total_acquired".to_string(), self.total_acquired.to_string());
        metrics.insert("total_released".to_string(), self.total_released.to_string());
        metrics.insert("total_created".to_string(), self.total_created.to_string());
        metrics.insert("redundant_releases".to_string(), self.redundant_releases.to_string());
        metrics.insert("stale_skipped".to_string(), self.stale_skipped.to_string());
        metrics.insert("instances".to_string(), self.instances.to_string());
        metrics.insert("checked_out".to_string(), self.checked_out.to_string());
        metrics.insert("free".to_string(), self.free.to_string());
        metrics.insert("destroyed".to_string(), self.destroyed.to_string());
        metrics.insert("utilization".to_string(), format!("{:.2}", self.utilization));
        metrics
    }
}

/// Metrics exporter for Prometheus format
#[cfg(feature = "prometheus")]
pub struct MetricsExporter;

#[cfg(feature = "prometheus")]
impl MetricsExporter {
    /// Export one pool's metrics in Prometheus exposition format
    ///
    /// # Examples
    ///
    /// ```
    /// use spawn_pool::{MetricsExporter, PoolMetrics};
    /// use std::collections::HashMap;
    ///
    /// let metrics = PoolMetrics { checked_out: 4, ..Default::default() };
    ///
    /// let mut tags = HashMap::new();
    /// tags.insert("scene".to_string(), "arena".to_string());
    ///
    /// let output = MetricsExporter::export_prometheus(&metrics, "bullet", Some(&tags)).unwrap();
    /// assert!(output.contains("spawnpool_instances_checked_out"));
    /// assert!(output.contains("scene=\"arena\""));
    /// ```
    pub fn export_prometheus(
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String> {
        let registry = prometheus::Registry::new();
        Self::register(&registry, metrics, pool_name, tags)?;
        Self::encode(&registry)
    }

    /// Export several pools into one exposition, one label set per pool
    pub fn export_prometheus_all<'a, I>(
        pools: I,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<String>
    where
        I: IntoIterator<Item = (&'a str, &'a PoolMetrics)>,
    {
        let registry = prometheus::Registry::new();
        for (pool_name, metrics) in pools {
            Self::register(&registry, metrics, pool_name, tags)?;
        }
        Self::encode(&registry)
    }

    fn register(
        registry: &prometheus::Registry,
        metrics: &PoolMetrics,
        pool_name: &str,
        tags: Option<&HashMap<String, String>>,
    ) -> PoolResult<()> {
        let labels = Self::format_labels(pool_name, tags);

        // Gauge metrics
        Self::int_gauge(registry, &labels, "spawnpool_instances_total", "Instances owned by the pool", metrics.instances)?;
        Self::int_gauge(registry, &labels, "spawnpool_instances_checked_out", "Instances currently handed out", metrics.checked_out)?;
        Self::int_gauge(registry, &labels, "spawnpool_instances_free", "Instances available for acquire", metrics.free)?;
        Self::int_gauge(registry, &labels, "spawnpool_instances_destroyed", "Instances destroyed by the engine", metrics.destroyed)?;

        let utilization = prometheus::Gauge::with_opts(
            prometheus::Opts::new("spawnpool_utilization", "Checked-out ratio").const_labels(labels.clone()),
        )?;
        utilization.set(metrics.utilization);
        registry.register(Box::new(utilization))?;

        // Counter metrics
        Self::int_counter(registry, &labels, "spawnpool_acquired_total", "Total acquire calls", metrics.total_acquired)?;
        Self::int_counter(registry, &labels, "spawnpool_released_total", "Total release calls", metrics.total_released)?;
        Self::int_counter(registry, &labels, "spawnpool_created_total", "Total instances created", metrics.total_created)?;
        Self::int_counter(registry, &labels, "spawnpool_redundant_releases_total", "Releases of already free instances", metrics.redundant_releases)?;
        Self::int_counter(registry, &labels, "spawnpool_stale_skipped_total", "Destroyed instances skipped on acquire", metrics.stale_skipped)?;

        Ok(())
    }

    fn int_gauge(
        registry: &prometheus::Registry,
        labels: &HashMap<String, String>,
        name: &str,
        help: &str,
        value: usize,
    ) -> PoolResult<()> {
        let gauge = prometheus::IntGauge::with_opts(
            prometheus::Opts::new(name, help).const_labels(labels.clone()),
        )?;
        gauge.set(i64::try_from(value).unwrap_or(i64::MAX));
        registry.register(Box::new(gauge))?;
        Ok(())
    }

    fn int_counter(
        registry: &prometheus::Registry,
        labels: &HashMap<String, String>,
        name: &str,
        help: &str,
        value: usize,
    ) -> PoolResult<()> {
        let counter = prometheus::IntCounter::with_opts(
            prometheus::Opts::new(name, help).const_labels(labels.clone()),
        )?;
        counter.inc_by(value as u64);
        registry.register(Box::new(counter))?;
        Ok(())
    }

    fn encode(registry: &prometheus::Registry) -> PoolResult<String> {
        use prometheus::Encoder;

        let mut buffer = Vec::new();
        prometheus::TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| PoolError::Metrics(err.to_string()))
    }

    fn format_labels(pool_name: &str, tags: Option<&HashMap<String, String>>) -> HashMap<String, String> {
        let mut labels = HashMap::new();

        if let Some(tags) = tags {
            for (key, value) in tags {
                labels.insert(key.clone(), value.clone());
            }
        }
        labels.insert("pool".to_string(), pool_name.to_string());

        labels
    }
}

/// Internal metrics tracker
#[derive(Debug, Default)]
pub(crate) struct MetricsTracker {
    pub total_acquired: AtomicUsize,
    pub total_released: AtomicUsize,
    pub total_created: AtomicUsize,
    pub redundant_releases: AtomicUsize,
    pub stale_skipped: AtomicUsize,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_metrics(&self, checked_out: usize, free: usize, destroyed: usize, instances: usize) -> PoolMetrics {
        let usable = checked_out + free;
        let utilization = if usable > 0 {
            checked_out as f64 / usable as f64
        } else {
            0.0
        };

        PoolMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_released: self.total_released.load(Ordering::Relaxed),
            total_created: self.total_created.load(Ordering::Relaxed),
            redundant_releases: self.redundant_releases.load(Ordering::Relaxed),
            stale_skipped: self.stale_skipped.load(Ordering::Relaxed),
            instances,
            checked_out,
            free,
            destroyed,
            utilization,
        }
    }
}

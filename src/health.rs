//! Health reporting for pools

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::metrics::PoolMetrics;

/// Health status of a pool
///
/// # Examples
///
/// ```
/// use spawn_pool::{HealthStatus, PoolMetrics};
///
/// let metrics = PoolMetrics { instances: 4, checked_out: 1, free: 3, utilization: 0.25, ..Default::default() };
///
/// let health = HealthStatus::from_metrics(&metrics, 0.9);
/// assert!(health.is_healthy());
/// assert_eq!(health.free_instances, 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current checked-out ratio (0.0 to 1.0)
    pub utilization: f64,

    /// Free instances count
    pub free_instances: usize,

    /// Checked-out instances count
    pub checked_out_instances: usize,

    /// Instances the engine destroyed behind the pool's back
    pub destroyed_instances: usize,

    /// Total instances owned by the pool
    pub total_instances: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    /// Derive a health status from a metrics snapshot
    pub fn from_metrics(metrics: &PoolMetrics, high_utilization_threshold: f64) -> Self {
        let mut warnings = Vec::new();
        let mut is_healthy = true;

        if metrics.utilization > high_utilization_threshold {
            warnings.push(format!("High utilization: {:.1}%", metrics.utilization * 100.0));
            is_healthy = false;
        }

        // Next acquire will have to grow the pool
        if metrics.free == 0 && metrics.instances > 0 {
            warnings.push("No free instances".to_string());
        }

        if metrics.destroyed > 0 {
            warnings.push(format!("{} destroyed instance(s) still tracked", metrics.destroyed));
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization: metrics.utilization,
            free_instances: metrics.free,
            checked_out_instances: metrics.checked_out,
            destroyed_instances: metrics.destroyed,
            total_instances: metrics.instances,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}

//! Pool configuration options

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a pool looks for a free instance on acquire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SearchStrategy {
    /// Scan all instances in creation order and take the first free one.
    ///
    /// O(n) per acquire. Fine for the tens to low hundreds of instances a
    /// single template usually needs.
    #[default]
    LinearScan,

    /// Keep a stack of free indices; acquire pops, release pushes.
    ///
    /// O(1) per acquire. The most recently released instance is reused first.
    FreeList,
}

/// Configuration shared by pools and the registry
///
/// # Examples
///
/// ```
/// use spawn_pool::{PoolConfiguration, SearchStrategy};
///
/// let config = PoolConfiguration::new()
///     .with_default_initial_size(32)
///     .with_search_strategy(SearchStrategy::FreeList)
///     .with_high_utilization_threshold(0.75);
///
/// assert_eq!(config.default_initial_size, 32);
/// assert_eq!(config.search_strategy, SearchStrategy::FreeList);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PoolConfiguration {
    /// Number of instances the registry pre-creates when it lazily builds a pool
    pub default_initial_size: usize,

    /// Free-instance lookup used by every pool built with this configuration
    pub search_strategy: SearchStrategy,

    /// Checked-out ratio above which a pool reports itself unhealthy
    pub high_utilization_threshold: f64,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            default_initial_size: 10,
            search_strategy: SearchStrategy::LinearScan,
            high_utilization_threshold: 0.9,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the initial size used for lazily created pools
    ///
    /// # Examples
    ///
    /// ```
    /// use spawn_pool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_default_initial_size(0);
    /// assert_eq!(config.default_initial_size, 0);
    /// ```
    pub fn with_default_initial_size(mut self, size: usize) -> Self {
        self.default_initial_size = size;
        self
    }

    /// Set the free-instance search strategy
    pub fn with_search_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.search_strategy = strategy;
        self
    }

    /// Set the utilization ratio treated as unhealthy (clamped to 0.0..=1.0)
    pub fn with_high_utilization_threshold(mut self, threshold: f64) -> Self {
        self.high_utilization_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

//! # spawn_pool
//!
//! Object pools for game entities that are expensive to create. Instead of
//! destroying an entity when it is no longer needed, it is despawned and
//! kept for the next request of the same template.
//!
//! ## Features
//!
//! - [`Pool`]: a growable set of instances of one template, with
//!   spawn/despawn lifecycle hooks and reuse before growth
//! - [`PoolRegistry`]: one pool per template identity, created lazily and
//!   routed by the identity carried on every [`InstanceHandle`]
//! - Linear-scan or free-list lookup of free instances
//! - Tolerance of instances the engine destroyed behind the pool's back
//! - Metrics, Prometheus export and health reporting
//! - Logging of every failure through `tracing`
//!
//! ## Quick Start
//!
//! ```rust
//! use spawn_pool::{PoolRegistry, Poolable, Template};
//!
//! #[derive(Clone)]
//! struct Prefab(&'static str);
//!
//! #[derive(Default)]
//! struct Explosion {
//!     playing: bool,
//! }
//!
//! impl Poolable for Explosion {
//!     fn on_spawn(&mut self) {
//!         self.playing = true;
//!     }
//!     fn on_despawn(&mut self) {
//!         self.playing = false;
//!     }
//! }
//!
//! impl Template for Prefab {
//!     type Instance = Explosion;
//!     type Placement = ();
//!     fn identity(&self) -> &str { self.0 }
//!     fn instantiate(&self, _: Option<&()>) -> Explosion { Explosion::default() }
//! }
//!
//! let registry = PoolRegistry::new();
//! let boom = registry.acquire(&Prefab("explosion")).unwrap();
//! assert!(registry.with_instance(&boom, |e| e.playing).unwrap());
//!
//! // Hand it back once the effect has finished
//! registry.release(&boom).unwrap();
//! ```

mod config;
mod errors;
mod health;
mod metrics;
mod pool;
mod registry;
mod template;

pub use config::{PoolConfiguration, SearchStrategy};
pub use errors::{PoolError, PoolResult};
pub use health::HealthStatus;
#[cfg(feature = "prometheus")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{InstanceHandle, Pool};
pub use registry::PoolRegistry;
pub use template::{Poolable, Template};

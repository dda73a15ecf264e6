// spawn_pool demo
// A few seconds of a fixed-tick shooter: projectiles are acquired from the
// registry and hand themselves back once their lifetime runs out.
//
// Run with: RUST_LOG=spawn_pool=debug cargo run

use spawn_pool::{InstanceHandle, PoolConfiguration, PoolRegistry, Poolable, Template};
use tracing_subscriber::EnvFilter;

const TICKS: u32 = 120;

#[derive(Clone)]
struct ProjectilePrefab {
    name: &'static str,
    lifetime: u32,
}

struct Projectile {
    lifetime: u32,
    remaining: u32,
    active: bool,
}

impl Poolable for Projectile {
    fn on_spawn(&mut self) {
        self.remaining = self.lifetime;
        self.active = true;
    }

    fn on_despawn(&mut self) {
        self.active = false;
    }
}

impl Template for ProjectilePrefab {
    type Instance = Projectile;
    type Placement = ();

    fn identity(&self) -> &str {
        self.name
    }

    fn instantiate(&self, _placement: Option<&()>) -> Projectile {
        Projectile {
            lifetime: self.lifetime,
            remaining: 0,
            active: false,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("=== spawn_pool demo ===");

    let registry = PoolRegistry::with_configuration(PoolConfiguration::new().with_default_initial_size(4));
    let bullet = ProjectilePrefab { name: "bullet", lifetime: 9 };
    let rocket = ProjectilePrefab { name: "rocket", lifetime: 30 };

    let mut live: Vec<InstanceHandle<Projectile>> = Vec::new();

    for tick in 0..TICKS {
        if tick % 2 == 0 {
            live.extend(registry.try_acquire(&bullet));
        }
        if tick % 15 == 0 {
            live.extend(registry.try_acquire(&rocket));
        }

        // Projectiles whose time ran out release themselves
        live.retain(|handle| {
            let expired = registry
                .with_instance(handle, |projectile| {
                    projectile.remaining = projectile.remaining.saturating_sub(1);
                    projectile.remaining == 0
                })
                .unwrap_or(true);
            if expired {
                registry.try_release(handle);
            }
            !expired
        });
    }

    let active = live
        .iter()
        .filter(|handle| registry.with_instance(*handle, |projectile| projectile.active).unwrap_or(false))
        .count();
    println!("Live projectiles after {TICKS} ticks: {active}");
    for (pool, metrics) in registry.metrics_snapshot() {
        println!(
            "  {pool}: {} instances, {} created, {} acquired, {} released",
            metrics.instances, metrics.total_created, metrics.total_acquired, metrics.total_released
        );
    }
}

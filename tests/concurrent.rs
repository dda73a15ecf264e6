use spawn_pool::*;
use std::collections::HashSet;

struct Particle;
impl Poolable for Particle {}

#[derive(Clone)]
struct ParticlePrefab(&'static str);

impl Template for ParticlePrefab {
    type Instance = Particle;
    type Placement = ();

    fn identity(&self) -> &str {
        self.0
    }

    fn instantiate(&self, _placement: Option<&()>) -> Particle {
        Particle
    }
}

const THREADS: usize = 8;
const PER_THREAD: usize = 64;

fn acquire_from_threads(registry: &PoolRegistry, template: &ParticlePrefab) -> Vec<InstanceHandle<Particle>> {
    crossbeam::thread::scope(|scope| {
        let workers: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|_| {
                    (0..PER_THREAD)
                        .map(|_| registry.acquire_with_size(template, 16).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    })
    .unwrap()
}

#[test]
fn test_concurrent_acquire_never_duplicates() {
    for strategy in [SearchStrategy::LinearScan, SearchStrategy::FreeList] {
        let registry = PoolRegistry::with_configuration(PoolConfiguration::new().with_search_strategy(strategy));
        let template = ParticlePrefab("spark");

        let handles = acquire_from_threads(&registry, &template);
        let distinct: HashSet<_> = handles.iter().cloned().collect();

        assert_eq!(distinct.len(), THREADS * PER_THREAD);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_pool::<ParticlePrefab>("spark").unwrap().len(), THREADS * PER_THREAD);
    }
}

#[test]
fn test_concurrent_release_then_reuse() {
    let registry = PoolRegistry::new();
    let template = ParticlePrefab("smoke");

    let handles = acquire_from_threads(&registry, &template);

    crossbeam::thread::scope(|scope| {
        for chunk in handles.chunks(PER_THREAD) {
            let registry = &registry;
            scope.spawn(move |_| {
                for handle in chunk {
                    registry.release(handle).unwrap();
                }
            });
        }
    })
    .unwrap();

    let pool = registry.get_pool::<ParticlePrefab>("smoke").unwrap();
    assert_eq!(pool.free_count(), THREADS * PER_THREAD);

    // Everything is free again, so a second wave creates nothing new
    acquire_from_threads(&registry, &template);
    assert_eq!(pool.len(), THREADS * PER_THREAD);
    assert_eq!(pool.get_metrics().total_created, THREADS * PER_THREAD);
}

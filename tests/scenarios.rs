use spawn_pool::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct Crate {
    spawns: usize,
    despawns: usize,
}

impl Poolable for Crate {
    fn on_spawn(&mut self) {
        self.spawns += 1;
    }

    fn on_despawn(&mut self) {
        self.despawns += 1;
    }
}

#[derive(Clone)]
struct CratePrefab {
    name: &'static str,
    created: Arc<AtomicUsize>,
}

impl CratePrefab {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl Template for CratePrefab {
    type Instance = Crate;
    type Placement = ();

    fn identity(&self) -> &str {
        self.name
    }

    fn instantiate(&self, _placement: Option<&()>) -> Crate {
        self.created.fetch_add(1, Ordering::Relaxed);
        Crate::default()
    }
}

#[test]
fn test_no_duplicate_checkout() {
    for strategy in [SearchStrategy::LinearScan, SearchStrategy::FreeList] {
        let config = PoolConfiguration::new().with_search_strategy(strategy);
        let pool = Pool::with_options(CratePrefab::new("crate"), 4, None, &config);

        let handles: HashSet<_> = (0..20).map(|_| pool.acquire()).collect();
        assert_eq!(handles.len(), 20);
        assert_eq!(pool.checked_out_count(), 20);
    }
}

#[test]
fn test_reuse_before_growth() {
    let template = CratePrefab::new("crate");
    let pool = Pool::new(template.clone(), 3);

    let a = pool.acquire();
    let _b = pool.acquire();
    pool.release(&a).unwrap();

    for _ in 0..5 {
        let handle = pool.acquire();
        pool.release(&handle).unwrap();
    }

    assert_eq!(template.created(), 3);
    assert_eq!(pool.len(), 3);
}

#[test]
fn test_double_release_is_harmless() {
    let registry = PoolRegistry::new();
    let handle = registry.acquire_with_size(&CratePrefab::new("crate"), 1).unwrap();

    registry.release(&handle).unwrap();
    registry.release(&handle).unwrap();

    let pool = registry.get_pool::<CratePrefab>("crate").unwrap();
    assert!(pool.is_free(&handle).unwrap());
    assert_eq!(registry.with_instance(&handle, |c| c.despawns).unwrap(), 3);
}

#[test]
fn test_lazy_pool_creation_leaves_other_pools_alone() {
    let registry = PoolRegistry::new();
    let barrel = CratePrefab::new("barrel");
    let chest = CratePrefab::new("chest");

    let held = registry.acquire_with_size(&barrel, 2).unwrap();
    let before = registry.get_pool::<CratePrefab>("barrel").unwrap().get_metrics();

    registry.acquire_with_size(&chest, 6).unwrap();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.get_pool::<CratePrefab>("chest").unwrap().len(), 6);
    assert_eq!(registry.get_pool::<CratePrefab>("barrel").unwrap().get_metrics(), before);
    assert!(!registry.get_pool::<CratePrefab>("barrel").unwrap().is_free(&held).unwrap());
    assert_eq!(chest.created(), 6);
}

#[test]
fn test_round_trip_returns_instance_to_free_set() {
    let registry = PoolRegistry::new();
    let template = CratePrefab::new("crate");

    let handle = registry.acquire_with_size(&template, 2).unwrap();
    registry.release(&handle).unwrap();

    let pool = registry.get_pool::<CratePrefab>("crate").unwrap();
    assert!(pool.is_free(&handle).unwrap());
    assert_eq!(registry.acquire(&template).unwrap(), handle);
}

#[test]
fn test_three_preallocated_then_growth() {
    let template = CratePrefab::new("x");
    let pool = Pool::new(template.clone(), 3);

    let handles: Vec<_> = (0..3).map(|_| pool.acquire()).collect();
    let distinct: HashSet<_> = handles.iter().cloned().collect();
    assert_eq!(distinct.len(), 3);
    for handle in &handles {
        assert!(!pool.is_free(handle).unwrap());
    }
    assert_eq!(template.created(), 3);

    let fourth = pool.acquire();
    assert_eq!(fourth.index(), 3);
    assert_eq!(template.created(), 4);
    assert_eq!(pool.len(), 4);
}

#[test]
fn test_release_into_unregistered_pool() {
    let registry = PoolRegistry::new();
    registry.acquire_with_size(&CratePrefab::new("x"), 10).unwrap();

    // Same identity, never acquired through the registry: routed by key
    let outsider = Pool::new(CratePrefab::new("x"), 1);
    let matching = outsider.acquire();
    registry.release(&matching).unwrap();

    let other = Pool::new(CratePrefab::new("y"), 1);
    let unregistered = other.acquire();
    assert_eq!(
        registry.release(&unregistered).unwrap_err(),
        PoolError::NoSuchPool { key: "y".to_string() }
    );
    assert!(!other.is_free(&unregistered).unwrap());
    assert!(!registry.contains("y"));
}

#[test]
fn test_empty_identity_creates_no_pool() {
    let registry = PoolRegistry::new();
    let nameless = CratePrefab::new("");

    assert_eq!(registry.acquire(&nameless).unwrap_err(), PoolError::MissingIdentity);
    assert!(registry.is_empty());
    assert_eq!(nameless.created(), 0);
}

#[test]
fn test_single_capacity_pool_reuses_instance() {
    let registry = PoolRegistry::new();
    let template = CratePrefab::new("solo");

    let first = registry.acquire_with_size(&template, 1).unwrap();
    registry.release(&first).unwrap();
    let second = registry.acquire(&template).unwrap();

    assert_eq!(first, second);
    assert_eq!(template.created(), 1);
    assert_eq!(registry.with_instance(&second, |c| c.spawns).unwrap(), 2);
}

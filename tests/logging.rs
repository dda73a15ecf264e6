use parking_lot::Mutex;
use spawn_pool::*;
use std::io;
use std::sync::Arc;
use tracing::Level;

struct Coin;
impl Poolable for Coin {}

#[derive(Clone)]
struct CoinPrefab(&'static str);

impl Template for CoinPrefab {
    type Instance = Coin;
    type Placement = ();

    fn identity(&self) -> &str {
        self.0
    }

    fn instantiate(&self, _placement: Option<&()>) -> Coin {
        Coin
    }
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn warnings(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .filter(|line| line.contains("WARN"))
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a subscriber that records WARN and above into the returned log.
fn capture_warnings(f: impl FnOnce()) -> CapturedLog {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    tracing::subscriber::with_default(subscriber, f);
    log
}

#[test]
fn test_empty_identity_acquire_logs_one_warning() {
    let registry = PoolRegistry::new();

    let log = capture_warnings(|| {
        assert!(registry.try_acquire(&CoinPrefab("")).is_none());
    });

    let warnings = log.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("empty identity"));
}

#[test]
fn test_release_to_unregistered_pool_logs_one_warning() {
    let registry = PoolRegistry::new();
    registry.acquire_with_size(&CoinPrefab("gold"), 1).unwrap();
    let stray = Pool::new(CoinPrefab("silver"), 1);
    let handle = stray.acquire();

    let log = capture_warnings(|| {
        assert!(!registry.try_release(&handle));
    });

    let warnings = log.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("no pool registered"));
    assert!(warnings[0].contains("silver"));
}

#[test]
fn test_release_with_empty_identity_logs_one_warning() {
    let registry = PoolRegistry::new();
    let stray = Pool::new(CoinPrefab(""), 1);
    let handle = stray.acquire();

    let log = capture_warnings(|| {
        assert_eq!(registry.release(&handle).unwrap_err(), PoolError::MissingIdentity);
    });

    assert_eq!(log.warnings().len(), 1);
}

#[test]
fn test_successful_round_trip_logs_no_warning() {
    let registry = PoolRegistry::new();

    let log = capture_warnings(|| {
        let handle = registry.acquire(&CoinPrefab("gold")).unwrap();
        registry.release(&handle).unwrap();
        registry.release(&handle).unwrap();
    });

    assert!(log.warnings().is_empty());
}

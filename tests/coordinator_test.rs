// tests/coordinator_test.rs

use prism_scan::core::aggregator::{WeightProfileName, WeightProfiles};
use prism_scan::core::coordinator::{ScanCoordinator, ScanRequest};
use prism_scan::core::error::ScanError;
use prism_scan::core::models::ProbeResult;
use prism_scan::core::scanner::{Probe, ProbeRegistry};
use prism_scan::core::store::ResultStore;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

const PROBE_COUNT: usize = 22;

/// Returns whatever `score` currently holds and counts its calls.
struct Stub {
    name: &'static str,
    score: Arc<AtomicU8>,
    details: &'static str,
    calls: Arc<AtomicUsize>,
}

impl Probe for Stub {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, _url: &str) -> ProbeResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ProbeResult::new(self.score.load(Ordering::SeqCst), self.details)
    }
}

struct Panicking;

impl Probe for Panicking {
    fn name(&self) -> &'static str {
        "Broken Probe"
    }

    fn run(&self, _url: &str) -> ProbeResult {
        panic!("socket exploded");
    }
}

struct Sleepy;

impl Probe for Sleepy {
    fn name(&self) -> &'static str {
        "Sleepy Probe"
    }

    fn run(&self, _url: &str) -> ProbeResult {
        std::thread::sleep(Duration::from_millis(300));
        ProbeResult::new(10, "late")
    }
}

/// Sleeps for `delay`, then records the URL it was handed.
struct Recorder {
    name: &'static str,
    delay: Duration,
    seen: Arc<Mutex<Vec<(&'static str, String)>>>,
}

impl Probe for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, url: &str) -> ProbeResult {
        std::thread::sleep(self.delay);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((self.name, url.to_string()));
        }
        ProbeResult::new(7, format!("saw {}", url))
    }
}

fn staggered_registry(seen: &Arc<Mutex<Vec<(&'static str, String)>>>) -> ProbeRegistry {
    ProbeRegistry::new()
        .register(Recorder { name: "slow", delay: Duration::from_millis(200), seen: Arc::clone(seen) })
        .register(Recorder { name: "fast", delay: Duration::from_millis(150), seen: Arc::clone(seen) })
}

const NAMES: [&str; PROBE_COUNT] = [
    "p01", "p02", "p03", "p04", "p05", "p06", "p07", "p08", "p09", "p10", "p11", "p12", "p13",
    "p14", "p15", "p16", "p17", "p18", "p19", "p20", "p21", "p22",
];

/// 22 stubs sharing one adjustable score and one call counter.
fn stub_registry(score: &Arc<AtomicU8>, details: &'static str, calls: &Arc<AtomicUsize>) -> ProbeRegistry {
    NAMES.into_iter().fold(ProbeRegistry::new(), |registry, name| {
        registry.register(Stub {
            name,
            score: Arc::clone(score),
            details,
            calls: Arc::clone(calls),
        })
    })
}

async fn coordinator(registry: ProbeRegistry) -> ScanCoordinator {
    let store = ResultStore::in_memory().await.unwrap();
    let profiles = WeightProfiles::predefined(&mut StdRng::seed_from_u64(42));
    ScanCoordinator::new(registry, profiles, store, None)
}

#[tokio::test]
async fn all_tens_give_tens_and_adversarial_one() {
    let score = Arc::new(AtomicU8::new(10));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator(stub_registry(&score, "ok", &calls)).await;

    let record = coordinator.run_scan("https://example.com/").await.unwrap();
    assert_eq!(record.scores.normal, 10);
    assert_eq!(record.scores.privacy, 10);
    assert_eq!(record.scores.security, 10);
    assert_eq!(record.scores.random, 10);
    assert_eq!(record.scores.adversarial, 1);
    assert_eq!(record.probes.len(), PROBE_COUNT);
    assert_eq!(record.probes[0].name, "p01");
    assert_eq!(record.probes[21].result, "Score: 10/10 - ok");
    assert_eq!(calls.load(Ordering::SeqCst), PROBE_COUNT);
}

#[tokio::test]
async fn all_ones_give_ones_and_adversarial_ten() {
    let score = Arc::new(AtomicU8::new(1));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator(stub_registry(&score, "fail", &calls)).await;

    let record = coordinator.run_scan("https://example.com").await.unwrap();
    assert_eq!(record.scores.normal, 1);
    assert_eq!(record.scores.privacy, 1);
    assert_eq!(record.scores.security, 1);
    assert_eq!(record.scores.random, 1);
    assert_eq!(record.scores.adversarial, 10);
}

#[tokio::test]
async fn second_request_for_the_same_key_is_a_cache_hit() {
    let score = Arc::new(AtomicU8::new(9));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator(stub_registry(&score, "first", &calls)).await;

    let first = coordinator.run_scan("https://example.com/page?a=1").await.unwrap();
    score.store(2, Ordering::SeqCst);
    let second = coordinator.run_scan("https://example.com/page/?b=2").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second.url, "https://example.com/page");
    assert_eq!(second.scores.normal, 9);
    assert_eq!(calls.load(Ordering::SeqCst), PROBE_COUNT);
}

#[tokio::test]
async fn repeated_scans_keep_one_row_per_url() {
    let store = ResultStore::in_memory().await.unwrap();
    let profiles = WeightProfiles::predefined(&mut StdRng::seed_from_u64(1));
    let score = Arc::new(AtomicU8::new(3));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator =
        ScanCoordinator::new(stub_registry(&score, "run", &calls), profiles, store.clone(), None);

    let started = chrono::Utc::now();
    for next in [3u8, 7, 8] {
        score.store(next, Ordering::SeqCst);
        coordinator.run_scan("https://example.com/?run=again").await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 1);
    let stored = store.get("https://example.com/").await.unwrap().unwrap();
    assert_eq!(stored.scores.normal, 3);
    assert_eq!(stored.scores.adversarial, 8);
    assert!(stored.timestamp >= started);
    assert_eq!(calls.load(Ordering::SeqCst), PROBE_COUNT);

    // Once the record is gone the next request recomputes and writes again.
    store.clear().await.unwrap();
    let fresh = coordinator.run_scan("https://example.com").await.unwrap();
    assert_eq!(fresh.scores.normal, 8);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_requests_for_one_url_compute_once() {
    let score = Arc::new(AtomicU8::new(8));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = Arc::new(coordinator(stub_registry(&score, "ok", &calls)).await);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator.run_scan(&format!("https://example.com/?visit={}", i)).await
            })
        })
        .collect();
    let mut records = Vec::new();
    for handle in handles {
        records.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), PROBE_COUNT);
    assert!(records.windows(2).all(|pair| pair[0] == pair[1]));
}

#[tokio::test]
async fn a_panicking_probe_fails_the_scan_and_stores_nothing() {
    let score = Arc::new(AtomicU8::new(10));
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = stub_registry(&score, "ok", &calls).register(Panicking);
    let store = ResultStore::in_memory().await.unwrap();
    let coordinator =
        ScanCoordinator::new(registry, WeightProfiles::uniform(PROBE_COUNT + 1), store, None);

    let err = coordinator.run_scan("https://example.com").await.unwrap_err();
    assert!(!err.is_client_error());
    match err {
        ScanError::ProbeContract { probe, reason } => {
            assert_eq!(probe, "Broken Probe");
            assert!(reason.contains("socket exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(coordinator.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn mismatched_weights_are_a_configuration_error() {
    let score = Arc::new(AtomicU8::new(5));
    let calls = Arc::new(AtomicUsize::new(0));
    let store = ResultStore::in_memory().await.unwrap();
    let coordinator = ScanCoordinator::new(
        stub_registry(&score, "ok", &calls),
        WeightProfiles::uniform(3),
        store,
        None,
    );

    let err = coordinator.run_scan("https://example.com").await.unwrap_err();
    assert!(matches!(err, ScanError::WeightMismatch { weights: 3, scores: 22, .. }));
    assert!(!err.is_client_error());
    assert_eq!(coordinator.store().count().await.unwrap(), 0);
}

#[tokio::test]
async fn deadline_turns_a_slow_probe_into_an_error() {
    let store = ResultStore::in_memory().await.unwrap();
    let registry = ProbeRegistry::new().register(Sleepy);
    let coordinator = ScanCoordinator::new(
        registry,
        WeightProfiles::uniform(1),
        store,
        Some(Duration::from_millis(20)),
    );

    let err = coordinator.run_scan("https://example.com").await.unwrap_err();
    assert!(matches!(err, ScanError::ProbeDeadline { ref probe, .. } if probe == "Sleepy Probe"));
}

#[tokio::test]
async fn submit_reports_the_requested_profile() {
    let score = Arc::new(AtomicU8::new(10));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator(stub_registry(&score, "ok", &calls)).await;

    let request = ScanRequest::parse("https://example.com", Some("SECURITY")).unwrap();
    let outcome = coordinator.submit(request).await.unwrap();
    assert_eq!(outcome.profile, WeightProfileName::Security);
    assert_eq!(outcome.headline, outcome.record.scores.security);

    let err = ScanRequest::parse("https://example.com", Some("stealth")).unwrap_err();
    assert!(err.is_client_error());
}

#[tokio::test]
async fn list_all_returns_newest_first() {
    let score = Arc::new(AtomicU8::new(6));
    let calls = Arc::new(AtomicUsize::new(0));
    let coordinator = coordinator(stub_registry(&score, "ok", &calls)).await;

    coordinator.run_scan("https://a.example").await.unwrap();
    tokio::time::sleep(Duration::from_millis(2)).await;
    coordinator.run_scan("https://b.example").await.unwrap();

    let urls: Vec<String> = coordinator.list_all().await.unwrap().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, ["https://b.example/", "https://a.example/"]);
}

#[tokio::test]
async fn checks_get_the_submitted_url_and_results_keep_registration_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = ResultStore::in_memory().await.unwrap();
    let coordinator =
        ScanCoordinator::new(staggered_registry(&seen), WeightProfiles::uniform(2), store, None);

    let record = coordinator.run_scan("https://example.com/p/?q=1").await.unwrap();

    // The fast one finishes first, yet the stored order is the registered one.
    let finished: Vec<&str> = seen.lock().unwrap().iter().map(|(name, _)| *name).collect();
    assert_eq!(finished, ["fast", "slow"]);
    let stored: Vec<&str> = record.probes.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(stored, ["slow", "fast"]);

    assert!(seen.lock().unwrap().iter().all(|(_, url)| url == "https://example.com/p/?q=1"));
    assert_eq!(record.probes[0].result, "Score: 7/10 - saw https://example.com/p/?q=1");
    assert_eq!(record.url, "https://example.com/p");

    // Parallel: about the slowest delay, well under the 0.35s sum.
    assert!(record.duration >= 0.2, "duration {}", record.duration);
    assert!(record.duration < 0.35, "duration {}", record.duration);
}

#[tokio::test]
async fn surrounding_whitespace_reaches_the_checks_but_not_the_key() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let store = ResultStore::in_memory().await.unwrap();
    let coordinator =
        ScanCoordinator::new(staggered_registry(&seen), WeightProfiles::uniform(2), store, None);

    let record = coordinator.run_scan("  https://example.com/p?q=1 ").await.unwrap();

    assert_eq!(record.url, "https://example.com/p");
    assert!(seen.lock().unwrap().iter().all(|(_, url)| url == "  https://example.com/p?q=1 "));
}

// src/core/scanner/mod.rs

// The probe layer: the `Probe` contract, the ordered registry the coordinator
// fans out over, and the built-in heuristic probes grouped by concern.
pub mod content_scanner;
pub mod fingerprint_scanner;
pub mod headers_scanner;
pub mod page;
pub mod privacy_scanner;
pub mod server_scanner;
pub mod ssl_scanner;

use crate::config::Settings;
use crate::core::models::{MAX_SCORE, MIN_SCORE, ProbeResult};
use self::page::{FetchOptions, Page};
use std::sync::Arc;
use tracing::{debug, info, warn};

// --- Probe Contract ---

/// One independent heuristic check.
///
/// `run` is blocking and must never panic: network errors, timeouts and
/// parse failures are reported as `ProbeResult::failure`, never raised.
/// A panic is treated by the coordinator as a broken contract and fails the
/// whole scan.
pub trait Probe: Send + Sync {
    /// Human-readable name stored next to the result line.
    fn name(&self) -> &'static str;

    /// Checks `url` exactly as submitted, query string included.
    fn run(&self, url: &str) -> ProbeResult;
}

/// The fixed, ordered list of probes run for every scan.
///
/// Weight profiles are positional, so registration order is part of the
/// contract with the aggregator.
#[derive(Clone, Default)]
pub struct ProbeRegistry {
    probes: Vec<Arc<dyn Probe>>,
}

impl ProbeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Arc::new(probe));
        self
    }

    pub fn len(&self) -> usize {
        self.probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Probe>> {
        self.probes.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.probes.iter().map(|p| p.name()).collect()
    }
}

impl std::fmt::Debug for ProbeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// The 22 built-in probes, in the order the predefined weight profiles expect.
pub fn default_registry(settings: &Settings) -> ProbeRegistry {
    let options = settings.fetch_options();
    let page = |name: &'static str, assess: Assessment| PageProbe::new(name, options.clone(), assess);

    ProbeRegistry::new()
        .register(page("Passive XSS Security Scan", content_scanner::assess_xss))
        .register(page(
            "Passive Vulnerability Cross-Reference Scan",
            fingerprint_scanner::assess_vulnerabilities,
        ))
        .register(page(
            "Passive Privacy Tracker Script Scan",
            privacy_scanner::assess_tracker_scripts,
        ))
        .register(page(
            "Passive Privacy Third-Party Script Evaluation Scan",
            privacy_scanner::assess_third_party_scripts,
        ))
        .register(ssl_scanner::CertificateProbe::new(options.timeout))
        .register(page("Passive SQL Injection Security Scan", content_scanner::assess_sql_injection))
        .register(page("Passive Security Headers Scan", headers_scanner::assess_security_headers))
        .register(page("Passive Privacy & Tracker Audit Scan", privacy_scanner::assess_tracker_audit))
        .register(server_scanner::PerformanceProbe::new(options.clone()))
        .register(page(
            "Passive Outdated Plugin Security Scan",
            fingerprint_scanner::assess_outdated_plugins,
        ))
        .register(page("Passive Mixed Content Detection Scan", content_scanner::assess_mixed_content))
        .register(server_scanner::DirectoryListingProbe::new(
            options.with_timeout(options.timeout / 2),
        ))
        .register(page("Passive CSRF Security Scan", content_scanner::assess_csrf))
        .register(page("Passive CSP Security Scan", headers_scanner::assess_csp))
        .register(ssl_scanner::HttpsProbe::new(options.clone()))
        .register(page(
            "Passive Third-Party Data Collection Scan",
            privacy_scanner::assess_data_collection,
        ))
        .register(page("Passive Tracker Detection Scan", privacy_scanner::assess_tracker_detection))
        .register(page(
            "Passive Fingerprinting Detection Scan",
            fingerprint_scanner::assess_fingerprinting,
        ))
        .register(
            page("Passive Referrer & DNT Analysis Scan", privacy_scanner::assess_referrer_dnt)
                .with_request_headers(privacy_scanner::DNT_REQUEST),
        )
        .register(page("Passive Data Leakage HTTP Headers Scan", headers_scanner::assess_data_leakage))
        .register(
            page("Passive Do Not Track Support Scan", privacy_scanner::assess_dnt_support)
                .with_request_headers(privacy_scanner::DNT_REQUEST),
        )
        .register(page("Passive Cookie Privacy Scan", privacy_scanner::assess_cookie_privacy))
}

// --- Page Probes ---

pub type Assessment = fn(&Page) -> ProbeResult;

/// A probe that fetches the page once and scores it with a pure function.
pub struct PageProbe {
    name: &'static str,
    options: FetchOptions,
    request_headers: &'static [(&'static str, &'static str)],
    assess: Assessment,
}

impl PageProbe {
    pub fn new(name: &'static str, options: FetchOptions, assess: Assessment) -> Self {
        Self { name, options, request_headers: &[], assess }
    }

    pub fn with_request_headers(mut self, headers: &'static [(&'static str, &'static str)]) -> Self {
        self.request_headers = headers;
        self
    }
}

impl Probe for PageProbe {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&self, url: &str) -> ProbeResult {
        info!(probe = self.name, target = url, "Starting probe.");
        match Page::fetch_with(url, &self.options, self.request_headers) {
            Ok(page) => {
                let result = (self.assess)(&page);
                debug!(probe = self.name, score = result.score, "Probe finished.");
                result
            }
            Err(diagnostic) => {
                warn!(probe = self.name, target = url, %diagnostic, "Probe could not fetch the page.");
                ProbeResult::failure(diagnostic)
            }
        }
    }
}

// --- Scoring Helpers ---

/// The closing line appended to a probe's notes, picked by final score.
#[derive(Debug, Clone, Copy)]
pub struct Verdicts {
    pub clean: &'static str,
    pub moderate: &'static str,
    pub high: &'static str,
}

/// Starts at 10, subtracts penalties and collects notes along the way.
#[derive(Debug, Default)]
pub struct Tally {
    deduction: i32,
    notes: Vec<String>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a finding and its penalty. The penalty is appended to the note.
    pub fn deduct(&mut self, points: i32, note: impl AsRef<str>) {
        self.deduction += points;
        self.notes.push(format!("{} (-{})", note.as_ref(), points));
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn score(&self) -> u8 {
        clamp_score(MAX_SCORE as i32 - self.deduction)
    }

    pub fn finish(mut self, verdicts: &Verdicts) -> ProbeResult {
        let score = self.score();
        let verdict = if score == MAX_SCORE {
            verdicts.clean
        } else if score < 5 {
            verdicts.high
        } else {
            verdicts.moderate
        };
        self.notes.push(verdict.to_string());
        ProbeResult::new(score, self.notes)
    }
}

pub fn clamp_score(raw: i32) -> u8 {
    raw.clamp(MIN_SCORE as i32, MAX_SCORE as i32) as u8
}

/// Lists at most three examples, with an ellipsis when there are more.
pub fn sample(items: &[String]) -> String {
    let mut shown = items.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > 3 {
        shown.push_str(", ...");
    }
    shown
}

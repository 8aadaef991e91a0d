// src/core/coordinator.rs

//! Scan orchestration: cache lookup, concurrent probe fan-out, scoring and
//! persistence, serialized per normalized URL.

use crate::core::aggregator::{WeightProfileName, WeightProfiles, score_all, select_profile};
use crate::core::error::{Result, ScanError};
use crate::core::models::{ProbeEntry, ProbeResult, ScanRecord};
use crate::core::normalizer::normalize;
use crate::core::scanner::ProbeRegistry;
use crate::core::scoring::{format_result, parse_line};
use crate::core::store::ResultStore;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::{JoinError, spawn_blocking};
use tracing::{debug, error, info, warn};
use url::Url;

/// A scan request carrying its own weight profile. There is no shared
/// "current profile": two concurrent requests never see each other's choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    pub url: String,
    pub profile: WeightProfileName,
}

impl ScanRequest {
    pub fn new(url: impl Into<String>, profile: WeightProfileName) -> Self {
        Self { url: url.into(), profile }
    }

    /// Builds a request from user input, defaulting to the `normal` profile.
    pub fn parse(url: &str, profile: Option<&str>) -> Result<Self> {
        let profile = profile.map(select_profile).transpose()?.unwrap_or_default();
        Ok(Self::new(url, profile))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    pub record: ScanRecord,
    pub profile: WeightProfileName,
    /// The aggregate computed with `profile`.
    pub headline: u8,
}

pub struct ScanCoordinator {
    registry: ProbeRegistry,
    profiles: WeightProfiles,
    store: ResultStore,
    deadline: Option<Duration>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ScanCoordinator {
    /// `deadline` bounds how long the coordinator waits for any single probe.
    /// `None` waits indefinitely and relies on each probe's own timeouts.
    pub fn new(
        registry: ProbeRegistry,
        profiles: WeightProfiles,
        store: ResultStore,
        deadline: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            profiles,
            store,
            deadline,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Every stored record, most recently written first.
    pub async fn list_all(&self) -> Result<Vec<ScanRecord>> {
        self.store.list_all().await
    }

    pub async fn submit(&self, request: ScanRequest) -> Result<ScanOutcome> {
        let record = self.run_scan(&request.url).await?;
        let headline = record.scores.for_profile(request.profile);
        Ok(ScanOutcome { record, profile: request.profile, headline })
    }

    /// Returns the stored record for `url`, computing and storing it first on
    /// a cache miss. Probes see `url` exactly as given; the store sees its
    /// normalized key.
    pub async fn run_scan(&self, url: &str) -> Result<ScanRecord> {
        Url::parse(url).map_err(|e| ScanError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let key = normalize(url);
        info!(target = %url, key = %key, "Scan requested.");

        let gate = self.gate(&key);
        let outcome = {
            let _held = gate.lock().await;
            self.scan_locked(url, &key).await
        };
        self.release(&key, gate);
        outcome
    }

    async fn scan_locked(&self, url: &str, key: &str) -> Result<ScanRecord> {
        if let Some(record) = self.store.get(key).await? {
            info!(key, "Cache hit, returning stored record.");
            return Ok(record);
        }

        let started = Instant::now();
        let results = self.fan_out(url).await?;
        let duration = started.elapsed().as_secs_f64();
        info!(key, probes = results.len(), duration_secs = duration, "All probes finished.");

        let entries: Vec<ProbeEntry> = results
            .iter()
            .map(|(name, result)| ProbeEntry { name: name.to_string(), result: format_result(result) })
            .collect();
        let parsed: Vec<Option<u8>> = entries.iter().map(|entry| parse_line(&entry.result)).collect();
        let misses = parsed.iter().filter(|score| score.is_none()).count();
        if misses > 0 {
            warn!(key, misses, "Some probe lines carried no score and were left out.");
        }

        let scores = {
            let mut rng = rand::thread_rng();
            score_all(&parsed, &self.profiles, &mut rng)?
        };
        debug!(key, ?scores, "Aggregates computed.");

        self.store.upsert(key, &entries, scores, duration).await?;
        self.store.get(key).await?.ok_or_else(|| {
            error!(key, "Record missing right after upsert.");
            ScanError::Decode(format!("no record stored for '{}'", key))
        })
    }

    /// Runs every probe on the blocking pool and waits for all of them.
    /// Results come back in registration order.
    async fn fan_out(&self, url: &str) -> Result<Vec<(&'static str, ProbeResult)>> {
        let tasks = self.registry.iter().map(|probe| {
            let probe = Arc::clone(probe);
            let name = probe.name();
            let url = url.to_string();
            let deadline = self.deadline;
            async move {
                let handle = spawn_blocking(move || probe.run(&url));
                let joined = match deadline {
                    Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
                        error!(probe = name, ?limit, "Probe exceeded the coordinator deadline.");
                        ScanError::ProbeDeadline { probe: name.to_string(), deadline: limit }
                    })?,
                    None => handle.await,
                };
                joined.map(|result| (name, result)).map_err(|e| {
                    error!(probe = name, error = %e, "Probe broke its contract.");
                    ScanError::ProbeContract { probe: name.to_string(), reason: panic_reason(e) }
                })
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    // --- Single-Flight ---

    fn gate(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(in_flight.entry(key.to_string()).or_default())
    }

    /// Drops the per-key lock once no other request holds or waits on it.
    fn release(&self, key: &str, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one in `gate`.
        if Arc::strong_count(&gate) <= 2 {
            in_flight.remove(key);
        }
    }
}

fn panic_reason(error: JoinError) -> String {
    if !error.is_panic() {
        return error.to_string();
    }
    let payload = error.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}

// src/config.rs

use crate::core::scanner::page::FetchOptions;
use crate::logging::{PROJECT_NAME, get_data_dir};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const DB_FILE: &str = "scans.sqlite";

/// Where scan records are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    Memory,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub store: StorePath,
    /// HTTP timeout handed to the built-in probes.
    pub probe_timeout: Duration,
    /// Coordinator-level limit per probe; `None` waits for every probe.
    pub probe_deadline: Option<Duration>,
    /// Wipe every stored record at start-up.
    pub reset_store: bool,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StorePath::File(get_data_dir().join(DB_FILE)),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_deadline: None,
            reset_store: false,
            user_agent: FetchOptions::default().user_agent,
        }
    }
}

impl Settings {
    /// Reads `PRISM_SCAN_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from any variable source. Invalid values are logged
    /// and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |suffix: &str| {
            let name = format!("{}_{}", PROJECT_NAME.as_str(), suffix);
            lookup(&name).map(|value| (name, value.trim().to_string()))
        };
        let mut settings = Self::default();

        if let Some((_, path)) = var("DB").filter(|(_, v)| !v.is_empty()) {
            settings.store = match path.as_str() {
                ":memory:" => StorePath::Memory,
                _ => StorePath::File(PathBuf::from(path)),
            };
        }
        if let Some((name, raw)) = var("PROBE_TIMEOUT_SECS") {
            match parse_seconds(&raw) {
                Some(timeout) => settings.probe_timeout = timeout,
                None => warn!(variable = %name, value = %raw, "Invalid timeout, using the default."),
            }
        }
        if let Some((name, raw)) = var("PROBE_DEADLINE_SECS").filter(|(_, v)| !v.is_empty()) {
            match parse_seconds(&raw) {
                Some(deadline) => settings.probe_deadline = Some(deadline),
                None => warn!(variable = %name, value = %raw, "Invalid deadline, probes run unbounded."),
            }
        }
        if let Some((name, raw)) = var("RESET_STORE") {
            match parse_flag(&raw) {
                Some(reset) => settings.reset_store = reset,
                None => warn!(variable = %name, value = %raw, "Invalid flag, keeping stored records."),
            }
        }
        if let Some((_, agent)) = var("USER_AGENT").filter(|(_, v)| !v.is_empty()) {
            settings.user_agent = agent;
        }
        settings
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions { timeout: self.probe_timeout, user_agent: self.user_agent.clone() }
    }
}

/// A positive number of seconds, fractions allowed.
fn parse_seconds(raw: &str) -> Option<Duration> {
    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .map(Duration::from_secs_f64)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_variables() {
        let s = settings(&[]);
        assert_eq!(s.probe_timeout, Duration::from_secs(10));
        assert_eq!(s.probe_deadline, None);
        assert!(!s.reset_store);
        assert!(matches!(s.store, StorePath::File(ref p) if p.ends_with("scans.sqlite")));
    }

    #[test]
    fn reads_prefixed_variables() {
        let s = settings(&[
            ("PRISM_SCAN_DB", ":memory:"),
            ("PRISM_SCAN_PROBE_TIMEOUT_SECS", "4"),
            ("PRISM_SCAN_PROBE_DEADLINE_SECS", "2.5"),
            ("PRISM_SCAN_RESET_STORE", "yes"),
            ("PRISM_SCAN_USER_AGENT", "audit-bot/1.0"),
        ]);
        assert_eq!(s.store, StorePath::Memory);
        assert_eq!(s.probe_timeout, Duration::from_secs(4));
        assert_eq!(s.probe_deadline, Some(Duration::from_millis(2500)));
        assert!(s.reset_store);
        assert_eq!(s.fetch_options().user_agent, "audit-bot/1.0");
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let s = settings(&[
            ("PRISM_SCAN_PROBE_TIMEOUT_SECS", "-3"),
            ("PRISM_SCAN_PROBE_DEADLINE_SECS", "soon"),
            ("PRISM_SCAN_RESET_STORE", "maybe"),
        ]);
        assert_eq!(s.probe_timeout, Duration::from_secs(10));
        assert_eq!(s.probe_deadline, None);
        assert!(!s.reset_store);
    }
}

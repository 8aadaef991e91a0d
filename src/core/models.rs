// src/core/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Probe Output ---

// The lowest and highest score a probe may report.
pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

// The free-text part of a probe result: either one line or an ordered list of notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    Single(String),
    Lines(Vec<String>),
}

impl Details {
    // Flattens the details into one string, separating list entries with "; ".
    pub fn joined(&self) -> String {
        match self {
            Details::Single(text) => text.clone(),
            Details::Lines(lines) => lines.join("; "),
        }
    }
}

impl From<&str> for Details {
    fn from(text: &str) -> Self {
        Details::Single(text.to_string())
    }
}

impl From<String> for Details {
    fn from(text: String) -> Self {
        Details::Single(text)
    }
}

impl From<Vec<String>> for Details {
    fn from(lines: Vec<String>) -> Self {
        Details::Lines(lines)
    }
}

// What a single probe invocation hands back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub score: u8,
    pub details: Details,
}

impl ProbeResult {
    pub fn new(score: u8, details: impl Into<Details>) -> Self {
        Self { score, details: details.into() }
    }

    // The worst score plus a one-line diagnostic. Probes use this for any internal failure.
    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self { score: MIN_SCORE, details: Details::Single(diagnostic.into()) }
    }
}

// --- Persisted Record ---

// One probe's human-readable name next to its formatted display line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeEntry {
    pub name: String,
    pub result: String,
}

// The five summary scores kept for every scan.
// `adversarial` may be 0 or 11, outside the usual [1,10] range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateScores {
    pub normal: u8,
    pub privacy: u8,
    pub security: u8,
    pub random: u8,
    pub adversarial: u8,
}

// The canonical unit of the result store, keyed by normalized URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub url: String,
    pub probes: Vec<ProbeEntry>,
    pub scores: AggregateScores,
    // Seconds of wall-clock time spent in the probe fan-out.
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
}

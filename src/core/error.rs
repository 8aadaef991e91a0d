// src/core/error.rs

use std::time::Duration;
use thiserror::Error;

/// Everything that can make a scan request fail.
///
/// Probe-internal problems never show up here: a probe folds those into its
/// own worst score. What remains are caller mistakes, configuration faults,
/// probes that break their contract, and storage failures.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unknown weight profile '{0}'")]
    UnknownProfile(String),

    #[error("weight profile '{profile}' has {weights} weights for {scores} probe results")]
    WeightMismatch {
        profile: String,
        weights: usize,
        scores: usize,
    },

    #[error("probe '{probe}' failed to return a result: {reason}")]
    ProbeContract { probe: String, reason: String },

    #[error("probe '{probe}' did not finish within {deadline:?}")]
    ProbeDeadline { probe: String, deadline: Duration },

    #[error("result store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ScanError {
    /// True for failures caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScanError::InvalidUrl { .. } | ScanError::UnknownProfile(_))
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

// src/core/mod.rs

// The scan engine. Leaf-first: models and errors, URL normalization, the
// score formatter/parser, aggregation, persistence, then the coordinator
// that ties the probes in `scanner` to all of them.

/// Data structures shared across the engine: probe results, aggregate
/// scores and the persisted `ScanRecord`.
pub mod models;

pub mod error;
pub mod normalizer;

/// Renders probe results into display lines and re-extracts their scores.
pub mod scoring;

pub mod aggregator;
pub mod store;
pub mod coordinator;

/// Static descriptions and remediation advice for every built-in probe.
pub mod catalog;

/// The probe contract, the registry and the 22 built-in probes.
pub mod scanner;

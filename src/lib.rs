//! modsieve: batch curation pipeline for a community modeling platform.
//!
//! Spam classification over member profiles (feature extraction, count
//! vectorized text + boosted-stump metadata classifiers, curator-label
//! lifecycle) and active-learning deduplication of free-text tags against a
//! canonical vocabulary. Operator binaries under `src/bin/` drive the
//! pipeline; everything persists through SQLite and JSON artifacts.

/// Application directory resolution.
pub mod app_dirs;
/// Keyed JSON artifact persistence.
pub mod artifacts;
/// Run configuration threaded through components.
pub mod config;
/// Tag deduplication engine.
pub mod dedupe;
/// Encoders from cleaned rows to numeric inputs.
pub mod encode;
/// Raw record to feature-row extraction.
pub mod extract;
/// Logging setup for binaries.
pub mod logging;
/// Trainable classifiers and metrics.
pub mod ml;
/// Spam detection orchestration.
pub mod spam;
/// SQLite record store.
pub mod store;

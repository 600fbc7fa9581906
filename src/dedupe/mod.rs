//! Tag deduplication engine.
//!
//! Two cooperating modes over one record-linkage primitive: clustering
//! discovers canon from scratch, the gazetteer assigns new tags to existing
//! canon. Deterministic heuristics bootstrap cleanup proposals before any
//! model is trained, and the active-learning session collects the
//! match/distinct labels that tune the similarity model.

pub mod active;
pub mod cluster;
pub mod gazetteer;
pub mod heuristics;
pub mod similarity;

pub use active::{ActiveSession, LabeledPair, TRAINING_PAIRS_KEY, UncertainPair};
pub use cluster::{TagCluster, cluster_tags};
pub use gazetteer::{GazetteerMatch, GazetteerOutcome, match_tags};
pub use similarity::{PairModel, pair_features};

/// Artifact key for the persisted pair model.
pub const PAIR_MODEL_KEY: &str = "dedupe_pair_model";

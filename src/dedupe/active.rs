//! Active-learning session over uncertain tag pairs.
//!
//! The learning loop is an explicit iterator: callers pull the most
//! uncertain candidate pair, supply a match/distinct label, and the
//! similarity model retrains. A console adapter drives this interactively;
//! tests drive it with scripted labels. Labelled pairs persist as a JSON
//! artifact and reload across sessions.

use serde::{Deserialize, Serialize};

use crate::artifacts::{ArtifactError, ArtifactStore};

use super::similarity::PairModel;

/// Artifact key for the persisted labelled training pairs.
pub const TRAINING_PAIRS_KEY: &str = "dedupe_training_pairs";

const TRAIN_EPOCHS: usize = 150;
const TRAIN_LEARNING_RATE: f64 = 0.5;

/// One human-labelled pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPair {
    pub left: String,
    pub right: String,
    pub is_match: bool,
}

/// A candidate pair awaiting a label, with the model's current score.
#[derive(Debug, Clone, PartialEq)]
pub struct UncertainPair {
    pub left: String,
    pub right: String,
    pub score: f64,
}

/// Active-learning state: candidate pairs, labelled pairs, and the model.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    model: PairModel,
    candidates: Vec<(String, String)>,
    labeled: Vec<LabeledPair>,
    skipped: Vec<(String, String)>,
}

impl ActiveSession {
    /// Start a session over every unordered pair of the given tags.
    pub fn new(tags: &[String], model: PairModel) -> Self {
        let mut candidates = Vec::new();
        for (idx, left) in tags.iter().enumerate() {
            for right in &tags[idx + 1..] {
                if left != right {
                    candidates.push((left.clone(), right.clone()));
                }
            }
        }
        Self {
            model,
            candidates,
            labeled: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Resume a session with previously labelled pairs; the model retrains
    /// on them immediately.
    pub fn with_labels(tags: &[String], model: PairModel, labeled: Vec<LabeledPair>) -> Self {
        let mut session = Self::new(tags, model);
        session.labeled = labeled;
        session.retrain();
        session
    }

    pub fn model(&self) -> &PairModel {
        &self.model
    }

    pub fn labeled(&self) -> &[LabeledPair] {
        &self.labeled
    }

    /// The unlabelled candidate pair whose score is closest to 0.5, the
    /// pair a label would teach the most about.
    pub fn next_uncertain_pair(&self) -> Option<UncertainPair> {
        let mut best: Option<UncertainPair> = None;
        for (left, right) in &self.candidates {
            if self.is_labeled(left, right) || self.is_skipped(left, right) {
                continue;
            }
            let score = self.model.score(left, right);
            let margin = (score - 0.5).abs();
            let better = match &best {
                Some(current) => margin < (current.score - 0.5).abs(),
                None => true,
            };
            if better {
                best = Some(UncertainPair {
                    left: left.clone(),
                    right: right.clone(),
                    score,
                });
            }
        }
        best
    }

    /// Set a pair aside without labelling it ("unsure"); it will not be
    /// offered again this session.
    pub fn skip(&mut self, left: &str, right: &str) {
        self.skipped.push((left.to_string(), right.to_string()));
    }

    /// Record a match/distinct label and retrain the model.
    pub fn record_label(&mut self, left: &str, right: &str, is_match: bool) {
        self.labeled.push(LabeledPair {
            left: left.to_string(),
            right: right.to_string(),
            is_match,
        });
        self.retrain();
    }

    /// Load previously labelled pairs from the artifact store; absent
    /// artifacts yield an empty set.
    pub fn load_labels(store: &ArtifactStore) -> Result<Vec<LabeledPair>, ArtifactError> {
        if !store.exists(TRAINING_PAIRS_KEY) {
            return Ok(Vec::new());
        }
        store.load(TRAINING_PAIRS_KEY)
    }

    /// Persist the labelled pairs for future sessions.
    pub fn save_labels(&self, store: &ArtifactStore) -> Result<(), ArtifactError> {
        store.save(TRAINING_PAIRS_KEY, &self.labeled)
    }

    fn is_skipped(&self, left: &str, right: &str) -> bool {
        self.skipped.iter().any(|(a, b)| {
            (a == left && b == right) || (a == right && b == left)
        })
    }

    fn is_labeled(&self, left: &str, right: &str) -> bool {
        self.labeled.iter().any(|pair| {
            (pair.left == left && pair.right == right)
                || (pair.left == right && pair.right == left)
        })
    }

    fn retrain(&mut self) {
        let pairs: Vec<(String, String, bool)> = self
            .labeled
            .iter()
            .map(|pair| (pair.left.clone(), pair.right.clone(), pair.is_match))
            .collect();
        self.model.train(&pairs, TRAIN_EPOCHS, TRAIN_LEARNING_RATE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn yields_the_most_uncertain_pair_first() {
        let session = ActiveSession::new(
            &tags(&["netlogo", "netlogo 6.0", "python"]),
            PairModel::default(),
        );
        let pair = session.next_uncertain_pair().unwrap();
        // The near-duplicate pair scores high and the unrelated pairs score
        // low; whichever is closest to 0.5 must come back first.
        let margin = (pair.score - 0.5).abs();
        for (left, right) in [("netlogo", "netlogo 6.0"), ("netlogo", "python")] {
            let score = session.model().score(left, right);
            assert!(margin <= (score - 0.5).abs() + 1e-12);
        }
    }

    #[test]
    fn labeled_pairs_are_not_offered_again() {
        let mut session =
            ActiveSession::new(&tags(&["netlogo", "net logo"]), PairModel::default());
        let pair = session.next_uncertain_pair().unwrap();
        session.record_label(&pair.left, &pair.right, true);
        assert!(session.next_uncertain_pair().is_none());
        assert_eq!(session.labeled().len(), 1);
    }

    #[test]
    fn scripted_labels_drive_the_loop_without_io() {
        let mut session = ActiveSession::new(
            &tags(&["netlogo", "netlogo 6", "mesa", "repast"]),
            PairModel::default(),
        );
        let mut rounds = 0;
        while let Some(pair) = session.next_uncertain_pair() {
            let is_match = pair.score > 0.5;
            session.record_label(&pair.left, &pair.right, is_match);
            rounds += 1;
            if rounds > 16 {
                break;
            }
        }
        assert_eq!(session.labeled().len(), rounds);
    }

    #[test]
    fn labels_round_trip_through_the_artifact_store() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(ActiveSession::load_labels(&store).unwrap().is_empty());

        let mut session =
            ActiveSession::new(&tags(&["netlogo", "net logo"]), PairModel::default());
        session.record_label("netlogo", "net logo", true);
        session.save_labels(&store).unwrap();

        let reloaded = ActiveSession::load_labels(&store).unwrap();
        assert_eq!(reloaded, session.labeled().to_vec());
    }
}

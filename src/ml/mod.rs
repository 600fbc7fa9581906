//! Trainable classifiers for the spam pipeline.
//!
//! Each classifier implements the shared [`SpamClassifier`] capability
//! interface; numeric internals stay encapsulated per variant. Fitted
//! weights persist through the artifact store so prediction runs can reuse
//! a model trained in an earlier process.

use thiserror::Error;

use crate::artifacts::{ArtifactError, ArtifactStore};

pub mod gbdt;
pub mod metrics;
pub mod naive_bayes;

pub use gbdt::UserClassifier;
pub use naive_bayes::TextClassifier;

/// Errors raised by classifier training and prediction.
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Prediction was requested before any model was fitted or loaded.
    #[error("Model not trained: fit or load a model before predicting")]
    ModelNotTrained,
    #[error("Mismatched input lengths: {rows} feature rows vs {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },
    #[error("Training failed: {0}")]
    Training(String),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

/// Result of a training attempt. Recoverable skip conditions are encoded
/// here rather than as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    /// A model was produced and is ready for prediction.
    Trained,
    /// Training set had fewer than two distinct classes; no model produced.
    SkippedSingleClass,
    /// Training set was empty; no model produced.
    NoData,
}

impl TrainOutcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, TrainOutcome::Trained)
    }
}

/// One prediction: spam label plus class-1 posterior probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: bool,
    pub confidence: f64,
}

impl Prediction {
    /// Build from a class-1 probability; the label is the round of it.
    pub fn from_probability(probability: f64) -> Self {
        Self {
            label: probability >= 0.5,
            confidence: probability,
        }
    }
}

/// Shared train/predict/evaluate/save/load contract.
pub trait SpamClassifier {
    /// Encoded feature input accepted by this variant.
    type Features;

    /// Fit (or continue fitting) on the given labelled rows.
    fn train(
        &mut self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<TrainOutcome, ClassifierError>;

    /// Score rows; requires a fitted or loaded model.
    fn predict(&self, features: &Self::Features) -> Result<Vec<Prediction>, ClassifierError>;

    /// Compute held-out scores; requires a fitted or loaded model.
    fn evaluate(
        &self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<metrics::EvalScores, ClassifierError>;

    /// Persist the fitted model under this classifier's artifact key.
    fn save(&self, store: &ArtifactStore) -> Result<(), ClassifierError>;

    /// Restore a previously saved model.
    fn load(store: &ArtifactStore) -> Result<Self, ClassifierError>
    where
        Self: Sized;
}

pub(crate) fn check_lengths(rows: usize, labels: usize) -> Result<(), ClassifierError> {
    if rows != labels {
        return Err(ClassifierError::LengthMismatch { rows, labels });
    }
    Ok(())
}

pub(crate) fn distinct_class_count(labels: &[bool]) -> usize {
    let has_spam = labels.iter().any(|&label| label);
    let has_ham = labels.iter().any(|&label| !label);
    has_spam as usize + has_ham as usize
}

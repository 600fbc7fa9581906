//! Gradient-boosted stump classifier for tabular profile metadata.

use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::ml::metrics::{EvalScores, score_pairs};
use crate::ml::{
    ClassifierError, Prediction, SpamClassifier, TrainOutcome, check_lengths,
    distinct_class_count,
};

mod model;
mod train;

pub use model::{GbdtModel, Stump, sigmoid};
pub use train::{TrainOptions, train_gbdt};

/// Artifact key for the persisted user/metadata model.
pub const USER_MODEL_KEY: &str = "user_classifier";

/// Trainable wrapper around [`GbdtModel`] with incremental refits.
#[derive(Debug, Clone, Default)]
pub struct UserClassifier {
    options: TrainOptions,
    model: Option<GbdtModel>,
}

impl UserClassifier {
    pub fn new(options: TrainOptions) -> Self {
        Self {
            options,
            model: None,
        }
    }

    pub fn model(&self) -> Option<&GbdtModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

impl SpamClassifier for UserClassifier {
    type Features = Vec<Vec<f32>>;

    /// Fit on the labelled rows. When a model is already present (fitted or
    /// loaded) and the feature width matches, boosting continues from the
    /// saved ensemble instead of restarting.
    fn train(
        &mut self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<TrainOutcome, ClassifierError> {
        check_lengths(features.len(), labels.len())?;
        if features.is_empty() {
            return Ok(TrainOutcome::NoData);
        }
        if distinct_class_count(labels) < 2 && self.model.is_none() {
            warn!("User classifier training skipped: only one label class present");
            return Ok(TrainOutcome::SkippedSingleClass);
        }

        let prior = match self.model.as_ref() {
            Some(model) if model.feature_len == features[0].len() => Some(model),
            Some(model) => {
                warn!(
                    "Discarding saved user model: feature width changed from {} to {}",
                    model.feature_len,
                    features[0].len()
                );
                None
            }
            None => None,
        };
        let trained =
            train_gbdt(features, labels, &self.options, prior).map_err(ClassifierError::Training)?;
        self.model = Some(trained);
        Ok(TrainOutcome::Trained)
    }

    fn predict(&self, features: &Self::Features) -> Result<Vec<Prediction>, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::ModelNotTrained)?;
        Ok(features
            .iter()
            .map(|row| Prediction::from_probability(model.predict_proba(row)))
            .collect())
    }

    fn evaluate(
        &self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<EvalScores, ClassifierError> {
        check_lengths(features.len(), labels.len())?;
        let predictions = self.predict(features)?;
        let predicted: Vec<bool> = predictions.iter().map(|p| p.label).collect();
        Ok(EvalScores::from_confusion(&score_pairs(labels, &predicted)))
    }

    fn save(&self, store: &ArtifactStore) -> Result<(), ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::ModelNotTrained)?;
        store.save(USER_MODEL_KEY, model)?;
        Ok(())
    }

    fn load(store: &ArtifactStore) -> Result<Self, ClassifierError> {
        let model: GbdtModel = store.load(USER_MODEL_KEY)?;
        Ok(Self {
            options: TrainOptions::default(),
            model: Some(model),
        })
    }
}

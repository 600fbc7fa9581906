//! Multinomial naive Bayes over count-vectorized profile text.
//!
//! Log-space scoring with Laplace smoothing; the positive class is spam.
//! Works directly on the sparse count matrix produced by the text encoder
//! so train and predict share one vocabulary.

use serde::{Deserialize, Serialize};
use sprs::CsMat;
use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::ml::metrics::{EvalScores, score_pairs};
use crate::ml::{
    ClassifierError, Prediction, SpamClassifier, TrainOutcome, check_lengths,
    distinct_class_count,
};

/// Artifact key for the persisted text model.
pub const TEXT_MODEL_KEY: &str = "text_classifier";

const LAPLACE_ALPHA: f64 = 1.0;

/// Fitted naive Bayes weights. Class index 0 is ham, 1 is spam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    /// Model format version.
    pub model_version: i64,
    /// Expected column count of the count matrix.
    pub vocab_size: usize,
    /// Log prior per class.
    pub class_log_prior: [f64; 2],
    /// Per-column log likelihood per class.
    pub feature_log_prob: Vec<[f64; 2]>,
}

impl NaiveBayesModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_log_prob.len() != self.vocab_size {
            return Err(format!(
                "feature_log_prob has {} rows but vocab_size is {}",
                self.feature_log_prob.len(),
                self.vocab_size
            ));
        }
        if self.class_log_prior.iter().any(|p| !p.is_finite()) {
            return Err("class_log_prior must be finite".to_string());
        }
        Ok(())
    }

    /// Spam probability for one sparse count row.
    pub fn predict_proba(&self, row: sprs::CsVecView<'_, f32>) -> f64 {
        let mut log_scores = self.class_log_prior;
        for (col, &count) in row.iter() {
            if let Some(log_prob) = self.feature_log_prob.get(col) {
                log_scores[0] += f64::from(count) * log_prob[0];
                log_scores[1] += f64::from(count) * log_prob[1];
            }
        }
        // Normalize in log space to avoid underflow on long documents.
        let max = log_scores[0].max(log_scores[1]);
        let ham = (log_scores[0] - max).exp();
        let spam = (log_scores[1] - max).exp();
        spam / (ham + spam)
    }
}

/// Trainable wrapper around [`NaiveBayesModel`].
#[derive(Debug, Clone, Default)]
pub struct TextClassifier {
    model: Option<NaiveBayesModel>,
}

impl TextClassifier {
    pub fn model(&self) -> Option<&NaiveBayesModel> {
        self.model.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

impl SpamClassifier for TextClassifier {
    type Features = CsMat<f32>;

    fn train(
        &mut self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<TrainOutcome, ClassifierError> {
        check_lengths(features.rows(), labels.len())?;
        if features.rows() == 0 {
            return Ok(TrainOutcome::NoData);
        }
        if distinct_class_count(labels) < 2 {
            warn!("Text classifier training skipped: only one label class present");
            return Ok(TrainOutcome::SkippedSingleClass);
        }

        let vocab_size = features.cols();
        let mut class_counts = [0usize; 2];
        let mut token_totals = [0f64; 2];
        let mut token_counts = vec![[0f64; 2]; vocab_size];

        for (row, &label) in features.outer_iterator().zip(labels.iter()) {
            let class = label as usize;
            class_counts[class] += 1;
            for (col, &count) in row.iter() {
                token_counts[col][class] += f64::from(count);
                token_totals[class] += f64::from(count);
            }
        }

        let total_docs = labels.len() as f64;
        let class_log_prior = [
            (class_counts[0] as f64 / total_docs).ln(),
            (class_counts[1] as f64 / total_docs).ln(),
        ];
        let feature_log_prob = token_counts
            .into_iter()
            .map(|counts| {
                [
                    ((counts[0] + LAPLACE_ALPHA)
                        / (token_totals[0] + LAPLACE_ALPHA * vocab_size as f64))
                        .ln(),
                    ((counts[1] + LAPLACE_ALPHA)
                        / (token_totals[1] + LAPLACE_ALPHA * vocab_size as f64))
                        .ln(),
                ]
            })
            .collect();

        self.model = Some(NaiveBayesModel {
            model_version: 1,
            vocab_size,
            class_log_prior,
            feature_log_prob,
        });
        Ok(TrainOutcome::Trained)
    }

    fn predict(&self, features: &Self::Features) -> Result<Vec<Prediction>, ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::ModelNotTrained)?;
        Ok(features
            .outer_iterator()
            .map(|row| Prediction::from_probability(model.predict_proba(row)))
            .collect())
    }

    fn evaluate(
        &self,
        features: &Self::Features,
        labels: &[bool],
    ) -> Result<EvalScores, ClassifierError> {
        check_lengths(features.rows(), labels.len())?;
        let predictions = self.predict(features)?;
        let predicted: Vec<bool> = predictions.iter().map(|p| p.label).collect();
        Ok(EvalScores::from_confusion(&score_pairs(labels, &predicted)))
    }

    fn save(&self, store: &ArtifactStore) -> Result<(), ClassifierError> {
        let model = self.model.as_ref().ok_or(ClassifierError::ModelNotTrained)?;
        store.save(TEXT_MODEL_KEY, model)?;
        Ok(())
    }

    fn load(store: &ArtifactStore) -> Result<Self, ClassifierError> {
        let model: NaiveBayesModel = store.load(TEXT_MODEL_KEY)?;
        Ok(Self { model: Some(model) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::CountVectorizer;
    use tempfile::tempdir;

    fn spam_corpus() -> (CsMat<f32>, Vec<bool>, CountVectorizer) {
        let documents = vec![
            "buy cheap pills now".to_string(),
            "cheap pills cheap deals".to_string(),
            "agent-based modeling researcher".to_string(),
            "complex systems simulation research".to_string(),
        ];
        let labels = vec![true, true, false, false];
        let vectorizer = CountVectorizer::fit(&documents);
        let encoded = vectorizer.transform(&[1, 2, 3, 4], &documents).unwrap();
        (encoded.counts, labels, vectorizer)
    }

    #[test]
    fn separates_spam_from_research_text() {
        let (x, y, vectorizer) = spam_corpus();
        let mut classifier = TextClassifier::default();
        assert!(classifier.train(&x, &y).unwrap().is_trained());

        let held_out = vectorizer
            .transform(&[9], &["cheap pills for sale".to_string()])
            .unwrap();
        let predictions = classifier.predict(&held_out.counts).unwrap();
        assert!(predictions[0].label);
        assert!(predictions[0].confidence > 0.5);
    }

    #[test]
    fn single_class_corpus_is_skipped() {
        let documents = vec!["spam".to_string(), "more spam".to_string()];
        let vectorizer = CountVectorizer::fit(&documents);
        let encoded = vectorizer.transform(&[1, 2], &documents).unwrap();
        let mut classifier = TextClassifier::default();
        let outcome = classifier.train(&encoded.counts, &[true, true]).unwrap();
        assert_eq!(outcome, TrainOutcome::SkippedSingleClass);
        assert!(!classifier.is_trained());
    }

    #[test]
    fn saved_model_predicts_identically_after_reload() {
        let (x, y, _) = spam_corpus();
        let mut classifier = TextClassifier::default();
        classifier.train(&x, &y).unwrap();

        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        classifier.save(&store).unwrap();
        let restored = TextClassifier::load(&store).unwrap();
        restored.model().unwrap().validate().unwrap();

        assert_eq!(
            classifier.predict(&x).unwrap(),
            restored.predict(&x).unwrap()
        );
    }

    #[test]
    fn predict_without_model_is_refused() {
        let classifier = TextClassifier::default();
        let (x, _, _) = spam_corpus();
        assert!(matches!(
            classifier.predict(&x),
            Err(ClassifierError::ModelNotTrained)
        ));
    }
}

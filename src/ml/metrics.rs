//! Evaluation metrics for the binary spam classifiers.

use serde::{Deserialize, Serialize};

/// Confusion matrix for a binary classifier (spam = positive class).
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfusionMatrix {
    pub true_positive: u32,
    pub false_positive: u32,
    pub true_negative: u32,
    pub false_negative: u32,
}

impl ConfusionMatrix {
    pub fn add(&mut self, truth: bool, predicted: bool) {
        match (truth, predicted) {
            (true, true) => self.true_positive = self.true_positive.saturating_add(1),
            (false, true) => self.false_positive = self.false_positive.saturating_add(1),
            (false, false) => self.true_negative = self.true_negative.saturating_add(1),
            (true, false) => self.false_negative = self.false_negative.saturating_add(1),
        }
    }

    pub fn total(&self) -> u32 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        f64::from(self.true_positive + self.true_negative) / f64::from(total)
    }

    pub fn precision(&self) -> f64 {
        let denominator = self.true_positive + self.false_positive;
        if denominator == 0 {
            return 0.0;
        }
        f64::from(self.true_positive) / f64::from(denominator)
    }

    pub fn recall(&self) -> f64 {
        let denominator = self.true_positive + self.false_negative;
        if denominator == 0 {
            return 0.0;
        }
        f64::from(self.true_positive) / f64::from(denominator)
    }

    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / (precision + recall)
    }
}

/// Scores computed from one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalScores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl EvalScores {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        Self {
            accuracy: cm.accuracy(),
            precision: cm.precision(),
            recall: cm.recall(),
            f1: cm.f1(),
        }
    }
}

/// Persisted metrics artifact; repeated metric reads are side-effect-free.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    #[serde(rename = "Precision")]
    pub precision: f64,
    #[serde(rename = "Recall")]
    pub recall: f64,
    #[serde(rename = "F1")]
    pub f1: f64,
    /// Held-out record ids used for the evaluation.
    pub test_user_ids: Vec<i64>,
}

impl ModelMetrics {
    pub fn new(scores: EvalScores, test_user_ids: Vec<i64>) -> Self {
        Self {
            accuracy: scores.accuracy,
            precision: scores.precision,
            recall: scores.recall,
            f1: scores.f1,
            test_user_ids,
        }
    }
}

/// Score truth/prediction pairs into a confusion matrix.
pub fn score_pairs(truths: &[bool], predictions: &[bool]) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::default();
    for (&truth, &predicted) in truths.iter().zip(predictions.iter()) {
        cm.add(truth, predicted);
    }
    cm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_score_one() {
        let truths = [true, false, true, false];
        let cm = score_pairs(&truths, &truths);
        let scores = EvalScores::from_confusion(&cm);
        assert_eq!(scores.accuracy, 1.0);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.f1, 1.0);
    }

    #[test]
    fn empty_matrix_scores_zero_not_nan() {
        let cm = ConfusionMatrix::default();
        let scores = EvalScores::from_confusion(&cm);
        assert_eq!(scores.accuracy, 0.0);
        assert_eq!(scores.f1, 0.0);
    }

    #[test]
    fn metrics_artifact_uses_capitalized_field_names() {
        let metrics = ModelMetrics::new(
            EvalScores {
                accuracy: 0.9,
                precision: 0.8,
                recall: 0.7,
                f1: 0.75,
            },
            vec![3, 5],
        );
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["Accuracy"], 0.9);
        assert_eq!(json["F1"], 0.75);
        assert_eq!(json["test_user_ids"], serde_json::json!([3, 5]));
    }
}

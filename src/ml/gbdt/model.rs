use serde::{Deserialize, Serialize};

/// Single-node decision tree used as a weak learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stump {
    /// Feature index used for the split.
    pub feature_index: u16,
    /// Threshold in feature units.
    pub threshold: f32,
    /// Prediction for `feature <= threshold`.
    pub left_value: f32,
    /// Prediction for `feature > threshold`.
    pub right_value: f32,
}

impl Stump {
    /// Predict the stump value for a feature vector.
    pub fn predict(&self, features: &[f32]) -> f32 {
        let idx = self.feature_index as usize;
        let value = features.get(idx).copied().unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Gradient-boosted decision stump model for binary spam classification.
///
/// Raw scores are log-odds of the positive (spam) class; boosting rounds
/// append stumps, which is what makes incremental refits cheap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len: usize,
    /// Learning rate applied to each stump prediction.
    pub learning_rate: f32,
    /// Initial raw log-odds before boosting rounds.
    pub init_raw: f32,
    /// One stump per boosting round.
    pub stumps: Vec<Stump>,
}

impl GbdtModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_len == 0 {
            return Err("feature_len must be positive".to_string());
        }
        if !self.init_raw.is_finite() {
            return Err("init_raw must be finite".to_string());
        }
        for (idx, stump) in self.stumps.iter().enumerate() {
            if (stump.feature_index as usize) >= self.feature_len {
                return Err(format!(
                    "Stump {idx} splits on feature {} but feature_len is {}",
                    stump.feature_index, self.feature_len
                ));
            }
        }
        Ok(())
    }

    /// Predict the raw log-odds for a feature vector.
    pub fn predict_raw(&self, features: &[f32]) -> f32 {
        let mut raw = self.init_raw;
        for stump in &self.stumps {
            raw += self.learning_rate * stump.predict(features);
        }
        raw
    }

    /// Predict the positive-class probability for a feature vector.
    pub fn predict_proba(&self, features: &[f32]) -> f64 {
        sigmoid(self.predict_raw(features) as f64)
    }
}

/// Numerically-stable logistic function.
pub fn sigmoid(raw: f64) -> f64 {
    if raw >= 0.0 {
        1.0 / (1.0 + (-raw).exp())
    } else {
        let e = raw.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stump_predict_branches() {
        let stump = Stump {
            feature_index: 0,
            threshold: 0.5,
            left_value: -1.0,
            right_value: 2.0,
        };
        assert_eq!(stump.predict(&[0.0]), -1.0);
        assert_eq!(stump.predict(&[0.5]), -1.0);
        assert_eq!(stump.predict(&[0.6]), 2.0);
    }

    #[test]
    fn raw_scores_accumulate_over_rounds() {
        let model = GbdtModel {
            model_version: 1,
            feature_len: 1,
            learning_rate: 0.5,
            init_raw: 0.0,
            stumps: vec![
                Stump {
                    feature_index: 0,
                    threshold: 0.0,
                    left_value: -2.0,
                    right_value: 2.0,
                },
                Stump {
                    feature_index: 0,
                    threshold: 0.0,
                    left_value: -2.0,
                    right_value: 2.0,
                },
            ],
        };
        assert!(model.predict_proba(&[1.0]) > 0.8);
        assert!(model.predict_proba(&[-1.0]) < 0.2);
    }

    #[test]
    fn sigmoid_is_stable_at_extremes() {
        assert!(sigmoid(100.0) > 0.999_999);
        assert!(sigmoid(-100.0) < 1e-6);
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn validate_rejects_out_of_range_split() {
        let model = GbdtModel {
            model_version: 1,
            feature_len: 1,
            learning_rate: 0.1,
            init_raw: 0.0,
            stumps: vec![Stump {
                feature_index: 4,
                threshold: 0.0,
                left_value: 0.0,
                right_value: 0.0,
            }],
        };
        assert!(model.validate().is_err());
    }
}

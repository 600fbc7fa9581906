//! Pairwise tag similarity: string-distance features scored by a small
//! logistic model.
//!
//! The feature functions are cheap and order-insensitive; the model weights
//! start from a hand-tuned prior so matching is useful before any labels
//! arrive, and gradient descent refines them as labelled pairs accumulate.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::ml::gbdt::sigmoid;

/// Number of features produced by [`pair_features`].
pub const PAIR_FEATURE_LEN: usize = 5;

/// Compute the similarity feature vector for a tag pair.
///
/// Features: Jaro-Winkler, normalized Levenshtein, token Jaccard overlap,
/// prefix flag (one name starts the other), containment flag.
pub fn pair_features(left: &str, right: &str) -> [f64; PAIR_FEATURE_LEN] {
    let a = normalize(left);
    let b = normalize(right);
    let tokens_a = tokens(&a);
    let tokens_b = tokens(&b);
    let union = tokens_a.union(&tokens_b).count();
    let intersection = tokens_a.intersection(&tokens_b).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    };
    let prefix = a.starts_with(&b) || b.starts_with(&a);
    let containment = a.contains(&b) || b.contains(&a);
    [
        jaro_winkler(&a, &b),
        normalized_levenshtein(&a, &b),
        jaccard,
        prefix as u8 as f64,
        containment as u8 as f64,
    ]
}

/// Logistic match/distinct model over [`pair_features`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairModel {
    /// Model format version.
    pub model_version: i64,
    pub weights: [f64; PAIR_FEATURE_LEN],
    pub bias: f64,
}

impl Default for PairModel {
    /// Hand-tuned prior: heavy on edit-distance agreement, light on the
    /// structural flags, biased towards "distinct".
    fn default() -> Self {
        Self {
            model_version: 1,
            weights: [2.0, 1.5, 1.5, 1.0, 1.0],
            bias: -3.0,
        }
    }
}

impl PairModel {
    /// Match probability for a tag pair.
    pub fn score(&self, left: &str, right: &str) -> f64 {
        self.score_features(&pair_features(left, right))
    }

    pub fn score_features(&self, features: &[f64; PAIR_FEATURE_LEN]) -> f64 {
        let mut raw = self.bias;
        for (weight, feature) in self.weights.iter().zip(features.iter()) {
            raw += weight * feature;
        }
        sigmoid(raw)
    }

    /// Refit on labelled pairs with plain gradient descent, starting from
    /// the current weights.
    pub fn train(&mut self, pairs: &[(String, String, bool)], epochs: usize, learning_rate: f64) {
        if pairs.is_empty() {
            return;
        }
        let features: Vec<([f64; PAIR_FEATURE_LEN], f64)> = pairs
            .iter()
            .map(|(left, right, is_match)| {
                (pair_features(left, right), *is_match as u8 as f64)
            })
            .collect();
        let scale = learning_rate / pairs.len() as f64;
        for _epoch in 0..epochs {
            let mut weight_grad = [0.0; PAIR_FEATURE_LEN];
            let mut bias_grad = 0.0;
            for (row, target) in &features {
                let error = self.score_features(row) - target;
                for (grad, feature) in weight_grad.iter_mut().zip(row.iter()) {
                    *grad += error * feature;
                }
                bias_grad += error;
            }
            for (weight, grad) in self.weights.iter_mut().zip(weight_grad.iter()) {
                *weight -= scale * grad;
            }
            self.bias -= scale * bias_grad;
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn tokens(name: &str) -> BTreeSet<String> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\w+").expect("token regex must compile"));
    re.find_iter(name)
        .map(|token| token.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_names_score_near_one() {
        let model = PairModel::default();
        assert!(model.score("NetLogo", "netlogo") > 0.9);
    }

    #[test]
    fn versioned_variant_matches_its_base_name() {
        let model = PairModel::default();
        assert!(model.score("NetLogo 6.0", "NetLogo") > 0.5);
    }

    #[test]
    fn unrelated_names_score_low() {
        let model = PairModel::default();
        assert!(model.score("xyzzyzzy123", "NetLogo") < 0.5);
    }

    #[test]
    fn features_are_symmetric() {
        assert_eq!(
            pair_features("agent based model", "agent-based modeling"),
            pair_features("agent-based modeling", "agent based model")
        );
    }

    #[test]
    fn training_separates_labelled_pairs() {
        let mut model = PairModel::default();
        let pairs = vec![
            ("netlogo".to_string(), "netlogo 6".to_string(), true),
            ("netlogo".to_string(), "net logo".to_string(), true),
            ("python".to_string(), "python 3".to_string(), true),
            ("netlogo".to_string(), "python".to_string(), false),
            ("mesa".to_string(), "repast".to_string(), false),
            ("julia".to_string(), "java".to_string(), false),
        ];
        model.train(&pairs, 200, 0.5);
        assert!(model.score("netlogo", "netlogo 6") > 0.5);
        assert!(model.score("mesa", "repast") < 0.5);
    }
}

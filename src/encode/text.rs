//! Count-vector text encoding.
//!
//! Concatenates selected text fields into one document per row (optionally
//! wrapped in templated sentences), fits a token vocabulary, and transforms
//! documents into a sparse count matrix with the originating row ids kept
//! alongside for traceability.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};

use super::EncodeError;
use crate::extract::FeatureRow;

/// Sparse count matrix plus the row ids it was built from.
#[derive(Debug, Clone)]
pub struct EncodedText {
    pub user_ids: Vec<i64>,
    pub counts: CsMat<f32>,
}

/// Vocabulary-based count vectorizer with serializable state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountVectorizer {
    /// Token -> column index, stable across save/load.
    vocabulary: BTreeMap<String, usize>,
}

impl CountVectorizer {
    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty()
    }

    /// Build the vocabulary from the given documents.
    pub fn fit(documents: &[String]) -> Self {
        let mut vocabulary = BTreeMap::new();
        for document in documents {
            for token in tokenize(document) {
                let next = vocabulary.len();
                vocabulary.entry(token).or_insert(next);
            }
        }
        Self { vocabulary }
    }

    /// Transform documents into a sparse count matrix. Tokens unseen at fit
    /// time are ignored so the feature space stays fixed.
    pub fn transform(
        &self,
        user_ids: &[i64],
        documents: &[String],
    ) -> Result<EncodedText, EncodeError> {
        if !self.is_fitted() {
            return Err(EncodeError::NotFitted);
        }
        let mut triplets = TriMat::new((documents.len(), self.vocabulary.len()));
        for (row_idx, document) in documents.iter().enumerate() {
            let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
            for token in tokenize(document) {
                if let Some(&col) = self.vocabulary.get(&token) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }
            for (col, count) in counts {
                triplets.add_triplet(row_idx, col, count);
            }
        }
        Ok(EncodedText {
            user_ids: user_ids.to_vec(),
            counts: triplets.to_csr(),
        })
    }
}

/// Concatenate bio and research interests into the text-classifier document.
/// Rows with both fields empty yield `None` and stay out of training.
pub fn text_document(row: &FeatureRow) -> Option<String> {
    if row.bio.is_empty() && row.research_interests.is_empty() {
        return None;
    }
    if row.research_interests.is_empty() {
        return Some(row.bio.clone());
    }
    if row.bio.is_empty() {
        return Some(row.research_interests.clone());
    }
    Some(format!("{} {}", row.bio, row.research_interests))
}

/// Compose the templated profile document used by the metadata classifier's
/// text-derived features.
pub fn profile_document(row: &FeatureRow) -> String {
    let mut sentences = Vec::new();
    let full_name = format!("{} {}", row.first_name, row.last_name)
        .trim()
        .to_string();
    if !full_name.is_empty() {
        sentences.push(format!("My name is {full_name}."));
    }
    if !row.email.is_empty() {
        sentences.push(format!("My email address is {}.", row.email));
    }
    if !row.affiliations_text.is_empty() {
        sentences.push(format!("I am affiliated with {}.", row.affiliations_text));
    }
    sentences.join(" ")
}

fn tokenize(text: &str) -> Vec<String> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r"\w+").expect("token regex must compile"));
    re.find_iter(&text.to_lowercase())
        .map(|token| token.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|text| text.to_string()).collect()
    }

    #[test]
    fn counts_tokens_per_document() {
        let documents = docs(&["spam spam ham", "ham only"]);
        let vectorizer = CountVectorizer::fit(&documents);
        let encoded = vectorizer.transform(&[1, 2], &documents).unwrap();
        assert_eq!(encoded.counts.rows(), 2);
        assert_eq!(encoded.counts.cols(), 3);
        let spam_col = 0; // insertion order: spam, ham, only
        assert_eq!(encoded.counts.get(0, spam_col).copied(), Some(2.0));
        assert_eq!(encoded.counts.get(1, spam_col).copied(), None);
    }

    #[test]
    fn unseen_tokens_are_ignored_at_transform_time() {
        let vectorizer = CountVectorizer::fit(&docs(&["alpha beta"]));
        let encoded = vectorizer
            .transform(&[9], &docs(&["alpha gamma delta"]))
            .unwrap();
        assert_eq!(encoded.counts.cols(), 2);
        assert_eq!(encoded.counts.get(0, 0).copied(), Some(1.0));
        assert_eq!(encoded.user_ids, vec![9]);
    }

    #[test]
    fn serialized_vocabulary_round_trips_identically() {
        let documents = docs(&["models of cooperation", "spam pills cheap"]);
        let vectorizer = CountVectorizer::fit(&documents);
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: CountVectorizer = serde_json::from_str(&json).unwrap();

        let original = vectorizer.transform(&[1, 2], &documents).unwrap();
        let replayed = restored.transform(&[1, 2], &documents).unwrap();
        assert_eq!(original.counts, replayed.counts);
    }

    #[test]
    fn transform_before_fit_is_refused() {
        let vectorizer = CountVectorizer::default();
        let result = vectorizer.transform(&[], &[]);
        assert!(matches!(result, Err(EncodeError::NotFitted)));
    }

    #[test]
    fn empty_bio_and_interests_produce_no_document() {
        let mut row = crate::extract::FeatureRow {
            user_id: 1,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            bio: String::new(),
            research_interests: String::new(),
            personal_url: String::new(),
            professional_url: String::new(),
            affiliations_text: String::new(),
            is_active: 0,
        };
        assert_eq!(text_document(&row), None);
        row.bio = "agent-based modeling".to_string();
        assert_eq!(text_document(&row).as_deref(), Some("agent-based modeling"));
    }

    #[test]
    fn profile_document_uses_templated_sentences() {
        let row = crate::extract::FeatureRow {
            user_id: 1,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.org".to_string(),
            bio: String::new(),
            research_interests: String::new(),
            personal_url: String::new(),
            professional_url: String::new(),
            affiliations_text: "Analytical Engines (url: https://a.example)".to_string(),
            is_active: 1,
        };
        assert_eq!(
            profile_document(&row),
            "My name is Ada Lovelace. My email address is ada@example.org. \
             I am affiliated with Analytical Engines (url: https://a.example)."
        );
    }
}

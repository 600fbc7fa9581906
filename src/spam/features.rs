//! Assembly of the user/metadata classifier's feature frame.
//!
//! Categorical fields go through the ordinal codebook; numeric text-derived
//! statistics are appended as-is. The resulting dense row layout is fixed:
//! codebook columns first, numerics after.

use crate::encode::categorical::CategoricalRow;
use crate::encode::text::profile_document;
use crate::encode::OrdinalCodebook;
use crate::extract::FeatureRow;

/// Fields treated as categorical by the user classifier.
pub const CATEGORICAL_FIELDS: &[&str] = &["is_active", "email_domain", "has_affiliation"];

/// Categorical values for one profile row.
pub fn categorical_row(row: &FeatureRow) -> CategoricalRow {
    let mut out = CategoricalRow::new();
    out.insert("is_active".to_string(), row.is_active.to_string());
    out.insert("email_domain".to_string(), email_domain(&row.email));
    out.insert(
        "has_affiliation".to_string(),
        (!row.affiliations_text.is_empty() as u8).to_string(),
    );
    out
}

/// Numeric text-derived features for one profile row.
pub fn numeric_features(row: &FeatureRow) -> Vec<f32> {
    let profile_text = profile_document(row);
    vec![
        row.bio.len() as f32,
        row.research_interests.len() as f32,
        (!row.personal_url.is_empty()) as u8 as f32,
        (!row.professional_url.is_empty()) as u8 as f32,
        row.affiliations_text.len() as f32,
        profile_text.split_whitespace().count() as f32,
    ]
}

/// Encode the full dense feature frame with a fitted codebook.
pub fn encode_frame(codebook: &OrdinalCodebook, rows: &[FeatureRow]) -> Vec<Vec<f32>> {
    rows.iter()
        .map(|row| {
            let mut encoded = codebook.encode_row(&categorical_row(row));
            encoded.extend(numeric_features(row));
            encoded
        })
        .collect()
}

fn email_domain(email: &str) -> String {
    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.trim().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_row() -> FeatureRow {
        FeatureRow {
            user_id: 1,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@Example.ORG".to_string(),
            bio: "I study engines".to_string(),
            research_interests: String::new(),
            personal_url: "https://ada.example".to_string(),
            professional_url: String::new(),
            affiliations_text: "Analytical Engines".to_string(),
            is_active: 1,
        }
    }

    #[test]
    fn categorical_row_normalizes_email_domain() {
        let row = categorical_row(&feature_row());
        assert_eq!(row["email_domain"], "example.org");
        assert_eq!(row["is_active"], "1");
        assert_eq!(row["has_affiliation"], "1");
    }

    #[test]
    fn frame_concatenates_codes_and_numerics() {
        let rows = vec![feature_row()];
        let categorical: Vec<_> = rows.iter().map(categorical_row).collect();
        let codebook = OrdinalCodebook::fit(CATEGORICAL_FIELDS, &categorical);
        let frame = encode_frame(&codebook, &rows);
        assert_eq!(frame[0].len(), CATEGORICAL_FIELDS.len() + 6);
        assert_eq!(frame[0][3], 15.0); // bio length
    }
}

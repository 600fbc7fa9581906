//! Ordinal encoding for declared categorical fields.
//!
//! The codebook assigns each observed value a stable positive code at fit
//! time. Code 0 is reserved for values unseen during fitting so prediction
//! never fails on a new category.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Code reserved for categories unseen at fit time.
pub const UNKNOWN_CODE: u32 = 0;

/// Per-field value -> ordinal code mapping with serializable state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdinalCodebook {
    /// Declared categorical fields, in encoding order.
    fields: Vec<String>,
    /// Per-field value -> code (codes start at 1; 0 is reserved).
    codes: BTreeMap<String, BTreeMap<String, u32>>,
}

/// One record's categorical values, keyed by field name.
pub type CategoricalRow = BTreeMap<String, String>;

impl OrdinalCodebook {
    /// Fit a codebook over the declared fields of the given rows.
    pub fn fit(fields: &[&str], rows: &[CategoricalRow]) -> Self {
        let fields: Vec<String> = fields.iter().map(|field| field.to_string()).collect();
        let mut codes: BTreeMap<String, BTreeMap<String, u32>> = BTreeMap::new();
        for field in &fields {
            let mut field_codes = BTreeMap::new();
            for row in rows {
                if let Some(value) = row.get(field) {
                    let next = field_codes.len() as u32 + 1;
                    field_codes.entry(value.clone()).or_insert(next);
                }
            }
            codes.insert(field.clone(), field_codes);
        }
        Self { fields, codes }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Encode one row; unknown or missing values map to [`UNKNOWN_CODE`].
    pub fn encode_row(&self, row: &CategoricalRow) -> Vec<f32> {
        self.fields
            .iter()
            .map(|field| {
                let code = row
                    .get(field)
                    .and_then(|value| self.codes.get(field).and_then(|codes| codes.get(value)))
                    .copied()
                    .unwrap_or(UNKNOWN_CODE);
                code as f32
            })
            .collect()
    }

    /// Encode a batch of rows.
    pub fn encode(&self, rows: &[CategoricalRow]) -> Vec<Vec<f32>> {
        rows.iter().map(|row| self.encode_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CategoricalRow {
        pairs
            .iter()
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn codes_are_stable_and_start_at_one() {
        let rows = vec![
            row(&[("is_active", "1"), ("email_domain", "example.org")]),
            row(&[("is_active", "0"), ("email_domain", "example.org")]),
            row(&[("is_active", "1"), ("email_domain", "spam.example")]),
        ];
        let codebook = OrdinalCodebook::fit(&["is_active", "email_domain"], &rows);
        let encoded = codebook.encode(&rows);
        assert_eq!(encoded[0], vec![1.0, 1.0]);
        assert_eq!(encoded[1], vec![2.0, 1.0]);
        assert_eq!(encoded[2], vec![1.0, 2.0]);
    }

    #[test]
    fn unseen_category_maps_to_reserved_code() {
        let rows = vec![row(&[("email_domain", "example.org")])];
        let codebook = OrdinalCodebook::fit(&["email_domain"], &rows);
        let encoded = codebook.encode_row(&row(&[("email_domain", "brand.new")]));
        assert_eq!(encoded, vec![UNKNOWN_CODE as f32]);
    }

    #[test]
    fn serialized_codebook_encodes_identically() {
        let rows = vec![
            row(&[("is_active", "1")]),
            row(&[("is_active", "0")]),
        ];
        let codebook = OrdinalCodebook::fit(&["is_active"], &rows);
        let json = serde_json::to_string(&codebook).unwrap();
        let restored: OrdinalCodebook = serde_json::from_str(&json).unwrap();
        assert_eq!(codebook.encode(&rows), restored.encode(&rows));
    }
}

//! Feature extraction: raw profile records into flat, cleaned rows.
//!
//! Everything here is a pure transform. Text fields are coerced to owned
//! strings with markup stripped, missing flags default to zero, and the
//! structured affiliation list is flattened into a single descriptive
//! sentence. Malformed affiliation data fails the row with a data-format
//! error; batch helpers abort on the first failure and leave skip-vs-abort
//! to the caller.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::UserSpamRow;

/// Errors raised while extracting feature rows.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Malformed affiliation data for user {user_id}: {source}")]
    DataFormat {
        user_id: i64,
        source: serde_json::Error,
    },
}

/// One structured affiliation entry as stored on the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affiliation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ror_id: Option<String>,
}

/// Boolean-like value accepted from external records: real booleans,
/// 0/1 integers, or truthy tokens such as `"t"`, `"yes"`, `"True"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Truthy {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Truthy {
    pub fn as_bool(&self) -> bool {
        match self {
            Truthy::Bool(value) => *value,
            Truthy::Int(value) => *value != 0,
            Truthy::Text(token) => truthy_token(token),
        }
    }
}

/// Parse a boolean-like token (`1`, `t`, `true`, `y`, `yes`, case-insensitive).
pub fn truthy_token(token: &str) -> bool {
    matches!(
        token.trim().to_ascii_lowercase().as_str(),
        "1" | "t" | "true" | "y" | "yes"
    )
}

/// Raw member-profile record as imported from the platform export.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRecord {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub research_interests: Option<String>,
    #[serde(default)]
    pub personal_url: Option<String>,
    #[serde(default)]
    pub professional_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<Truthy>,
    #[serde(default)]
    pub affiliations: Option<serde_json::Value>,
}

impl ProfileRecord {
    /// Convert to a storable row, validating the affiliation structure.
    pub fn into_store_row(self) -> Result<UserSpamRow, ExtractError> {
        let affiliations_json = match self.affiliations {
            None | Some(serde_json::Value::Null) => "[]".to_string(),
            Some(value) => {
                // Validate the shape before storing the raw JSON.
                let _: Vec<Affiliation> = serde_json::from_value(value.clone()).map_err(
                    |source| ExtractError::DataFormat {
                        user_id: self.user_id,
                        source,
                    },
                )?;
                value.to_string()
            }
        };
        let mut row = UserSpamRow::new(self.user_id);
        row.first_name = self.first_name.unwrap_or_default();
        row.last_name = self.last_name.unwrap_or_default();
        row.email = self.email.unwrap_or_default();
        row.bio = self.bio.unwrap_or_default();
        row.research_interests = self.research_interests.unwrap_or_default();
        row.personal_url = self.personal_url.unwrap_or_default();
        row.professional_url = self.professional_url.unwrap_or_default();
        row.is_active = self.is_active.map(|value| value.as_bool()).unwrap_or(false);
        row.affiliations = affiliations_json;
        Ok(row)
    }
}

/// Flat, cleaned feature row ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub research_interests: String,
    pub personal_url: String,
    pub professional_url: String,
    /// Affiliations flattened into one descriptive sentence.
    pub affiliations_text: String,
    /// Missing/false flags default to 0.
    pub is_active: u8,
}

/// Extract a single cleaned feature row from a stored record.
pub fn extract_row(row: &UserSpamRow) -> Result<FeatureRow, ExtractError> {
    let affiliations: Vec<Affiliation> =
        serde_json::from_str(&row.affiliations).map_err(|source| ExtractError::DataFormat {
            user_id: row.user_id,
            source,
        })?;
    Ok(FeatureRow {
        user_id: row.user_id,
        first_name: strip_markup(&row.first_name),
        last_name: strip_markup(&row.last_name),
        email: strip_markup(&row.email),
        bio: strip_markup(&row.bio),
        research_interests: strip_markup(&row.research_interests),
        personal_url: strip_markup(&row.personal_url),
        professional_url: strip_markup(&row.professional_url),
        affiliations_text: flatten_affiliations(&affiliations),
        is_active: row.is_active as u8,
    })
}

/// Extract a batch, aborting on the first malformed row.
pub fn extract_rows(rows: &[UserSpamRow]) -> Result<Vec<FeatureRow>, ExtractError> {
    rows.iter().map(extract_row).collect()
}

/// Strip HTML/markdown tags with the single generic rule `<.*?>` -> space,
/// collapsing the result's surrounding whitespace.
pub fn strip_markup(text: &str) -> String {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = TAG_RE.get_or_init(|| Regex::new(r"<.*?>").expect("markup regex must compile"));
    let stripped = re.replace_all(text, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Flatten affiliation entries into `name (url: ..., ror id: ...)` joined by commas.
pub fn flatten_affiliations(affiliations: &[Affiliation]) -> String {
    let mut parts = Vec::with_capacity(affiliations.len());
    for entry in affiliations {
        let mut details = Vec::new();
        if let Some(url) = entry.url.as_deref().filter(|url| !url.is_empty()) {
            details.push(format!("url: {url}"));
        }
        if let Some(ror_id) = entry.ror_id.as_deref().filter(|id| !id.is_empty()) {
            details.push(format!("ror id: {ror_id}"));
        }
        if details.is_empty() {
            parts.push(entry.name.clone());
        } else {
            parts.push(format!("{} ({})", entry.name, details.join(", ")));
        }
    }
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_with_generic_rule() {
        assert_eq!(
            strip_markup("<p>Hello <b>world</b></p> trailing"),
            "Hello world trailing"
        );
        assert_eq!(strip_markup("no tags here"), "no tags here");
    }

    #[test]
    fn flattens_affiliations_into_one_sentence() {
        let affiliations = vec![
            Affiliation {
                name: "Example University".to_string(),
                url: Some("https://example.edu".to_string()),
                ror_id: Some("01abc".to_string()),
            },
            Affiliation {
                name: "Modeling Lab".to_string(),
                url: None,
                ror_id: None,
            },
        ];
        assert_eq!(
            flatten_affiliations(&affiliations),
            "Example University (url: https://example.edu, ror id: 01abc), Modeling Lab"
        );
    }

    #[test]
    fn malformed_affiliations_fail_the_row() {
        let mut row = UserSpamRow::new(7);
        row.affiliations = r#"[{"url": "https://no-name.example"}]"#.to_string();
        let err = extract_row(&row).unwrap_err();
        assert!(matches!(err, ExtractError::DataFormat { user_id: 7, .. }));
    }

    #[test]
    fn truthy_tokens_cover_string_encoded_flags() {
        assert!(truthy_token("1"));
        assert!(truthy_token(" True "));
        assert!(truthy_token("yes"));
        assert!(!truthy_token("0"));
        assert!(!truthy_token("false"));
        assert!(!truthy_token(""));
    }

    #[test]
    fn profile_record_accepts_mixed_truthy_encodings() {
        let record: ProfileRecord = serde_json::from_str(
            r#"{"user_id": 3, "is_active": "t", "bio": "<p>hi</p>",
                "affiliations": [{"name": "Lab"}]}"#,
        )
        .unwrap();
        let row = record.into_store_row().unwrap();
        assert!(row.is_active);
        assert_eq!(row.affiliations, r#"[{"name":"Lab"}]"#);
    }

    #[test]
    fn missing_flags_default_to_zero() {
        let row = UserSpamRow::new(1);
        let features = extract_row(&row).unwrap();
        assert_eq!(features.is_active, 0);
        assert_eq!(features.affiliations_text, "");
    }
}

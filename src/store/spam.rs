//! Read/write contracts for `user_spam_status` rows.
//!
//! Reads return flat row sets; writes are bulk updates keyed by user id and
//! run inside immediate transactions. The curator label is authoritative:
//! prediction writers must never touch rows that carry one, and the helpers
//! here enforce that in SQL rather than trusting callers.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::StoreError;

const ROW_COLUMNS: &str = "user_id, first_name, last_name, email, bio, research_interests,
        personal_url, professional_url, affiliations, is_active,
        labelled_by_curator, labelled_by_text_classifier, text_classifier_confidence,
        labelled_by_user_classifier, user_classifier_confidence, is_training_data";

/// One `user_spam_status` row, as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSpamRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub bio: String,
    pub research_interests: String,
    pub personal_url: String,
    pub professional_url: String,
    /// JSON array of `{name, url?, ror_id?}` objects, verbatim.
    pub affiliations: String,
    pub is_active: bool,
    pub labelled_by_curator: Option<bool>,
    pub labelled_by_text_classifier: Option<bool>,
    pub text_classifier_confidence: Option<f64>,
    pub labelled_by_user_classifier: Option<bool>,
    pub user_classifier_confidence: Option<f64>,
    pub is_training_data: bool,
}

impl UserSpamRow {
    /// Minimal row for inserts; label fields start unknown.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            bio: String::new(),
            research_interests: String::new(),
            personal_url: String::new(),
            professional_url: String::new(),
            affiliations: "[]".to_string(),
            is_active: false,
            labelled_by_curator: None,
            labelled_by_text_classifier: None,
            text_classifier_confidence: None,
            labelled_by_user_classifier: None,
            user_classifier_confidence: None,
            is_training_data: false,
        }
    }

    /// True when no label or prediction has touched this row yet.
    pub fn is_unlabelled(&self) -> bool {
        self.labelled_by_curator.is_none()
            && self.labelled_by_text_classifier.is_none()
            && self.labelled_by_user_classifier.is_none()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            email: row.get(3)?,
            bio: row.get(4)?,
            research_interests: row.get(5)?,
            personal_url: row.get(6)?,
            professional_url: row.get(7)?,
            affiliations: row.get(8)?,
            is_active: row.get::<_, i64>(9)? != 0,
            labelled_by_curator: row.get::<_, Option<i64>>(10)?.map(|v| v != 0),
            labelled_by_text_classifier: row.get::<_, Option<i64>>(11)?.map(|v| v != 0),
            text_classifier_confidence: row.get(12)?,
            labelled_by_user_classifier: row.get::<_, Option<i64>>(13)?.map(|v| v != 0),
            user_classifier_confidence: row.get(14)?,
            is_training_data: row.get::<_, i64>(15)? != 0,
        })
    }
}

/// Insert or replace a profile row, preserving nothing from any prior row.
pub fn upsert_row(conn: &Connection, row: &UserSpamRow) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO user_spam_status (
            user_id, first_name, last_name, email, bio, research_interests,
            personal_url, professional_url, affiliations, is_active,
            labelled_by_curator, labelled_by_text_classifier, text_classifier_confidence,
            labelled_by_user_classifier, user_classifier_confidence, is_training_data
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
        ON CONFLICT(user_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            email = excluded.email,
            bio = excluded.bio,
            research_interests = excluded.research_interests,
            personal_url = excluded.personal_url,
            professional_url = excluded.professional_url,
            affiliations = excluded.affiliations,
            is_active = excluded.is_active",
        params![
            row.user_id,
            row.first_name,
            row.last_name,
            row.email,
            row.bio,
            row.research_interests,
            row.personal_url,
            row.professional_url,
            row.affiliations,
            row.is_active as i64,
            row.labelled_by_curator.map(|v| v as i64),
            row.labelled_by_text_classifier.map(|v| v as i64),
            row.text_classifier_confidence,
            row.labelled_by_user_classifier.map(|v| v as i64),
            row.user_classifier_confidence,
            row.is_training_data as i64,
        ],
    )?;
    Ok(())
}

/// Fetch every row.
pub fn all_rows(conn: &Connection) -> Result<Vec<UserSpamRow>, StoreError> {
    query_rows(conn, &format!("SELECT {ROW_COLUMNS} FROM user_spam_status ORDER BY user_id"))
}

/// Rows with no curator label (prediction candidates).
pub fn rows_missing_curator_label(conn: &Connection) -> Result<Vec<UserSpamRow>, StoreError> {
    query_rows(
        conn,
        &format!(
            "SELECT {ROW_COLUMNS} FROM user_spam_status
             WHERE labelled_by_curator IS NULL ORDER BY user_id"
        ),
    )
}

/// Curator-labelled rows (training ground truth).
pub fn rows_with_curator_label(conn: &Connection) -> Result<Vec<UserSpamRow>, StoreError> {
    query_rows(
        conn,
        &format!(
            "SELECT {ROW_COLUMNS} FROM user_spam_status
             WHERE labelled_by_curator IS NOT NULL ORDER BY user_id"
        ),
    )
}

/// Curator-labelled rows not yet consumed by a training pass.
pub fn rows_unused_for_training(conn: &Connection) -> Result<Vec<UserSpamRow>, StoreError> {
    query_rows(
        conn,
        &format!(
            "SELECT {ROW_COLUMNS} FROM user_spam_status
             WHERE labelled_by_curator IS NOT NULL AND is_training_data = 0
             ORDER BY user_id"
        ),
    )
}

/// True when some row carries neither a curator label nor any prediction.
pub fn has_untouched_rows(conn: &Connection) -> Result<bool, StoreError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM user_spam_status
             WHERE labelled_by_curator IS NULL
               AND labelled_by_text_classifier IS NULL
               AND labelled_by_user_classifier IS NULL
             LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Bulk-set curator labels. Ids absent from storage are skipped; the ids
/// actually updated are returned in input order.
pub fn set_curator_labels(
    conn: &mut Connection,
    labels: &[(i64, bool)],
) -> Result<Vec<i64>, StoreError> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let mut updated = Vec::new();
    {
        let mut stmt = tx.prepare(
            "UPDATE user_spam_status SET labelled_by_curator = ?2 WHERE user_id = ?1",
        )?;
        for &(user_id, is_spam) in labels {
            let changed = stmt.execute(params![user_id, is_spam as i64])?;
            if changed > 0 {
                updated.push(user_id);
            }
        }
    }
    tx.commit()?;
    Ok(updated)
}

/// Bulk-write text-classifier predictions `(user_id, label, confidence)`.
/// Rows holding a curator label are left untouched.
pub fn set_text_predictions(
    conn: &mut Connection,
    predictions: &[(i64, bool, f64)],
) -> Result<usize, StoreError> {
    set_predictions(
        conn,
        predictions,
        "UPDATE user_spam_status
         SET labelled_by_text_classifier = ?2, text_classifier_confidence = ?3
         WHERE user_id = ?1 AND labelled_by_curator IS NULL",
    )
}

/// Bulk-write user-classifier predictions `(user_id, label, confidence)`.
/// Rows holding a curator label are left untouched.
pub fn set_user_predictions(
    conn: &mut Connection,
    predictions: &[(i64, bool, f64)],
) -> Result<usize, StoreError> {
    set_predictions(
        conn,
        predictions,
        "UPDATE user_spam_status
         SET labelled_by_user_classifier = ?2, user_classifier_confidence = ?3
         WHERE user_id = ?1 AND labelled_by_curator IS NULL",
    )
}

/// Mark rows as consumed for training.
pub fn mark_training_data(conn: &mut Connection, user_ids: &[i64]) -> Result<usize, StoreError> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let mut changed = 0usize;
    {
        let mut stmt =
            tx.prepare("UPDATE user_spam_status SET is_training_data = 1 WHERE user_id = ?1")?;
        for user_id in user_ids {
            changed += stmt.execute(params![user_id])?;
        }
    }
    tx.commit()?;
    Ok(changed)
}

/// Aggregate counts for operator status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub curator_labelled: i64,
    pub curator_spam: i64,
    pub predicted_only: i64,
    pub untouched: i64,
    pub training_data: i64,
}

pub fn status_counts(conn: &Connection) -> Result<StatusCounts, StoreError> {
    conn.query_row(
        "SELECT COUNT(*),
                COUNT(labelled_by_curator),
                COALESCE(SUM(labelled_by_curator IS NOT NULL AND labelled_by_curator = 1), 0),
                COALESCE(SUM(labelled_by_curator IS NULL
                             AND (labelled_by_text_classifier IS NOT NULL
                                  OR labelled_by_user_classifier IS NOT NULL)), 0),
                COALESCE(SUM(labelled_by_curator IS NULL
                             AND labelled_by_text_classifier IS NULL
                             AND labelled_by_user_classifier IS NULL), 0),
                COALESCE(SUM(is_training_data), 0)
         FROM user_spam_status",
        [],
        |row| {
            Ok(StatusCounts {
                total: row.get(0)?,
                curator_labelled: row.get(1)?,
                curator_spam: row.get(2)?,
                predicted_only: row.get(3)?,
                untouched: row.get(4)?,
                training_data: row.get(5)?,
            })
        },
    )
    .map_err(StoreError::from)
}

fn set_predictions(
    conn: &mut Connection,
    predictions: &[(i64, bool, f64)],
    sql: &str,
) -> Result<usize, StoreError> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let mut changed = 0usize;
    {
        let mut stmt = tx.prepare(sql)?;
        for &(user_id, label, confidence) in predictions {
            changed += stmt.execute(params![user_id, label as i64, confidence])?;
        }
    }
    tx.commit()?;
    Ok(changed)
}

fn query_rows(conn: &Connection, sql: &str) -> Result<Vec<UserSpamRow>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], UserSpamRow::from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

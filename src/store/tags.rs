//! Tag vocabulary storage: raw tags, canonical tags, mappings, and the
//! batch rename machinery.
//!
//! A raw tag maps to at most one canonical tag; re-mapping replaces the
//! previous row. Cleanup renames accumulate as unprocessed rows
//! (`transaction_id IS NULL`) and are applied by [`process_cleanups`] in a
//! single transaction; partial failure rolls back the whole batch.

use std::collections::BTreeMap;

use rusqlite::{Connection, params};

use super::{StoreError, now_epoch_seconds};

/// A pending or processed rename proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCleanup {
    pub id: i64,
    pub old_name: String,
    pub new_name: String,
    pub transaction_id: Option<i64>,
}

/// Summary of one processed cleanup batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub transaction_id: i64,
    pub cleanups_processed: usize,
    pub tags_created: usize,
    pub tags_deleted: usize,
    pub items_rewritten: usize,
}

/// Insert a raw tag if absent.
pub fn ensure_tag(conn: &Connection, name: &str) -> Result<(), StoreError> {
    conn.execute("INSERT OR IGNORE INTO tag (name) VALUES (?1)", params![name])?;
    Ok(())
}

/// Attach a tag to a content object through the shared through-table.
pub fn tag_item(
    conn: &Connection,
    content_type: &str,
    object_id: i64,
    tag_name: &str,
) -> Result<(), StoreError> {
    ensure_tag(conn, tag_name)?;
    conn.execute(
        "INSERT OR IGNORE INTO tagged_item (content_type, object_id, tag_name)
         VALUES (?1, ?2, ?3)",
        params![content_type, object_id, tag_name],
    )?;
    Ok(())
}

/// Every raw tag name, sorted.
pub fn all_tag_names(conn: &Connection) -> Result<Vec<String>, StoreError> {
    query_names(conn, "SELECT name FROM tag ORDER BY name")
}

/// Every canonical tag name, sorted.
pub fn all_canonical_names(conn: &Connection) -> Result<Vec<String>, StoreError> {
    query_names(conn, "SELECT name FROM canonical_tag ORDER BY name")
}

/// Raw tags with no canonical mapping yet, sorted.
pub fn unmapped_tag_names(conn: &Connection) -> Result<Vec<String>, StoreError> {
    query_names(
        conn,
        "SELECT name FROM tag
         WHERE name NOT IN (SELECT tag_name FROM canonical_tag_mapping)
         ORDER BY name",
    )
}

/// Insert a canonical tag if absent.
pub fn ensure_canonical_tag(conn: &Connection, name: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO canonical_tag (name) VALUES (?1)",
        params![name],
    )?;
    Ok(())
}

/// Map a raw tag to a canonical tag, replacing any previous mapping.
pub fn upsert_mapping(
    conn: &Connection,
    tag_name: &str,
    canonical_name: &str,
    confidence_score: f64,
) -> Result<(), StoreError> {
    ensure_canonical_tag(conn, canonical_name)?;
    conn.execute(
        "INSERT INTO canonical_tag_mapping (tag_name, canonical_name, confidence_score)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(tag_name) DO UPDATE SET
            canonical_name = excluded.canonical_name,
            confidence_score = excluded.confidence_score",
        params![tag_name, canonical_name, confidence_score],
    )?;
    Ok(())
}

/// All mappings as `tag -> (canonical, confidence)`.
pub fn all_mappings(conn: &Connection) -> Result<BTreeMap<String, (String, f64)>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT tag_name, canonical_name, confidence_score FROM canonical_tag_mapping",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            (row.get::<_, String>(1)?, row.get::<_, f64>(2)?),
        ))
    })?;
    let mut out = BTreeMap::new();
    for row in rows {
        let (tag, target) = row?;
        out.insert(tag, target);
    }
    Ok(out)
}

/// Queue rename proposals as unprocessed cleanups.
pub fn create_cleanups(
    conn: &mut Connection,
    renames: &[(String, String)],
) -> Result<usize, StoreError> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let mut created = 0usize;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tag_cleanup (old_name, new_name, transaction_id)
             VALUES (?1, ?2, NULL)",
        )?;
        for (old_name, new_name) in renames {
            if old_name == new_name {
                continue;
            }
            stmt.execute(params![old_name, new_name])?;
            created += 1;
        }
    }
    tx.commit()?;
    Ok(created)
}

/// Unprocessed cleanups (`transaction_id IS NULL`), oldest first.
pub fn pending_cleanups(conn: &Connection) -> Result<Vec<TagCleanup>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, old_name, new_name, transaction_id FROM tag_cleanup
         WHERE transaction_id IS NULL ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TagCleanup {
            id: row.get(0)?,
            old_name: row.get(1)?,
            new_name: row.get(2)?,
            transaction_id: row.get(3)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Delete unprocessed cleanups by id. Processed cleanups are immutable
/// history and are never deleted.
pub fn delete_pending_cleanups(conn: &mut Connection, ids: &[i64]) -> Result<usize, StoreError> {
    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let mut deleted = 0usize;
    {
        let mut stmt =
            tx.prepare("DELETE FROM tag_cleanup WHERE id = ?1 AND transaction_id IS NULL")?;
        for id in ids {
            deleted += stmt.execute(params![id])?;
        }
    }
    tx.commit()?;
    Ok(deleted)
}

/// Apply every unprocessed cleanup in one atomic batch.
///
/// For each `old_name` group the through-table rows are rewritten to every
/// `new_name` (fan-out: one old reference becomes one reference per new
/// name), missing target tags are created, the superseded tag is deleted
/// exactly once, and the cleanups are stamped with a fresh transaction id.
/// Any failure rolls the entire batch back.
pub fn process_cleanups(conn: &mut Connection) -> Result<Option<CleanupReport>, StoreError> {
    let pending = pending_cleanups(conn)?;
    if pending.is_empty() {
        return Ok(None);
    }

    // old_name -> distinct new names, preserving proposal order.
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for cleanup in &pending {
        let targets = groups.entry(cleanup.old_name.clone()).or_default();
        if !targets.contains(&cleanup.new_name) {
            targets.push(cleanup.new_name.clone());
        }
    }

    let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
    let report = apply_cleanup_groups(&tx, &groups, pending.len())
        .map_err(|err| StoreError::CleanupTransaction(err.to_string()))?;
    tx.commit()?;
    Ok(Some(report))
}

fn apply_cleanup_groups(
    tx: &rusqlite::Transaction<'_>,
    groups: &BTreeMap<String, Vec<String>>,
    cleanups_processed: usize,
) -> rusqlite::Result<CleanupReport> {
    tx.execute(
        "INSERT INTO tag_cleanup_transaction (created_at) VALUES (?1)",
        params![now_epoch_seconds()],
    )?;
    let transaction_id = tx.last_insert_rowid();

    let mut report = CleanupReport {
        transaction_id,
        cleanups_processed,
        ..CleanupReport::default()
    };

    for (old_name, new_names) in groups {
        let references: Vec<(String, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT content_type, object_id FROM tagged_item WHERE tag_name = ?1",
            )?;
            let rows = stmt.query_map(params![old_name], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        for new_name in new_names {
            let created = tx.execute(
                "INSERT OR IGNORE INTO tag (name) VALUES (?1)",
                params![new_name],
            )?;
            report.tags_created += created;
            for (content_type, object_id) in &references {
                report.items_rewritten += tx.execute(
                    "INSERT OR IGNORE INTO tagged_item (content_type, object_id, tag_name)
                     VALUES (?1, ?2, ?3)",
                    params![content_type, object_id, new_name],
                )?;
            }
        }

        if !new_names.iter().any(|name| name == old_name) {
            tx.execute(
                "DELETE FROM tagged_item WHERE tag_name = ?1",
                params![old_name],
            )?;
            tx.execute(
                "DELETE FROM canonical_tag_mapping WHERE tag_name = ?1",
                params![old_name],
            )?;
            report.tags_deleted +=
                tx.execute("DELETE FROM tag WHERE name = ?1", params![old_name])?;
        }
    }

    tx.execute(
        "UPDATE tag_cleanup SET transaction_id = ?1 WHERE transaction_id IS NULL",
        params![transaction_id],
    )?;
    Ok(report)
}

fn query_names(conn: &Connection, sql: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

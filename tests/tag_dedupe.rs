//! End-to-end checks for tag deduplication and batch cleanup migration.

use modsieve::artifacts::ArtifactStore;
use modsieve::dedupe::heuristics::stem_group_renames;
use modsieve::dedupe::{PairModel, cluster_tags, match_tags};
use modsieve::encode::CountVectorizer;
use modsieve::store;
use std::collections::BTreeSet;
use tempfile::tempdir;

#[test]
fn cleanup_batch_with_fan_out_is_applied_atomically() {
    let mut conn = store::open_in_memory().unwrap();
    store::tags::tag_item(&conn, "codebase", 1, "GNU/Linux").unwrap();
    store::tags::tag_item(&conn, "codebase", 2, "GNU/Linux").unwrap();
    store::tags::tag_item(&conn, "job", 7, "GNU/Linux").unwrap();
    store::tags::tag_item(&conn, "codebase", 1, "NetLogo").unwrap();

    store::tags::create_cleanups(
        &mut conn,
        &[
            ("GNU/Linux".to_string(), "Linux".to_string()),
            ("GNU/Linux".to_string(), "GNU".to_string()),
        ],
    )
    .unwrap();
    let report = store::tags::process_cleanups(&mut conn).unwrap().unwrap();

    // The original tag is gone exactly once; both new tags carry every
    // original reference.
    assert_eq!(report.tags_deleted, 1);
    let names = store::tags::all_tag_names(&conn).unwrap();
    assert_eq!(
        names,
        vec!["GNU".to_string(), "Linux".to_string(), "NetLogo".to_string()]
    );
    for new_tag in ["GNU", "Linux"] {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM tagged_item WHERE tag_name = ?1",
                [new_tag],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 3, "references for {new_tag}");
    }

    // Nothing is left pending, and a second run is a no-op.
    assert!(store::tags::pending_cleanups(&conn).unwrap().is_empty());
    assert!(store::tags::process_cleanups(&mut conn).unwrap().is_none());
}

#[test]
fn gazetteer_matches_versioned_tags_and_refuses_nonsense() {
    let model = PairModel::default();
    let canon = vec!["NetLogo".to_string(), "Python".to_string()];

    let outcome = match_tags(&model, &["NetLogo 6.0".to_string()], &canon, 0.5);
    assert_eq!(outcome.matched.len(), 1);
    assert_eq!(outcome.matched[0].canonical, "NetLogo");
    assert!(outcome.matched[0].confidence > 0.5);

    let outcome = match_tags(&model, &["xyzzyzzy123".to_string()], &canon, 0.5);
    assert!(outcome.matched.is_empty());
    assert_eq!(outcome.unmatched, vec!["xyzzyzzy123".to_string()]);
}

#[test]
fn clustering_writes_mappings_that_replace_on_rerun() {
    let conn = store::open_in_memory().unwrap();
    for tag in ["NetLogo", "NetLogo 6.0", "netlogo 5", "Python"] {
        store::tags::ensure_tag(&conn, tag).unwrap();
    }
    let tags = store::tags::all_tag_names(&conn).unwrap();
    let clusters = cluster_tags(&PairModel::default(), &tags, 0.5);
    for cluster in &clusters {
        store::tags::ensure_canonical_tag(&conn, &cluster.canonical).unwrap();
        for (member, confidence) in &cluster.members {
            store::tags::upsert_mapping(&conn, member, &cluster.canonical, *confidence).unwrap();
        }
    }

    let mappings = store::tags::all_mappings(&conn).unwrap();
    assert_eq!(mappings["NetLogo 6.0"].0, "NetLogo");
    assert_eq!(mappings["netlogo 5"].0, "NetLogo");
    assert!(!mappings.contains_key("Python"));

    // A second clustering pass overwrites rather than accumulates.
    for cluster in &cluster_tags(&PairModel::default(), &tags, 0.5) {
        for (member, confidence) in &cluster.members {
            store::tags::upsert_mapping(&conn, member, &cluster.canonical, *confidence).unwrap();
        }
    }
    assert_eq!(store::tags::all_mappings(&conn).unwrap().len(), mappings.len());
}

#[test]
fn stem_grouping_only_shrinks_the_vocabulary() {
    let input: Vec<String> = [
        "agent-based model",
        "agent-based models",
        "cognitive models",
        "cognitive model",
        "land use",
        "segregation",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect();

    let renames = stem_group_renames(&input);
    assert!(!renames.is_empty());

    let input_set: BTreeSet<&String> = input.iter().collect();
    let mut survivors: BTreeSet<String> = input.iter().cloned().collect();
    for (old, new) in &renames {
        assert!(input_set.contains(old));
        assert!(input_set.contains(new), "canon {new} must come from the input");
        survivors.remove(old);
    }
    assert!(survivors.len() < input.len());
    assert!(survivors.contains("land use"));
    assert!(survivors.contains("segregation"));
}

#[test]
fn fitted_vocabulary_survives_the_artifact_store_bit_for_bit() {
    let dir = tempdir().unwrap();
    let artifacts = ArtifactStore::new(dir.path());
    let documents = vec![
        "agent-based modeling of cooperation".to_string(),
        "cheap pills and casino offers".to_string(),
    ];

    let vectorizer = CountVectorizer::fit(&documents);
    artifacts.save("text_vocabulary", &vectorizer).unwrap();
    let restored: CountVectorizer = artifacts.load("text_vocabulary").unwrap();

    let original = vectorizer.transform(&[1, 2], &documents).unwrap();
    let replayed = restored.transform(&[1, 2], &documents).unwrap();
    assert_eq!(original.counts, replayed.counts);
    assert_eq!(original.user_ids, replayed.user_ids);
}

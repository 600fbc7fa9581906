//! End-to-end checks for the spam detection pipeline.

use std::path::Path;

use modsieve::config::PipelineConfig;
use modsieve::spam::SpamDetector;
use modsieve::store::{self, UserSpamRow};
use tempfile::tempdir;

fn detector(dir: &Path) -> SpamDetector {
    SpamDetector::new(&PipelineConfig::rooted_at(dir))
}

fn profile(user_id: i64, bio: &str) -> UserSpamRow {
    let mut row = UserSpamRow::new(user_id);
    row.bio = bio.to_string();
    row.email = format!("user{user_id}@example.org");
    row.is_active = true;
    row
}

#[test]
fn trains_on_labelled_bios_and_flags_held_out_spam() {
    let dir = tempdir().unwrap();
    let mut conn = store::open_in_memory().unwrap();

    store::spam::upsert_row(&conn, &profile(1, "buy cheap pills now")).unwrap();
    store::spam::upsert_row(&conn, &profile(2, "agent-based modeling researcher")).unwrap();
    store::spam::set_curator_labels(&mut conn, &[(1, true), (2, false)]).unwrap();
    store::spam::upsert_row(&conn, &profile(3, "cheap pills for sale")).unwrap();

    let verdicts = detector(dir.path()).execute(&mut conn).unwrap();

    let rows = store::spam::all_rows(&conn).unwrap();
    let held_out = rows.iter().find(|row| row.user_id == 3).unwrap();
    assert_eq!(held_out.labelled_by_text_classifier, Some(true));
    assert!(held_out.text_classifier_confidence.unwrap() > 0.5);
    assert!(verdicts.combined().contains(&3));
    assert_eq!(verdicts.curator_confirmed, vec![1]);
}

#[test]
fn repeated_execute_calls_leave_curator_labels_terminal() {
    let dir = tempdir().unwrap();
    let mut conn = store::open_in_memory().unwrap();

    store::spam::upsert_row(&conn, &profile(1, "buy cheap pills now")).unwrap();
    store::spam::upsert_row(&conn, &profile(2, "agent-based modeling researcher")).unwrap();
    store::spam::upsert_row(&conn, &profile(3, "cheap deals and pills")).unwrap();
    store::spam::set_curator_labels(&mut conn, &[(1, true), (2, false), (3, false)]).unwrap();
    store::spam::upsert_row(&conn, &profile(4, "population dynamics models")).unwrap();

    let detector = detector(dir.path());
    for _pass in 0..3 {
        detector.execute(&mut conn).unwrap();
        let rows = store::spam::all_rows(&conn).unwrap();
        assert_eq!(rows[0].labelled_by_curator, Some(true));
        assert_eq!(rows[1].labelled_by_curator, Some(false));
        assert_eq!(rows[2].labelled_by_curator, Some(false));
        // Curator rows never receive classifier predictions.
        assert_eq!(rows[0].labelled_by_text_classifier, None);
        assert_eq!(rows[0].labelled_by_user_classifier, None);
    }
}

#[test]
fn refine_then_metrics_is_a_pure_read() {
    let dir = tempdir().unwrap();
    let mut conn = store::open_in_memory().unwrap();

    let corpus = [
        (1, "buy cheap pills now", true),
        (2, "free casino bonus offer", true),
        (3, "cheap watches discount deals", true),
        (4, "agent-based modeling researcher", false),
        (5, "ecology and population dynamics", false),
        (6, "social network simulation", false),
    ];
    for (id, bio, _) in &corpus {
        store::spam::upsert_row(&conn, &profile(*id, bio)).unwrap();
    }
    let labels: Vec<(i64, bool)> = corpus.iter().map(|&(id, _, spam)| (id, spam)).collect();
    store::spam::set_curator_labels(&mut conn, &labels).unwrap();

    let detector = detector(dir.path());
    let report = detector.refine(&mut conn).unwrap();
    assert!(report.text.is_some());
    assert!(report.user.is_some());

    let before = detector.get_metrics().unwrap();
    let again = detector.get_metrics().unwrap();
    assert_eq!(before.text.accuracy, again.text.accuracy);
    assert_eq!(before.text.test_user_ids, again.text.test_user_ids);
}

#[test]
fn label_import_csv_accepts_numeric_and_boolean_tokens() {
    let dir = tempdir().unwrap();
    let mut conn = store::open_in_memory().unwrap();
    for id in 1..=4 {
        store::spam::upsert_row(&conn, &profile(id, "some bio text")).unwrap();
    }
    let csv_path = dir.path().join("labels.csv");
    std::fs::write(&csv_path, "user_id,is_spam\n1,1\n2,0\n3,true\n4,False\n").unwrap();

    let import = detector(dir.path())
        .load_labels(&mut conn, &csv_path)
        .unwrap();
    assert_eq!(import.updated, vec![1, 2, 3, 4]);

    let rows = store::spam::rows_with_curator_label(&conn).unwrap();
    let labels: Vec<Option<bool>> = rows.iter().map(|row| row.labelled_by_curator).collect();
    assert_eq!(
        labels,
        vec![Some(true), Some(false), Some(true), Some(false)]
    );
}

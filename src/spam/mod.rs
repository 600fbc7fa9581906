//! Spam detection orchestrator.
//!
//! Coordinates label import, lazy (re)training, prediction runs, and the
//! unified spam-verdict read. Per record the state machine is
//! Unlabeled -> PredictedByClassifier -> ReviewedByCurator; the curator state
//! is terminal and classifier runs never transition out of it.

use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rusqlite::Connection;
use thiserror::Error;
use tracing::{info, warn};

use crate::artifacts::{ArtifactError, ArtifactStore};
use crate::config::PipelineConfig;
use crate::encode::text::text_document;
use crate::encode::{CountVectorizer, EncodeError, OrdinalCodebook};
use crate::extract::{self, ExtractError, FeatureRow, truthy_token};
use crate::ml::gbdt::USER_MODEL_KEY;
use crate::ml::metrics::{EvalScores, ModelMetrics};
use crate::ml::naive_bayes::TEXT_MODEL_KEY;
use crate::ml::{ClassifierError, SpamClassifier, TextClassifier, UserClassifier};
use crate::store::{self, StoreError};

pub mod features;

/// Artifact key for the persisted text-classifier metrics.
pub const TEXT_METRICS_KEY: &str = "text_classifier_metrics";
/// Artifact key for the persisted user-classifier metrics.
pub const USER_METRICS_KEY: &str = "user_classifier_metrics";
/// Artifact key for the fitted text vocabulary.
pub const TEXT_VOCABULARY_KEY: &str = "text_vocabulary";
/// Artifact key for the fitted categorical codebook.
pub const USER_CODEBOOK_KEY: &str = "user_codebook";

const SPLIT_SEED: u64 = 0x6d6f_6473;
/// Below this many labelled rows, evaluation reuses the full training set.
const MIN_EVAL_ROWS: usize = 10;

/// Errors surfaced by orchestrator commands.
#[derive(Debug, Error)]
pub enum SpamError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error("Label CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Label CSV is malformed: {0}")]
    LabelFormat(String),
}

/// Outcome of a curator label import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelImport {
    /// Ids actually updated, in input order.
    pub updated: Vec<i64>,
    /// Rows whose ids were absent from storage.
    pub skipped: usize,
}

/// Current spam verdicts, one entry per flagged record.
#[derive(Debug, Clone, Default)]
pub struct SpamVerdicts {
    /// Records a curator confirmed as spam.
    pub curator_confirmed: Vec<i64>,
    /// Text-classifier flags above threshold, with confidence.
    pub text_flagged: Vec<(i64, f64)>,
    /// User-classifier flags above threshold, with confidence.
    pub user_flagged: Vec<(i64, f64)>,
}

impl SpamVerdicts {
    /// Union of all flagged ids, sorted and deduplicated.
    pub fn combined(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self
            .curator_confirmed
            .iter()
            .copied()
            .chain(self.text_flagged.iter().map(|&(id, _)| id))
            .chain(self.user_flagged.iter().map(|&(id, _)| id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Outcome of a retraining pass.
#[derive(Debug, Clone, Default)]
pub struct RefineReport {
    /// Curator-labelled rows available for training.
    pub training_rows: usize,
    /// Rows newly marked as consumed training data.
    pub newly_consumed: usize,
    /// Fresh text-classifier metrics, if a model was produced.
    pub text: Option<ModelMetrics>,
    /// Fresh user-classifier metrics, if a model was produced.
    pub user: Option<ModelMetrics>,
}

/// Persisted metrics for both classifiers.
#[derive(Debug, Clone)]
pub struct SpamMetrics {
    pub text: ModelMetrics,
    pub user: ModelMetrics,
}

struct TrainedText {
    vectorizer: CountVectorizer,
    classifier: TextClassifier,
    metrics: ModelMetrics,
}

struct TrainedUser {
    codebook: OrdinalCodebook,
    classifier: UserClassifier,
    metrics: ModelMetrics,
}

/// Coordinates the spam pipeline against one record store.
pub struct SpamDetector {
    artifacts: ArtifactStore,
    text_threshold: f64,
    user_threshold: f64,
}

impl SpamDetector {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            artifacts: ArtifactStore::new(config.artifact_dir.clone()),
            text_threshold: config.text_threshold,
            user_threshold: config.user_threshold,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Import a curator-labelled CSV (`user_id,is_spam`). Ids absent from
    /// storage are skipped; the ids actually updated are returned.
    pub fn load_labels(
        &self,
        conn: &mut Connection,
        csv_path: &Path,
    ) -> Result<LabelImport, SpamError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(csv_path)?;
        let headers = reader.headers()?.clone();
        let id_idx = headers
            .iter()
            .position(|name| name == "user_id")
            .ok_or_else(|| SpamError::LabelFormat("missing user_id column".to_string()))?;
        let spam_idx = headers
            .iter()
            .position(|name| name == "is_spam")
            .ok_or_else(|| SpamError::LabelFormat("missing is_spam column".to_string()))?;

        let mut labels = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let id_token = record.get(id_idx).unwrap_or_default();
            let user_id: i64 = id_token.parse().map_err(|_| {
                SpamError::LabelFormat(format!(
                    "row {}: invalid user_id {id_token:?}",
                    line + 2
                ))
            })?;
            let spam_token = record.get(spam_idx).unwrap_or_default();
            labels.push((user_id, truthy_token(spam_token)));
        }

        let updated = store::spam::set_curator_labels(conn, &labels)?;
        let skipped = labels.len() - updated.len();
        info!(
            "Imported {} curator labels ({} skipped as unknown ids)",
            updated.len(),
            skipped
        );
        Ok(LabelImport { updated, skipped })
    }

    /// Run predictions where needed, then return the current spam verdicts:
    /// curator-confirmed spam unioned with classifier flags above threshold.
    pub fn execute(&self, conn: &mut Connection) -> Result<SpamVerdicts, SpamError> {
        if store::spam::has_untouched_rows(conn)? {
            self.run_predictions(conn)?;
        }

        let mut verdicts = SpamVerdicts::default();
        for row in store::spam::all_rows(conn)? {
            if row.labelled_by_curator == Some(true) {
                verdicts.curator_confirmed.push(row.user_id);
                continue;
            }
            if row.labelled_by_curator == Some(false) {
                continue;
            }
            if let (Some(true), Some(confidence)) = (
                row.labelled_by_text_classifier,
                row.text_classifier_confidence,
            ) {
                if confidence > self.text_threshold {
                    verdicts.text_flagged.push((row.user_id, confidence));
                }
            }
            if let (Some(true), Some(confidence)) = (
                row.labelled_by_user_classifier,
                row.user_classifier_confidence,
            ) {
                if confidence > self.user_threshold {
                    verdicts.user_flagged.push((row.user_id, confidence));
                }
            }
        }
        Ok(verdicts)
    }

    /// Retrain both classifiers on the curator-labelled rows (the boosted
    /// model continues from its saved ensemble) and mark the consumed rows.
    /// Curator labels themselves are never touched.
    pub fn refine(&self, conn: &mut Connection) -> Result<RefineReport, SpamError> {
        let labelled = store::spam::rows_with_curator_label(conn)?;
        let mut report = RefineReport {
            training_rows: labelled.len(),
            ..RefineReport::default()
        };
        if labelled.is_empty() {
            warn!("Refine skipped: no curator-labelled rows available");
            return Ok(report);
        }

        let rows = extract::extract_rows(&labelled)?;
        let labels: Vec<bool> = labelled
            .iter()
            .map(|row| row.labelled_by_curator.unwrap_or(false))
            .collect();

        if let Some(trained) = self.train_text(&rows, &labels)? {
            report.text = Some(trained.metrics);
        }
        if let Some(trained) = self.train_user(&rows, &labels)? {
            report.user = Some(trained.metrics);
        }

        let ids: Vec<i64> = labelled.iter().map(|row| row.user_id).collect();
        report.newly_consumed = store::spam::mark_training_data(conn, &ids)?;
        Ok(report)
    }

    /// Pure read of the persisted metrics artifacts. Missing metrics are an
    /// error; this path never trains.
    pub fn get_metrics(&self) -> Result<SpamMetrics, SpamError> {
        if !self.artifacts.exists(TEXT_METRICS_KEY) {
            return Err(ArtifactError::MetricsUnavailable("text_classifier".to_string()).into());
        }
        if !self.artifacts.exists(USER_METRICS_KEY) {
            return Err(ArtifactError::MetricsUnavailable("user_classifier".to_string()).into());
        }
        Ok(SpamMetrics {
            text: self.artifacts.load(TEXT_METRICS_KEY)?,
            user: self.artifacts.load(USER_METRICS_KEY)?,
        })
    }

    fn run_predictions(&self, conn: &mut Connection) -> Result<(), SpamError> {
        let candidates = store::spam::rows_missing_curator_label(conn)?;
        if candidates.is_empty() {
            return Ok(());
        }
        let rows = extract::extract_rows(&candidates)?;

        if let Some((vectorizer, classifier)) = self.text_model(conn)? {
            let mut ids = Vec::new();
            let mut documents = Vec::new();
            for row in &rows {
                if let Some(document) = text_document(row) {
                    ids.push(row.user_id);
                    documents.push(document);
                }
            }
            if !documents.is_empty() {
                let encoded = vectorizer.transform(&ids, &documents)?;
                let predictions = classifier.predict(&encoded.counts)?;
                let writes: Vec<(i64, bool, f64)> = ids
                    .iter()
                    .zip(predictions.iter())
                    .map(|(&id, p)| (id, p.label, p.confidence))
                    .collect();
                let written = store::spam::set_text_predictions(conn, &writes)?;
                info!("Wrote {written} text-classifier predictions");
            }
        }

        if let Some((codebook, classifier)) = self.user_model(conn)? {
            let frame = features::encode_frame(&codebook, &rows);
            let predictions = classifier.predict(&frame)?;
            let writes: Vec<(i64, bool, f64)> = rows
                .iter()
                .zip(predictions.iter())
                .map(|(row, p)| (row.user_id, p.label, p.confidence))
                .collect();
            let written = store::spam::set_user_predictions(conn, &writes)?;
            info!("Wrote {written} user-classifier predictions");
        }
        Ok(())
    }

    /// Load the persisted text model, lazily fitting when no artifact exists.
    fn text_model(
        &self,
        conn: &Connection,
    ) -> Result<Option<(CountVectorizer, TextClassifier)>, SpamError> {
        if self.artifacts.exists(TEXT_MODEL_KEY) && self.artifacts.exists(TEXT_VOCABULARY_KEY) {
            let vectorizer: CountVectorizer = self.artifacts.load(TEXT_VOCABULARY_KEY)?;
            let classifier = TextClassifier::load(&self.artifacts)?;
            return Ok(Some((vectorizer, classifier)));
        }
        let (rows, labels) = self.labelled_rows(conn)?;
        match self.train_text(&rows, &labels)? {
            Some(trained) => Ok(Some((trained.vectorizer, trained.classifier))),
            None => {
                warn!("No text model available; skipping text predictions");
                Ok(None)
            }
        }
    }

    /// Load the persisted user model, lazily fitting when no artifact exists.
    fn user_model(
        &self,
        conn: &Connection,
    ) -> Result<Option<(OrdinalCodebook, UserClassifier)>, SpamError> {
        if self.artifacts.exists(USER_MODEL_KEY) && self.artifacts.exists(USER_CODEBOOK_KEY) {
            let codebook: OrdinalCodebook = self.artifacts.load(USER_CODEBOOK_KEY)?;
            let classifier = UserClassifier::load(&self.artifacts)?;
            return Ok(Some((codebook, classifier)));
        }
        let (rows, labels) = self.labelled_rows(conn)?;
        match self.train_user(&rows, &labels)? {
            Some(trained) => Ok(Some((trained.codebook, trained.classifier))),
            None => {
                warn!("No user model available; skipping user predictions");
                Ok(None)
            }
        }
    }

    fn labelled_rows(&self, conn: &Connection) -> Result<(Vec<FeatureRow>, Vec<bool>), SpamError> {
        let labelled = store::spam::rows_with_curator_label(conn)?;
        let rows = extract::extract_rows(&labelled)?;
        let labels = labelled
            .iter()
            .map(|row| row.labelled_by_curator.unwrap_or(false))
            .collect();
        Ok((rows, labels))
    }

    fn train_text(
        &self,
        rows: &[FeatureRow],
        labels: &[bool],
    ) -> Result<Option<TrainedText>, SpamError> {
        // Rows without any usable text stay out of the concatenation.
        let mut ids = Vec::new();
        let mut documents = Vec::new();
        let mut doc_labels = Vec::new();
        for (row, &label) in rows.iter().zip(labels.iter()) {
            if let Some(document) = text_document(row) {
                ids.push(row.user_id);
                documents.push(document);
                doc_labels.push(label);
            }
        }
        if documents.is_empty() {
            warn!("Text classifier training skipped: no rows with usable text");
            return Ok(None);
        }

        let (train_idx, eval_idx) = split_indices(documents.len());
        let train_docs: Vec<String> = train_idx.iter().map(|&i| documents[i].clone()).collect();
        let train_labels: Vec<bool> = train_idx.iter().map(|&i| doc_labels[i]).collect();
        let train_ids: Vec<i64> = train_idx.iter().map(|&i| ids[i]).collect();

        let vectorizer = CountVectorizer::fit(&train_docs);
        let encoded = vectorizer.transform(&train_ids, &train_docs)?;
        let mut classifier = TextClassifier::default();
        if !classifier.train(&encoded.counts, &train_labels)?.is_trained() {
            return Ok(None);
        }

        let eval_docs: Vec<String> = eval_idx.iter().map(|&i| documents[i].clone()).collect();
        let eval_labels: Vec<bool> = eval_idx.iter().map(|&i| doc_labels[i]).collect();
        let eval_ids: Vec<i64> = eval_idx.iter().map(|&i| ids[i]).collect();
        let eval_encoded = vectorizer.transform(&eval_ids, &eval_docs)?;
        let scores = classifier.evaluate(&eval_encoded.counts, &eval_labels)?;
        let metrics = self.persist_text(&vectorizer, &classifier, scores, eval_ids)?;
        Ok(Some(TrainedText {
            vectorizer,
            classifier,
            metrics,
        }))
    }

    fn train_user(
        &self,
        rows: &[FeatureRow],
        labels: &[bool],
    ) -> Result<Option<TrainedUser>, SpamError> {
        if rows.is_empty() {
            warn!("User classifier training skipped: no labelled rows");
            return Ok(None);
        }

        // Reuse the saved codebook so refits keep train-time codes; unseen
        // categories fall back to the reserved unknown code.
        let codebook = if self.artifacts.exists(USER_CODEBOOK_KEY) {
            self.artifacts.load(USER_CODEBOOK_KEY)?
        } else {
            let categorical: Vec<_> = rows.iter().map(features::categorical_row).collect();
            OrdinalCodebook::fit(features::CATEGORICAL_FIELDS, &categorical)
        };

        let (train_idx, eval_idx) = split_indices(rows.len());
        let train_rows: Vec<FeatureRow> = train_idx.iter().map(|&i| rows[i].clone()).collect();
        let train_labels: Vec<bool> = train_idx.iter().map(|&i| labels[i]).collect();
        let frame = features::encode_frame(&codebook, &train_rows);

        let mut classifier = if self.artifacts.exists(USER_MODEL_KEY) {
            UserClassifier::load(&self.artifacts)?
        } else {
            UserClassifier::default()
        };
        if !classifier.train(&frame, &train_labels)?.is_trained() {
            return Ok(None);
        }

        let eval_rows: Vec<FeatureRow> = eval_idx.iter().map(|&i| rows[i].clone()).collect();
        let eval_labels: Vec<bool> = eval_idx.iter().map(|&i| labels[i]).collect();
        let eval_ids: Vec<i64> = eval_rows.iter().map(|row| row.user_id).collect();
        let eval_frame = features::encode_frame(&codebook, &eval_rows);
        let scores = classifier.evaluate(&eval_frame, &eval_labels)?;
        let metrics = self.persist_user(&codebook, &classifier, scores, eval_ids)?;
        Ok(Some(TrainedUser {
            codebook,
            classifier,
            metrics,
        }))
    }

    fn persist_text(
        &self,
        vectorizer: &CountVectorizer,
        classifier: &TextClassifier,
        scores: EvalScores,
        eval_ids: Vec<i64>,
    ) -> Result<ModelMetrics, SpamError> {
        let metrics = ModelMetrics::new(scores, eval_ids);
        self.artifacts.save(TEXT_VOCABULARY_KEY, vectorizer)?;
        classifier.save(&self.artifacts)?;
        self.artifacts.save(TEXT_METRICS_KEY, &metrics)?;
        Ok(metrics)
    }

    fn persist_user(
        &self,
        codebook: &OrdinalCodebook,
        classifier: &UserClassifier,
        scores: EvalScores,
        eval_ids: Vec<i64>,
    ) -> Result<ModelMetrics, SpamError> {
        let metrics = ModelMetrics::new(scores, eval_ids);
        self.artifacts.save(USER_CODEBOOK_KEY, codebook)?;
        classifier.save(&self.artifacts)?;
        self.artifacts.save(USER_METRICS_KEY, &metrics)?;
        Ok(metrics)
    }
}

/// Deterministic shuffled train/eval split. Small datasets train and
/// evaluate on the full set so tiny curation runs still produce a model.
fn split_indices(n: usize) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < MIN_EVAL_ROWS {
        return (indices.clone(), indices);
    }
    let mut rng = StdRng::seed_from_u64(SPLIT_SEED);
    indices.shuffle(&mut rng);
    let eval_len = (n / 5).max(1);
    let eval = indices.split_off(n - eval_len);
    (indices, eval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{UserSpamRow, open_in_memory};
    use tempfile::tempdir;

    fn detector(dir: &Path) -> SpamDetector {
        SpamDetector::new(&PipelineConfig::rooted_at(dir))
    }

    fn seed_profiles(conn: &Connection) {
        let spammy = [
            (1, "buy cheap pills now", "discount pharmacy deals"),
            (2, "cheap watches and pills", "free casino bonus"),
            (3, "limited offer buy now", "cheap pills online"),
        ];
        let genuine = [
            (4, "agent-based modeling researcher", "complex systems"),
            (5, "ecology simulation models", "population dynamics"),
            (6, "social simulation and networks", "agent-based models"),
        ];
        for (id, bio, interests) in spammy.iter().chain(genuine.iter()) {
            let mut row = UserSpamRow::new(*id);
            row.bio = bio.to_string();
            row.research_interests = interests.to_string();
            row.email = format!("user{id}@example.org");
            row.is_active = true;
            store::spam::upsert_row(conn, &row).unwrap();
        }
    }

    fn label_all(conn: &mut Connection) {
        store::spam::set_curator_labels(
            conn,
            &[(1, true), (2, true), (3, true), (4, false), (5, false), (6, false)],
        )
        .unwrap();
    }

    #[test]
    fn execute_lazily_fits_and_flags_unlabelled_spam() {
        let dir = tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        seed_profiles(&conn);
        label_all(&mut conn);

        let mut extra = UserSpamRow::new(7);
        extra.bio = "cheap pills for sale".to_string();
        store::spam::upsert_row(&conn, &extra).unwrap();

        let verdicts = detector(dir.path()).execute(&mut conn).unwrap();
        assert_eq!(verdicts.curator_confirmed, vec![1, 2, 3]);
        assert!(verdicts.text_flagged.iter().any(|&(id, conf)| id == 7 && conf > 0.5));
        assert!(verdicts.combined().contains(&7));
    }

    #[test]
    fn execute_never_rewrites_curator_labels() {
        let dir = tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        seed_profiles(&conn);
        label_all(&mut conn);

        let detector = detector(dir.path());
        detector.execute(&mut conn).unwrap();
        detector.execute(&mut conn).unwrap();

        for row in store::spam::all_rows(&conn).unwrap() {
            assert!(row.labelled_by_curator.is_some());
            assert_eq!(row.labelled_by_text_classifier, None);
            assert_eq!(row.labelled_by_user_classifier, None);
        }
    }

    #[test]
    fn refine_reports_metrics_and_consumes_rows() {
        let dir = tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        seed_profiles(&conn);
        label_all(&mut conn);

        let detector = detector(dir.path());
        let report = detector.refine(&mut conn).unwrap();
        assert_eq!(report.training_rows, 6);
        assert_eq!(report.newly_consumed, 6);
        assert!(report.text.is_some());
        assert!(report.user.is_some());
        assert!(store::spam::rows_unused_for_training(&conn).unwrap().is_empty());

        let metrics = detector.get_metrics().unwrap();
        assert!(metrics.text.accuracy > 0.0);
    }

    #[test]
    fn get_metrics_never_trains() {
        let dir = tempdir().unwrap();
        let result = detector(dir.path()).get_metrics();
        assert!(matches!(
            result,
            Err(SpamError::Artifact(ArtifactError::MetricsUnavailable(_)))
        ));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn load_labels_imports_csv_and_skips_unknown_ids() {
        let dir = tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        seed_profiles(&conn);

        let csv_path = dir.path().join("labels.csv");
        std::fs::write(&csv_path, "user_id,is_spam\n1,1\n4,0\n99,true\n").unwrap();
        let import = detector(dir.path())
            .load_labels(&mut conn, &csv_path)
            .unwrap();
        assert_eq!(import.updated, vec![1, 4]);
        assert_eq!(import.skipped, 1);

        let rows = store::spam::rows_with_curator_label(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].labelled_by_curator, Some(true));
        assert_eq!(rows[1].labelled_by_curator, Some(false));
    }

    #[test]
    fn malformed_label_csv_is_rejected() {
        let dir = tempdir().unwrap();
        let mut conn = open_in_memory().unwrap();
        let csv_path = dir.path().join("labels.csv");
        std::fs::write(&csv_path, "who,what\n1,1\n").unwrap();
        let result = detector(dir.path()).load_labels(&mut conn, &csv_path);
        assert!(matches!(result, Err(SpamError::LabelFormat(_))));
    }
}

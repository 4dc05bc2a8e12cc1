//! Batch reanalysis: re-scores rows stored as `neutral` with the external
//! classifier and writes back only the rows whose result changed.
//!
//! Rows are processed one at a time. A failure on one row is logged and
//! counted; the batch moves on to the next row.

pub mod store;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{truncate_input, SentimentClassifier};
use crate::models::feedback::StoredSentiment;
use crate::sentiment::{Sentiment, SentimentResult};

pub use store::{FeedbackStore, PgFeedbackStore};

#[derive(Debug, Clone, Copy)]
pub struct ReanalysisOptions {
    /// Upper bound on rows fetched across all pages.
    pub limit: usize,
    pub page_size: usize,
    pub dry_run: bool,
}

impl Default for ReanalysisOptions {
    fn default() -> Self {
        Self {
            limit: 1000,
            page_size: 100,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReanalysisSummary {
    pub processed: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowOutcome {
    Updated,
    Unchanged,
    Skipped,
}

/// Whether a recomputed result differs from what is stored.
/// A row with no stored score is always rewritten.
pub fn needs_write(new: &SentimentResult, stored_score: Option<f64>) -> bool {
    new.sentiment != Sentiment::Neutral || stored_score != Some(new.sentiment_score)
}

/// Runs one reanalysis pass over neutral rows.
///
/// Only fails when a page cannot be fetched; row-level errors are counted in
/// the summary.
pub async fn reanalyze_neutral(
    store: &dyn FeedbackStore,
    classifier: &dyn SentimentClassifier,
    options: ReanalysisOptions,
) -> anyhow::Result<ReanalysisSummary> {
    let mut summary = ReanalysisSummary::default();
    let mut cursor: Option<Uuid> = None;
    let page_size = options.page_size.max(1);

    info!(
        "Reanalyzing up to {} neutral rows (page size {}, dry run: {})",
        options.limit, page_size, options.dry_run
    );

    while summary.processed < options.limit {
        let want = page_size.min(options.limit - summary.processed);
        let page = store.fetch_neutral_page(cursor, want).await?;
        if page.is_empty() {
            break;
        }
        let page_len = page.len();
        cursor = page.last().map(|row| row.id);

        for row in &page {
            summary.processed += 1;
            match reanalyze_row(store, classifier, row, options.dry_run).await {
                Ok(RowOutcome::Updated) => summary.updated += 1,
                Ok(RowOutcome::Unchanged) => summary.unchanged += 1,
                Ok(RowOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!("Reanalysis failed for feedback {}: {e:#}", row.id);
                }
            }
        }

        if page_len < want {
            break;
        }
    }

    info!(
        "Reanalysis finished: processed={} updated={} unchanged={} skipped={} failed={}",
        summary.processed, summary.updated, summary.unchanged, summary.skipped, summary.failed
    );
    Ok(summary)
}

async fn reanalyze_row(
    store: &dyn FeedbackStore,
    classifier: &dyn SentimentClassifier,
    row: &StoredSentiment,
    dry_run: bool,
) -> anyhow::Result<RowOutcome> {
    let text = row.feedback.as_deref().map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Ok(RowOutcome::Skipped);
    }

    let result = classifier.classify(truncate_input(text)).await?.to_result();

    if !needs_write(&result, row.sentiment_score) {
        debug!("Feedback {} unchanged", row.id);
        return Ok(RowOutcome::Unchanged);
    }

    if !dry_run {
        store.update_sentiment(row.id, &result, Utc::now()).await?;
    }
    debug!(
        "Feedback {} → {} ({:.3})",
        row.id, result.sentiment, result.sentiment_score
    );
    Ok(RowOutcome::Updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{Classification, ClassifierError};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// In-memory store keyed (and ordered) by id.
    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<BTreeMap<Uuid, StoredSentiment>>,
        writes: Mutex<usize>,
        fail_writes_for: Option<Uuid>,
    }

    impl MemoryStore {
        fn with_rows(rows: Vec<(Option<&str>, f64)>) -> (Self, Vec<Uuid>) {
            let store = MemoryStore::default();
            let mut ids = Vec::new();
            {
                let mut map = store.rows.lock().unwrap();
                for (text, score) in rows {
                    let id = Uuid::new_v4();
                    ids.push(id);
                    map.insert(
                        id,
                        StoredSentiment {
                            id,
                            feedback: text.map(String::from),
                            sentiment: "neutral".to_string(),
                            sentiment_score: Some(score),
                        },
                    );
                }
            }
            (store, ids)
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn get(&self, id: Uuid) -> StoredSentiment {
            self.rows.lock().unwrap()[&id].clone()
        }
    }

    #[async_trait]
    impl FeedbackStore for MemoryStore {
        async fn fetch_neutral_page(
            &self,
            after: Option<Uuid>,
            limit: usize,
        ) -> anyhow::Result<Vec<StoredSentiment>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .filter(|r| r.sentiment == "neutral")
                .filter(|r| after.map_or(true, |a| r.id > a))
                .take(limit)
                .cloned()
                .collect())
        }

        async fn update_sentiment(
            &self,
            id: Uuid,
            result: &SentimentResult,
            _analyzed_at: DateTime<Utc>,
        ) -> anyhow::Result<()> {
            if self.fail_writes_for == Some(id) {
                anyhow::bail!("connection reset");
            }
            *self.writes.lock().unwrap() += 1;
            let mut rows = self.rows.lock().unwrap();
            let row = rows.get_mut(&id).ok_or_else(|| anyhow::anyhow!("missing row"))?;
            row.sentiment = result.sentiment.to_string();
            row.sentiment_score = Some(result.sentiment_score);
            Ok(())
        }
    }

    /// Classifier answering from a text → (label, score) table.
    struct TableClassifier {
        answers: HashMap<&'static str, (&'static str, f64)>,
        calls: Mutex<Vec<String>>,
    }

    impl TableClassifier {
        fn new(answers: &[(&'static str, &'static str, f64)]) -> Self {
            Self {
                answers: answers.iter().map(|(t, l, s)| (*t, (*l, *s))).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SentimentClassifier for TableClassifier {
        async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
            self.calls.lock().unwrap().push(text.to_string());
            match self.answers.get(text) {
                Some((label, score)) => Ok(Classification {
                    label: label.to_string(),
                    score: *score,
                }),
                None => Err(ClassifierError::Api {
                    status: 503,
                    message: "model unavailable".to_string(),
                }),
            }
        }
    }

    #[test]
    fn test_needs_write_rules() {
        let neutral = SentimentResult::NEUTRAL;
        assert!(!needs_write(&neutral, Some(0.0)));
        assert!(needs_write(&neutral, Some(0.2)));
        assert!(needs_write(&neutral, None));
        let positive = SentimentResult {
            sentiment: Sentiment::Positive,
            sentiment_score: 0.9,
        };
        assert!(needs_write(&positive, Some(0.9)));
    }

    #[tokio::test]
    async fn test_updates_changed_rows_and_skips_empty_text() {
        let (store, ids) = MemoryStore::with_rows(vec![
            (Some("aplikasinya keren"), 0.0),
            (Some("biasa saja"), 0.0),
            (Some("   "), 0.0),
            (None, 0.0),
        ]);
        let classifier = TableClassifier::new(&[
            ("aplikasinya keren", "POSITIVE", 0.93),
            ("biasa saja", "neutral", 0.55),
        ]);

        let summary = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReanalysisSummary {
                processed: 4,
                updated: 1,
                unchanged: 1,
                skipped: 2,
                failed: 0,
            }
        );
        let updated = store.get(ids[0]);
        assert_eq!(updated.sentiment, "positive");
        assert_eq!(updated.sentiment_score, Some(0.93));
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn test_second_run_performs_no_writes() {
        let (store, _) = MemoryStore::with_rows(vec![
            (Some("bagus"), 0.0),
            (Some("biasa"), 0.0),
            (Some("jelek"), 0.0),
        ]);
        let classifier = TableClassifier::new(&[
            ("bagus", "pos", 0.8),
            ("biasa", "neutral", 0.4),
            ("jelek", "neg", 0.7),
        ]);

        let first = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(first.updated, 2);
        let writes_after_first = store.writes();

        let second = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(store.writes(), writes_after_first);
    }

    #[tokio::test]
    async fn test_row_failures_do_not_abort_batch() {
        let (mut store, ids) = MemoryStore::with_rows(vec![
            (Some("unknown text"), 0.0),
            (Some("mantap"), 0.0),
            (Some("lemot"), 0.0),
        ]);
        let classifier = TableClassifier::new(&[("mantap", "POSITIVE", 0.9), ("lemot", "NEGATIVE", 0.8)]);
        // Ids are random, so the write failure targets whichever row holds "lemot".
        let lemot = ids
            .iter()
            .copied()
            .find(|id| store.get(*id).feedback.as_deref() == Some("lemot"))
            .unwrap();
        store.fail_writes_for = Some(lemot);

        let summary = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.get(lemot).sentiment, "neutral");
    }

    #[tokio::test]
    async fn test_respects_limit_across_pages() {
        let rows: Vec<(Option<&str>, f64)> = (0..7).map(|_| (Some("biasa"), 0.0)).collect();
        let (store, _) = MemoryStore::with_rows(rows);
        let classifier = TableClassifier::new(&[("biasa", "neutral", 0.5)]);

        let options = ReanalysisOptions {
            limit: 5,
            page_size: 2,
            dry_run: false,
        };
        let summary = reanalyze_neutral(&store, &classifier, options).await.unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.unchanged, 5);
        assert_eq!(classifier.calls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_keyset_paging_visits_every_row_once() {
        let rows: Vec<(Option<&str>, f64)> = (0..5).map(|_| (Some("bagus"), 0.0)).collect();
        let (store, _) = MemoryStore::with_rows(rows);
        let classifier = TableClassifier::new(&[("bagus", "positive", 0.7)]);

        let options = ReanalysisOptions {
            limit: 100,
            page_size: 2,
            dry_run: false,
        };
        let summary = reanalyze_neutral(&store, &classifier, options).await.unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.updated, 5);
        assert_eq!(store.writes(), 5);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let (store, ids) = MemoryStore::with_rows(vec![(Some("bagus"), 0.0)]);
        let classifier = TableClassifier::new(&[("bagus", "positive", 0.7)]);

        let options = ReanalysisOptions {
            dry_run: true,
            ..ReanalysisOptions::default()
        };
        let summary = reanalyze_neutral(&store, &classifier, options).await.unwrap();
        assert_eq!(summary.updated, 1);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get(ids[0]).sentiment, "neutral");
    }

    #[tokio::test]
    async fn test_long_text_is_truncated_before_classification() {
        let long = "a".repeat(2000);
        let (store, _) = MemoryStore::with_rows(vec![(Some(long.as_str()), 0.0)]);
        let classifier = TableClassifier::new(&[]);

        let summary = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        let calls = classifier.calls.lock().unwrap();
        assert_eq!(calls[0].chars().count(), 512);
    }

    #[tokio::test]
    async fn test_unavailable_classifier_is_called_once_per_row() {
        use crate::classifier::{ClassifierConfig, HttpClassifier};

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/sentiment")
            .with_status(503)
            .with_body(r#"{"error":"Model is currently loading"}"#)
            .expect(1)
            .create_async()
            .await;
        let config = ClassifierConfig::new(format!("{}/models/sentiment", server.url()), None)
            .without_retries();
        let classifier = HttpClassifier::new(config).unwrap();
        let (store, ids) = MemoryStore::with_rows(vec![(Some("aplikasinya lemot"), 0.0)]);

        let summary = reanalyze_neutral(&store, &classifier, ReanalysisOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.writes(), 0);
        assert_eq!(store.get(ids[0]).sentiment, "neutral");
        mock.assert_async().await;
    }
}

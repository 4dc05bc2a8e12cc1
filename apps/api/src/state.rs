use std::sync::Arc;

use sqlx::PgPool;

use crate::classifier::SentimentClassifier;
use crate::sentiment::SentimentScorer;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Lexicon scorer bound to the configured threshold.
    pub scorer: SentimentScorer,
    /// External model; `None` when `CLASSIFIER_URL` is unset.
    pub classifier: Option<Arc<dyn SentimentClassifier>>,
}

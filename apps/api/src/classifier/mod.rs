//! Sentiment Classifier: the seam to the external ML model used by reanalysis
//! and by model-backed scoring requests.
//!
//! The model's raw label is normalized to positive / negative / neutral and
//! its confidence turned into a signed score.

use std::future::Future;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::sentiment::{Sentiment, SentimentResult};

pub mod http;

pub use http::{ClassifierConfig, HttpClassifier, DEFAULT_MAX_ATTEMPTS};

/// Longest input, in characters, sent to the model.
pub const MAX_INPUT_CHARS: usize = 512;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Classifier returned no labels")]
    EmptyResponse,

    #[error("Classifier initialization failed: {0}")]
    Init(String),
}

/// Top label reported by the model with its confidence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

impl Classification {
    pub fn to_result(&self) -> SentimentResult {
        let sentiment = normalize_label(&self.label);
        SentimentResult {
            sentiment,
            sentiment_score: signed_score(sentiment, self.score),
        }
    }
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError>;
}

/// `pos`/`positive` → positive, `neg`/`negative` → negative, anything else
/// stays neutral.
pub fn normalize_label(label: &str) -> Sentiment {
    match label.trim().to_ascii_lowercase().as_str() {
        "pos" | "positive" => Sentiment::Positive,
        "neg" | "negative" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// `+score` for positive, `-score` for negative, `0` for neutral.
pub fn signed_score(sentiment: Sentiment, score: f64) -> f64 {
    let score = if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    };
    match sentiment {
        Sentiment::Positive => score,
        Sentiment::Negative => -score,
        Sentiment::Neutral => 0.0,
    }
}

/// Cuts `text` to at most [`MAX_INPUT_CHARS`] characters on a char boundary.
pub fn truncate_input(text: &str) -> &str {
    match text.char_indices().nth(MAX_INPUT_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Classifier handle built on first use.
///
/// Concurrent first callers await one shared initialization. A failed
/// initialization is not cached; the next caller tries again.
pub struct LazyClassifier {
    config: ClassifierConfig,
    cell: OnceCell<HttpClassifier>,
}

impl LazyClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    pub async fn handle(&self) -> Result<&HttpClassifier, ClassifierError> {
        self.handle_with(|config| async move { HttpClassifier::new(config) })
            .await
    }

    async fn handle_with<F, Fut>(&self, init: F) -> Result<&HttpClassifier, ClassifierError>
    where
        F: FnOnce(ClassifierConfig) -> Fut,
        Fut: Future<Output = Result<HttpClassifier, ClassifierError>>,
    {
        self.cell
            .get_or_try_init(|| async move {
                info!("Initializing sentiment classifier at {}", self.config.url);
                init(self.config.clone()).await
            })
            .await
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}

#[async_trait]
impl SentimentClassifier for LazyClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        self.handle().await?.classify(text).await
    }
}

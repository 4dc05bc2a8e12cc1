use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::classifier::truncate_input;
use crate::errors::AppError;
use crate::sentiment::{score_sentiment, SentimentResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringEngine {
    #[default]
    Lexicon,
    Model,
}

#[derive(Debug, Deserialize)]
pub struct ScoreRequest {
    pub text: Option<String>,
    pub rating: Option<f64>,
    /// Overrides the configured threshold for the lexicon engine.
    pub threshold: Option<f64>,
    #[serde(default)]
    pub engine: ScoringEngine,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    #[serde(flatten)]
    pub result: SentimentResult,
    pub engine: ScoringEngine,
}

/// POST /api/v1/sentiment/score
pub async fn handle_score(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let result = match req.engine {
        ScoringEngine::Lexicon => {
            let threshold = match req.threshold {
                Some(t) if (0.0..=1.0).contains(&t) => t,
                Some(t) => {
                    return Err(AppError::Validation(format!(
                        "threshold must be between 0 and 1, got {t}"
                    )))
                }
                None => state.scorer.threshold,
            };
            score_sentiment(req.text.as_deref(), threshold, req.rating)
        }
        ScoringEngine::Model => {
            let classifier = state.classifier.as_ref().ok_or_else(|| {
                AppError::Validation("no sentiment model is configured".to_string())
            })?;
            let text = req.text.as_deref().map(str::trim).unwrap_or_default();
            if text.is_empty() {
                return Err(AppError::Validation(
                    "model scoring requires non-empty text".to_string(),
                ));
            }
            classifier.classify(truncate_input(text)).await?.to_result()
        }
    };

    Ok(Json(ScoreResponse {
        result,
        engine: req.engine,
    }))
}

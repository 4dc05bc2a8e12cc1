pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::sentiment::handlers as sentiment;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sentiment
        .route("/api/v1/sentiment/score", post(sentiment::handle_score))
        // Feedback
        .route("/api/v1/feedback", get(feedback::handle_list))
        .route("/api/v1/feedback/import", post(feedback::handle_import))
        .route("/api/v1/feedback/stats", get(feedback::handle_stats))
        .route(
            "/api/v1/feedback/:id/tags",
            patch(feedback::handle_update_tags),
        )
        .with_state(state)
}

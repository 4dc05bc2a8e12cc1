use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use feedback_api::classifier::{ClassifierConfig, LazyClassifier, SentimentClassifier};
use feedback_api::config::Config;
use feedback_api::db::create_pool;
use feedback_api::logging;
use feedback_api::routes::build_router;
use feedback_api::sentiment::SentimentScorer;
use feedback_api::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    logging::init(env!("CARGO_CRATE_NAME"), &config.rust_log);

    info!("Starting Feedback API v{}", env!("CARGO_PKG_VERSION"));

    let db = create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;

    let scorer = SentimentScorer::new(config.sentiment_threshold);
    info!("Lexicon scorer threshold: {}", scorer.threshold);

    // The model client is built lazily on the first model-backed request.
    let classifier = config.classifier_url.clone().map(|url| {
        info!("Sentiment model configured at {url}");
        Arc::new(LazyClassifier::new(ClassifierConfig::new(
            url,
            config.classifier_token.clone(),
        ))) as Arc<dyn SentimentClassifier>
    });

    let state = AppState {
        db,
        scorer,
        classifier,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

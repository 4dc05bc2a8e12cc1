//! Re-scores feedback stored as `neutral` with the external sentiment model.
//!
//! Row failures are logged and counted; the job still exits successfully.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use feedback_api::classifier::{ClassifierConfig, LazyClassifier};
use feedback_api::config::Config;
use feedback_api::db::create_pool;
use feedback_api::logging;
use feedback_api::reanalysis::{reanalyze_neutral, PgFeedbackStore, ReanalysisOptions};

#[derive(Debug, Parser)]
#[command(name = "reanalyze", version, about = "Re-score neutral feedback with the sentiment model")]
struct Args {
    /// Maximum number of neutral rows to examine (default: REANALYZE_LIMIT)
    #[arg(long)]
    limit: Option<usize>,

    /// Rows fetched per page (default: REANALYZE_PAGE_SIZE)
    #[arg(long)]
    page_size: Option<usize>,

    /// Classify and report without writing anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    logging::init(env!("CARGO_CRATE_NAME"), &config.rust_log);

    let classifier_url = config
        .classifier_url
        .clone()
        .context("CLASSIFIER_URL must be set to run reanalysis")?;
    // A failed row is counted and skipped, never retried.
    let classifier = LazyClassifier::new(
        ClassifierConfig::new(classifier_url, config.classifier_token.clone()).without_retries(),
    );

    let pool = create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("failed to connect to PostgreSQL")?;
    let store = PgFeedbackStore::new(pool);

    let options = ReanalysisOptions {
        limit: args.limit.unwrap_or(config.reanalyze_limit),
        page_size: args.page_size.unwrap_or(config.reanalyze_page_size),
        dry_run: args.dry_run,
    };

    let summary = reanalyze_neutral(&store, &classifier, options).await?;

    info!("Reanalysis summary: {}", serde_json::to_string(&summary)?);
    println!(
        "updated: {}, unchanged: {}, skipped: {}, failed: {} (of {} processed)",
        summary.updated, summary.unchanged, summary.skipped, summary.failed, summary.processed
    );
    Ok(())
}

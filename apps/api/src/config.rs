use anyhow::{bail, Context, Result};

use crate::sentiment::DEFAULT_THRESHOLD;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    pub sentiment_threshold: f64,
    /// Only the reanalysis job needs a classifier.
    pub classifier_url: Option<String>,
    pub classifier_token: Option<String>,
    pub reanalyze_limit: usize,
    pub reanalyze_page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let sentiment_threshold: f64 = parse_env("SENTIMENT_THRESHOLD", DEFAULT_THRESHOLD)?;
        if !(0.0..=1.0).contains(&sentiment_threshold) {
            bail!("SENTIMENT_THRESHOLD must be between 0 and 1, got {sentiment_threshold}");
        }

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            sentiment_threshold,
            classifier_url: optional_env("CLASSIFIER_URL"),
            classifier_token: optional_env("CLASSIFIER_TOKEN"),
            reanalyze_limit: parse_env("REANALYZE_LIMIT", 1000)?,
            reanalyze_page_size: parse_env("REANALYZE_PAGE_SIZE", 100)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

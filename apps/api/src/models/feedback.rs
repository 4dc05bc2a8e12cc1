use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::sentiment::Sentiment;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub feedback: Option<String>,
    pub rating: i32,
    pub device: Option<String>,
    pub app_version: Option<String>,
    pub tags: Vec<String>,
    pub sentiment: String,
    pub sentiment_score: Option<f64>,
    pub submitted_at: DateTime<Utc>,
    pub last_analyzed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// The subset of a feedback row the reanalysis job reads.
#[derive(Debug, Clone, FromRow)]
pub struct StoredSentiment {
    pub id: Uuid,
    pub feedback: Option<String>,
    pub sentiment: String,
    pub sentiment_score: Option<f64>,
}

/// One `GROUP BY` cell of the stats query: rows sharing a UTC day, device,
/// app version, sentiment label and rating.
#[derive(Debug, Clone, FromRow)]
pub struct StatsBucket {
    pub day: NaiveDate,
    pub device: Option<String>,
    pub app_version: Option<String>,
    pub sentiment: String,
    pub rating: i32,
    pub count: i64,
    pub score_sum: Option<f64>,
    /// Rows in the bucket with a non-null score.
    pub scored: i64,
}

impl StatsBucket {
    /// Parsed sentiment label. Unknown labels in the column read as neutral.
    pub fn sentiment(&self) -> Sentiment {
        self.sentiment.parse().unwrap_or(Sentiment::Neutral)
    }
}

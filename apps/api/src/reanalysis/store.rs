use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::feedback::StoredSentiment;
use crate::sentiment::SentimentResult;

/// Persistence seam for the reanalysis job.
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Up to `limit` neutral rows with `id > after`, ordered by id.
    async fn fetch_neutral_page(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<StoredSentiment>>;

    async fn update_sentiment(
        &self,
        id: Uuid,
        result: &SentimentResult,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()>;
}

pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn fetch_neutral_page(
        &self,
        after: Option<Uuid>,
        limit: usize,
    ) -> Result<Vec<StoredSentiment>> {
        Ok(sqlx::query_as::<_, StoredSentiment>(
            r#"
            SELECT id, feedback, sentiment, sentiment_score
            FROM feedback
            WHERE sentiment = 'neutral'
              AND ($1::uuid IS NULL OR id > $1)
            ORDER BY id
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn update_sentiment(
        &self,
        id: Uuid,
        result: &SentimentResult,
        analyzed_at: DateTime<Utc>,
    ) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE feedback
            SET sentiment = $1, sentiment_score = $2, last_analyzed_at = $3
            WHERE id = $4
            "#,
        )
        .bind(result.sentiment.as_str())
        .bind(result.sentiment_score)
        .bind(analyzed_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            anyhow::bail!("feedback {id} no longer exists");
        }
        Ok(())
    }
}

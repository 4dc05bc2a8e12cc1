use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::feedback::import::NewFeedback;
use crate::models::feedback::{FeedbackRow, StatsBucket};
use crate::sentiment::Sentiment;

/// Filters for the feedback listing. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct FeedbackFilter {
    pub sentiment: Option<Sentiment>,
    pub tag: Option<String>,
    pub device: Option<String>,
    pub app_version: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Inserts imported rows in one transaction. Returns the number inserted.
pub async fn insert_feedback(
    pool: &PgPool,
    records: &[NewFeedback],
    analyzed_at: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for record in records {
        let result = sqlx::query(
            r#"
            INSERT INTO feedback
                (id, feedback, rating, device, app_version, tags,
                 sentiment, sentiment_score, submitted_at, last_analyzed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(record.feedback.as_deref())
        .bind(record.rating)
        .bind(record.device.as_deref())
        .bind(record.app_version.as_deref())
        .bind(&record.tags)
        .bind(record.sentiment.sentiment.as_str())
        .bind(record.sentiment.sentiment_score)
        .bind(record.submitted_at)
        .bind(analyzed_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    info!("Inserted {inserted} feedback rows");
    Ok(inserted)
}

pub async fn list_feedback(
    pool: &PgPool,
    filter: &FeedbackFilter,
) -> Result<Vec<FeedbackRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedbackRow>(
        r#"
        SELECT *
        FROM feedback
        WHERE ($1::text IS NULL OR sentiment = $1)
          AND ($2::text IS NULL OR $2 = ANY(tags))
          AND ($3::text IS NULL OR device = $3)
          AND ($4::text IS NULL OR app_version = $4)
        ORDER BY submitted_at DESC, id
        LIMIT $5 OFFSET $6
        "#,
    )
    .bind(filter.sentiment.map(|s| s.as_str()))
    .bind(filter.tag.as_deref())
    .bind(filter.device.as_deref())
    .bind(filter.app_version.as_deref())
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await
}

/// Replaces a record's tags. `None` when the record does not exist.
pub async fn update_tags(
    pool: &PgPool,
    id: Uuid,
    tags: &[String],
) -> Result<Option<FeedbackRow>, sqlx::Error> {
    sqlx::query_as::<_, FeedbackRow>("UPDATE feedback SET tags = $1 WHERE id = $2 RETURNING *")
        .bind(tags)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Stats buckets for rows submitted within `[from, to)`, either bound
/// optional. Aggregation happens in the database so the result size tracks
/// the number of distinct groups, not the number of rows.
pub async fn fetch_stats_buckets(
    pool: &PgPool,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Vec<StatsBucket>, sqlx::Error> {
    sqlx::query_as::<_, StatsBucket>(
        r#"
        SELECT (submitted_at AT TIME ZONE 'UTC')::date AS day,
               device,
               app_version,
               sentiment,
               rating,
               COUNT(*) AS count,
               SUM(sentiment_score) AS score_sum,
               COUNT(sentiment_score) AS scored
        FROM feedback
        WHERE ($1::timestamptz IS NULL OR submitted_at >= $1)
          AND ($2::timestamptz IS NULL OR submitted_at < $2)
        GROUP BY 1, 2, 3, 4, 5
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

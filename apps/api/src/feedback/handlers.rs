use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::import::{parse_csv, RowRejection};
use crate::feedback::queries::{
    fetch_stats_buckets, insert_feedback, list_feedback, update_tags, FeedbackFilter,
};
use crate::feedback::stats::{compute_stats, FeedbackStats};
use crate::feedback::tags::normalize_tags;
use crate::models::feedback::FeedbackRow;
use crate::sentiment::Sentiment;
use crate::state::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub inserted: u64,
    pub rejected: Vec<RowRejection>,
}

/// POST /api/v1/feedback/import
/// Multipart upload; the CSV is read from the `file` field.
pub async fn handle_import(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
            upload = Some(bytes);
            break;
        }
    }
    let upload = upload.ok_or_else(|| AppError::Validation("missing 'file' field".to_string()))?;

    let now = Utc::now();
    let parsed = parse_csv(&upload, &state.scorer, now)?;
    let inserted = insert_feedback(&state.db, &parsed.records, now).await?;

    info!(
        "Imported {inserted} feedback rows ({} rejected)",
        parsed.rejected.len()
    );
    Ok(Json(ImportResponse {
        inserted,
        rejected: parsed.rejected,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub sentiment: Option<String>,
    pub tag: Option<String>,
    pub device: Option<String>,
    pub app_version: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> Result<FeedbackFilter, AppError> {
        let sentiment = self
            .sentiment
            .as_deref()
            .map(str::parse::<Sentiment>)
            .transpose()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        Ok(FeedbackFilter {
            sentiment,
            tag: self.tag.map(|t| t.trim().to_lowercase()),
            device: self.device.map(|d| d.trim().to_lowercase()),
            app_version: self.app_version,
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        })
    }
}

/// GET /api/v1/feedback
pub async fn handle_list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<FeedbackRow>>, AppError> {
    let filter = params.into_filter()?;
    Ok(Json(list_feedback(&state.db, &filter).await?))
}

#[derive(Debug, Deserialize)]
pub struct TagsRequest {
    pub tags: Vec<String>,
}

/// PATCH /api/v1/feedback/:id/tags
pub async fn handle_update_tags(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TagsRequest>,
) -> Result<Json<FeedbackRow>, AppError> {
    let tags = normalize_tags(&req.tags)?;
    let row = update_tags(&state.db, id, &tags)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback {id} not found")))?;
    Ok(Json(row))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub from: Option<NaiveDate>,
    /// Inclusive end date.
    pub to: Option<NaiveDate>,
}

/// GET /api/v1/feedback/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<FeedbackStats>, AppError> {
    if let (Some(from), Some(to)) = (params.from, params.to) {
        if from > to {
            return Err(AppError::Validation(format!(
                "'from' ({from}) is after 'to' ({to})"
            )));
        }
    }
    let from = params
        .from
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    let to = params
        .to
        .and_then(|d| d.succ_opt())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());

    let buckets = fetch_stats_buckets(&state.db, from, to).await?;
    Ok(Json(compute_stats(&buckets)))
}

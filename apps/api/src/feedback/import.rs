//! CSV Import: parses uploaded feedback, validates each row and scores it
//! with the lexicon scorer before insertion.
//!
//! Invalid rows are reported with their line number and do not abort the
//! import. Only an unreadable header (or a missing `rating` column) fails
//! the whole upload.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::feedback::tags::normalize_tags;
use crate::sentiment::{SentimentResult, SentimentScorer};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    feedback: Option<String>,
    rating: Option<String>,
    device: Option<String>,
    app_version: Option<String>,
    submitted_at: Option<String>,
    tags: Option<String>,
}

/// A validated, scored row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub feedback: Option<String>,
    pub rating: i32,
    pub device: Option<String>,
    pub app_version: Option<String>,
    pub tags: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub sentiment: SentimentResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ParsedImport {
    pub records: Vec<NewFeedback>,
    pub rejected: Vec<RowRejection>,
}

pub fn parse_csv(
    data: &[u8],
    scorer: &SentimentScorer,
    now: DateTime<Utc>,
) -> Result<ParsedImport, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers = reader
        .headers()
        .map_err(|e| AppError::Validation(format!("unreadable CSV header: {e}")))?
        .clone();
    if !headers.iter().any(|h| h.eq_ignore_ascii_case("rating")) {
        return Err(AppError::Validation(
            "CSV is missing the required 'rating' column".to_string(),
        ));
    }
    let headers = normalize_headers(&headers);

    let mut parsed = ParsedImport::default();
    let mut record = csv::StringRecord::new();

    loop {
        match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {}
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    return Err(AppError::Validation(format!("failed to read CSV: {e}")));
                }
                parsed.rejected.push(RowRejection {
                    line,
                    reason: format!("malformed row: {e}"),
                });
                continue;
            }
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.iter().all(str::is_empty) {
            continue;
        }

        let outcome = record
            .deserialize::<CsvRow>(Some(&headers))
            .map_err(|e| format!("malformed row: {e}"))
            .and_then(|row| validate_row(row, scorer, now));

        match outcome {
            Ok(feedback) => parsed.records.push(feedback),
            Err(reason) => parsed.rejected.push(RowRejection { line, reason }),
        }
    }

    Ok(parsed)
}

/// Lowercases header names. `text` stands in for `feedback` only when the
/// file has no `feedback` column; otherwise it is ignored like any unknown
/// column.
fn normalize_headers(headers: &csv::StringRecord) -> csv::StringRecord {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_ascii_lowercase()).collect();
    let has_feedback = lowered.iter().any(|h| h == "feedback");
    lowered
        .into_iter()
        .map(|h| {
            if h == "text" && !has_feedback {
                "feedback".to_string()
            } else {
                h
            }
        })
        .collect()
}

fn validate_row(
    row: CsvRow,
    scorer: &SentimentScorer,
    now: DateTime<Utc>,
) -> Result<NewFeedback, String> {
    let rating = parse_rating(row.rating.as_deref())?;
    let submitted_at = match non_blank(row.submitted_at) {
        Some(raw) => parse_timestamp(&raw)?,
        None => now,
    };
    let tags = normalize_tags(row.tags.as_deref().unwrap_or_default().split(';'))
        .map_err(|e| e.to_string())?;
    let feedback = non_blank(row.feedback);
    let sentiment = scorer.score(feedback.as_deref(), Some(rating as f64));

    Ok(NewFeedback {
        feedback,
        rating,
        device: non_blank(row.device).map(|d| d.to_lowercase()),
        app_version: non_blank(row.app_version),
        tags,
        submitted_at,
        sentiment,
    })
}

fn parse_rating(raw: Option<&str>) -> Result<i32, String> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty());
    let raw = raw.ok_or_else(|| "rating is required".to_string())?;
    let rating: i32 = raw
        .parse()
        .map_err(|_| format!("rating '{raw}' is not an integer"))?;
    if !(1..=5).contains(&rating) {
        return Err(format!("rating {rating} is outside 1-5"));
    }
    Ok(rating)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("submitted_at '{raw}' is not a date"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

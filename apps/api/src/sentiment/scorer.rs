//! Lexicon Sentiment Scorer: keyword polarity with a star-rating fallback.
//!
//! Algorithm:
//! 1. Empty text → rating fallback when a rating is given, else neutral / 0.
//! 2. Otherwise count positive and negative lexicon hits in the lower-cased text.
//! 3. score = (pos − neg) / (pos + neg), or 0 when nothing matched.
//! 4. score > threshold → positive, score < −threshold → negative, else neutral.
//!
//! The rating is ignored whenever text is present.

use crate::sentiment::lexicon::count_keywords;
use crate::sentiment::{Sentiment, SentimentResult};

pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Scores one feedback text. Never fails: absent or invalid input degrades
/// to neutral / 0.
pub fn score_sentiment(text: Option<&str>, threshold: f64, rating: Option<f64>) -> SentimentResult {
    let text = text.map(str::trim).unwrap_or_default();

    if text.is_empty() {
        return match rating {
            Some(r) => rating_based_sentiment(r),
            None => SentimentResult::NEUTRAL,
        };
    }

    let counts = count_keywords(&text.to_lowercase());
    let total = counts.total();
    let score = if total == 0 {
        0.0
    } else {
        (counts.positive as f64 - counts.negative as f64) / total as f64
    };

    let sentiment = if score > threshold {
        Sentiment::Positive
    } else if score < -threshold {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    SentimentResult {
        sentiment,
        sentiment_score: score,
    }
}

/// Derives sentiment from a star rating alone.
///
/// The rating is clamped to [1, 5] and rounded: 4 ↦ 0.3, 5 ↦ 0.7, 3 ↦ 0,
/// 2 ↦ −0.3, 1 ↦ −0.7.
pub fn rating_based_sentiment(rating: f64) -> SentimentResult {
    if !rating.is_finite() {
        return SentimentResult::NEUTRAL;
    }

    let stars = rating.clamp(1.0, 5.0).round() as i32;
    let (sentiment, sentiment_score) = match stars {
        5 => (Sentiment::Positive, 0.7),
        4 => (Sentiment::Positive, 0.3),
        3 => (Sentiment::Neutral, 0.0),
        2 => (Sentiment::Negative, -0.3),
        _ => (Sentiment::Negative, -0.7),
    };
    SentimentResult {
        sentiment,
        sentiment_score,
    }
}

/// Scorer bound to a configured threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentimentScorer {
    pub threshold: f64,
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl SentimentScorer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn score(&self, text: Option<&str>, rating: Option<f64>) -> SentimentResult {
        score_sentiment(text, self.threshold, rating)
    }
}

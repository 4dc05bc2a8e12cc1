//! Sentiment labels and the lexicon scorer used across import, the scoring
//! endpoint and analytics.

pub mod handlers;
pub mod lexicon;
pub mod scorer;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use scorer::{rating_based_sentiment, score_sentiment, SentimentScorer, DEFAULT_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSentiment(pub String);

impl fmt::Display for UnknownSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sentiment label '{}'", self.0)
    }
}

impl std::error::Error for UnknownSentiment {}

impl FromStr for Sentiment {
    type Err = UnknownSentiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(UnknownSentiment(other.to_string())),
        }
    }
}

/// Label plus continuous score in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub sentiment_score: f64,
}

impl SentimentResult {
    pub const NEUTRAL: SentimentResult = SentimentResult {
        sentiment: Sentiment::Neutral,
        sentiment_score: 0.0,
    };
}

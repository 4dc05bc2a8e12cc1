//! Aggregate analytics over feedback rows: sentiment distribution, rating
//! histogram, device / app-version breakdowns and a daily trend.
//!
//! Input is the pre-grouped [`StatsBucket`] list from the database; each
//! bucket contributes its row count to every total it falls into.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::feedback::StatsBucket;
use crate::sentiment::Sentiment;

const UNKNOWN_GROUP: &str = "unknown";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

impl SentimentCounts {
    fn add(&mut self, sentiment: Sentiment, n: u64) {
        match sentiment {
            Sentiment::Positive => self.positive += n,
            Sentiment::Neutral => self.neutral += n,
            Sentiment::Negative => self.negative += n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: u64,
    pub average_rating: f64,
    pub sentiment: SentimentCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub count: u64,
    pub average_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackStats {
    pub total: u64,
    pub sentiment_counts: SentimentCounts,
    pub average_rating: Option<f64>,
    pub average_sentiment_score: Option<f64>,
    /// Counts for ratings 1 through 5; out-of-range ratings are clamped.
    pub rating_distribution: [u64; 5],
    pub by_device: BTreeMap<String, GroupStats>,
    pub by_app_version: BTreeMap<String, GroupStats>,
    pub daily: Vec<DailyPoint>,
}

#[derive(Default)]
struct GroupAcc {
    count: u64,
    rating_sum: i64,
    sentiment: SentimentCounts,
}

impl GroupAcc {
    fn add(&mut self, bucket: &StatsBucket) {
        let n = bucket_count(bucket);
        self.count += n;
        self.rating_sum += i64::from(bucket.rating) * n as i64;
        self.sentiment.add(bucket.sentiment(), n);
    }

    fn finish(self) -> GroupStats {
        GroupStats {
            count: self.count,
            average_rating: mean(self.rating_sum as f64, self.count).unwrap_or(0.0),
            sentiment: self.sentiment,
        }
    }
}

pub fn compute_stats(buckets: &[StatsBucket]) -> FeedbackStats {
    let mut total = 0u64;
    let mut sentiment_counts = SentimentCounts::default();
    let mut rating_distribution = [0u64; 5];
    let mut rating_sum = 0i64;
    let mut score_sum = 0.0;
    let mut scored = 0u64;
    let mut by_device: BTreeMap<String, GroupAcc> = BTreeMap::new();
    let mut by_app_version: BTreeMap<String, GroupAcc> = BTreeMap::new();
    let mut daily: BTreeMap<NaiveDate, GroupAcc> = BTreeMap::new();

    for bucket in buckets {
        let n = bucket_count(bucket);
        if n == 0 {
            continue;
        }
        total += n;
        sentiment_counts.add(bucket.sentiment(), n);
        rating_sum += i64::from(bucket.rating) * n as i64;
        rating_distribution[(bucket.rating.clamp(1, 5) - 1) as usize] += n;
        if let Some(sum) = bucket.score_sum {
            score_sum += sum;
            scored += bucket.scored.max(0) as u64;
        }

        let device = bucket
            .device
            .clone()
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        by_device.entry(device).or_default().add(bucket);
        let version = bucket
            .app_version
            .clone()
            .unwrap_or_else(|| UNKNOWN_GROUP.to_string());
        by_app_version.entry(version).or_default().add(bucket);
        daily.entry(bucket.day).or_default().add(bucket);
    }

    FeedbackStats {
        total,
        sentiment_counts,
        average_rating: mean(rating_sum as f64, total),
        average_sentiment_score: mean(score_sum, scored),
        rating_distribution,
        by_device: finish_groups(by_device),
        by_app_version: finish_groups(by_app_version),
        daily: daily
            .into_iter()
            .map(|(date, acc)| {
                let group = acc.finish();
                DailyPoint {
                    date,
                    count: group.count,
                    average_rating: group.average_rating,
                }
            })
            .collect(),
    }
}

fn finish_groups(groups: BTreeMap<String, GroupAcc>) -> BTreeMap<String, GroupStats> {
    groups.into_iter().map(|(k, acc)| (k, acc.finish())).collect()
}

fn bucket_count(bucket: &StatsBucket) -> u64 {
    bucket.count.max(0) as u64
}

fn mean(sum: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

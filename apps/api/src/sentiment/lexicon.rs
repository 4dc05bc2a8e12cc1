//! Fixed two-language keyword lexicon (informal Indonesian + English).
//!
//! Matching is plain substring containment on lower-cased text, so a keyword
//! inside a longer word still counts (`lag` matches `lagi`). Keep entries
//! lower-case.

pub const POSITIVE_KEYWORDS: &[&str] = &[
    // Indonesian
    "bagus",
    "mantap",
    "keren",
    "suka",
    "senang",
    "puas",
    "mudah",
    "cepat",
    "membantu",
    "terbaik",
    "hebat",
    "lancar",
    "rekomendasi",
    "terima kasih",
    "nyaman",
    // English
    "good",
    "great",
    "excellent",
    "love",
    "amazing",
    "awesome",
    "helpful",
    "easy",
    "fast",
    "best",
    "nice",
    "perfect",
    "recommend",
    "smooth",
    "useful",
    "satisfied",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &[
    // Indonesian
    "jelek",
    "buruk",
    "lambat",
    "lemot",
    "gagal",
    "susah",
    "sulit",
    "kecewa",
    "ribet",
    "rusak",
    "payah",
    "masalah",
    "parah",
    "hilang",
    // English
    "error",
    "crash",
    "bug",
    "lag",
    "bad",
    "poor",
    "slow",
    "terrible",
    "worst",
    "hate",
    "awful",
    "useless",
    "broken",
    "difficult",
    "disappointed",
    "annoying",
    "problem",
];

/// Positive and negative keyword hits for one text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeywordCounts {
    pub positive: u32,
    pub negative: u32,
}

impl KeywordCounts {
    pub fn total(&self) -> u32 {
        self.positive + self.negative
    }
}

/// Counts the keywords of each list contained in `text_lower`.
/// Each keyword contributes at most once, however often it occurs.
pub fn count_keywords(text_lower: &str) -> KeywordCounts {
    let hits = |list: &[&str]| list.iter().filter(|kw| text_lower.contains(*kw)).count() as u32;
    KeywordCounts {
        positive: hits(POSITIVE_KEYWORDS),
        negative: hits(NEGATIVE_KEYWORDS),
    }
}

//! Word-list sentiment backend.
//!
//! Counts positive (dovish or expansionary) and negative (hawkish or
//! contractionary) terms. Single words match whole tokens; multi-word
//! phrases match consecutive tokens.
//!
//! Confidence is the normalized polarity sum `|pos - neg| / (pos + neg)`.
//! A sentence with no hits is `Neutral` with confidence 1.0; a tie is
//! `Neutral` with confidence 0.5.

use async_trait::async_trait;
use fedspeak_core::{BackendError, Classification, SentimentBackend, SentimentLabel};

const POSITIVE_TERMS: &[&str] = &[
    "strong",
    "growth",
    "improvement",
    "gain",
    "solid",
    "recovery",
    "stable",
    "progress",
    "positive",
    "confident",
    "robust",
    "stimulus",
    "ease",
    "accommodative",
    "dovish",
    "lower rates",
    "support economy",
    "monetary accommodation",
];

const NEGATIVE_TERMS: &[&str] = &[
    "weak",
    "recession",
    "decline",
    "loss",
    "difficult",
    "negative",
    "risk",
    "inflation",
    "tight",
    "slow",
    "uncertainty",
    "deterioration",
    "tighten",
    "restrictive",
    "hawkish",
    "overheating",
    "raise rates",
    "higher rates",
    "monetary tightening",
    "policy tightening",
    "inflationary pressure",
];

#[derive(Debug, Clone)]
pub struct LexiconBackend {
    name: String,
    positive: Vec<Vec<String>>,
    negative: Vec<Vec<String>>,
}

impl LexiconBackend {
    /// Creates a backend with the built-in Fed lexicon.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_terms(name, POSITIVE_TERMS, NEGATIVE_TERMS)
    }

    /// Creates a backend from custom term lists. Terms are matched case-insensitively.
    pub fn with_terms<S: AsRef<str>>(
        name: impl Into<String>,
        positive: &[S],
        negative: &[S],
    ) -> Self {
        Self {
            name: name.into(),
            positive: positive.iter().map(|t| tokenize(t.as_ref())).collect(),
            negative: negative.iter().map(|t| tokenize(t.as_ref())).collect(),
        }
    }

    /// Returns `(positive_hits, negative_hits)` for `text`.
    #[must_use]
    pub fn polarity_counts(&self, text: &str) -> (usize, usize) {
        let tokens = tokenize(text);
        (
            count_hits(&tokens, &self.positive),
            count_hits(&tokens, &self.negative),
        )
    }

    /// Synchronous classification used by the async trait method.
    #[must_use]
    pub fn classify(&self, text: &str) -> Classification {
        let (pos, neg) = self.polarity_counts(text);
        let total = pos + neg;
        let (label, confidence) = if total == 0 {
            (SentimentLabel::Neutral, 1.0)
        } else if pos == neg {
            (SentimentLabel::Neutral, 0.5)
        } else {
            let label = if pos > neg {
                SentimentLabel::Positive
            } else {
                SentimentLabel::Negative
            };
            (label, pos.abs_diff(neg) as f64 / total as f64)
        };
        Classification { label, confidence }
    }
}

#[async_trait]
impl SentimentBackend for LexiconBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, text: &str) -> Result<Classification, BackendError> {
        Ok(self.classify(text))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn count_hits(tokens: &[String], terms: &[Vec<String>]) -> usize {
    terms
        .iter()
        .filter(|term| !term.is_empty())
        .map(|term| {
            tokens
                .windows(term.len())
                .filter(|window| window == &term.as_slice())
                .count()
        })
        .sum()
}

//! Three-class sentiment primitives shared by every scoring backend.
//!
//! In the Fed context a `Positive` label reads as dovish (accommodative)
//! and a `Negative` label as hawkish (restrictive).

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BackendError;

/// Categorical sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// All labels in a fixed order, used for reporting.
    pub const ALL: [SentimentLabel; 3] = [Self::Positive, Self::Negative, Self::Neutral];

    /// Numeric polarity: Positive = +1, Neutral = 0, Negative = -1.
    #[must_use]
    pub const fn polarity(&self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// Parses a plain text label, accepting the dovish/hawkish vocabulary.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "dovish" => Some(Self::Positive),
            "negative" | "hawkish" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output contract of a sentiment backend: a label and a confidence in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl Classification {
    /// Creates a classification, rejecting confidences outside `[0, 1]`.
    ///
    /// # Errors
    /// Returns `BackendError::InvalidResponse` for NaN or out-of-range confidence.
    pub fn new(label: SentimentLabel, confidence: f64) -> Result<Self, BackendError> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(BackendError::InvalidResponse(format!(
                "confidence {confidence} outside [0, 1]"
            )));
        }
        Ok(Self { label, confidence })
    }

    /// Confidence-weighted polarity of this classification.
    #[must_use]
    pub fn weighted_polarity(&self) -> f64 {
        self.label.polarity() * self.confidence
    }
}

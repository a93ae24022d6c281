//! Sentiment score records produced by the scorer and aggregator.

use chrono::NaiveDate;
use fedspeak_core::{Classification, SentimentLabel};
use serde::{Deserialize, Serialize};

/// One backend's classification of one sentence (or a whole document).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub document_id: String,
    /// `None` for a document-level score.
    pub sentence_index: Option<usize>,
    pub model_name: String,
    pub label: SentimentLabel,
    pub confidence: f64,
}

impl SentimentScore {
    pub fn from_classification(
        document_id: impl Into<String>,
        sentence_index: Option<usize>,
        model_name: impl Into<String>,
        classification: Classification,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            sentence_index,
            model_name: model_name.into(),
            label: classification.label,
            confidence: classification.confidence,
        }
    }

    /// Confidence-weighted polarity in `[-1, 1]`.
    #[must_use]
    pub fn weighted_polarity(&self) -> f64 {
        self.label.polarity() * self.confidence
    }
}

/// Document-level label derived from its sentence scores for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSentiment {
    pub document_id: String,
    pub model_name: String,
    pub label: SentimentLabel,
    /// Mean confidence of the sentences carrying the winning label.
    pub confidence: f64,
    pub n_sentences: usize,
}

/// Daily sentiment value for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySentimentIndex {
    pub date: NaiveDate,
    /// Bounded to `[-1, 1]`.
    pub value: f64,
    pub n_documents: usize,
    pub n_sentences: usize,
    pub model_name: String,
}

/// A sentence with a human label, used to evaluate backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledSentence {
    #[serde(default)]
    pub date: Option<String>,
    pub source: String,
    pub text: String,
    pub label: SentimentLabel,
}

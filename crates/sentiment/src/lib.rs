//! Sentiment scoring for Fed communications.
//!
//! This crate provides:
//! - Lexicon and HTTP transformer backends behind one scoring contract
//! - A registry selecting backends by configured name
//! - The concurrent Sentiment Scorer
//! - The Score Aggregator (document labels, daily index, explicit ensemble)
//! - Evaluation against human-labeled sentences

pub mod aggregator;
pub mod backend;
pub mod evaluation;
pub mod registry;
pub mod scorer;

pub use aggregator::{ensemble, majority_label, model_names, ScoreAggregator, ENSEMBLE_MODEL};
pub use backend::{HttpClassifierBackend, LexiconBackend};
pub use evaluation::{evaluate, ClassMetrics, EvaluationReport, EvaluationSummary};
pub use registry::BackendRegistry;
pub use scorer::{ScoringRun, SentimentScorer};

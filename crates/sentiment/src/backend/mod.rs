//! Concrete sentiment backends.
//!
//! Every backend implements [`fedspeak_core::SentimentBackend`] and is
//! selected by name from configuration.

pub mod http_classifier;
pub mod lexicon;

pub use http_classifier::{map_label, HttpClassifierBackend};
pub use lexicon::LexiconBackend;

//! Record models passed between pipeline stages.
//!
//! Every stage consumes one table of these records and produces a new one;
//! no stage mutates its input.

pub mod aligned;
pub mod causality;
pub mod document;
pub mod failure;
pub mod market;
pub mod sentiment;

pub use aligned::{AlignedRow, AlignedSeries, DropReason, DroppedDay};
pub use causality::{CausalityResult, Outlier, TestDirection};
pub use document::{Document, DocumentSource, RawDocument, SectionSpan};
pub use failure::{FailureRecord, Stage};
pub use market::MarketObservation;
pub use sentiment::{DailySentimentIndex, DocumentSentiment, LabeledSentence, SentimentScore};

//! Records, ingestion and tabular storage for Fed sentiment analysis.
//!
//! This crate provides:
//! - Record models passed between pipeline stages
//! - The Document Store with deterministic sentence segmentation
//! - CSV readers for raw inputs and writers for result tables

pub mod csv_storage;
pub mod document_store;
pub mod error;
pub mod models;
pub mod text;

pub use csv_storage::{series_names, CsvRows, CsvStorage};
pub use document_store::{parse_timestamp, DocumentStore, IngestReport};
pub use error::DataError;

pub use models::{
    AlignedRow, AlignedSeries, CausalityResult, DailySentimentIndex, Document, DocumentSentiment,
    DocumentSource, DropReason, DroppedDay, FailureRecord, LabeledSentence, MarketObservation,
    Outlier, RawDocument, SectionSpan, SentimentScore, Stage, TestDirection,
};

//! CLI commands for the sentiment causality pipeline.

pub mod analyze;
pub mod evaluate;
pub mod ingest;
pub mod pipeline;
pub mod run;
pub mod score;

pub use analyze::{run_analyze, AnalyzeArgs};
pub use evaluate::{run_evaluate, EvaluateArgs};
pub use ingest::{run_ingest, IngestArgs};
pub use run::{run_pipeline, RunArgs};
pub use score::{run_score, ScoreArgs};

pub mod config;
pub mod config_loader;
pub mod error;
pub mod sentiment;
pub mod stats;
pub mod traits;

pub use config::{
    AnalysisConfig, AppConfig, BackendKind, BackendSpec, IndexMethod, InformationCriterion,
    IngestionConfig, LabelScheme, LagSelectionMode, ScoringConfig, StationarityPolicy,
};
pub use config_loader::ConfigLoader;
pub use error::{BackendError, PipelineError};
pub use sentiment::{Classification, SentimentLabel};
pub use traits::SentimentBackend;

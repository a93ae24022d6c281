use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage at which a record was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Score,
    Align,
    Analyze,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Ingest => "ingest",
            Self::Score => "score",
            Self::Align => "align",
            Self::Analyze => "analyze",
        };
        f.write_str(s)
    }
}

/// A skipped or failed record, reported next to the results tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub record_id: String,
    pub model_name: Option<String>,
    pub reason: String,
}

impl FailureRecord {
    pub fn new(stage: Stage, record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            stage,
            record_id: record_id.into(),
            model_name: None,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }
}

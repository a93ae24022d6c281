//! Error taxonomy for the analysis pipeline.
//!
//! Per-record failures (`MalformedInput`, `BackendUnavailable`) are isolated
//! by callers and logged into the failure ledger. Precondition failures of
//! the causality engine (`NonStationarySeries`, `InsufficientData`) are
//! always returned to the caller.

use thiserror::Error;

use crate::config::StationarityPolicy;

/// Errors raised by pipeline stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A raw record is missing required metadata or cannot be parsed.
    #[error("malformed input in {record}: {reason}")]
    MalformedInput { record: String, reason: String },

    /// A scoring backend failed or could not be reached.
    #[error("backend {backend} unavailable: {reason}")]
    BackendUnavailable { backend: String, reason: String },

    /// A series failed the unit-root test under the configured policy.
    #[error(
        "series {series} is non-stationary under {policy} policy (ADF statistic {statistic:.4}, p-value {p_value:.4})"
    )]
    NonStationarySeries {
        series: String,
        statistic: f64,
        p_value: f64,
        policy: StationarityPolicy,
    },

    /// The unit-root test could not be computed for a series.
    #[error("unit-root test not computable for {series} under {policy} policy: {reason}")]
    UnitRootTestUnavailable {
        series: String,
        reason: String,
        policy: StationarityPolicy,
    },

    /// A Granger regression could not be estimated at one lag order.
    #[error("Granger regression {cause} -> {effect} could not be estimated at lag {lag}")]
    GrangerLagUnavailable {
        cause: String,
        effect: String,
        lag: usize,
    },

    /// Too few aligned observations for the requested lag.
    #[error("insufficient data for max_lag {max_lag}: need {required} observations, have {available}")]
    InsufficientData {
        required: usize,
        available: usize,
        max_lag: usize,
    },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was aborted; partial results were discarded.
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Shorthand for a malformed-input error.
    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced by a single backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Converts into the pipeline taxonomy, attributing the failure to `backend`.
    #[must_use]
    pub fn into_pipeline(self, backend: &str) -> PipelineError {
        PipelineError::BackendUnavailable {
            backend: backend.to_string(),
            reason: self.to_string(),
        }
    }
}

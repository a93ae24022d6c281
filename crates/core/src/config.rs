use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Rejects option combinations that would make a run meaningless.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidConfig` naming the offending option.
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.scoring.validate()?;
        self.analysis.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Sentences with fewer words are dropped during segmentation.
    #[serde(default = "default_min_sentence_words")]
    pub min_sentence_words: usize,
    /// When set, only this speaker's turns are kept from press conference transcripts.
    #[serde(default)]
    pub press_conference_speaker: Option<String>,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            min_sentence_words: default_min_sentence_words(),
            press_conference_speaker: None,
        }
    }
}

const fn default_min_sentence_words() -> usize {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Lexicon,
    HttpClassifier,
}

/// Raw label vocabulary of a served transformer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelScheme {
    /// FinBERT-FOMC: LABEL_0 neutral, LABEL_1 hawkish, LABEL_2 dovish.
    FinbertFomc,
    /// RoBERTa 3-class: LABEL_0 negative, LABEL_1 neutral, LABEL_2 positive.
    Roberta,
    /// Plain positive/negative/neutral text labels.
    Sentiment,
}

/// One configured scoring backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    pub name: String,
    pub kind: BackendKind,
    /// Inference endpoint, required for `http_classifier`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub label_scheme: Option<LabelScheme>,
    #[serde(default)]
    pub requests_per_minute: Option<u32>,
    /// Name of the environment variable holding a bearer token.
    #[serde(default)]
    pub api_token_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl BackendSpec {
    #[must_use]
    pub fn lexicon(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::Lexicon,
            url: None,
            label_scheme: None,
            requests_per_minute: None,
            api_token_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    #[must_use]
    pub fn http_classifier(
        name: impl Into<String>,
        url: impl Into<String>,
        label_scheme: LabelScheme,
    ) -> Self {
        Self {
            name: name.into(),
            kind: BackendKind::HttpClassifier,
            url: Some(url.into()),
            label_scheme: Some(label_scheme),
            requests_per_minute: None,
            api_token_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

/// How sentence scores are reduced into a daily index value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMethod {
    /// Mean of confidence-weighted polarity over all scored sentences.
    #[default]
    ConfidenceWeighted,
    /// (positive count - negative count) / scored sentences.
    NetCount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendSpec>,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default)]
    pub index_method: IndexMethod,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            max_concurrency: default_max_concurrency(),
            index_method: IndexMethod::default(),
        }
    }
}

impl ScoringConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        if self.backends.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "scoring.backends must name at least one backend".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "scoring.max_concurrency must be positive".to_string(),
            ));
        }
        for spec in &self.backends {
            if spec.kind == BackendKind::HttpClassifier && spec.url.is_none() {
                return Err(PipelineError::InvalidConfig(format!(
                    "backend {} needs a url",
                    spec.name
                )));
            }
        }
        let mut names: Vec<&str> = self.backends.iter().map(|b| b.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.backends.len() {
            return Err(PipelineError::InvalidConfig(
                "backend names must be unique".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_backends() -> Vec<BackendSpec> {
    vec![BackendSpec::lexicon("lexicon")]
}

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LagSelectionMode {
    /// Report only the lag minimizing the information criterion.
    #[default]
    Criterion,
    /// Report every lag `1..=max_lag` with its p-value.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InformationCriterion {
    #[default]
    Aic,
    Bic,
}

/// Whether series enter the causality test as-is or first-differenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationarityPolicy {
    Raw,
    #[default]
    Diff,
}

impl fmt::Display for StationarityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Diff => f.write_str("diff"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_lag")]
    pub max_lag: usize,
    #[serde(default)]
    pub lag_selection_mode: LagSelectionMode,
    #[serde(default)]
    pub information_criterion: InformationCriterion,
    #[serde(default)]
    pub stationarity_policy: StationarityPolicy,
    /// Minimum aligned observations per unit of `max_lag`.
    #[serde(default = "default_min_obs_per_lag")]
    pub min_obs_per_lag: usize,
    #[serde(default = "default_significance")]
    pub significance: f64,
    /// Lagged differences in the ADF regression; `None` uses `floor((n-1)^(1/3))`.
    #[serde(default)]
    pub adf_lags: Option<usize>,
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold_stdev: f64,
    /// Forward-fill staleness bound in calendar days; `None` drops uncovered days.
    #[serde(default)]
    pub imputation_window_days: Option<u32>,
    #[serde(default = "default_market_series")]
    pub market_series: Vec<String>,
    #[serde(default)]
    pub ensemble: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_lag: default_max_lag(),
            lag_selection_mode: LagSelectionMode::default(),
            information_criterion: InformationCriterion::default(),
            stationarity_policy: StationarityPolicy::default(),
            min_obs_per_lag: default_min_obs_per_lag(),
            significance: default_significance(),
            adf_lags: None,
            outlier_threshold_stdev: default_outlier_threshold(),
            imputation_window_days: None,
            market_series: default_market_series(),
            ensemble: false,
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), PipelineError> {
        if self.max_lag == 0 {
            return Err(PipelineError::InvalidConfig(
                "analysis.max_lag must be at least 1".to_string(),
            ));
        }
        if self.min_obs_per_lag == 0 {
            return Err(PipelineError::InvalidConfig(
                "analysis.min_obs_per_lag must be at least 1".to_string(),
            ));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(PipelineError::InvalidConfig(
                "analysis.significance must lie in (0, 1)".to_string(),
            ));
        }
        if !(self.outlier_threshold_stdev.is_finite() && self.outlier_threshold_stdev > 0.0) {
            return Err(PipelineError::InvalidConfig(
                "analysis.outlier_threshold_stdev must be positive".to_string(),
            ));
        }
        if self.market_series.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "analysis.market_series must name at least one series".to_string(),
            ));
        }
        if let Some(days) = self.imputation_window_days {
            if days > MAX_IMPUTATION_WINDOW_DAYS {
                return Err(PipelineError::InvalidConfig(format!(
                    "analysis.imputation_window_days must be at most {MAX_IMPUTATION_WINDOW_DAYS}, got {days}"
                )));
            }
        }
        Ok(())
    }

    /// Observations required before a test at `max_lag` is attempted.
    #[must_use]
    pub fn required_observations(&self, max_lag: usize) -> usize {
        self.min_obs_per_lag * max_lag
    }
}

/// Longest forward-fill bound accepted from configuration.
pub const MAX_IMPUTATION_WINDOW_DAYS: u32 = 366;

const fn default_max_lag() -> usize {
    5
}

const fn default_min_obs_per_lag() -> usize {
    10
}

const fn default_significance() -> f64 {
    0.05
}

const fn default_outlier_threshold() -> f64 {
    2.0
}

fn default_market_series() -> Vec<String> {
    vec!["TNX".to_string(), "MOVE".to_string()]
}

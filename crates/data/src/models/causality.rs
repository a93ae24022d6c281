//! Causality test and diagnostics records.

use chrono::NaiveDate;
use fedspeak_core::StationarityPolicy;
use serde::{Deserialize, Serialize};

/// Whether a result tests the requested direction or its reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestDirection {
    /// `predictor -> target` as requested by the caller.
    Forward,
    /// `target -> predictor`.
    Reverse,
}

/// Granger causality statistics for one tested direction and lag.
///
/// `predictor_series` and `target_series` always name the tested cause and
/// effect; `direction` records whether that matches the requested pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CausalityResult {
    pub predictor_series: String,
    pub target_series: String,
    pub direction: TestDirection,
    pub max_lag: usize,
    /// Lag this row tests.
    pub lag: usize,
    /// Lag minimizing the information criterion over `1..=max_lag`.
    pub optimal_lag: usize,
    /// F statistic of the restricted-vs-unrestricted comparison.
    pub test_statistic: f64,
    pub p_value: f64,
    pub df_num: usize,
    pub df_den: usize,
    pub n_obs: usize,
    /// Information criterion of the unrestricted model at `lag`.
    pub information_criterion: f64,
    pub stationarity_policy: StationarityPolicy,
    pub significant: bool,
}

/// A date whose residual deviates sharply from the fitted relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outlier {
    pub date: NaiveDate,
    pub residual: f64,
    /// `(residual - mean) / stdev`.
    pub z_score: f64,
    /// 1 for the largest deviation.
    pub rank: usize,
}

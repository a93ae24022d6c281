//! Granger causality F-test for one lag order.
//!
//! Compares the restricted autoregression of `effect` on its own lags with
//! the unrestricted model that adds the lags of `cause`:
//!
//! `F = ((RSS_r - RSS_u) / p) / (RSS_u / (n - 2p - 1))`

use fedspeak_core::stats::{f_test_p_value, ols, OlsFit};
use fedspeak_core::InformationCriterion;

#[derive(Debug, Clone)]
pub struct GrangerTest {
    pub lag: usize,
    pub f_statistic: f64,
    pub p_value: f64,
    pub df_num: usize,
    pub df_den: usize,
    pub n_obs: usize,
    pub rss_restricted: f64,
    pub rss_unrestricted: f64,
    /// Information criterion of the unrestricted model.
    pub information_criterion: f64,
    /// Index into the input series of the first modeled observation.
    pub sample_start: usize,
    pub unrestricted: OlsFit,
}

/// Tests whether `cause` Granger-causes `effect` at `lag`.
///
/// The regression sample is `start..n`, so tests at different lags can
/// share a common sample when `start` is the largest lag considered.
/// Returns `None` if `start < lag`, the series lengths differ, or either
/// regression is singular or has no residual degrees of freedom.
#[must_use]
pub fn granger_test(
    cause: &[f64],
    effect: &[f64],
    lag: usize,
    start: usize,
    criterion: InformationCriterion,
) -> Option<GrangerTest> {
    let n = effect.len();
    if lag == 0 || start < lag || cause.len() != n || start >= n {
        return None;
    }

    let y: Vec<f64> = effect[start..].to_vec();
    let mut restricted = Vec::with_capacity(y.len());
    let mut unrestricted = Vec::with_capacity(y.len());
    for t in start..n {
        let mut row = Vec::with_capacity(1 + 2 * lag);
        row.push(1.0);
        row.extend((1..=lag).map(|i| effect[t - i]));
        restricted.push(row.clone());
        row.extend((1..=lag).map(|i| cause[t - i]));
        unrestricted.push(row);
    }

    let n_obs = y.len();
    let df_den = n_obs.checked_sub(2 * lag + 1).filter(|&d| d > 0)?;

    let fit_r = ols(&restricted, &y)?;
    let fit_u = ols(&unrestricted, &y)?;

    let rss_u = fit_u.rss;
    let f_statistic = if rss_u > 0.0 {
        ((fit_r.rss - rss_u) / lag as f64) / (rss_u / df_den as f64)
    } else {
        f64::INFINITY
    };
    let f_statistic = f_statistic.max(0.0);
    let p_value = if f_statistic.is_infinite() {
        0.0
    } else {
        f_test_p_value(f_statistic, lag as f64, df_den as f64)
    };

    Some(GrangerTest {
        lag,
        f_statistic,
        p_value,
        df_num: lag,
        df_den,
        n_obs,
        rss_restricted: fit_r.rss,
        rss_unrestricted: rss_u,
        information_criterion: fit_u.information_criterion(criterion),
        sample_start: start,
        unrestricted: fit_u,
    })
}

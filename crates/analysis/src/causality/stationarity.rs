//! Augmented Dickey-Fuller unit-root test with constant.
//!
//! Regression: `dy_t = a + b*y_{t-1} + sum(g_i * dy_{t-i}) + e_t`.
//! H0: unit root (non-stationary). The statistic is the t ratio of `b`;
//! the p-value uses MacKinnon's (1994) response-surface approximation.

use std::fmt;

use fedspeak_core::stats::{first_difference, ols, standard_normal_cdf};
use serde::{Deserialize, Serialize};

/// Asymptotic critical values for the constant-only case.
pub const CRITICAL_VALUES: [(&str, f64); 3] = [("1%", -3.43), ("5%", -2.86), ("10%", -2.57)];

// MacKinnon (1994) constant-only coefficients, increasing powers of the statistic.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences included in the regression.
    pub lags: usize,
    /// Observations used in the regression.
    pub n_obs: usize,
}

impl AdfResult {
    /// True when the unit root is rejected at `significance`.
    #[must_use]
    pub fn is_stationary(&self, significance: f64) -> bool {
        self.p_value < significance
    }
}

/// Why the ADF regression could not be estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdfError {
    /// Too few observations for the requested lagged differences.
    TooShort { observations: usize, lags: usize },
    /// The regression is singular, e.g. for a constant series.
    Singular,
}

impl fmt::Display for AdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { observations, lags } => write!(
                f,
                "{observations} observations are too few for {lags} lagged differences (need {})",
                min_observations(*lags)
            ),
            Self::Singular => f.write_str("regression is singular (constant series?)"),
        }
    }
}

/// Smallest sample that leaves residual degrees of freedom with `lags` differences.
#[must_use]
pub fn min_observations(lags: usize) -> usize {
    2 * lags + 4
}

/// Default augmentation: `floor((n - 1)^(1/3))`.
#[must_use]
pub fn default_lags(n: usize) -> usize {
    (n.saturating_sub(1) as f64).cbrt().floor() as usize
}

/// Runs the ADF test.
///
/// # Errors
/// `TooShort` when the series cannot support the requested lags, `Singular`
/// when the regression cannot be solved.
pub fn adf_test(series: &[f64], lags: Option<usize>) -> Result<AdfResult, AdfError> {
    let n = series.len();
    let p = lags.unwrap_or_else(|| default_lags(n));
    if n < min_observations(p) {
        return Err(AdfError::TooShort {
            observations: n,
            lags: p,
        });
    }

    let diff = first_difference(series);
    let mut rows = Vec::with_capacity(diff.len() - p);
    let mut y = Vec::with_capacity(diff.len() - p);
    for t in p..diff.len() {
        let mut row = Vec::with_capacity(2 + p);
        row.push(1.0);
        row.push(series[t]);
        row.extend((1..=p).map(|i| diff[t - i]));
        rows.push(row);
        y.push(diff[t]);
    }

    let fit = ols(&rows, &y).ok_or(AdfError::Singular)?;
    let statistic = fit.t_stat(1);
    if !statistic.is_finite() {
        return Err(AdfError::Singular);
    }

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        lags: p,
        n_obs: fit.n,
    })
}

/// Approximate p-value of an ADF statistic (constant, one variable).
#[must_use]
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    let poly = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    standard_normal_cdf(poly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect()
    }

    #[test]
    fn p_value_matches_critical_values() {
        assert!((mackinnon_p_value(-2.86) - 0.05).abs() < 0.005);
        assert!((mackinnon_p_value(-3.43) - 0.01).abs() < 0.003);
        assert!((mackinnon_p_value(-2.57) - 0.10).abs() < 0.01);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
    }

    #[test]
    fn p_value_is_monotone() {
        let mut last = 0.0;
        for i in 0..80 {
            let stat = -6.0 + f64::from(i) * 0.1;
            let p = mackinnon_p_value(stat);
            assert!(p >= last - 1e-12, "p-value decreased at {stat}");
            last = p;
        }
    }

    #[test]
    fn white_noise_is_stationary() {
        let result = adf_test(&noise(300, 7), None).unwrap();
        assert!(result.statistic < -3.43);
        assert!(result.is_stationary(0.05));
        assert_eq!(result.lags, default_lags(300));
    }

    #[test]
    fn random_walk_is_not_stationary() {
        let mut level = 0.0;
        let walk: Vec<f64> = noise(300, 11)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        let result = adf_test(&walk, Some(2)).unwrap();
        assert!(!result.is_stationary(0.01));
    }

    #[test]
    fn constant_series_is_singular() {
        assert_eq!(adf_test(&[1.0; 50], Some(1)), Err(AdfError::Singular));
    }

    #[test]
    fn short_series_is_distinguished_from_singular() {
        let err = adf_test(&noise(10, 3), Some(5)).unwrap_err();
        assert_eq!(
            err,
            AdfError::TooShort {
                observations: 10,
                lags: 5
            }
        );
        assert!(err.to_string().contains("need 14"));
        assert!(adf_test(&noise(30, 3), Some(5)).is_ok());
    }

    #[test]
    fn default_lag_rule() {
        assert_eq!(default_lags(30), 3);
        assert_eq!(default_lags(130), 5);
        assert_eq!(default_lags(1), 0);
    }
}

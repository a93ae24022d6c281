//! Statistical primitives shared by the causality engine and diagnostics.
//!
//! Ordinary least squares is solved through the normal equations with
//! `nalgebra`; reference distributions come from `statrs`.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, Normal};

use crate::config::InformationCriterion;

/// Arithmetic mean, or 0.0 for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance with `n - 1` denominator, or 0.0 for fewer than two values.
#[must_use]
pub fn sample_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Pearson correlation coefficient, or 0.0 when undefined.
#[must_use]
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }

    let mean_x = mean(x);
    let mean_y = mean(y);

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;

    for (xi, yi) in x.iter().zip(y.iter()) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = (var_x * var_y).sqrt();
    if denominator < f64::EPSILON {
        return 0.0;
    }

    covariance / denominator
}

/// First differences `x[t] - x[t-1]`; one element shorter than the input.
#[must_use]
pub fn first_difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Standard normal CDF.
#[must_use]
pub fn standard_normal_cdf(x: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(x),
        Err(_) => f64::NAN,
    }
}

/// Upper-tail probability of an F statistic with `(df1, df2)` degrees of freedom.
#[must_use]
pub fn f_test_p_value(f_stat: f64, df1: f64, df2: f64) -> f64 {
    if !f_stat.is_finite() || f_stat <= 0.0 {
        return 1.0;
    }
    match FisherSnedecor::new(df1, df2) {
        Ok(dist) => dist.sf(f_stat).clamp(0.0, 1.0),
        Err(_) => 1.0,
    }
}

/// Result of an ordinary least squares fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    pub coefficients: Vec<f64>,
    /// Standard error of each coefficient.
    pub std_errors: Vec<f64>,
    pub residuals: Vec<f64>,
    /// Residual sum of squares.
    pub rss: f64,
    /// Observations used.
    pub n: usize,
    /// Estimated parameters, intercept included.
    pub k: usize,
}

impl OlsFit {
    /// t statistic of coefficient `idx`.
    #[must_use]
    pub fn t_stat(&self, idx: usize) -> f64 {
        let se = self.std_errors.get(idx).copied().unwrap_or(f64::NAN);
        if se > 0.0 {
            self.coefficients[idx] / se
        } else {
            f64::NAN
        }
    }

    /// Akaike or Bayesian information criterion of the fit.
    #[must_use]
    pub fn information_criterion(&self, criterion: InformationCriterion) -> f64 {
        let n = self.n as f64;
        let rss = self.rss.max(f64::MIN_POSITIVE);
        let fit = n * (rss / n).ln();
        match criterion {
            InformationCriterion::Aic => fit + 2.0 * self.k as f64,
            InformationCriterion::Bic => fit + self.k as f64 * n.ln(),
        }
    }
}

/// Fits `y = X b + e` by ordinary least squares.
///
/// `rows` holds one regressor row per observation; include a leading 1.0
/// for an intercept. Returns `None` when the design is rank deficient or
/// leaves no residual degrees of freedom.
#[must_use]
pub fn ols(rows: &[Vec<f64>], y: &[f64]) -> Option<OlsFit> {
    let n = rows.len();
    let k = rows.first().map(Vec::len)?;
    if n != y.len() || k == 0 || n <= k || rows.iter().any(|r| r.len() != k) {
        return None;
    }

    let x = DMatrix::from_fn(n, k, |i, j| rows[i][j]);
    let y_vec = DVector::from_column_slice(y);

    let xtx = x.transpose() * &x;
    let xtx_inv = xtx.try_inverse()?;
    let beta = &xtx_inv * (x.transpose() * &y_vec);

    let fitted = &x * &beta;
    let residuals = &y_vec - fitted;
    let rss: f64 = residuals.iter().map(|r| r * r).sum();
    let sigma2 = rss / (n - k) as f64;

    let std_errors = (0..k)
        .map(|j| (sigma2 * xtx_inv[(j, j)]).max(0.0).sqrt())
        .collect();

    if beta.iter().any(|b| !b.is_finite()) {
        return None;
    }

    Some(OlsFit {
        coefficients: beta.iter().copied().collect(),
        std_errors,
        residuals: residuals.iter().copied().collect(),
        rss,
        n,
        k,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_sample_std() {
        let values = [0.1, 3.2, 0.4, -2.9, 0.2];
        assert!((mean(&values) - 0.2).abs() < 1e-12);
        // sum of squared deviations = 18.66, n - 1 = 4
        assert!((sample_variance(&values) - 4.665).abs() < 1e-9);
    }

    #[test]
    fn pearson_perfect_correlation() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson_correlation(&x, &y) - 1.0).abs() < 1e-12);
        let neg: Vec<f64> = y.iter().map(|v| -v).collect();
        assert!((pearson_correlation(&x, &neg) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_degenerate_is_zero() {
        assert_eq!(pearson_correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(pearson_correlation(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn first_difference_shortens_by_one() {
        assert_eq!(first_difference(&[1.0, 3.0, 6.0]), vec![2.0, 3.0]);
        assert!(first_difference(&[1.0]).is_empty());
    }

    #[test]
    fn normal_cdf_symmetry() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-9);
        assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-3);
    }

    #[test]
    fn f_test_p_value_bounds() {
        assert_eq!(f_test_p_value(0.0, 2.0, 50.0), 1.0);
        let p_large = f_test_p_value(50.0, 2.0, 100.0);
        assert!(p_large < 1e-6);
        let p_small = f_test_p_value(0.5, 2.0, 100.0);
        assert!(p_small > 0.5);
    }

    #[test]
    fn ols_recovers_linear_relationship() {
        let xs: Vec<f64> = (0..20).map(f64::from).collect();
        let rows: Vec<Vec<f64>> = xs.iter().map(|x| vec![1.0, *x]).collect();
        // small deterministic wobble so the residual variance is non-zero
        let y: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 2.0 + 3.0 * x + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();

        let fit = ols(&rows, &y).unwrap();
        assert!((fit.coefficients[0] - 2.0).abs() < 0.05);
        assert!((fit.coefficients[1] - 3.0).abs() < 0.01);
        assert_eq!(fit.n, 20);
        assert_eq!(fit.k, 2);
        assert!(fit.t_stat(1) > 100.0);
    }

    #[test]
    fn ols_rejects_rank_deficient_design() {
        let rows: Vec<Vec<f64>> = (0..10).map(|_| vec![1.0, 1.0]).collect();
        let y: Vec<f64> = (0..10).map(f64::from).collect();
        assert!(ols(&rows, &y).is_none());
    }

    #[test]
    fn bic_penalizes_parameters_more_than_aic() {
        let fit = OlsFit {
            coefficients: vec![0.0; 3],
            std_errors: vec![0.0; 3],
            residuals: vec![],
            rss: 10.0,
            n: 100,
            k: 3,
        };
        assert!(
            fit.information_criterion(InformationCriterion::Bic)
                > fit.information_criterion(InformationCriterion::Aic)
        );
    }
}

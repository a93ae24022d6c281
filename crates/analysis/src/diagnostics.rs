//! Residual diagnostics: dates where the fitted relationship misses badly.
//!
//! Flagging is descriptive only and never feeds back into a test result.

use chrono::NaiveDate;
use fedspeak_core::stats::{mean, ols, sample_std_dev};
use fedspeak_data::Outlier;
use tracing::debug;

use crate::causality::FittedRelationship;

/// Attaches dates to the residuals of a fitted causality model.
///
/// `dates` is the aligned (untransformed) date axis the model was fitted on.
#[must_use]
pub fn residuals_by_date(dates: &[NaiveDate], fit: &FittedRelationship) -> Vec<(NaiveDate, f64)> {
    dates
        .iter()
        .skip(fit.first_index)
        .copied()
        .zip(fit.residuals.iter().copied())
        .collect()
}

/// Residuals of the contemporaneous baseline `y = a + b*x`.
///
/// Returns `None` if the inputs differ in length or the regression is singular.
#[must_use]
pub fn linear_baseline_residuals(
    dates: &[NaiveDate],
    x: &[f64],
    y: &[f64],
) -> Option<Vec<(NaiveDate, f64)>> {
    if dates.len() != x.len() || x.len() != y.len() {
        return None;
    }
    let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![1.0, v]).collect();
    let fit = ols(&rows, y)?;
    Some(dates.iter().copied().zip(fit.residuals).collect())
}

/// Flags residuals more than `threshold` sample standard deviations from
/// their mean, ranked by deviation (largest first, ties by date).
#[must_use]
pub fn flag_outliers(residuals: &[(NaiveDate, f64)], threshold: f64) -> Vec<Outlier> {
    let values: Vec<f64> = residuals.iter().map(|(_, r)| *r).collect();
    let sd = sample_std_dev(&values);
    if values.len() < 2 || sd <= 0.0 || !sd.is_finite() {
        return Vec::new();
    }
    let m = mean(&values);

    let mut flagged: Vec<(NaiveDate, f64, f64)> = residuals
        .iter()
        .map(|&(date, r)| (date, r, (r - m) / sd))
        .filter(|(_, _, z)| z.abs() > threshold)
        .collect();
    flagged.sort_by(|a, b| b.2.abs().total_cmp(&a.2.abs()).then(a.0.cmp(&b.0)));

    debug!(
        n = values.len(),
        flagged = flagged.len(),
        mean = m,
        stdev = sd,
        "Residual outliers"
    );

    flagged
        .into_iter()
        .enumerate()
        .map(|(i, (date, residual, z_score))| Outlier {
            date,
            residual,
            z_score,
            rank: i + 1,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, day).unwrap()
    }

    fn dated(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (d(i as u32 + 1), v))
            .collect()
    }

    #[test]
    fn ranks_largest_deviation_first() {
        // mean 0.2, sample stdev sqrt(4.665)
        let residuals = dated(&[0.1, 3.2, 0.4, -2.9, 0.2]);
        let outliers = flag_outliers(&residuals, 1.0);

        assert_eq!(outliers.len(), 2);
        assert_eq!(outliers[0].residual, -2.9);
        assert_eq!(outliers[0].date, d(4));
        assert_eq!(outliers[0].rank, 1);
        assert_eq!(outliers[1].residual, 3.2);
        assert_eq!(outliers[1].rank, 2);
        assert!(outliers[0].z_score < 0.0);
        assert!((outliers[1].z_score - 3.0 / 4.665_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn default_threshold_on_small_sample() {
        // The two-sided shocks inflate the stdev; neither exceeds 2 sd.
        let residuals = dated(&[0.1, 3.2, 0.4, -2.9, 0.2]);
        assert!(flag_outliers(&residuals, 2.0).is_empty());
    }

    #[test]
    fn single_shock_in_calm_series() {
        let mut values = vec![0.1, -0.1, 0.05, -0.05, 0.0, 0.1, -0.1, 0.0, 0.05, -0.05];
        values[6] = 4.0;
        let outliers = flag_outliers(&dated(&values), 2.0);
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].date, d(7));
    }

    #[test]
    fn degenerate_inputs() {
        assert!(flag_outliers(&[], 2.0).is_empty());
        assert!(flag_outliers(&dated(&[1.0]), 2.0).is_empty());
        assert!(flag_outliers(&dated(&[0.5, 0.5, 0.5]), 2.0).is_empty());
    }

    #[test]
    fn baseline_residuals_are_dated() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.1, 3.9, 6.2, 7.8, 10.1];
        let dates: Vec<NaiveDate> = (1..=5).map(d).collect();
        let residuals = linear_baseline_residuals(&dates, &x, &y).unwrap();
        assert_eq!(residuals.len(), 5);
        assert_eq!(residuals[0].0, d(1));
        let total: f64 = residuals.iter().map(|(_, r)| r).sum();
        assert!(total.abs() < 1e-9);

        assert!(linear_baseline_residuals(&dates, &x[..4], &y).is_none());
    }

    #[test]
    fn fitted_residuals_skip_lost_dates() {
        let fit = FittedRelationship {
            lag: 2,
            residuals: vec![0.5, -0.5],
            first_index: 3,
        };
        let dates: Vec<NaiveDate> = (1..=5).map(d).collect();
        assert_eq!(residuals_by_date(&dates, &fit), vec![(d(4), 0.5), (d(5), -0.5)]);
    }
}

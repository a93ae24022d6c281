//! Causality Engine: stationarity gate, lag selection and two-way Granger tests.

use fedspeak_core::{
    AnalysisConfig, LagSelectionMode, PipelineError, StationarityPolicy,
};
use fedspeak_core::stats::first_difference;
use fedspeak_data::{CausalityResult, TestDirection};
use tracing::{debug, info, warn};

use super::granger::{granger_test, GrangerTest};
use super::stationarity::adf_test;

/// A named numeric series handed to the engine.
#[derive(Debug, Clone, Copy)]
pub struct SeriesInput<'a> {
    pub name: &'a str,
    pub values: &'a [f64],
}

impl<'a> SeriesInput<'a> {
    #[must_use]
    pub fn new(name: &'a str, values: &'a [f64]) -> Self {
        Self { name, values }
    }
}

/// Fitted unrestricted model at one lag, for residual diagnostics.
#[derive(Debug, Clone)]
pub struct FittedRelationship {
    pub lag: usize,
    /// Residuals of the unrestricted regression.
    pub residuals: Vec<f64>,
    /// Index into the original (untransformed) series of the first residual.
    pub first_index: usize,
}

pub struct CausalityEngine {
    config: AnalysisConfig,
}

impl CausalityEngine {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Tests `predictor -> target` and `target -> predictor`.
    ///
    /// Returns the forward rows followed by the reverse rows: one row per
    /// direction at the criterion-optimal lag, or one row per lag
    /// `1..=max_lag` when `mode` is [`LagSelectionMode::All`].
    ///
    /// # Errors
    /// - `InvalidConfig` if `max_lag` is zero
    /// - `MalformedInput` if the series lengths differ
    /// - `InsufficientData` if fewer than `min_obs_per_lag * max_lag` observations
    /// - `NonStationarySeries` if a series fails the unit-root test under the policy
    /// - `UnitRootTestUnavailable` if the unit-root test cannot be computed
    /// - `GrangerLagUnavailable` if any lag in `1..=max_lag` cannot be estimated
    pub fn test(
        &self,
        predictor: SeriesInput<'_>,
        target: SeriesInput<'_>,
        max_lag: usize,
        mode: LagSelectionMode,
    ) -> Result<Vec<CausalityResult>, PipelineError> {
        self.check_inputs(predictor, target, max_lag)?;

        let x = self.prepare(predictor)?;
        let y = self.prepare(target)?;

        let mut results = self.test_direction(
            (predictor.name, &x),
            (target.name, &y),
            max_lag,
            mode,
            TestDirection::Forward,
        )?;
        results.extend(self.test_direction(
            (target.name, &y),
            (predictor.name, &x),
            max_lag,
            mode,
            TestDirection::Reverse,
        )?);

        info!(
            predictor = predictor.name,
            target = target.name,
            max_lag,
            policy = %self.config.stationarity_policy,
            rows = results.len(),
            "Causality tests complete"
        );
        Ok(results)
    }

    /// Unrestricted `cause -> effect` model at `lag` on the transformed series.
    ///
    /// # Errors
    /// Same preconditions as [`CausalityEngine::test`].
    pub fn fit(
        &self,
        cause: SeriesInput<'_>,
        effect: SeriesInput<'_>,
        lag: usize,
    ) -> Result<FittedRelationship, PipelineError> {
        self.check_inputs(cause, effect, lag)?;
        let x = self.prepare(cause)?;
        let y = self.prepare(effect)?;
        let test = granger_test(&x, &y, lag, lag, self.config.information_criterion)
            .ok_or_else(|| self.insufficient(effect.values.len(), lag))?;
        Ok(FittedRelationship {
            lag,
            residuals: test.unrestricted.residuals,
            first_index: test.sample_start + self.transform_offset(),
        })
    }

    /// Runs the unit-root gate and applies the configured transform.
    ///
    /// # Errors
    /// Returns `NonStationarySeries` when the (transformed) series keeps a unit
    /// root, or `UnitRootTestUnavailable` when the test cannot be computed.
    pub fn prepare(&self, series: SeriesInput<'_>) -> Result<Vec<f64>, PipelineError> {
        let policy = self.config.stationarity_policy;
        let transformed = match policy {
            StationarityPolicy::Raw => series.values.to_vec(),
            StationarityPolicy::Diff => first_difference(series.values),
        };

        let adf = adf_test(&transformed, self.config.adf_lags).map_err(|e| {
            PipelineError::UnitRootTestUnavailable {
                series: series.name.to_string(),
                reason: e.to_string(),
                policy,
            }
        })?;
        if adf.is_stationary(self.config.significance) {
            debug!(series = series.name, %policy, statistic = adf.statistic, p_value = adf.p_value, "Series is stationary");
            Ok(transformed)
        } else {
            Err(PipelineError::NonStationarySeries {
                series: series.name.to_string(),
                statistic: adf.statistic,
                p_value: adf.p_value,
                policy,
            })
        }
    }

    fn check_inputs(
        &self,
        a: SeriesInput<'_>,
        b: SeriesInput<'_>,
        max_lag: usize,
    ) -> Result<(), PipelineError> {
        if max_lag == 0 {
            return Err(PipelineError::InvalidConfig(
                "max_lag must be at least 1".to_string(),
            ));
        }
        if a.values.len() != b.values.len() {
            return Err(PipelineError::malformed(
                format!("{} / {}", a.name, b.name),
                format!(
                    "series lengths differ ({} vs {})",
                    a.values.len(),
                    b.values.len()
                ),
            ));
        }
        let available = a.values.len();
        if available < self.config.required_observations(max_lag) {
            return Err(self.insufficient(available, max_lag));
        }
        Ok(())
    }

    fn test_direction(
        &self,
        (cause_name, cause): (&str, &[f64]),
        (effect_name, effect): (&str, &[f64]),
        max_lag: usize,
        mode: LagSelectionMode,
        direction: TestDirection,
    ) -> Result<Vec<CausalityResult>, PipelineError> {
        let criterion = self.config.information_criterion;
        // All lags share the sample starting at max_lag so criteria are comparable.
        let tests = (1..=max_lag)
            .map(|lag| {
                granger_test(cause, effect, lag, max_lag, criterion).ok_or_else(|| {
                    warn!(cause = cause_name, effect = effect_name, lag, "Granger regression not estimable");
                    PipelineError::GrangerLagUnavailable {
                        cause: cause_name.to_string(),
                        effect: effect_name.to_string(),
                        lag,
                    }
                })
            })
            .collect::<Result<Vec<GrangerTest>, _>>()?;

        let optimal_lag = tests
            .iter()
            .min_by(|a, b| a.information_criterion.total_cmp(&b.information_criterion))
            .map(|t| t.lag)
            .ok_or_else(|| self.insufficient(effect.len(), max_lag))?;

        let to_result = |t: &GrangerTest| CausalityResult {
            predictor_series: cause_name.to_string(),
            target_series: effect_name.to_string(),
            direction,
            max_lag,
            lag: t.lag,
            optimal_lag,
            test_statistic: t.f_statistic,
            p_value: t.p_value,
            df_num: t.df_num,
            df_den: t.df_den,
            n_obs: t.n_obs,
            information_criterion: t.information_criterion,
            stationarity_policy: self.config.stationarity_policy,
            significant: t.p_value < self.config.significance,
        };

        let results: Vec<CausalityResult> = match mode {
            LagSelectionMode::Criterion => tests
                .iter()
                .filter(|t| t.lag == optimal_lag)
                .map(to_result)
                .collect(),
            LagSelectionMode::All => tests.iter().map(to_result).collect(),
        };

        for r in &results {
            debug!(
                cause = cause_name,
                effect = effect_name,
                lag = r.lag,
                f = r.test_statistic,
                p = r.p_value,
                "Granger test"
            );
        }
        Ok(results)
    }

    fn transform_offset(&self) -> usize {
        match self.config.stationarity_policy {
            StationarityPolicy::Raw => 0,
            StationarityPolicy::Diff => 1,
        }
    }

    fn insufficient(&self, available: usize, max_lag: usize) -> PipelineError {
        PipelineError::InsufficientData {
            required: self.config.required_observations(max_lag),
            available,
            max_lag,
        }
    }
}

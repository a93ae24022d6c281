//! Granger causality between a sentiment index and market series.

pub mod engine;
pub mod granger;
pub mod stationarity;

pub use engine::{CausalityEngine, FittedRelationship, SeriesInput};
pub use granger::{granger_test, GrangerTest};
pub use stationarity::{
    adf_test, default_lags, mackinnon_p_value, min_observations, AdfError, AdfResult,
    CRITICAL_VALUES,
};

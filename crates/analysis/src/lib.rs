//! Alignment, causality testing and residual diagnostics.

pub mod alignment;
pub mod causality;
pub mod diagnostics;

pub use alignment::{align, AlignWindow};
pub use causality::{
    adf_test, granger_test, AdfError, AdfResult, CausalityEngine, FittedRelationship, GrangerTest,
    SeriesInput,
};
pub use diagnostics::{flag_outliers, linear_baseline_residuals, residuals_by_date};

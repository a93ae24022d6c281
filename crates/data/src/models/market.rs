use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily close of an external market series (e.g. `TNX`, `MOVE`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketObservation {
    pub date: NaiveDate,
    pub series_name: String,
    pub value: f64,
}

impl MarketObservation {
    pub fn new(date: NaiveDate, series_name: impl Into<String>, value: f64) -> Self {
        Self {
            date,
            series_name: series_name.into(),
            value,
        }
    }
}

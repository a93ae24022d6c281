//! Sentiment and market values on a shared trading-day axis.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One trading day with every required value present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub date: NaiveDate,
    pub sentiment_value: f64,
    /// Values in the order of `AlignedSeries::market_series`.
    pub market_values: Vec<f64>,
    /// True when the sentiment value was carried forward from an earlier day.
    pub imputed: bool,
    /// Calendar days between this row and the sentiment observation used.
    pub staleness_days: u32,
}

/// Why a candidate trading day did not produce a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    NoSentiment,
    StaleSentiment,
    MissingMarketValue,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NoSentiment => "no sentiment observation",
            Self::StaleSentiment => "sentiment older than imputation window",
            Self::MissingMarketValue => "missing market value",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedDay {
    pub date: NaiveDate,
    pub reason: DropReason,
}

/// Output of the series aligner. Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedSeries {
    pub sentiment_model: String,
    pub market_series: Vec<String>,
    pub rows: Vec<AlignedRow>,
    pub dropped: Vec<DroppedDay>,
}

impl AlignedSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    #[must_use]
    pub fn sentiment_values(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.sentiment_value).collect()
    }

    /// Column of one market series, or `None` if it is not part of the alignment.
    #[must_use]
    pub fn market_values(&self, series_name: &str) -> Option<Vec<f64>> {
        let idx = self.market_series.iter().position(|s| s == series_name)?;
        Some(self.rows.iter().map(|r| r.market_values[idx]).collect())
    }

    #[must_use]
    pub fn imputed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.imputed).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, s: f64, m: [f64; 2], imputed: bool) -> AlignedRow {
        AlignedRow {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            sentiment_value: s,
            market_values: m.to_vec(),
            imputed,
            staleness_days: u32::from(imputed),
        }
    }

    #[test]
    fn column_access_by_series_name() {
        let series = AlignedSeries {
            sentiment_model: "lexicon".to_string(),
            market_series: vec!["TNX".to_string(), "MOVE".to_string()],
            rows: vec![row(4, 0.1, [4.2, 110.0], false), row(5, 0.2, [4.3, 112.0], true)],
            dropped: vec![],
        };
        assert_eq!(series.market_values("MOVE"), Some(vec![110.0, 112.0]));
        assert_eq!(series.market_values("VIX"), None);
        assert_eq!(series.sentiment_values(), vec![0.1, 0.2]);
        assert_eq!(series.imputed_count(), 1);
        assert_eq!(series.len(), 2);
    }
}

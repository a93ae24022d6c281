//! Series Aligner.
//!
//! The market calendar governs the timeline: only dates with market
//! observations are candidate rows. A row needs every requested market
//! series and a sentiment value; a missing sentiment value may be carried
//! forward from an earlier date only when a staleness bound is configured,
//! and such rows are tagged as imputed. Every other gap is dropped and
//! reported with its reason.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fedspeak_data::{
    AlignedRow, AlignedSeries, DailySentimentIndex, DropReason, DroppedDay, MarketObservation,
};
use tracing::{debug, info, warn};

/// Date range and imputation policy for one alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlignWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Maximum calendar days a sentiment value may be carried forward.
    /// `None` drops every day without its own sentiment observation.
    pub imputation_window_days: Option<u32>,
}

impl AlignWindow {
    #[must_use]
    pub fn with_imputation(days: Option<u32>) -> Self {
        Self {
            imputation_window_days: days,
            ..Self::default()
        }
    }

    fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Aligns one model's daily index with the named market series.
///
/// Candidate days lie in the overlap of sentiment and market coverage,
/// extended past the last sentiment date by the imputation bound.
#[must_use]
pub fn align(
    sentiment: &[DailySentimentIndex],
    model_name: &str,
    market: &[MarketObservation],
    series: &[String],
    window: &AlignWindow,
) -> AlignedSeries {
    let mut sentiment_by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for row in sentiment.iter().filter(|r| r.model_name == model_name) {
        if !row.value.is_finite() {
            warn!(date = %row.date, model = model_name, "Ignoring non-finite sentiment value");
            continue;
        }
        if sentiment_by_date.insert(row.date, row.value).is_some() {
            warn!(date = %row.date, model = model_name, "Duplicate sentiment row, keeping last");
        }
    }

    let mut market_by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    for obs in market {
        let Some(col) = series.iter().position(|s| *s == obs.series_name) else {
            continue;
        };
        if !obs.value.is_finite() {
            continue;
        }
        let values = market_by_date
            .entry(obs.date)
            .or_insert_with(|| vec![None; series.len()]);
        if values[col].replace(obs.value).is_some() {
            warn!(date = %obs.date, series = %obs.series_name, "Duplicate market observation, keeping last");
        }
    }

    let mut aligned = AlignedSeries {
        sentiment_model: model_name.to_string(),
        market_series: series.to_vec(),
        rows: Vec::new(),
        dropped: Vec::new(),
    };

    let (Some((&first_sentiment, _)), Some((&last_sentiment, _))) = (
        sentiment_by_date.first_key_value(),
        sentiment_by_date.last_key_value(),
    ) else {
        info!(model = model_name, "No sentiment observations to align");
        return aligned;
    };
    let carry_days = window.imputation_window_days.unwrap_or(0);
    let coverage_end = last_sentiment
        .checked_add_signed(chrono::Duration::days(i64::from(carry_days)))
        .unwrap_or(NaiveDate::MAX);

    for (&date, values) in &market_by_date {
        if date < first_sentiment || date > coverage_end || !window.contains(date) {
            continue;
        }

        let market_values: Option<Vec<f64>> = values.iter().copied().collect();
        let Some(market_values) = market_values else {
            aligned.dropped.push(DroppedDay {
                date,
                reason: DropReason::MissingMarketValue,
            });
            continue;
        };

        if let Some(&value) = sentiment_by_date.get(&date) {
            aligned.rows.push(AlignedRow {
                date,
                sentiment_value: value,
                market_values,
                imputed: false,
                staleness_days: 0,
            });
            continue;
        }

        let Some(limit) = window.imputation_window_days else {
            aligned.dropped.push(DroppedDay {
                date,
                reason: DropReason::NoSentiment,
            });
            continue;
        };

        // Latest earlier observation; one always exists since date >= first_sentiment.
        let Some((&source_date, &value)) = sentiment_by_date.range(..date).next_back() else {
            continue;
        };
        let staleness = (date - source_date).num_days();
        if staleness <= i64::from(limit) {
            debug!(%date, %source_date, staleness, "Forward-filled sentiment");
            aligned.rows.push(AlignedRow {
                date,
                sentiment_value: value,
                market_values,
                imputed: true,
                staleness_days: u32::try_from(staleness).unwrap_or(u32::MAX),
            });
        } else {
            aligned.dropped.push(DroppedDay {
                date,
                reason: DropReason::StaleSentiment,
            });
        }
    }

    info!(
        model = model_name,
        rows = aligned.rows.len(),
        imputed = aligned.imputed_count(),
        dropped = aligned.dropped.len(),
        "Aligned sentiment with market series"
    );
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn sent(day: u32, value: f64) -> DailySentimentIndex {
        DailySentimentIndex {
            date: d(day),
            value,
            n_documents: 1,
            n_sentences: 3,
            model_name: "lexicon".to_string(),
        }
    }

    fn market_days(days: &[u32]) -> Vec<MarketObservation> {
        days.iter()
            .flat_map(|&day| {
                [
                    MarketObservation::new(d(day), "TNX", 4.0 + f64::from(day) / 100.0),
                    MarketObservation::new(d(day), "MOVE", 100.0 + f64::from(day)),
                ]
            })
            .collect()
    }

    fn series() -> Vec<String> {
        vec!["TNX".to_string(), "MOVE".to_string()]
    }

    #[test]
    fn market_calendar_governs() {
        // Saturday the 9th has sentiment but no market data
        let sentiment = vec![sent(7, 0.2), sent(8, 0.1), sent(9, 0.5), sent(11, -0.3)];
        let market = market_days(&[7, 8, 11, 12]);
        let out = align(&sentiment, "lexicon", &market, &series(), &AlignWindow::default());

        assert_eq!(out.dates(), vec![d(7), d(8), d(11)]);
        assert_eq!(out.sentiment_values(), vec![0.2, 0.1, -0.3]);
        assert_eq!(out.market_values("MOVE"), Some(vec![107.0, 108.0, 111.0]));
        assert!(out.dropped.is_empty());
        assert_eq!(out.imputed_count(), 0);
    }

    #[test]
    fn gaps_are_dropped_with_reason() {
        let sentiment = vec![sent(7, 0.2), sent(11, -0.3)];
        let mut market = market_days(&[7, 8, 11]);
        market.retain(|o| !(o.date == d(11) && o.series_name == "TNX"));
        let out = align(&sentiment, "lexicon", &market, &series(), &AlignWindow::default());

        assert_eq!(out.dates(), vec![d(7)]);
        assert_eq!(
            out.dropped,
            vec![
                DroppedDay {
                    date: d(8),
                    reason: DropReason::NoSentiment
                },
                DroppedDay {
                    date: d(11),
                    reason: DropReason::MissingMarketValue
                },
            ]
        );
    }

    #[test]
    fn forward_fill_is_bounded_and_tagged() {
        let sentiment = vec![sent(4, 0.4), sent(12, 0.1)];
        let market = market_days(&[4, 5, 6, 7, 8, 11, 12]);
        let window = AlignWindow::with_imputation(Some(2));
        let out = align(&sentiment, "lexicon", &market, &series(), &window);

        assert_eq!(out.dates(), vec![d(4), d(5), d(6), d(12)]);
        assert_eq!(out.rows[1].staleness_days, 1);
        assert_eq!(out.rows[2].staleness_days, 2);
        assert!(out.rows[1].imputed && out.rows[2].imputed);
        assert!(!out.rows[3].imputed);
        assert_eq!(out.sentiment_values(), vec![0.4, 0.4, 0.4, 0.1]);
        assert!(out
            .dropped
            .iter()
            .all(|day| day.reason == DropReason::StaleSentiment));
        assert_eq!(out.dropped.len(), 3);
    }

    #[test]
    fn imputation_extends_past_last_sentiment() {
        let sentiment = vec![sent(7, 0.3)];
        let market = market_days(&[7, 8, 11]);
        let out = align(
            &sentiment,
            "lexicon",
            &market,
            &series(),
            &AlignWindow::with_imputation(Some(1)),
        );
        assert_eq!(out.dates(), vec![d(7), d(8)]);
    }

    #[test]
    fn huge_imputation_bound_saturates() {
        let sentiment = vec![sent(7, 0.3)];
        let market = market_days(&[7, 8, 11]);
        let out = align(
            &sentiment,
            "lexicon",
            &market,
            &series(),
            &AlignWindow::with_imputation(Some(u32::MAX)),
        );
        assert_eq!(out.dates(), vec![d(7), d(8), d(11)]);
        assert_eq!(out.imputed_count(), 2);
    }

    #[test]
    fn duplicate_market_observation_keeps_last() {
        let sentiment = vec![sent(7, 0.3)];
        let mut market = market_days(&[7]);
        market.push(MarketObservation::new(d(7), "TNX", 9.99));
        let out = align(&sentiment, "lexicon", &market, &series(), &AlignWindow::default());
        assert_eq!(out.market_values("TNX"), Some(vec![9.99]));
    }

    #[test]
    fn other_models_and_window_bounds_are_excluded() {
        let mut sentiment = vec![sent(7, 0.2), sent(8, 0.1), sent(11, 0.0)];
        sentiment.push(DailySentimentIndex {
            model_name: "finbert".to_string(),
            ..sent(12, 0.9)
        });
        let market = market_days(&[7, 8, 11, 12]);
        let window = AlignWindow {
            start: Some(d(8)),
            end: None,
            imputation_window_days: None,
        };
        let out = align(&sentiment, "lexicon", &market, &series(), &window);
        assert_eq!(out.dates(), vec![d(8), d(11)]);
        assert_eq!(out.sentiment_model, "lexicon");
    }

    #[test]
    fn alignment_is_pure() {
        let sentiment = vec![sent(7, 0.2), sent(8, 0.1)];
        let market = market_days(&[7, 8]);
        let window = AlignWindow::with_imputation(Some(3));
        let a = align(&sentiment, "lexicon", &market, &series(), &window);
        let b = align(&sentiment, "lexicon", &market, &series(), &window);
        assert_eq!(a, b);
    }

    #[test]
    fn empty_sentiment_yields_empty_series() {
        let out = align(&[], "lexicon", &market_days(&[7]), &series(), &AlignWindow::default());
        assert!(out.is_empty());
        assert!(out.dropped.is_empty());
    }
}

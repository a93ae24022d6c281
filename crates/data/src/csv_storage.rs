use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;

use chrono::NaiveDate;
use csv::{Reader, Writer};
use fedspeak_core::PipelineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DataError;
use crate::models::{
    AlignedSeries, DailySentimentIndex, FailureRecord, LabeledSentence, MarketObservation,
    RawDocument, Stage,
};

const LONG_MARKET_COLUMNS: [&str; 3] = ["date", "series_name", "value"];

pub struct CsvStorage;

impl CsvStorage {
    /// Reads raw documents with columns `source`, `timestamp` (or `date`), `text`.
    ///
    /// Rows that cannot be decoded are returned as ingest failures.
    ///
    /// # Errors
    /// Returns error if the file or its header cannot be read.
    pub fn read_raw_documents(path: impl AsRef<Path>) -> Result<CsvRows<RawDocument>, DataError> {
        Self::read_rows(path.as_ref(), "row")
    }

    /// Reads market observations.
    ///
    /// Accepts long format (`date,series_name,value`) or wide format where
    /// every column after `date` is a series. Empty cells are skipped. A row
    /// with an unparseable date or value is returned as a failure as a whole.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or has no date column.
    pub fn read_market(path: impl AsRef<Path>) -> Result<CsvRows<MarketObservation>, DataError> {
        let path = path.as_ref();
        let mut reader = Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;
        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DataError::csv(path, e))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let is_long = LONG_MARKET_COLUMNS
            .iter()
            .all(|c| headers.iter().any(|h| h == c));
        if is_long {
            return Self::read_rows(path, "market row");
        }

        let date_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| {
                PipelineError::malformed(path.display().to_string(), "market file has no date column")
            })?;

        let mut rows = CsvRows::default();
        for (row, record) in reader.records().enumerate() {
            let parsed = match record {
                Ok(record) => parse_wide_row(&record, &headers, date_col),
                Err(e) if is_io(&e) => return Err(DataError::csv(path, e)),
                Err(e) => Err(e.to_string()),
            };
            match parsed {
                Ok(observations) => rows.rows.extend(observations.into_iter().map(|o| (row, o))),
                Err(reason) => rows.skip(path, format!("market row {row}"), reason),
            }
        }

        debug!(
            count = rows.rows.len(),
            skipped = rows.failures.len(),
            "Read wide market file"
        );
        Ok(rows)
    }

    /// # Errors
    /// Returns error if the file cannot be opened or a row cannot be decoded.
    pub fn read_daily_index(
        path: impl AsRef<Path>,
    ) -> Result<Vec<DailySentimentIndex>, DataError> {
        Self::read_records(path)
    }

    /// Reads gold-standard sentences with columns `date`, `source`, `text`, `label`.
    ///
    /// Rows whose label is not a known sentiment class are skipped.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened.
    pub fn read_labeled_sentences(
        path: impl AsRef<Path>,
    ) -> Result<Vec<LabeledSentence>, DataError> {
        let path = path.as_ref();
        let mut reader = Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;
        let mut sentences = Vec::new();
        for (row, result) in reader.deserialize::<LabeledSentence>().enumerate() {
            match result {
                Ok(sentence) => sentences.push(sentence),
                Err(e) => warn!(row, error = %e, "Skipping unlabeled gold sentence"),
            }
        }
        Ok(sentences)
    }

    /// Writes records with a header row derived from their field names.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails.
    pub fn write_records<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<(), DataError> {
        let path = path.as_ref();
        let mut writer = Self::writer(path)?;
        for record in records {
            writer.serialize(record).map_err(|e| DataError::csv(path, e))?;
        }
        writer.flush().map_err(|e| DataError::io(path, e))?;
        debug!(path = %path.display(), rows = records.len(), "Wrote table");
        Ok(())
    }

    /// Writes aligned series for one or more models, one column per market series.
    ///
    /// Format: `date,model,sentiment,<series...>,imputed,staleness_days`.
    /// All series must share the market columns of the first.
    ///
    /// # Errors
    /// Returns error if the file cannot be created, writing fails, or the
    /// series disagree on their market columns.
    pub fn write_aligned(path: impl AsRef<Path>, series: &[AlignedSeries]) -> Result<(), DataError> {
        let path = path.as_ref();
        let market_series: &[String] = series
            .first()
            .map(|s| s.market_series.as_slice())
            .unwrap_or_default();
        if let Some(other) = series.iter().find(|s| s.market_series != market_series) {
            return Err(DataError::Malformed(PipelineError::malformed(
                path.display().to_string(),
                format!("model {} has different market columns", other.sentiment_model),
            )));
        }

        let mut writer = Self::writer(path)?;
        let mut header = vec!["date".to_string(), "model".to_string(), "sentiment".to_string()];
        header.extend(market_series.iter().cloned());
        header.push("imputed".to_string());
        header.push("staleness_days".to_string());
        writer.write_record(&header).map_err(|e| DataError::csv(path, e))?;

        for aligned in series {
            for row in &aligned.rows {
                let mut record = vec![
                    row.date.format("%Y-%m-%d").to_string(),
                    aligned.sentiment_model.clone(),
                    row.sentiment_value.to_string(),
                ];
                record.extend(row.market_values.iter().map(f64::to_string));
                record.push(row.imputed.to_string());
                record.push(row.staleness_days.to_string());
                writer.write_record(&record).map_err(|e| DataError::csv(path, e))?;
            }
        }

        writer.flush().map_err(|e| DataError::io(path, e))?;
        Ok(())
    }

    /// Decodes rows one at a time so a bad row only costs itself.
    fn read_rows<T: DeserializeOwned>(path: &Path, label: &str) -> Result<CsvRows<T>, DataError> {
        let mut reader = Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;
        let mut rows = CsvRows::default();
        for (row, result) in reader.deserialize::<T>().enumerate() {
            match result {
                Ok(record) => rows.rows.push((row, record)),
                Err(e) if is_io(&e) => return Err(DataError::csv(path, e)),
                Err(e) => rows.skip(path, format!("{label} {row}"), e.to_string()),
            }
        }
        Ok(rows)
    }

    fn read_records<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>, DataError> {
        let path = path.as_ref();
        let mut reader = Reader::from_path(path).map_err(|e| DataError::csv(path, e))?;
        reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| DataError::csv(path, e))
    }

    fn writer(path: &Path) -> Result<Writer<File>, DataError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }
        let file = File::create(path).map_err(|e| DataError::io(path, e))?;
        Ok(Writer::from_writer(file))
    }
}

/// Rows decoded from an input table, plus one failure per undecodable row.
#[derive(Debug)]
pub struct CsvRows<T> {
    /// Decoded records with their 0-based data row.
    pub rows: Vec<(usize, T)>,
    pub failures: Vec<FailureRecord>,
}

impl<T> Default for CsvRows<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> CsvRows<T> {
    /// Decoded records in file order.
    #[must_use]
    pub fn into_records(self) -> Vec<T> {
        self.rows.into_iter().map(|(_, r)| r).collect()
    }

    fn skip(&mut self, path: &Path, record_id: String, reason: String) {
        warn!(path = %path.display(), record = %record_id, error = %reason, "Skipping undecodable row");
        self.failures
            .push(FailureRecord::new(Stage::Ingest, record_id, reason));
    }
}

fn is_io(e: &csv::Error) -> bool {
    matches!(e.kind(), csv::ErrorKind::Io(_))
}

fn parse_wide_row(
    record: &csv::StringRecord,
    headers: &[String],
    date_col: usize,
) -> Result<Vec<MarketObservation>, String> {
    let raw_date = record.get(date_col).unwrap_or_default();
    let date = parse_date(raw_date).ok_or_else(|| format!("bad date '{raw_date}'"))?;

    let mut observations = Vec::new();
    for (col, name) in headers.iter().enumerate() {
        if col == date_col {
            continue;
        }
        let cell = record.get(col).unwrap_or_default().trim();
        if cell.is_empty() {
            continue;
        }
        let value: f64 = cell
            .parse()
            .map_err(|_| format!("bad value '{cell}' for {name}"))?;
        observations.push(MarketObservation::new(date, name.clone(), value));
    }
    Ok(observations)
}

/// Distinct series names in first-seen order.
#[must_use]
pub fn series_names(observations: &[MarketObservation]) -> Vec<String> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .filter(|o| seen.insert(o.series_name.as_str()))
        .map(|o| o.series_name.clone())
        .collect()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    // Market exports sometimes carry a time suffix on the date column.
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

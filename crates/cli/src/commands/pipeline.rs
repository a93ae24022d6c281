//! Stage plumbing shared by the subcommands.
//!
//! Each stage consumes one table and returns new ones; nothing is mutated
//! in place. Failures from every stage are collected into one ledger.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use fedspeak_analysis::{
    align, flag_outliers, residuals_by_date, AlignWindow, CausalityEngine, SeriesInput,
};
use fedspeak_core::{AnalysisConfig, AppConfig};
use fedspeak_data::{
    series_names, AlignedSeries, CausalityResult, CsvStorage, DailySentimentIndex, Document,
    DocumentSentiment, DocumentStore, FailureRecord, IngestReport, MarketObservation, Stage,
    TestDirection,
};
use fedspeak_sentiment::{
    ensemble, model_names, BackendRegistry, ScoreAggregator, ScoringRun, SentimentScorer,
};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const DAILY_INDEX_FILE: &str = "daily_index.csv";
pub const SENTENCE_SCORES_FILE: &str = "sentence_scores.csv";
pub const DOCUMENT_SCORES_FILE: &str = "document_scores.csv";
pub const SENTENCES_FILE: &str = "sentences.csv";
pub const ALIGNED_FILE: &str = "aligned.csv";
pub const CAUSALITY_FILE: &str = "causality.csv";
pub const OUTLIERS_FILE: &str = "outliers.csv";
pub const FAILURES_FILE: &str = "failures.csv";

/// Output format for command reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("Unknown format: '{}'. Valid formats: text, json", s)),
        }
    }
}

/// One segmented sentence, as written to `sentences.csv`.
#[derive(Debug, Serialize)]
pub struct SentenceRow<'a> {
    pub document_id: &'a str,
    pub source: &'a str,
    pub date: NaiveDate,
    pub sentence_index: usize,
    pub section: Option<&'a str>,
    pub text: &'a str,
}

/// A flagged residual together with the relationship it came from.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierRow {
    pub model_name: String,
    pub predictor_series: String,
    pub target_series: String,
    pub lag: usize,
    pub date: NaiveDate,
    pub residual: f64,
    pub z_score: f64,
    pub rank: usize,
}

pub struct ScoringOutcome {
    pub run: ScoringRun,
    pub document_sentiment: Vec<DocumentSentiment>,
    pub index: Vec<DailySentimentIndex>,
}

#[derive(Debug, Default)]
pub struct AnalysisOutcome {
    pub aligned: Vec<AlignedSeries>,
    pub results: Vec<CausalityResult>,
    pub outliers: Vec<OutlierRow>,
    pub failures: Vec<FailureRecord>,
}

/// Reads raw documents and ingests them into a fresh store.
///
/// Undecodable rows are reported with the other ingest failures.
pub fn ingest_documents(config: &AppConfig, path: &Path) -> Result<IngestReport> {
    let table = CsvStorage::read_raw_documents(path)
        .with_context(|| format!("Failed to read documents from {}", path.display()))?;
    let mut store = DocumentStore::new(&config.ingestion)?;
    let report = store.ingest_table(&table);
    if report.documents.is_empty() {
        warn!(path = %path.display(), "No documents ingested");
    }
    Ok(report)
}

/// Scores documents with every configured backend and builds the daily index.
///
/// Ctrl-C aborts the run; no partial tables are produced.
pub async fn score_documents(
    config: &AppConfig,
    documents: &[Arc<Document>],
    with_ensemble: bool,
) -> Result<ScoringOutcome> {
    let registry = BackendRegistry::from_specs(&config.scoring.backends)?;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scoring run");
            let _ = cancel_tx.send(true);
        }
    });

    let scorer = SentimentScorer::new(registry, config.scoring.max_concurrency)
        .with_cancellation(cancel_rx);
    let run = scorer.score_documents(documents).await;
    interrupt.abort();
    let run = run.context("Scoring run did not complete")?;

    let aggregator = ScoreAggregator::new(config.scoring.index_method);
    let document_sentiment = aggregator.document_sentiment(&run.scores);
    let mut index = aggregator.daily_index(documents, &run.scores);
    if with_ensemble {
        let models = model_names(&index);
        let combined = ensemble(&index, &models);
        info!(models = models.len(), rows = combined.len(), "Built ensemble index");
        index.extend(combined);
    }

    Ok(ScoringOutcome {
        run,
        document_sentiment,
        index,
    })
}

/// Reads market observations and the ingest failures of rows that could not be decoded.
pub fn read_market(path: &Path) -> Result<(Vec<MarketObservation>, Vec<FailureRecord>)> {
    let table = CsvStorage::read_market(path)
        .with_context(|| format!("Failed to read market data from {}", path.display()))?;
    let failures = table.failures.clone();
    Ok((table.into_records(), failures))
}

/// Market series to test: the configured ones present in the market table.
pub fn select_market_series(config: &AnalysisConfig, market: &[MarketObservation]) -> Result<Vec<String>> {
    let available = series_names(market);
    let selected: Vec<String> = config
        .market_series
        .iter()
        .filter(|name| {
            let present = available.contains(name);
            if !present {
                warn!(series = %name, "Configured market series not found in market data");
            }
            present
        })
        .cloned()
        .collect();
    if selected.is_empty() {
        bail!(
            "None of the configured market series {:?} are present (found {:?})",
            config.market_series,
            available
        );
    }
    Ok(selected)
}

/// Aligns every model with the market series, tests causality both ways for
/// each (model, series) pair, and flags residual outliers of the forward fit.
///
/// Precondition failures (non-stationarity, short samples) produce no result
/// for that pair and are reported in the failure ledger.
pub fn analyze(
    config: &AnalysisConfig,
    index: &[DailySentimentIndex],
    market: &[MarketObservation],
    series: &[String],
    window: AlignWindow,
) -> AnalysisOutcome {
    let engine = CausalityEngine::new(config.clone());
    let mut outcome = AnalysisOutcome::default();

    for model in model_names(index) {
        let aligned = align(index, &model, market, series, &window);
        outcome.failures.extend(aligned.dropped.iter().map(|day| {
            FailureRecord::new(
                Stage::Align,
                day.date.format("%Y-%m-%d").to_string(),
                day.reason.to_string(),
            )
            .with_model(&model)
        }));

        let dates = aligned.dates();
        let sentiment = aligned.sentiment_values();
        for name in series {
            let Some(values) = aligned.market_values(name) else {
                continue;
            };
            let predictor = SeriesInput::new(&model, &sentiment);
            let target = SeriesInput::new(name, &values);

            match engine.test(predictor, target, config.max_lag, config.lag_selection_mode) {
                Ok(results) => {
                    let lag = results
                        .iter()
                        .find(|r| r.direction == TestDirection::Forward)
                        .map(|r| r.optimal_lag);
                    outcome.results.extend(results);
                    if let Some(lag) = lag {
                        outcome.outliers.extend(diagnose(
                            &engine, &model, predictor, target, lag, &dates,
                        ));
                    }
                }
                Err(e) => {
                    error!(model = %model, series = %name, error = %e, "Causality test not performed");
                    outcome.failures.push(
                        FailureRecord::new(Stage::Analyze, format!("{model} -> {name}"), e.to_string())
                            .with_model(&model),
                    );
                }
            }
        }
        outcome.aligned.push(aligned);
    }

    info!(
        models = outcome.aligned.len(),
        results = outcome.results.len(),
        outliers = outcome.outliers.len(),
        "Analysis complete"
    );
    outcome
}

fn diagnose(
    engine: &CausalityEngine,
    model: &str,
    predictor: SeriesInput<'_>,
    target: SeriesInput<'_>,
    lag: usize,
    dates: &[NaiveDate],
) -> Vec<OutlierRow> {
    let fit = match engine.fit(predictor, target, lag) {
        Ok(fit) => fit,
        Err(e) => {
            warn!(model, series = target.name, error = %e, "Skipping residual diagnostics");
            return Vec::new();
        }
    };
    let residuals = residuals_by_date(dates, &fit);
    flag_outliers(&residuals, engine.config().outlier_threshold_stdev)
        .into_iter()
        .map(|o| OutlierRow {
            model_name: model.to_string(),
            predictor_series: predictor.name.to_string(),
            target_series: target.name.to_string(),
            lag,
            date: o.date,
            residual: o.residual,
            z_score: o.z_score,
            rank: o.rank,
        })
        .collect()
}

/// Sentence table of an ingested corpus.
pub fn sentence_rows(documents: &[Arc<Document>]) -> Vec<SentenceRow<'_>> {
    documents
        .iter()
        .flat_map(|doc| {
            doc.sentences.iter().enumerate().map(move |(i, text)| SentenceRow {
                document_id: &doc.id,
                source: doc.source.as_str(),
                date: doc.date,
                sentence_index: i,
                section: doc.section_of(i),
                text,
            })
        })
        .collect()
}

/// Writes `records` to `dir/file`.
pub fn write_table<T: Serialize>(dir: &Path, file: &str, records: &[T]) -> Result<()> {
    let path = dir.join(file);
    CsvStorage::write_records(&path, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), rows = records.len(), "Wrote table");
    Ok(())
}

/// Writes the aligned table of every model to `dir/aligned.csv`.
pub fn write_aligned(dir: &Path, aligned: &[AlignedSeries]) -> Result<()> {
    let path = dir.join(ALIGNED_FILE);
    CsvStorage::write_aligned(&path, aligned)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Per-stage counts for the run summary.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub documents: usize,
    pub sentences: usize,
    pub duplicates: usize,
    pub scores: usize,
    pub unavailable_backends: Vec<String>,
    pub index_rows: usize,
    pub aligned_rows: usize,
    pub imputed_rows: usize,
    pub tests: usize,
    pub significant: usize,
    pub outliers: usize,
    pub failures: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn record_ingest(&mut self, report: &IngestReport) {
        self.documents = report.documents.len();
        self.sentences = report.documents.iter().map(|d| d.sentence_count()).sum();
        self.duplicates = report.duplicates;
        self.record_failures(&report.failures);
    }

    pub fn record_scoring(&mut self, outcome: &ScoringOutcome) {
        self.scores = outcome.run.scores.len();
        self.unavailable_backends = outcome.run.unavailable.clone();
        self.index_rows = outcome.index.len();
        self.record_failures(&outcome.run.failures);
    }

    pub fn record_analysis(&mut self, outcome: &AnalysisOutcome) {
        self.aligned_rows = outcome.aligned.iter().map(AlignedSeries::len).sum();
        self.imputed_rows = outcome.aligned.iter().map(AlignedSeries::imputed_count).sum();
        self.tests = outcome.results.len();
        self.significant = outcome.results.iter().filter(|r| r.significant).count();
        self.outliers = outcome.outliers.len();
        self.record_failures(&outcome.failures);
    }

    pub fn record_failures(&mut self, failures: &[FailureRecord]) {
        for f in failures {
            *self.failures.entry(f.stage.to_string()).or_default() += 1;
        }
    }

    /// Formats a text summary.
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        output.push_str("║                    FEDSPEAK RUN SUMMARY                      ║\n");
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        output.push_str(&row("Documents ingested:", self.documents));
        output.push_str(&row("Sentences:", self.sentences));
        output.push_str(&row("Duplicates skipped:", self.duplicates));
        output.push_str(&row("Sentence scores:", self.scores));
        output.push_str(&row("Daily index rows:", self.index_rows));
        output.push_str(&row("Aligned rows:", self.aligned_rows));
        output.push_str(&row("  of which imputed:", self.imputed_rows));
        output.push_str(&row("Causality tests:", self.tests));
        output.push_str(&row("  significant:", self.significant));
        output.push_str(&row("Outliers flagged:", self.outliers));
        output.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        if self.failures.is_empty() {
            output.push_str("║  No failed or skipped records.                               ║\n");
        } else {
            for (stage, count) in &self.failures {
                output.push_str(&row(&format!("Failures ({stage}):"), count));
            }
        }
        for backend in &self.unavailable_backends {
            output.push_str(&row("Backend unavailable:", backend));
        }
        output.push_str("╚══════════════════════════════════════════════════════════════╝\n");

        output
    }
}

fn row(label: &str, value: impl std::fmt::Display) -> String {
    format!("║  {label:<28}{value:>31} ║\n")
}

/// Fixed-width causality table.
pub fn causality_table(results: &[CausalityResult]) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<14} {:<14} {:<8} {:>4} {:>4} {:>10} {:>10} {:>6}  {}\n",
        "PREDICTOR", "TARGET", "DIR", "LAG", "OPT", "F", "P-VALUE", "POLICY", "SIG"
    ));
    output.push_str(&format!("{}\n", "-".repeat(86)));
    for r in results {
        let direction = match r.direction {
            TestDirection::Forward => "forward",
            TestDirection::Reverse => "reverse",
        };
        output.push_str(&format!(
            "{:<14} {:<14} {:<8} {:>4} {:>4} {:>10.4} {:>10.4} {:>6}  {}\n",
            truncate(&r.predictor_series, 14),
            truncate(&r.target_series, 14),
            direction,
            r.lag,
            r.optimal_lag,
            r.test_statistic,
            r.p_value,
            r.stationarity_policy.to_string(),
            if r.significant { "*" } else { "" }
        ));
    }
    output
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('~')).collect()
    }
}

/// Surfaces an engine precondition error for a single explicitly requested pair.
pub fn require_results(outcome: &AnalysisOutcome) -> Result<()> {
    if outcome.results.is_empty() {
        if let Some(f) = outcome.failures.iter().find(|f| f.stage == Stage::Analyze) {
            bail!("No causality results produced: {}: {}", f.record_id, f.reason);
        }
        bail!("No causality results produced");
    }
    Ok(())
}

/// Alignment window from the configured imputation bound and optional date limits.
pub fn align_window(
    config: &AnalysisConfig,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> AlignWindow {
    AlignWindow {
        start,
        end,
        imputation_window_days: config.imputation_window_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, Weekday};
    use fedspeak_core::{LagSelectionMode, StationarityPolicy};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const SHOCK_DAY: usize = 80;
    const MOVE_GAP_DAY: usize = 50;

    fn weekdays(n: usize) -> Vec<NaiveDate> {
        let mut date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut days = Vec::with_capacity(n);
        while days.len() < n {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(date);
            }
            date += Duration::days(1);
        }
        days
    }

    fn index_row(date: NaiveDate, value: f64, model: &str) -> DailySentimentIndex {
        DailySentimentIndex {
            date,
            value,
            n_documents: 1,
            n_sentences: 3,
            model_name: model.to_string(),
        }
    }

    /// "lexicon" covers every day and drives TNX; "sparse" covers 15 days.
    fn inputs() -> (Vec<DailySentimentIndex>, Vec<MarketObservation>) {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let days = weekdays(120);
        let mut index = Vec::new();
        let mut market = Vec::new();
        let mut previous = 0.0;

        for (i, &date) in days.iter().enumerate() {
            let value = f64::from(rng.gen_range(-3..=3)) / 3.0;
            index.push(index_row(date, value, "lexicon"));
            if i < 15 {
                index.push(index_row(date, value, "sparse"));
            }

            let shock = if i == SHOCK_DAY { 5.0 } else { 0.0 };
            let tnx = 4.0 + 0.8 * previous + 0.3 * rng.gen_range(-1.0..1.0) + shock;
            market.push(MarketObservation::new(date, "TNX", tnx));
            if i != MOVE_GAP_DAY {
                market.push(MarketObservation::new(date, "MOVE", 100.0 + 5.0 * rng.gen_range(-1.0..1.0)));
            }
            previous = value;
        }
        (index, market)
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            stationarity_policy: StationarityPolicy::Raw,
            lag_selection_mode: LagSelectionMode::Criterion,
            max_lag: 3,
            ..AnalysisConfig::default()
        }
    }

    fn series() -> Vec<String> {
        vec!["TNX".to_string(), "MOVE".to_string()]
    }

    #[test]
    fn test_analyze_keeps_passing_pairs_and_ledgers_the_rest() {
        let (index, market) = inputs();
        let outcome = analyze(&config(), &index, &market, &series(), AlignWindow::default());

        // Both models are aligned, only one has enough rows to test
        assert_eq!(outcome.aligned.len(), 2);
        assert_eq!(outcome.results.len(), 4);
        assert!(outcome
            .results
            .iter()
            .all(|r| r.predictor_series == "lexicon" || r.target_series == "lexicon"));

        let analyze_failures: Vec<&FailureRecord> = outcome
            .failures
            .iter()
            .filter(|f| f.stage == Stage::Analyze)
            .collect();
        assert_eq!(analyze_failures.len(), 2);
        assert_eq!(analyze_failures[0].record_id, "sparse -> TNX");
        assert_eq!(analyze_failures[1].record_id, "sparse -> MOVE");
        for failure in &analyze_failures {
            assert_eq!(failure.model_name.as_deref(), Some("sparse"));
            assert!(failure.reason.contains("insufficient data"));
        }

        let forward_tnx = outcome
            .results
            .iter()
            .find(|r| r.direction == TestDirection::Forward && r.target_series == "TNX")
            .unwrap();
        assert!(forward_tnx.significant);
        assert!(require_results(&outcome).is_ok());
    }

    #[test]
    fn test_market_gap_drops_the_day_for_every_series() {
        let (index, market) = inputs();
        let outcome = analyze(&config(), &index, &market, &series(), AlignWindow::default());
        let gap_date = weekdays(120)[MOVE_GAP_DAY];

        let lexicon = &outcome.aligned[0];
        assert_eq!(lexicon.sentiment_model, "lexicon");
        assert_eq!(lexicon.len(), 119);
        assert!(!lexicon.dates().contains(&gap_date));

        let drops: Vec<&FailureRecord> = outcome
            .failures
            .iter()
            .filter(|f| f.stage == Stage::Align)
            .collect();
        assert_eq!(drops.len(), 1);
        assert_eq!(drops[0].record_id, gap_date.format("%Y-%m-%d").to_string());
        assert_eq!(drops[0].model_name.as_deref(), Some("lexicon"));
        assert_eq!(drops[0].reason, "missing market value");
    }

    #[test]
    fn test_outliers_use_forward_optimal_lag() {
        let (index, market) = inputs();
        let outcome = analyze(&config(), &index, &market, &series(), AlignWindow::default());
        let shock_date = weekdays(120)[SHOCK_DAY];

        for target in ["TNX", "MOVE"] {
            let lag = outcome
                .results
                .iter()
                .find(|r| r.direction == TestDirection::Forward && r.target_series == target)
                .map(|r| r.optimal_lag)
                .unwrap();
            assert!(outcome
                .outliers
                .iter()
                .filter(|o| o.target_series == target)
                .all(|o| o.lag == lag && o.model_name == "lexicon" && o.predictor_series == "lexicon"));
        }

        let tnx_top = outcome
            .outliers
            .iter()
            .find(|o| o.target_series == "TNX" && o.rank == 1)
            .unwrap();
        assert_eq!(tnx_top.date, shock_date);
        assert!(tnx_top.z_score > 2.0);
    }

    #[test]
    fn test_no_tested_pair_is_an_error() {
        let (index, market) = inputs();
        let sparse: Vec<DailySentimentIndex> = index
            .into_iter()
            .filter(|row| row.model_name == "sparse")
            .collect();
        let outcome = analyze(&config(), &sparse, &market, &series(), AlignWindow::default());

        assert!(outcome.results.is_empty());
        let err = require_results(&outcome).unwrap_err().to_string();
        assert!(err.contains("sparse -> TNX"));
        assert!(err.contains("insufficient data"));

        assert!(require_results(&AnalysisOutcome::default()).is_err());
    }

    #[test]
    fn test_select_market_series() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let tnx_only = vec![MarketObservation::new(date, "TNX", 4.1)];
        assert_eq!(select_market_series(&config(), &tnx_only).unwrap(), vec!["TNX"]);

        let unrelated = vec![MarketObservation::new(date, "VIX", 14.0)];
        let err = select_market_series(&config(), &unrelated).unwrap_err();
        assert!(err.to_string().contains("VIX"));
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("TEXT").unwrap(), OutputFormat::Text);
        assert_eq!(OutputFormat::parse("json").unwrap(), OutputFormat::Json);
        assert!(OutputFormat::parse("xml").is_err());
    }
}

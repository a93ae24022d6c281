//! Backend evaluation against human-labeled sentences.

use std::collections::BTreeMap;

use fedspeak_core::{SentimentBackend, SentimentLabel};
use fedspeak_data::LabeledSentence;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub label: SentimentLabel,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Gold sentences of this class that received a score.
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub n_total: usize,
    pub n_scored: usize,
    /// Sentences the backend failed on; excluded from every metric.
    pub n_missing: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub classes: Vec<ClassMetrics>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub model_name: String,
    pub overall: EvaluationSummary,
    pub by_source: BTreeMap<String, EvaluationSummary>,
}

/// Scores every labeled sentence with `backend` and compares against the gold label.
pub async fn evaluate(
    labeled: &[LabeledSentence],
    backend: &dyn SentimentBackend,
) -> EvaluationReport {
    let mut pairs = Vec::with_capacity(labeled.len());
    for (row, sentence) in labeled.iter().enumerate() {
        let predicted = match backend.score(&sentence.text).await {
            Ok(c) => Some(c.label),
            Err(e) => {
                warn!(backend = backend.name(), row, error = %e, "Gold sentence not scored");
                None
            }
        };
        pairs.push((sentence.source.clone(), sentence.label, predicted));
    }

    let overall_pairs: Vec<_> = pairs.iter().map(|(_, g, p)| (*g, *p)).collect();
    let mut grouped: BTreeMap<String, Vec<(SentimentLabel, Option<SentimentLabel>)>> =
        BTreeMap::new();
    for (source, gold, predicted) in &pairs {
        grouped
            .entry(source.trim().to_lowercase())
            .or_default()
            .push((*gold, *predicted));
    }

    let report = EvaluationReport {
        model_name: backend.name().to_string(),
        overall: summarize(&overall_pairs),
        by_source: grouped
            .into_iter()
            .map(|(source, p)| (source, summarize(&p)))
            .collect(),
    };
    info!(
        backend = %report.model_name,
        accuracy = report.overall.accuracy,
        missing = report.overall.n_missing,
        "Evaluation complete"
    );
    report
}

/// Accuracy and per-class precision/recall/F1 over scored pairs.
#[must_use]
pub fn summarize(pairs: &[(SentimentLabel, Option<SentimentLabel>)]) -> EvaluationSummary {
    let scored: Vec<(SentimentLabel, SentimentLabel)> = pairs
        .iter()
        .filter_map(|(gold, predicted)| predicted.map(|p| (*gold, p)))
        .collect();
    let n_scored = scored.len();
    let correct = scored.iter().filter(|(g, p)| g == p).count();

    let classes: Vec<ClassMetrics> = SentimentLabel::ALL
        .iter()
        .map(|&label| {
            let tp = scored.iter().filter(|(g, p)| *g == label && *p == label).count();
            let predicted = scored.iter().filter(|(_, p)| *p == label).count();
            let support = scored.iter().filter(|(g, _)| *g == label).count();
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let macro_f1 = classes.iter().map(|c| c.f1).sum::<f64>() / classes.len() as f64;

    EvaluationSummary {
        n_total: pairs.len(),
        n_scored,
        n_missing: pairs.len() - n_scored,
        accuracy: ratio(correct, n_scored),
        macro_f1,
        classes,
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

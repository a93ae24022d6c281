//! Score Aggregator: sentence scores to document labels and daily indices.
//!
//! Every model is aggregated separately. Grouping uses ordered maps so the
//! output depends only on the input scores.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;
use fedspeak_core::{IndexMethod, SentimentLabel};
use fedspeak_data::{DailySentimentIndex, Document, DocumentSentiment, SentimentScore};
use tracing::{debug, warn};

/// Model name given to the explicit cross-model average.
pub const ENSEMBLE_MODEL: &str = "ensemble";

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator {
    method: IndexMethod,
}

impl ScoreAggregator {
    #[must_use]
    pub fn new(method: IndexMethod) -> Self {
        Self { method }
    }

    #[must_use]
    pub fn method(&self) -> IndexMethod {
        self.method
    }

    /// Document-level label per (document, model).
    ///
    /// Output is ordered by model name, then document id.
    #[must_use]
    pub fn document_sentiment(&self, scores: &[SentimentScore]) -> Vec<DocumentSentiment> {
        let mut groups: BTreeMap<(&str, &str), Vec<&SentimentScore>> = BTreeMap::new();
        for score in scores {
            groups
                .entry((score.model_name.as_str(), score.document_id.as_str()))
                .or_default()
                .push(score);
        }

        groups
            .into_iter()
            .map(|((model, doc_id), group)| {
                let (label, confidence) = majority_label(&group);
                DocumentSentiment {
                    document_id: doc_id.to_string(),
                    model_name: model.to_string(),
                    label,
                    confidence,
                    n_sentences: group.len(),
                }
            })
            .collect()
    }

    /// One index value per (date, model), dated by each score's document.
    ///
    /// Scores whose document is not in `documents` are ignored.
    #[must_use]
    pub fn daily_index(
        &self,
        documents: &[Arc<Document>],
        scores: &[SentimentScore],
    ) -> Vec<DailySentimentIndex> {
        let dates: HashMap<&str, NaiveDate> =
            documents.iter().map(|d| (d.id.as_str(), d.date)).collect();

        let mut groups: BTreeMap<(NaiveDate, &str), (Vec<&SentimentScore>, BTreeSet<&str>)> =
            BTreeMap::new();
        for score in scores {
            let Some(&date) = dates.get(score.document_id.as_str()) else {
                warn!(document_id = %score.document_id, "Score references unknown document");
                continue;
            };
            let (group, docs) = groups
                .entry((date, score.model_name.as_str()))
                .or_default();
            group.push(score);
            docs.insert(score.document_id.as_str());
        }

        let index: Vec<DailySentimentIndex> = groups
            .into_iter()
            .map(|((date, model), (group, docs))| DailySentimentIndex {
                date,
                value: self.index_value(&group),
                n_documents: docs.len(),
                n_sentences: group.len(),
                model_name: model.to_string(),
            })
            .collect();

        debug!(rows = index.len(), method = ?self.method, "Built daily sentiment index");
        index
    }

    fn index_value(&self, group: &[&SentimentScore]) -> f64 {
        if group.is_empty() {
            return 0.0;
        }
        let n = group.len() as f64;
        let value = match self.method {
            IndexMethod::ConfidenceWeighted => {
                group.iter().map(|s| s.weighted_polarity()).sum::<f64>() / n
            }
            IndexMethod::NetCount => group.iter().map(|s| s.label.polarity()).sum::<f64>() / n,
        };
        value.clamp(-1.0, 1.0)
    }
}

/// Majority label with confidence tie-break; a remaining tie is `Neutral`.
///
/// Returns the label and the mean confidence of the scores carrying it
/// (0.0 when no score carries it).
#[must_use]
pub fn majority_label(scores: &[&SentimentScore]) -> (SentimentLabel, f64) {
    let tally = |label: SentimentLabel| {
        scores
            .iter()
            .filter(|s| s.label == label)
            .fold((0usize, 0.0f64), |(n, c), s| (n + 1, c + s.confidence))
    };

    let mut best: Option<(SentimentLabel, usize, f64)> = None;
    let mut tied = false;
    for label in SentimentLabel::ALL {
        let (count, total) = tally(label);
        match best {
            None => best = Some((label, count, total)),
            Some((_, best_count, best_total)) => {
                let better = count > best_count
                    || (count == best_count && total > best_total + f64::EPSILON);
                let same = count == best_count && (total - best_total).abs() <= f64::EPSILON;
                if better {
                    best = Some((label, count, total));
                    tied = false;
                } else if same {
                    tied = true;
                }
            }
        }
    }

    let label = match best {
        Some((label, count, _)) if count > 0 && !tied => label,
        _ => SentimentLabel::Neutral,
    };
    let (count, total) = tally(label);
    let confidence = if count == 0 { 0.0 } else { total / count as f64 };
    (label, confidence)
}

/// Cross-model mean per date, named [`ENSEMBLE_MODEL`].
///
/// Only the listed models contribute (all models when `models` is empty);
/// a date is included when at least one of them has a value. Never applied
/// unless requested.
#[must_use]
pub fn ensemble(index: &[DailySentimentIndex], models: &[String]) -> Vec<DailySentimentIndex> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&DailySentimentIndex>> = BTreeMap::new();
    for row in index {
        if row.model_name == ENSEMBLE_MODEL {
            continue;
        }
        if models.is_empty() || models.iter().any(|m| m == &row.model_name) {
            by_date.entry(row.date).or_default().push(row);
        }
    }

    by_date
        .into_iter()
        .map(|(date, rows)| DailySentimentIndex {
            date,
            value: rows.iter().map(|r| r.value).sum::<f64>() / rows.len() as f64,
            n_documents: rows.iter().map(|r| r.n_documents).max().unwrap_or(0),
            n_sentences: rows.iter().map(|r| r.n_sentences).sum(),
            model_name: ENSEMBLE_MODEL.to_string(),
        })
        .collect()
}

/// Distinct model names in an index, sorted.
#[must_use]
pub fn model_names(index: &[DailySentimentIndex]) -> Vec<String> {
    index
        .iter()
        .map(|r| r.model_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedspeak_data::DocumentSource;

    fn score(doc: &str, idx: usize, model: &str, label: SentimentLabel, conf: f64) -> SentimentScore {
        SentimentScore {
            document_id: doc.to_string(),
            sentence_index: Some(idx),
            model_name: model.to_string(),
            label,
            confidence: conf,
        }
    }

    fn doc(id: &str, day: u32) -> Arc<Document> {
        Arc::new(Document {
            id: id.to_string(),
            source: DocumentSource::Speech,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            time: None,
            raw_text: String::new(),
            sentences: vec![],
            sections: vec![],
        })
    }

    #[test]
    fn daily_polarity_is_confidence_weighted_mean() {
        let scores = vec![
            score("a", 0, "m", SentimentLabel::Positive, 0.9),
            score("a", 1, "m", SentimentLabel::Negative, 0.4),
            score("a", 2, "m", SentimentLabel::Neutral, 0.5),
        ];
        let index = ScoreAggregator::default().daily_index(&[doc("a", 7)], &scores);
        assert_eq!(index.len(), 1);
        assert!((index[0].value - 0.1667).abs() < 1e-4);
        assert_eq!(index[0].n_sentences, 3);
        assert_eq!(index[0].n_documents, 1);
    }

    #[test]
    fn net_count_ignores_confidence() {
        let scores = vec![
            score("a", 0, "m", SentimentLabel::Positive, 0.9),
            score("a", 1, "m", SentimentLabel::Positive, 0.2),
            score("a", 2, "m", SentimentLabel::Negative, 0.4),
            score("a", 3, "m", SentimentLabel::Neutral, 0.5),
        ];
        let index = ScoreAggregator::new(IndexMethod::NetCount).daily_index(&[doc("a", 7)], &scores);
        assert!((index[0].value - 0.25).abs() < 1e-12);
    }

    #[test]
    fn documents_on_same_day_pool_sentences() {
        let scores = vec![
            score("a", 0, "m", SentimentLabel::Positive, 1.0),
            score("b", 0, "m", SentimentLabel::Negative, 0.5),
            score("b", 1, "m", SentimentLabel::Negative, 0.5),
            score("c", 0, "m", SentimentLabel::Positive, 0.8),
        ];
        let docs = [doc("a", 7), doc("b", 7), doc("c", 8)];
        let index = ScoreAggregator::default().daily_index(&docs, &scores);
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].n_documents, 2);
        assert_eq!(index[0].n_sentences, 3);
        assert!((index[0].value - 0.0).abs() < 1e-12);
        assert!((index[1].value - 0.8).abs() < 1e-12);
    }

    #[test]
    fn models_are_kept_separate() {
        let scores = vec![
            score("a", 0, "lexicon", SentimentLabel::Positive, 1.0),
            score("a", 0, "finbert", SentimentLabel::Negative, 0.6),
        ];
        let index = ScoreAggregator::default().daily_index(&[doc("a", 7)], &scores);
        let models: Vec<&str> = index.iter().map(|r| r.model_name.as_str()).collect();
        assert_eq!(models, vec!["finbert", "lexicon"]);
        assert!((index[0].value + 0.6).abs() < 1e-12);
        assert!((index[1].value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn surviving_backend_unaffected_by_failed_one() {
        let docs = [doc("a", 7), doc("b", 8)];
        let survivor = vec![
            score("a", 0, "lexicon", SentimentLabel::Positive, 0.7),
            score("b", 0, "lexicon", SentimentLabel::Negative, 0.3),
        ];
        // finbert failed on document b entirely
        let mut combined = survivor.clone();
        combined.push(score("a", 0, "finbert", SentimentLabel::Negative, 0.9));

        let agg = ScoreAggregator::default();
        let alone = agg.daily_index(&docs, &survivor);
        let with_partial: Vec<_> = agg
            .daily_index(&docs, &combined)
            .into_iter()
            .filter(|r| r.model_name == "lexicon")
            .collect();
        assert_eq!(alone, with_partial);
        assert_eq!(alone.len(), 2);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let scores = vec![
            score("b", 0, "m", SentimentLabel::Negative, 0.5),
            score("a", 0, "m", SentimentLabel::Positive, 0.9),
        ];
        let mut reversed = scores.clone();
        reversed.reverse();
        let docs = [doc("a", 7), doc("b", 9)];
        let agg = ScoreAggregator::default();
        assert_eq!(agg.daily_index(&docs, &scores), agg.daily_index(&docs, &reversed));
    }

    #[test]
    fn majority_with_confidence_tie_break() {
        let s = [
            score("a", 0, "m", SentimentLabel::Positive, 0.9),
            score("a", 1, "m", SentimentLabel::Negative, 0.6),
            score("a", 2, "m", SentimentLabel::Negative, 0.5),
        ];
        let refs: Vec<&SentimentScore> = s.iter().collect();
        let (label, conf) = majority_label(&refs);
        assert_eq!(label, SentimentLabel::Negative);
        assert!((conf - 0.55).abs() < 1e-12);

        // one each: highest total confidence wins
        let (label, _) = majority_label(&refs[..2]);
        assert_eq!(label, SentimentLabel::Positive);
    }

    #[test]
    fn full_tie_defaults_to_neutral() {
        let s = [
            score("a", 0, "m", SentimentLabel::Positive, 0.5),
            score("a", 1, "m", SentimentLabel::Negative, 0.5),
        ];
        let refs: Vec<&SentimentScore> = s.iter().collect();
        let (label, conf) = majority_label(&refs);
        assert_eq!(label, SentimentLabel::Neutral);
        assert_eq!(conf, 0.0);
        assert_eq!(majority_label(&[]).0, SentimentLabel::Neutral);
    }

    #[test]
    fn document_sentiment_per_model() {
        let scores = vec![
            score("a", 0, "m", SentimentLabel::Positive, 0.9),
            score("a", 1, "m", SentimentLabel::Positive, 0.7),
            score("a", 0, "n", SentimentLabel::Negative, 0.8),
        ];
        let docs = ScoreAggregator::default().document_sentiment(&scores);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].model_name, "m");
        assert_eq!(docs[0].label, SentimentLabel::Positive);
        assert!((docs[0].confidence - 0.8).abs() < 1e-12);
        assert_eq!(docs[0].n_sentences, 2);
    }

    #[test]
    fn ensemble_averages_available_models() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        let row = |day, model: &str, value| DailySentimentIndex {
            date: d(day),
            value,
            n_documents: 1,
            n_sentences: 2,
            model_name: model.to_string(),
        };
        let index = vec![row(7, "a", 0.4), row(7, "b", -0.2), row(8, "a", 0.5), row(8, "c", 0.9)];
        let models = vec!["a".to_string(), "b".to_string()];
        let out = ensemble(&index, &models);
        assert_eq!(out.len(), 2);
        assert!((out[0].value - 0.1).abs() < 1e-12);
        assert!((out[1].value - 0.5).abs() < 1e-12);
        assert!(out.iter().all(|r| r.model_name == ENSEMBLE_MODEL));
        assert_eq!(model_names(&index), vec!["a", "b", "c"]);
    }
}

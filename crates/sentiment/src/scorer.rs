//! Concurrent Sentiment Scorer.
//!
//! One task per (document, backend) pair, bounded by a semaphore. A
//! document is the minimal retry unit: a task scores every sentence of its
//! document with one backend. Failed sentences are recorded as missing and
//! never replaced by a default label.

use std::sync::Arc;

use fedspeak_core::{PipelineError, SentimentBackend};
use fedspeak_data::{Document, FailureRecord, SentimentScore, Stage};
use futures_util::future::join_all;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::registry::BackendRegistry;

/// Scores and failures of one scoring run.
#[derive(Debug, Default)]
pub struct ScoringRun {
    /// Ordered by backend name, then document order, then sentence index.
    pub scores: Vec<SentimentScore>,
    pub failures: Vec<FailureRecord>,
    /// Backends that failed their health check and produced no scores.
    pub unavailable: Vec<String>,
}

impl ScoringRun {
    /// Scores produced by one backend.
    pub fn scores_for<'a>(&'a self, model_name: &'a str) -> impl Iterator<Item = &'a SentimentScore> {
        self.scores.iter().filter(move |s| s.model_name == model_name)
    }
}

#[derive(Default)]
struct TaskOutput {
    scores: Vec<SentimentScore>,
    failures: Vec<FailureRecord>,
}

pub struct SentimentScorer {
    registry: BackendRegistry,
    max_concurrency: usize,
    cancel: Option<watch::Receiver<bool>>,
}

impl SentimentScorer {
    #[must_use]
    pub fn new(registry: BackendRegistry, max_concurrency: usize) -> Self {
        Self {
            registry,
            max_concurrency: max_concurrency.max(1),
            cancel: None,
        }
    }

    /// Aborts runs once `true` is sent on the channel.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Scores one sentence of `document` with the named backend.
    ///
    /// # Errors
    /// Returns `BackendUnavailable` if the backend is unknown or fails, and
    /// `MalformedInput` if the sentence index is out of range.
    pub async fn score(
        &self,
        document: &Document,
        sentence_index: usize,
        model_name: &str,
    ) -> Result<SentimentScore, PipelineError> {
        let backend = self
            .registry
            .get(model_name)
            .ok_or_else(|| PipelineError::BackendUnavailable {
                backend: model_name.to_string(),
                reason: "not registered".to_string(),
            })?;
        let sentence = document.sentences.get(sentence_index).ok_or_else(|| {
            PipelineError::malformed(
                sentence_id(&document.id, sentence_index),
                "sentence index out of range",
            )
        })?;

        let classification = backend
            .score(sentence)
            .await
            .map_err(|e| e.into_pipeline(model_name))?;
        Ok(SentimentScore::from_classification(
            document.id.clone(),
            Some(sentence_index),
            model_name,
            classification,
        ))
    }

    /// Scores every sentence of every document with every registered backend.
    ///
    /// Backends failing their health check are skipped and every document
    /// gets a failure record for them. Per-sentence errors are isolated.
    ///
    /// # Errors
    /// Returns `Cancelled` if the cancellation flag was raised; no partial
    /// results are returned.
    pub async fn score_documents(
        &self,
        documents: &[Arc<Document>],
    ) -> Result<ScoringRun, PipelineError> {
        let mut run = ScoringRun::default();
        let mut available: Vec<(String, Arc<dyn SentimentBackend>)> = Vec::new();

        for (name, backend) in self.registry.iter() {
            match backend.health_check().await {
                Ok(()) => available.push((name.to_string(), Arc::clone(backend))),
                Err(e) => {
                    let err = e.into_pipeline(name);
                    warn!(backend = %name, error = %err, "Backend unavailable, scores recorded as missing");
                    run.unavailable.push(name.to_string());
                    run.failures.extend(documents.iter().map(|doc| {
                        FailureRecord::new(Stage::Score, doc.id.clone(), err.to_string())
                            .with_model(name)
                    }));
                }
            }
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut handles = Vec::with_capacity(available.len() * documents.len());
        for (name, backend) in &available {
            for doc in documents {
                let semaphore = Arc::clone(&semaphore);
                let backend = Arc::clone(backend);
                let doc = Arc::clone(doc);
                let name = name.clone();
                let cancel = self.cancel.clone();
                handles.push(tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return TaskOutput::default();
                    };
                    score_document(&name, backend.as_ref(), &doc, cancel.as_ref()).await
                }));
            }
        }

        let task_keys: Vec<(String, String)> = available
            .iter()
            .flat_map(|(name, _)| documents.iter().map(move |d| (name.clone(), d.id.clone())))
            .collect();

        for (result, (name, doc_id)) in join_all(handles).await.into_iter().zip(task_keys) {
            match result {
                Ok(output) => {
                    run.scores.extend(output.scores);
                    run.failures.extend(output.failures);
                }
                Err(e) => {
                    warn!(backend = %name, document_id = %doc_id, error = %e, "Scoring task aborted");
                    run.failures.push(
                        FailureRecord::new(Stage::Score, doc_id, format!("task failed: {e}"))
                            .with_model(name),
                    );
                }
            }
        }

        if self.is_cancelled() {
            info!("Scoring run cancelled, discarding partial results");
            return Err(PipelineError::Cancelled);
        }

        info!(
            documents = documents.len(),
            backends = available.len(),
            scores = run.scores.len(),
            failures = run.failures.len(),
            "Scoring complete"
        );
        Ok(run)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

async fn score_document(
    name: &str,
    backend: &dyn SentimentBackend,
    doc: &Document,
    cancel: Option<&watch::Receiver<bool>>,
) -> TaskOutput {
    let mut output = TaskOutput::default();
    for (index, sentence) in doc.sentences.iter().enumerate() {
        if cancel.is_some_and(|rx| *rx.borrow()) {
            return TaskOutput::default();
        }
        match backend.score(sentence).await {
            Ok(classification) => output.scores.push(SentimentScore::from_classification(
                doc.id.clone(),
                Some(index),
                name,
                classification,
            )),
            Err(e) => {
                debug!(backend = %name, document_id = %doc.id, index, error = %e, "Sentence score missing");
                output.failures.push(
                    FailureRecord::new(Stage::Score, sentence_id(&doc.id, index), e.to_string())
                        .with_model(name),
                );
            }
        }
    }
    output
}

fn sentence_id(document_id: &str, index: usize) -> String {
    format!("{document_id}#{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LexiconBackend;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use fedspeak_core::{BackendError, Classification, SentimentLabel};
    use fedspeak_data::DocumentSource;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails on sentences containing a marker word.
    struct FlakyBackend {
        name: String,
        marker: &'static str,
    }

    #[async_trait]
    impl SentimentBackend for FlakyBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn score(&self, text: &str) -> Result<Classification, BackendError> {
            if text.contains(self.marker) {
                return Err(BackendError::Request("timeout".to_string()));
            }
            Classification::new(SentimentLabel::Positive, 0.9)
        }
    }

    /// Down for health checks; counts score calls.
    struct DownBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SentimentBackend for DownBackend {
        fn name(&self) -> &str {
            "down"
        }

        async fn score(&self, _text: &str) -> Result<Classification, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Classification::new(SentimentLabel::Neutral, 1.0)
        }

        async fn health_check(&self) -> Result<(), BackendError> {
            Err(BackendError::Unavailable("connection refused".to_string()))
        }
    }

    fn doc(id: &str, sentences: &[&str]) -> Arc<Document> {
        Arc::new(Document {
            id: id.to_string(),
            source: DocumentSource::Speech,
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            time: None,
            raw_text: sentences.join(" "),
            sentences: sentences.iter().map(|s| (*s).to_string()).collect(),
            sections: vec![],
        })
    }

    fn lexicon_registry() -> BackendRegistry {
        let mut registry = BackendRegistry::new();
        registry.register(Arc::new(LexiconBackend::new("lexicon")));
        registry
    }

    fn flaky(marker: &'static str) -> Arc<FlakyBackend> {
        Arc::new(FlakyBackend {
            name: "flaky".to_string(),
            marker,
        })
    }

    #[tokio::test]
    async fn scores_every_sentence_per_backend() {
        let mut registry = lexicon_registry();
        registry.register(flaky("never"));
        let scorer = SentimentScorer::new(registry, 2);
        let docs = vec![
            doc("a", &["Growth is strong.", "Inflation is high."]),
            doc("b", &["Risks are balanced."]),
        ];
        let run = scorer.score_documents(&docs).await.unwrap();
        assert_eq!(run.scores.len(), 6);
        assert!(run.failures.is_empty());
        assert_eq!(run.scores_for("lexicon").count(), 3);
        // flaky sorts before lexicon
        assert_eq!(run.scores[0].model_name, "flaky");
        assert_eq!(run.scores[0].document_id, "a");
        assert_eq!(run.scores[1].sentence_index, Some(1));
    }

    #[tokio::test]
    async fn failed_sentences_are_missing_not_neutral() {
        let mut registry = lexicon_registry();
        registry.register(flaky("Inflation"));
        let scorer = SentimentScorer::new(registry, 4);
        let docs = vec![doc("a", &["Growth is strong.", "Inflation is high."])];
        let run = scorer.score_documents(&docs).await.unwrap();

        let flaky: Vec<_> = run.scores_for("flaky").collect();
        assert_eq!(flaky.len(), 1);
        assert_eq!(flaky[0].sentence_index, Some(0));
        assert_eq!(run.scores_for("lexicon").count(), 2);

        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.failures[0].record_id, "a#1");
        assert_eq!(run.failures[0].model_name.as_deref(), Some("flaky"));
    }

    #[tokio::test]
    async fn unhealthy_backend_is_skipped() {
        let down = Arc::new(DownBackend {
            calls: AtomicUsize::new(0),
        });
        let mut registry = lexicon_registry();
        registry.register(down.clone());
        let scorer = SentimentScorer::new(registry, 2);
        let docs = vec![doc("a", &["Growth is strong."]), doc("b", &["Rates are high."])];
        let run = scorer.score_documents(&docs).await.unwrap();

        assert_eq!(run.unavailable, vec!["down"]);
        assert_eq!(down.calls.load(Ordering::SeqCst), 0);
        assert_eq!(run.scores_for("down").count(), 0);
        assert_eq!(run.scores_for("lexicon").count(), 2);
        assert_eq!(run.failures.len(), 2);
        assert!(run.failures.iter().all(|f| f.stage == Stage::Score));
    }

    #[tokio::test]
    async fn cancelled_run_returns_no_results() {
        let (tx, rx) = watch::channel(false);
        let scorer = SentimentScorer::new(lexicon_registry(), 1)
            .with_cancellation(rx);
        tx.send(true).unwrap();
        let docs = vec![doc("a", &["Growth is strong."])];
        assert_eq!(
            scorer.score_documents(&docs).await.unwrap_err(),
            PipelineError::Cancelled
        );
    }

    #[tokio::test]
    async fn single_sentence_score() {
        let scorer = SentimentScorer::new(lexicon_registry(), 1);
        let d = doc("a", &["Growth is strong and solid."]);
        let score = scorer.score(&d, 0, "lexicon").await.unwrap();
        assert_eq!(score.label, SentimentLabel::Positive);
        assert_eq!(score.sentence_index, Some(0));

        assert!(matches!(
            scorer.score(&d, 0, "finbert").await,
            Err(PipelineError::BackendUnavailable { .. })
        ));
        assert!(matches!(
            scorer.score(&d, 5, "lexicon").await,
            Err(PipelineError::MalformedInput { .. })
        ));
    }
}

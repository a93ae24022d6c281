//! Document Store: validates raw records into immutable [`Document`]s.
//!
//! Identity is a SHA-256 digest over source, normalized timestamp and raw
//! text, so re-ingesting the same record returns the stored document.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use fedspeak_core::{IngestionConfig, PipelineError};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::csv_storage::CsvRows;
use crate::models::{Document, DocumentSource, FailureRecord, RawDocument, SectionSpan, Stage};
use crate::text::{extract_sections, SentenceSplitter, SpeakerFilter};

/// Outcome of ingesting a batch of raw records.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents in input order, duplicates collapsed.
    pub documents: Vec<Arc<Document>>,
    pub failures: Vec<FailureRecord>,
    pub duplicates: usize,
}

pub struct DocumentStore {
    splitter: SentenceSplitter,
    speaker_filter: Option<SpeakerFilter>,
    documents: HashMap<String, Arc<Document>>,
    order: Vec<String>,
}

impl DocumentStore {
    /// Creates an empty store using the ingestion settings.
    ///
    /// # Errors
    /// Returns `InvalidConfig` if the speaker filter cannot be built.
    pub fn new(config: &IngestionConfig) -> Result<Self, PipelineError> {
        let speaker_filter = config
            .press_conference_speaker
            .as_deref()
            .map(SpeakerFilter::new)
            .transpose()
            .map_err(|e| PipelineError::InvalidConfig(format!("speaker filter: {e}")))?;

        Ok(Self {
            splitter: SentenceSplitter::new(config.min_sentence_words),
            speaker_filter,
            documents: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Validates and stores one raw record.
    ///
    /// Ingesting an identical record again returns the existing document.
    ///
    /// # Errors
    /// Returns `MalformedInput` if the source or timestamp is missing or
    /// unparseable, or the text is empty.
    pub fn ingest(&mut self, raw: &RawDocument) -> Result<Arc<Document>, PipelineError> {
        let record = describe(raw);

        let source_tag = non_empty(raw.source.as_deref())
            .ok_or_else(|| PipelineError::malformed(&record, "missing source"))?;
        let source = DocumentSource::parse(source_tag).ok_or_else(|| {
            PipelineError::malformed(&record, format!("unknown source '{source_tag}'"))
        })?;

        let timestamp = non_empty(raw.timestamp.as_deref())
            .ok_or_else(|| PipelineError::malformed(&record, "missing timestamp"))?;
        let (date, time) = parse_timestamp(timestamp).ok_or_else(|| {
            PipelineError::malformed(&record, format!("unparseable timestamp '{timestamp}'"))
        })?;

        if raw.text.trim().is_empty() {
            return Err(PipelineError::malformed(&record, "empty text"));
        }

        let id = document_id(source, date, time, &raw.text);
        if let Some(existing) = self.documents.get(&id) {
            debug!(document_id = %id, "Duplicate document, returning stored copy");
            return Ok(Arc::clone(existing));
        }

        let (sentences, sections) = self.segment(source, &raw.text);
        if sentences.is_empty() {
            warn!(document_id = %id, %source, %date, "Document has no sentences after filtering");
        }

        let document = Arc::new(Document {
            id: id.clone(),
            source,
            date,
            time,
            raw_text: raw.text.clone(),
            sentences,
            sections,
        });

        self.documents.insert(id.clone(), Arc::clone(&document));
        self.order.push(id);
        Ok(document)
    }

    /// Ingests every record, isolating malformed ones into the failure list.
    ///
    /// Failures are identified by the record's 0-based position.
    pub fn ingest_batch(&mut self, raws: &[RawDocument]) -> IngestReport {
        self.ingest_rows(raws.iter().enumerate())
    }

    /// Ingests records read from a table, keeping the table's row numbers
    /// and its undecodable rows in the failure list.
    pub fn ingest_table(&mut self, table: &CsvRows<RawDocument>) -> IngestReport {
        let mut report = self.ingest_rows(table.rows.iter().map(|(row, raw)| (*row, raw)));
        let mut failures = table.failures.clone();
        failures.append(&mut report.failures);
        report.failures = failures;
        report
    }

    fn ingest_rows<'a>(
        &mut self,
        rows: impl IntoIterator<Item = (usize, &'a RawDocument)>,
    ) -> IngestReport {
        let mut report = IngestReport::default();
        let mut seen = std::collections::HashSet::new();

        for (row, raw) in rows {
            match self.ingest(raw) {
                Ok(doc) if !seen.insert(doc.id.clone()) => report.duplicates += 1,
                Ok(doc) if doc.sentences.is_empty() => {
                    report.failures.push(FailureRecord::new(
                        Stage::Ingest,
                        format!("row {row}"),
                        format!("document {} has no sentences after filtering", doc.id),
                    ));
                }
                Ok(doc) => report.documents.push(doc),
                Err(e) => {
                    warn!(row, error = %e, "Skipping malformed document");
                    report
                        .failures
                        .push(FailureRecord::new(Stage::Ingest, format!("row {row}"), e.to_string()));
                }
            }
        }

        info!(
            ingested = report.documents.len(),
            duplicates = report.duplicates,
            skipped = report.failures.len(),
            "Ingestion complete"
        );
        report
    }

    /// Deterministic segmentation of a document's text.
    ///
    /// Always equal to `document.sentences` for documents from this store.
    #[must_use]
    pub fn sentence_split(&self, document: &Document) -> Vec<String> {
        self.segment(document.source, &document.raw_text).0
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.documents.get(id).cloned()
    }

    /// All stored documents in first-ingestion order.
    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn segment(&self, source: DocumentSource, text: &str) -> (Vec<String>, Vec<SectionSpan>) {
        match source {
            DocumentSource::Minutes => {
                let mut sentences = Vec::new();
                let mut sections = Vec::new();
                for section in extract_sections(text) {
                    let start = sentences.len();
                    sentences.extend(self.splitter.split(&section.text));
                    if sentences.len() > start {
                        sections.push(SectionSpan {
                            name: section.name,
                            start,
                            end: sentences.len(),
                        });
                    }
                }
                (sentences, sections)
            }
            DocumentSource::PressConference => {
                let kept = match &self.speaker_filter {
                    Some(filter) => filter.apply(text),
                    None => text.to_string(),
                };
                (self.splitter.split(&kept), Vec::new())
            }
            DocumentSource::Speech => (self.splitter.split(text), Vec::new()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn describe(raw: &RawDocument) -> String {
    format!(
        "{}@{}",
        raw.source.as_deref().unwrap_or("?"),
        raw.timestamp.as_deref().unwrap_or("?")
    )
}

/// Parses `YYYY-MM-DD`, `YYYYMMDD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339.
///
/// RFC 3339 timestamps keep the calendar date as written, not UTC.
pub fn parse_timestamp(s: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some((date, None));
    }
    if s.len() == 8 {
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y%m%d") {
            return Some((date, None));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        let local = dt.naive_local();
        return Some((local.date(), Some(local.time())));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| (dt.date(), Some(dt.time())))
}

fn document_id(
    source: DocumentSource,
    date: NaiveDate,
    time: Option<NaiveTime>,
    text: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_str().as_bytes());
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    if let Some(t) = time {
        hasher.update(b"T");
        hasher.update(t.format("%H:%M:%S").to_string().as_bytes());
    }
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

//! Ingested Fed communication documents.
//!
//! A `Document` is created once by the document store and never mutated;
//! downstream stages share it behind an `Arc`.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of Fed communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    Speech,
    Minutes,
    PressConference,
}

impl DocumentSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Speech => "speech",
            Self::Minutes => "minutes",
            Self::PressConference => "press_conference",
        }
    }

    /// Parses a source tag, accepting the spellings used by the scrapers.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "speech" | "speeches" => Some(Self::Speech),
            "minutes" | "fomc_minutes" => Some(Self::Minutes),
            "press_conference" | "press_conf" | "press" | "pressconf" => {
                Some(Self::PressConference)
            }
            _ => None,
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw record as supplied by a scraper, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawDocument {
    #[serde(default)]
    pub source: Option<String>,
    /// `YYYY-MM-DD`, `YYYYMMDD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339.
    #[serde(default, alias = "date")]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl RawDocument {
    pub fn new(source: &str, timestamp: &str, text: impl Into<String>) -> Self {
        Self {
            source: Some(source.to_string()),
            timestamp: Some(timestamp.to_string()),
            text: text.into(),
        }
    }
}

/// A contiguous run of sentences belonging to one named section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpan {
    pub name: String,
    /// Index of the first sentence in the section.
    pub start: usize,
    /// One past the last sentence.
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Content-derived identifier, stable across runs.
    pub id: String,
    pub source: DocumentSource,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub raw_text: String,
    pub sentences: Vec<String>,
    pub sections: Vec<SectionSpan>,
}

impl Document {
    /// Name of the section holding sentence `index`, if sections were extracted.
    #[must_use]
    pub fn section_of(&self, index: usize) -> Option<&str> {
        self.sections
            .iter()
            .find(|s| (s.start..s.end).contains(&index))
            .map(|s| s.name.as_str())
    }

    #[must_use]
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parse_aliases() {
        assert_eq!(DocumentSource::parse("Speech"), Some(DocumentSource::Speech));
        assert_eq!(DocumentSource::parse("Minutes"), Some(DocumentSource::Minutes));
        assert_eq!(
            DocumentSource::parse("Press Conf"),
            Some(DocumentSource::PressConference)
        );
        assert_eq!(
            DocumentSource::parse("press-conference"),
            Some(DocumentSource::PressConference)
        );
        assert_eq!(DocumentSource::parse("tweet"), None);
    }

    #[test]
    fn section_lookup() {
        let doc = Document {
            id: "d".to_string(),
            source: DocumentSource::Minutes,
            date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            time: None,
            raw_text: String::new(),
            sentences: vec!["a".into(), "b".into(), "c".into()],
            sections: vec![
                SectionSpan {
                    name: "Staff Economic Outlook".to_string(),
                    start: 0,
                    end: 2,
                },
                SectionSpan {
                    name: "Committee Policy Action".to_string(),
                    start: 2,
                    end: 3,
                },
            ],
        };
        assert_eq!(doc.section_of(1), Some("Staff Economic Outlook"));
        assert_eq!(doc.section_of(2), Some("Committee Policy Action"));
        assert_eq!(doc.section_of(3), None);
    }
}

//! Press conference transcript speaker filtering.
//!
//! Transcripts mark each turn with an upper-case speaker tag such as
//! `CHAIR POWELL.` or `MICHELLE SMITH:`. Filtering keeps only the turns of
//! one speaker so reporters' questions do not contribute sentiment.

use regex::Regex;

/// At least two upper-case words followed by '.' or ':'.
const SPEAKER_TAG_PATTERN: &str = r"(?:^|\s)([A-Z][A-Z'\-]+(?:\s+[A-Z][A-Z'\-]+){1,3})[.:](?:\s|$)";

/// One speaker turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerTurn {
    pub speaker: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct SpeakerFilter {
    tag: Regex,
    speaker: String,
}

impl SpeakerFilter {
    /// Creates a filter keeping turns whose tag contains `speaker` (case-insensitive).
    ///
    /// # Errors
    /// Returns an error if the tag pattern fails to compile.
    pub fn new(speaker: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            tag: Regex::new(SPEAKER_TAG_PATTERN)?,
            speaker: speaker.trim().to_uppercase(),
        })
    }

    /// Splits a transcript into speaker turns. Text before the first tag is dropped.
    #[must_use]
    pub fn turns(&self, text: &str) -> Vec<SpeakerTurn> {
        let tags: Vec<(usize, usize, String)> = self
            .tag
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                Some((name.start(), whole.end(), name.as_str().to_string()))
            })
            .collect();

        tags.iter()
            .enumerate()
            .map(|(i, (_, content_start, speaker))| {
                let end = tags.get(i + 1).map_or(text.len(), |next| next.0);
                let content = text[(*content_start).min(end)..end].trim();
                SpeakerTurn {
                    speaker: speaker.split_whitespace().collect::<Vec<_>>().join(" "),
                    text: content.to_string(),
                }
            })
            .collect()
    }

    /// Keeps only the configured speaker's turns.
    ///
    /// A transcript without any speaker tags is returned unchanged.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let turns = self.turns(text);
        if turns.is_empty() {
            return text.to_string();
        }
        turns
            .into_iter()
            .filter(|t| t.speaker.contains(&self.speaker))
            .map(|t| t.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

//! Deterministic English sentence segmentation.
//!
//! Boundaries fall after `.`, `?` or `!` (plus any closing quotes or
//! brackets) when followed by whitespace and an upper-case letter, digit or
//! opening quote. A period ending a known abbreviation, a single-letter
//! initial, or a dotted token such as `U.S.` is not a boundary. The same
//! input always yields the same sentences, which keeps sentence indices
//! stable across runs.

/// Tokens that end in a period without ending a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "gov", "sen", "rep", "st", "jr", "sr", "vs", "etc", "inc",
    "co", "corp", "ltd", "no", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec", "fig", "approx", "est", "dept", "univ", "gen", "lt", "col", "cf", "al",
];

/// Sentences containing these phrases carry procedure rather than policy content.
const NOISE_PHRASES: &[&str] = &[
    "meeting adjourned",
    "vote against",
    "voting for this action",
    "voting against this action",
    "return to text",
];

#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    min_words: usize,
    drop_noise: bool,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self {
            min_words: 5,
            drop_noise: true,
        }
    }
}

impl SentenceSplitter {
    #[must_use]
    pub fn new(min_words: usize) -> Self {
        Self {
            min_words,
            drop_noise: true,
        }
    }

    /// Keeps administrative sentences instead of filtering them.
    #[must_use]
    pub fn keep_noise(mut self) -> Self {
        self.drop_noise = false;
        self
    }

    /// Splits `text` into cleaned sentences, applying the word-count and noise filters.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        segment(text)
            .into_iter()
            .filter(|s| s.split_whitespace().count() >= self.min_words)
            .filter(|s| !self.drop_noise || !is_noise(s))
            .collect()
    }
}

/// Collapses every whitespace run into a single space and trims the ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_noise(sentence: &str) -> bool {
    let lower = sentence.to_lowercase();
    NOISE_PHRASES.iter().any(|p| lower.contains(p))
}

/// Raw segmentation with no filtering.
#[must_use]
pub fn segment(text: &str) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    let chars: Vec<char> = normalized.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !matches!(c, '.' | '?' | '!') {
            i += 1;
            continue;
        }

        let mut end = i + 1;
        while end < chars.len() && is_trailing(chars[end]) {
            end += 1;
        }

        let boundary = if end >= chars.len() {
            true
        } else {
            chars[end] == ' '
                && chars.get(end + 1).is_some_and(|n| opens_sentence(*n))
                && !(c == '.' && ends_with_abbreviation(&chars[start..i]))
        };

        if boundary {
            push_trimmed(&mut sentences, &chars[start..end]);
            start = end;
        }
        i = end;
    }

    if start < chars.len() {
        push_trimmed(&mut sentences, &chars[start..]);
    }

    sentences
}

fn push_trimmed(out: &mut Vec<String>, chars: &[char]) {
    let sentence: String = chars.iter().collect();
    let sentence = sentence.trim();
    if !sentence.is_empty() {
        out.push(sentence.to_string());
    }
}

fn is_trailing(c: char) -> bool {
    matches!(c, '.' | '?' | '!' | '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '(' | '\u{201c}' | '\u{2018}')
}

fn ends_with_abbreviation(preceding: &[char]) -> bool {
    let token_start = preceding
        .iter()
        .rposition(|c| c.is_whitespace())
        .map_or(0, |p| p + 1);
    let token: String = preceding[token_start..]
        .iter()
        .skip_while(|c| !c.is_alphanumeric())
        .collect();

    if token.is_empty() {
        return false;
    }
    // dotted acronyms such as "U.S" or "e.g"
    if token.contains('.') {
        return true;
    }
    let mut letters = token.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_alphabetic() && first.is_uppercase() {
            return true;
        }
    }
    ABBREVIATIONS.contains(&token.to_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminal_punctuation() {
        let parts = segment("Inflation remains elevated. Will rates rise? We think so!");
        assert_eq!(
            parts,
            vec![
                "Inflation remains elevated.",
                "Will rates rise?",
                "We think so!"
            ]
        );
    }

    #[test]
    fn keeps_abbreviations_and_acronyms_together() {
        let text = "Chair Powell met Mr. Smith in the U.S. Treasury today. The meeting went well.";
        let parts = segment(text);
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("Mr. Smith"));
        assert!(parts[0].contains("U.S. Treasury"));
    }

    #[test]
    fn keeps_decimals_and_initials() {
        let parts = segment("The rate rose 0.25 percent under J. Powell. Markets rallied.");
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("0.25 percent"));
    }

    #[test]
    fn lowercase_continuation_is_not_a_boundary() {
        let parts = segment("Growth was solid, approx. three percent. Then it slowed.");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn quote_after_period_stays_with_sentence() {
        let parts = segment("He said \"policy is restrictive.\" Markets listened.");
        assert_eq!(parts[0], "He said \"policy is restrictive.\"");
        assert_eq!(parts[1], "Markets listened.");
    }

    #[test]
    fn trailing_fragment_is_kept() {
        let parts = segment("First sentence here. trailing words without period");
        assert_eq!(parts.len(), 1);
        let parts = segment("First sentence here. Trailing words without period");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn splitter_is_stable() {
        let splitter = SentenceSplitter::default();
        let text = "The Committee decided to maintain the target range. \
                    Participants noted that inflation had eased somewhat.";
        assert_eq!(splitter.split(text), splitter.split(text));
    }

    #[test]
    fn splitter_filters_short_and_noise_sentences() {
        let splitter = SentenceSplitter::new(5);
        let text = "Thank you. The labor market has remained quite tight overall. \
                    Voting for this action were all members of the Committee.";
        let parts = splitter.split(text);
        assert_eq!(parts, vec!["The labor market has remained quite tight overall."]);

        let keep = SentenceSplitter::new(5).keep_noise();
        assert_eq!(keep.split(text).len(), 2);
    }

    #[test]
    fn whitespace_is_normalized() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
    }
}

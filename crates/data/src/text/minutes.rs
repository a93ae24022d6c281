//! FOMC minutes section extraction.
//!
//! Minutes mix policy discussion with attendance lists and procedural
//! votes. Only text under recognized section headers is kept; a document
//! with no recognized header is kept whole under [`GENERAL_SECTION`].

/// Section name used when no known header is present.
pub const GENERAL_SECTION: &str = "General";

/// Canonical section names with the header variants that introduce them.
/// The first variant found in the text wins.
const SECTION_HEADERS: &[(&str, &[&str])] = &[
    (
        "Developments in Financial Markets",
        &["Developments in Financial Markets and Open Market Operations"],
    ),
    ("Inflation Analysis", &["Inflation Analysis and Forecasting"]),
    (
        "Staff Review of Economic Situation",
        &[
            "Staff Review of the Economic Situation",
            "The information reviewed for the",
        ],
    ),
    (
        "Staff Review of Financial Situation",
        &["Staff Review of the Financial Situation"],
    ),
    ("Staff Economic Outlook", &["Staff Economic Outlook"]),
    (
        "Participants' Views",
        &[
            "Participants' Views on Current Conditions and the Economic Outlook",
            "Participants' Views on Current Conditions",
            "Participants\u{2019} Views on Current Conditions",
            "Discussion of Monetary Policy",
        ],
    ),
    ("Committee Policy Action", &["Committee Policy Action"]),
];

/// A named slice of a minutes document, header removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinutesSection {
    pub name: String,
    pub text: String,
}

/// Cuts minutes text at known section headers, in document order.
#[must_use]
pub fn extract_sections(text: &str) -> Vec<MinutesSection> {
    // ASCII lowering keeps byte offsets valid in `text`.
    let lower = text.to_ascii_lowercase();

    let mut found: Vec<(usize, usize, &str)> = SECTION_HEADERS
        .iter()
        .filter_map(|(name, variants)| {
            variants.iter().find_map(|variant| {
                lower
                    .find(&variant.to_ascii_lowercase())
                    .map(|pos| (pos, variant.len(), *name))
            })
        })
        .collect();

    if found.is_empty() {
        return vec![MinutesSection {
            name: GENERAL_SECTION.to_string(),
            text: text.trim().to_string(),
        }];
    }

    found.sort_by_key(|(pos, _, _)| *pos);

    found
        .iter()
        .enumerate()
        .filter_map(|(i, (pos, header_len, name))| {
            let content_start = (pos + header_len).min(text.len());
            let end = found.get(i + 1).map_or(text.len(), |next| next.0);
            if content_start >= end {
                return None;
            }
            let content = text[content_start..end].trim();
            (!content.is_empty()).then(|| MinutesSection {
                name: (*name).to_string(),
                text: content.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_sections_in_document_order() {
        let text = "Attendance: many people. \
            Staff Review of the Economic Situation The economy expanded at a solid pace. \
            Staff Economic Outlook Growth is expected to moderate. \
            Committee Policy Action Members agreed to maintain the range.";
        let sections = extract_sections(text);
        let names: Vec<&str> = sections.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Staff Review of Economic Situation",
                "Staff Economic Outlook",
                "Committee Policy Action"
            ]
        );
        assert_eq!(sections[0].text, "The economy expanded at a solid pace.");
        assert!(!sections.iter().any(|s| s.text.contains("Attendance")));
    }

    #[test]
    fn header_match_is_case_insensitive() {
        let text = "COMMITTEE POLICY ACTION Members voted to hold rates steady.";
        let sections = extract_sections(text);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, "Committee Policy Action");
    }

    #[test]
    fn no_headers_keeps_whole_text() {
        let sections = extract_sections("  Plain text with no headers at all.  ");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].name, GENERAL_SECTION);
        assert_eq!(sections[0].text, "Plain text with no headers at all.");
    }
}

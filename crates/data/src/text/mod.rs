//! Text cleaning and segmentation used at ingestion time.

pub mod minutes;
pub mod sentences;
pub mod transcript;

pub use minutes::{extract_sections, MinutesSection, GENERAL_SECTION};
pub use sentences::{normalize_whitespace, segment, SentenceSplitter};
pub use transcript::{SpeakerFilter, SpeakerTurn};

//! Assembler
//!
//! Flattens a `FinalNarration` into the text handed to speech rendering.
//! Order comes from `SectionKey::ALL`; blank and unselected sections are
//! skipped. Pure, no I/O.

use sdk::types::{FinalNarration, SectionKey, TopicKind};
use std::collections::BTreeSet;

pub const PARAGRAPH_BREAK: &str = "\n\n";

/// Sections that survive assembly, in narration order.
pub fn segments<'a>(narration: &'a FinalNarration, topics: &BTreeSet<TopicKind>) -> Vec<&'a str> {
    SectionKey::ALL
        .into_iter()
        .filter(|section| match section {
            SectionKey::Topic(topic) => topics.contains(topic),
            SectionKey::Introduction | SectionKey::Conclusion => true,
        })
        .map(|section| narration.get(section).trim())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Introduction, selected topics in canonical order, conclusion, separated
/// by paragraph breaks.
pub fn assemble(narration: &FinalNarration, topics: &BTreeSet<TopicKind>) -> String {
    segments(narration, topics).join(PARAGRAPH_BREAK)
}

//! Synthesizer
//!
//! One synthesis call per run. The reply must decode to an object carrying
//! all six section keys. Sections for topics that were not selected, or whose
//! specialist failed, are forced to the empty string whatever the backend
//! put there. A missing key is a hard failure: specialist text is never
//! substituted for a section the backend left out.

use sdk::errors::TourError;
use sdk::types::{FinalNarration, SectionKey, SynthesisInput, TopicKind};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use super::decode::{decode_object, JsonObject};
use super::WORDS_PER_MINUTE;
use crate::capabilities::{NarrationSynthesizer, SynthesisBrief};

/// Target length of the whole narration: `duration × 150`, rounded down.
pub fn target_words(duration_minutes: f64) -> u32 {
    if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
        return 0;
    }
    (duration_minutes * f64::from(WORDS_PER_MINUTE)).floor() as u32
}

/// Specialist texts labeled `<Topic>:` in canonical order.
pub fn label_specialist_texts(input: &SynthesisInput) -> String {
    TopicKind::CANONICAL_ORDER
        .iter()
        .filter_map(|topic| input.specialist_results.get(topic))
        .map(|result| format!("{}:\n{}", result.topic.label(), result.text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_brief(input: &SynthesisInput) -> SynthesisBrief {
    let request = &input.request;
    SynthesisBrief {
        location: request.location().to_string(),
        topics: request.topics_in_order().collect(),
        duration_minutes: request.duration_minutes(),
        target_words: target_words(request.duration_minutes()),
        specialist_texts: label_specialist_texts(input),
    }
}

/// Run the synthesis call and validate its reply.
pub async fn synthesize(
    synthesizer: &dyn NarrationSynthesizer,
    input: &SynthesisInput,
    timeout: Duration,
) -> Result<FinalNarration, TourError> {
    let brief = build_brief(input);

    let raw = match tokio::time::timeout(timeout, synthesizer.synthesize_narration(&brief)).await
    {
        Ok(result) => result?,
        Err(_) => {
            return Err(TourError::Backend(format!(
                "synthesis timed out after {}s",
                timeout.as_secs()
            )))
        }
    };

    parse_narration(&raw, input)
}

/// Decode a synthesis reply into a complete `FinalNarration`.
pub fn parse_narration(raw: &str, input: &SynthesisInput) -> Result<FinalNarration, TourError> {
    let object = decode_object(raw).map_err(|e| TourError::SynthesisParse(e.to_string()))?;

    for section in SectionKey::ALL {
        if !object.contains_key(section.key()) {
            return Err(TourError::SynthesisParse(format!(
                "missing key '{}'",
                section.key()
            )));
        }
    }

    let introduction = read_text(&object, SectionKey::Introduction)?;
    let conclusion = read_text(&object, SectionKey::Conclusion)?;

    let mut sections = BTreeMap::new();
    for topic in TopicKind::CANONICAL_ORDER {
        let keep = input.request.is_selected(topic) && input.specialist_results.contains_key(&topic);
        let text = if keep {
            read_text(&object, SectionKey::Topic(topic))?
        } else {
            if has_content(&object, topic) {
                tracing::debug!("Discarding synthesized text for {}", topic);
            }
            String::new()
        };
        sections.insert(topic, text);
    }

    Ok(FinalNarration::from_parts(introduction, sections, conclusion))
}

fn read_text(object: &JsonObject, section: SectionKey) -> Result<String, TourError> {
    match object.get(section.key()) {
        Some(Value::String(text)) => Ok(text.trim().to_string()),
        Some(Value::Null) => Ok(String::new()),
        Some(other) => Err(TourError::SynthesisParse(format!(
            "'{}' must be a string, found {}",
            section.key(),
            other
        ))),
        None => Err(TourError::SynthesisParse(format!(
            "missing key '{}'",
            section.key()
        ))),
    }
}

fn has_content(object: &JsonObject, topic: TopicKind) -> bool {
    match object.get(topic.key()) {
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}

//! Capability contracts consumed by the tour engine
//!
//! The engine never talks to a generation backend directly. It calls these
//! three traits, each an opaque async capability with a defined input and
//! output. `LlmCapabilities` implements all of them over an `LLMProvider`;
//! tests substitute fakes.

use async_trait::async_trait;
use sdk::errors::TourError;
use sdk::types::TopicKind;
use serde::Serialize;

pub mod llm;

pub use llm::LlmCapabilities;

/// Produces the narration text for one topic.
#[async_trait]
pub trait SectionGenerator: Send + Sync {
    /// Generate roughly `word_budget` words about `topic` at `location`.
    ///
    /// `context_topics` lists every topic selected for the run so the
    /// generator can avoid straying into a sibling's material. The budget is
    /// a hint; callers do not enforce the returned length.
    async fn generate_section(
        &self,
        topic: TopicKind,
        location: &str,
        context_topics: &[TopicKind],
        word_budget: u32,
    ) -> Result<String, TourError>;
}

/// Estimates how a tour's minutes should be spread across its sections.
#[async_trait]
pub trait AllocationEstimator: Send + Sync {
    /// Return the raw reply: a JSON object keyed by section, possibly wrapped.
    async fn estimate_allocation(
        &self,
        location: &str,
        topics: &[TopicKind],
        duration_minutes: f64,
    ) -> Result<String, TourError>;
}

/// Merges specialist texts into one structured narration.
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    /// Return the raw reply: a JSON object with the six section keys,
    /// possibly wrapped.
    async fn synthesize_narration(&self, brief: &SynthesisBrief) -> Result<String, TourError>;
}

/// Everything the synthesis capability is given for one run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisBrief {
    pub location: String,
    /// Selected topics in canonical order
    pub topics: Vec<TopicKind>,
    pub duration_minutes: f64,
    /// Target length of the whole narration
    pub target_words: u32,
    /// Available specialist texts, each labeled `<Topic>:`, canonical order
    pub specialist_texts: String,
}

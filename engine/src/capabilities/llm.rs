//! LLM-backed capabilities
//!
//! Implements every capability trait over one shared `LLMProvider`. The
//! provider is injected at construction, so concurrent runs with different
//! backends never share client state.

use async_trait::async_trait;
use sdk::errors::TourError;
use sdk::types::TopicKind;
use std::sync::Arc;

use super::{AllocationEstimator, NarrationSynthesizer, SectionGenerator, SynthesisBrief};
use crate::config::TourConfig;
use crate::llm::{LLMProvider, Message};

/// Slack above the word budget that specialists may use.
pub const WORD_BAND_SLACK: u32 = 20;

const SPOKEN_RULES: &str = "The text is read aloud by a speech engine, so write plain \
conversational sentences. No headings, lists, markdown, links or citations. Stay within \
the word range you are given.";

const PLANNER_SYSTEM: &str = "You plan self-guided audio tours. Given a location, the \
listener's chosen topics and a total duration in minutes, decide how many minutes each \
section gets. Reserve 1 to 2 minutes for the introduction and 1 minute for the conclusion, \
then spread the rest across the chosen topics according to how much the location has to \
offer for each. Unchosen topics get 0.\n\n\
Reply with a single JSON object and nothing else. It must have exactly these numeric keys: \
introduction, architecture, history, culture, culinary, conclusion.\n\
Example: {\"introduction\": 1.5, \"architecture\": 3, \"history\": 4, \"culture\": 0, \
\"culinary\": 0, \"conclusion\": 1}";

const SYNTHESIS_SYSTEM: &str = "You assemble self-guided audio tours from material written \
by topic specialists. Write a warm introduction that welcomes the listener to the location \
and previews what the tour covers. Keep each specialist's material and voice, presented in \
this order: Architecture, History, Culture, Culinary. Add short natural transitions between \
sections and avoid repeating yourself. Close with a brief conclusion that recalls the \
highlights and invites the listener to keep exploring.\n\n\
Reply with a single JSON object and nothing else. It must have exactly these string keys: \
introduction, architecture, history, culture, culinary, conclusion. Use an empty string for \
any topic that was not selected.";

/// Capability implementation backed by a text-generation provider.
pub struct LlmCapabilities {
    provider: Arc<dyn LLMProvider>,
    planner_max_tokens: u32,
    specialist_max_tokens: u32,
    synthesis_max_tokens: u32,
}

impl LlmCapabilities {
    pub fn new(provider: Arc<dyn LLMProvider>, limits: &TourConfig) -> Self {
        Self {
            provider,
            planner_max_tokens: limits.planner_max_tokens,
            specialist_max_tokens: limits.specialist_max_tokens,
            synthesis_max_tokens: limits.synthesis_max_tokens,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }
}

/// Voice and focus for one topic's specialist.
fn specialist_system_prompt(topic: TopicKind) -> String {
    let brief = match topic {
        TopicKind::Architecture => {
            "You are the architecture guide. Describe styles, notable buildings, street \
             layout and design details, balancing technical insight with accessible \
             explanation. Point out the striking structures a visitor might walk past \
             without noticing. Use a detailed, descriptive voice."
        }
        TopicKind::History => {
            "You are the history guide. Tell the accurate story of the place through its \
             landmarks, events and people, favouring lesser-known anecdotes over textbook \
             summaries. Use an authoritative, professorial voice that still feels alive."
        }
        TopicKind::Culture => {
            "You are the culture guide. Explain local traditions, customs, arts, music and \
             everyday life, and why they matter to the people who live here. Use a warm, \
             respectful voice."
        }
        TopicKind::Culinary => {
            "You are the food guide. Cover local specialties, markets, dishes and the \
             stories behind them, with practical suggestions where they help. Use an \
             enthusiastic, vivid voice."
        }
    };
    format!("{}\n\n{}", brief, SPOKEN_RULES)
}

fn join_labels(topics: &[TopicKind]) -> String {
    topics
        .iter()
        .map(|t| t.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn specialist_user_prompt(
    topic: TopicKind,
    location: &str,
    context_topics: &[TopicKind],
    word_budget: u32,
) -> String {
    format!(
        "Location: {}\nTour topics: {}\nWord range: {} - {}\n\n\
         Write the {} segment of an audio tour of this location. Aim for about {} words.",
        location,
        join_labels(context_topics),
        word_budget,
        word_budget.saturating_add(WORD_BAND_SLACK),
        topic.key(),
        word_budget
    )
}

fn planner_user_prompt(location: &str, topics: &[TopicKind], duration_minutes: f64) -> String {
    format!(
        "Location: {}\nTopics: {}\nDuration: {} minutes\n\nReturn the time allocation as JSON.",
        location,
        join_labels(topics),
        duration_minutes
    )
}

fn synthesis_user_prompt(brief: &SynthesisBrief) -> String {
    format!(
        "Location: {}\nSelected topics: {}\nTour duration (minutes): {}\nTarget word count: {}\n\n\
         Specialist material:\n{}\n\n\
         Write it as a friendly guide walking beside the visitor, using phrases such as \
         \"as we walk\" or \"notice how\". Cover only the selected topics.",
        brief.location,
        join_labels(&brief.topics),
        brief.duration_minutes,
        brief.target_words,
        brief.specialist_texts
    )
}

#[async_trait]
impl SectionGenerator for LlmCapabilities {
    async fn generate_section(
        &self,
        topic: TopicKind,
        location: &str,
        context_topics: &[TopicKind],
        word_budget: u32,
    ) -> Result<String, TourError> {
        let messages = [
            Message::system(specialist_system_prompt(topic)),
            Message::user(specialist_user_prompt(
                topic,
                location,
                context_topics,
                word_budget,
            )),
        ];

        let text = self
            .provider
            .generate(&messages, self.specialist_max_tokens)
            .await?;

        let text = text.trim();
        if text.is_empty() {
            return Err(TourError::Backend(format!(
                "{} returned no text for {}",
                self.provider.name(),
                topic
            )));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl AllocationEstimator for LlmCapabilities {
    async fn estimate_allocation(
        &self,
        location: &str,
        topics: &[TopicKind],
        duration_minutes: f64,
    ) -> Result<String, TourError> {
        let messages = [
            Message::system(PLANNER_SYSTEM),
            Message::user(planner_user_prompt(location, topics, duration_minutes)),
        ];

        Ok(self
            .provider
            .generate(&messages, self.planner_max_tokens)
            .await?)
    }
}

#[async_trait]
impl NarrationSynthesizer for LlmCapabilities {
    async fn synthesize_narration(&self, brief: &SynthesisBrief) -> Result<String, TourError> {
        let messages = [
            Message::system(SYNTHESIS_SYSTEM),
            Message::user(synthesis_user_prompt(brief)),
        ];

        Ok(self
            .provider
            .generate(&messages, self.synthesis_max_tokens)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LLMError, MessageRole};
    use std::sync::Mutex;

    /// Provider that records every request and replies with a fixed string.
    struct RecordingProvider {
        reply: std::result::Result<String, ()>,
        seen: Mutex<Vec<(Vec<Message>, u32)>>,
    }

    impl RecordingProvider {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: Err(()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LLMProvider for RecordingProvider {
        fn name(&self) -> &str {
            "recording"
        }

        fn is_local(&self) -> bool {
            true
        }

        async fn generate(
            &self,
            messages: &[Message],
            max_tokens: u32,
        ) -> crate::llm::Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((messages.to_vec(), max_tokens));
            self.reply.clone().map_err(|_| LLMError::RateLimitExceeded)
        }
    }

    fn capabilities(provider: &Arc<RecordingProvider>) -> LlmCapabilities {
        let provider: Arc<dyn LLMProvider> = Arc::clone(provider) as Arc<dyn LLMProvider>;
        LlmCapabilities::new(provider, &TourConfig::default())
    }

    #[tokio::test]
    async fn test_specialist_prompt_carries_word_band() {
        let provider = RecordingProvider::replying("  The Golden Pavilion glows.  ");
        let caps = capabilities(&provider);

        let text = caps
            .generate_section(
                TopicKind::Architecture,
                "Kyoto",
                &[TopicKind::Architecture, TopicKind::History],
                375,
            )
            .await
            .unwrap();
        assert_eq!(text, "The Golden Pavilion glows.");

        let seen = provider.seen.lock().unwrap();
        let (messages, max_tokens) = &seen[0];
        assert_eq!(*max_tokens, 2048);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("architecture guide"));
        assert!(messages[1].content.contains("Word range: 375 - 395"));
        assert!(messages[1].content.contains("Architecture, History"));
        assert!(messages[1].content.contains("Location: Kyoto"));
    }

    #[tokio::test]
    async fn test_blank_specialist_reply_is_backend_error() {
        let provider = RecordingProvider::replying("   ");
        let caps = capabilities(&provider);

        let err = caps
            .generate_section(TopicKind::Culinary, "Lyon", &[TopicKind::Culinary], 150)
            .await
            .unwrap_err();
        assert!(matches!(err, TourError::Backend(_)));
    }

    #[tokio::test]
    async fn test_provider_error_becomes_backend_error() {
        let provider = RecordingProvider::failing();
        let caps = capabilities(&provider);

        let err = caps
            .estimate_allocation("Lyon", &[TopicKind::Culinary], 5.0)
            .await
            .unwrap_err();
        assert!(matches!(err, TourError::Backend(ref m) if m.contains("Rate limit")));
    }

    #[tokio::test]
    async fn test_synthesis_uses_synthesis_token_limit() {
        let provider = RecordingProvider::replying("{}");
        let caps = capabilities(&provider);
        let brief = SynthesisBrief {
            location: "Kyoto".to_string(),
            topics: vec![TopicKind::History],
            duration_minutes: 10.0,
            target_words: 1500,
            specialist_texts: "History:\nFounded in 794.".to_string(),
        };

        let raw = caps.synthesize_narration(&brief).await.unwrap();
        assert_eq!(raw, "{}");

        let seen = provider.seen.lock().unwrap();
        let (messages, max_tokens) = &seen[0];
        assert_eq!(*max_tokens, 4096);
        assert!(messages[1].content.contains("Target word count: 1500"));
        assert!(messages[1].content.contains("History:\nFounded in 794."));
    }
}

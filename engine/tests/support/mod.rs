//! Fake capabilities shared by the pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sdk::errors::TourError;
use sdk::types::TopicKind;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tour_engine::capabilities::{
    AllocationEstimator, NarrationSynthesizer, SectionGenerator, SynthesisBrief,
};
use tour_engine::config::TourConfig;
use tour_engine::tour::{Capabilities, TourEngine};

pub const KYOTO_PLAN: &str = r#"{"introduction": 1.5, "architecture": 3.5, "history": 4, "culture": 0, "culinary": 0, "conclusion": 1}"#;

/// Synthesis reply with text for every key, selected or not.
pub fn full_synthesis_reply() -> String {
    serde_json::json!({
        "introduction": "Welcome to the tour.",
        "architecture": "Look up at the wooden eaves.",
        "history": "This city was the capital for a millennium.",
        "culture": "Tea is served with quiet ceremony.",
        "culinary": "Try the tofu cuisine nearby.",
        "conclusion": "Thank you for walking with me."
    })
    .to_string()
}

/// What a fake specialist does for one topic.
#[derive(Clone)]
pub enum SpecialistBehaviour {
    Reply(String),
    Fail(String),
    /// Sleep, then reply
    Slow(Duration),
}

/// Scriptable implementation of all three capabilities.
pub struct FakeCapabilities {
    pub plan_reply: Mutex<Result<String, String>>,
    pub synthesis_reply: Mutex<Result<String, String>>,
    pub synthesis_delay: Mutex<Option<Duration>>,
    pub specialists: Mutex<BTreeMap<TopicKind, SpecialistBehaviour>>,
    pub estimate_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub synthesis_calls: AtomicUsize,
    /// Topics whose generation finished (not dropped)
    pub completed: Mutex<BTreeSet<TopicKind>>,
    pub word_budgets: Mutex<Vec<(TopicKind, u32)>>,
    pub briefs: Mutex<Vec<SynthesisBrief>>,
}

impl Default for FakeCapabilities {
    fn default() -> Self {
        Self {
            plan_reply: Mutex::new(Ok(KYOTO_PLAN.to_string())),
            synthesis_reply: Mutex::new(Ok(full_synthesis_reply())),
            synthesis_delay: Mutex::new(None),
            specialists: Mutex::new(BTreeMap::new()),
            estimate_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            synthesis_calls: AtomicUsize::new(0),
            completed: Mutex::new(BTreeSet::new()),
            word_budgets: Mutex::new(Vec::new()),
            briefs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeCapabilities {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_specialist(self: Arc<Self>, topic: TopicKind, behaviour: SpecialistBehaviour) -> Arc<Self> {
        self.specialists.lock().unwrap().insert(topic, behaviour);
        self
    }

    pub fn with_synthesis_reply(self: Arc<Self>, reply: impl Into<String>) -> Arc<Self> {
        *self.synthesis_reply.lock().unwrap() = Ok(reply.into());
        self
    }

    pub fn with_slow_synthesis(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        *self.synthesis_delay.lock().unwrap() = Some(delay);
        self
    }

    pub fn with_plan_reply(self: Arc<Self>, reply: impl Into<String>) -> Arc<Self> {
        *self.plan_reply.lock().unwrap() = Ok(reply.into());
        self
    }

    pub fn synthesis_calls(&self) -> usize {
        self.synthesis_calls.load(Ordering::SeqCst)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SectionGenerator for FakeCapabilities {
    async fn generate_section(
        &self,
        topic: TopicKind,
        location: &str,
        _context_topics: &[TopicKind],
        word_budget: u32,
    ) -> Result<String, TourError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.word_budgets.lock().unwrap().push((topic, word_budget));

        let behaviour = self.specialists.lock().unwrap().get(&topic).cloned();
        let text = match behaviour {
            Some(SpecialistBehaviour::Reply(text)) => text,
            Some(SpecialistBehaviour::Fail(reason)) => return Err(TourError::Backend(reason)),
            Some(SpecialistBehaviour::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                format!("{} material for {}", topic.label(), location)
            }
            None => format!("{} material for {}", topic.label(), location),
        };

        self.completed.lock().unwrap().insert(topic);
        Ok(text)
    }
}

#[async_trait]
impl AllocationEstimator for FakeCapabilities {
    async fn estimate_allocation(
        &self,
        _location: &str,
        _topics: &[TopicKind],
        _duration_minutes: f64,
    ) -> Result<String, TourError> {
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.plan_reply
            .lock()
            .unwrap()
            .clone()
            .map_err(TourError::Backend)
    }
}

#[async_trait]
impl NarrationSynthesizer for FakeCapabilities {
    async fn synthesize_narration(&self, brief: &SynthesisBrief) -> Result<String, TourError> {
        self.synthesis_calls.fetch_add(1, Ordering::SeqCst);
        self.briefs.lock().unwrap().push(brief.clone());
        let delay = *self.synthesis_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.synthesis_reply
            .lock()
            .unwrap()
            .clone()
            .map_err(TourError::Backend)
    }
}

pub fn engine(caps: &Arc<FakeCapabilities>) -> TourEngine {
    TourEngine::new(Capabilities::shared(Arc::clone(caps)), TourConfig::default())
}

pub fn engine_with_settings(caps: &Arc<FakeCapabilities>, settings: TourConfig) -> TourEngine {
    TourEngine::new(Capabilities::shared(Arc::clone(caps)), settings)
}

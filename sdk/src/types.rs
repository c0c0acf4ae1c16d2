//! Tour domain types
//!
//! Requests, section keys, budgets and narration values exchanged between the
//! stages of a run. Every value here is created fresh per run and never shared
//! between runs.

use crate::errors::TourError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Topic a specialist can cover.
///
/// `CANONICAL_ORDER` is the single source of truth for assembly order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    Architecture,
    History,
    Culture,
    Culinary,
}

impl TopicKind {
    /// Order in which topic sections appear in the final narration.
    pub const CANONICAL_ORDER: [TopicKind; 4] = [
        TopicKind::Architecture,
        TopicKind::History,
        TopicKind::Culture,
        TopicKind::Culinary,
    ];

    /// Key used in structured payloads (`"architecture"`, ...)
    pub fn key(self) -> &'static str {
        match self {
            TopicKind::Architecture => "architecture",
            TopicKind::History => "history",
            TopicKind::Culture => "culture",
            TopicKind::Culinary => "culinary",
        }
    }

    /// Human-facing name (`"Architecture"`, ...)
    pub fn label(self) -> &'static str {
        match self {
            TopicKind::Architecture => "Architecture",
            TopicKind::History => "History",
            TopicKind::Culture => "Culture",
            TopicKind::Culinary => "Culinary",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TopicKind {
    type Err = TourError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TopicKind::CANONICAL_ORDER
            .into_iter()
            .find(|t| t.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                TourError::InvalidRequest(format!(
                    "Unknown topic '{}'. Must be one of: architecture, history, culture, culinary",
                    wanted
                ))
            })
    }
}

/// One of the six sections of a narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKey {
    Introduction,
    Topic(TopicKind),
    Conclusion,
}

impl SectionKey {
    /// All six sections, introduction first, topics in canonical order, conclusion last.
    pub const ALL: [SectionKey; 6] = [
        SectionKey::Introduction,
        SectionKey::Topic(TopicKind::Architecture),
        SectionKey::Topic(TopicKind::History),
        SectionKey::Topic(TopicKind::Culture),
        SectionKey::Topic(TopicKind::Culinary),
        SectionKey::Conclusion,
    ];

    /// Key used in structured payloads
    pub fn key(self) -> &'static str {
        match self {
            SectionKey::Introduction => "introduction",
            SectionKey::Topic(topic) => topic.key(),
            SectionKey::Conclusion => "conclusion",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A validated tour request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TourRequest {
    location: String,
    topics: BTreeSet<TopicKind>,
    duration_minutes: f64,
}

impl TourRequest {
    /// Build a request, rejecting an empty location, an empty topic set or a
    /// non-positive duration with `TourError::InvalidRequest`.
    pub fn new(
        location: impl Into<String>,
        topics: impl IntoIterator<Item = TopicKind>,
        duration_minutes: f64,
    ) -> Result<Self, TourError> {
        let location = location.into().trim().to_string();
        if location.is_empty() {
            return Err(TourError::InvalidRequest(
                "location must not be empty".to_string(),
            ));
        }

        let topics: BTreeSet<TopicKind> = topics.into_iter().collect();
        if topics.is_empty() {
            return Err(TourError::InvalidRequest(
                "at least one topic must be selected".to_string(),
            ));
        }

        if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
            return Err(TourError::InvalidRequest(format!(
                "duration must be a positive number of minutes, got {}",
                duration_minutes
            )));
        }

        Ok(Self {
            location,
            topics,
            duration_minutes,
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn topics(&self) -> &BTreeSet<TopicKind> {
        &self.topics
    }

    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    pub fn is_selected(&self, topic: TopicKind) -> bool {
        self.topics.contains(&topic)
    }

    /// Selected topics, walked in canonical order.
    pub fn topics_in_order(&self) -> impl Iterator<Item = TopicKind> + '_ {
        TopicKind::CANONICAL_ORDER
            .into_iter()
            .filter(move |t| self.topics.contains(t))
    }
}

/// Advisory time allocation (minutes) per section.
///
/// Produced once by the planner and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBudget {
    pub introduction: f64,
    pub topics: BTreeMap<TopicKind, f64>,
    pub conclusion: f64,
}

impl SectionBudget {
    /// Allocation for one section. Topics absent from the map count as zero.
    pub fn get(&self, section: SectionKey) -> f64 {
        match section {
            SectionKey::Introduction => self.introduction,
            SectionKey::Topic(topic) => self.topics.get(&topic).copied().unwrap_or(0.0),
            SectionKey::Conclusion => self.conclusion,
        }
    }

    /// Sum of all six allocations.
    pub fn total(&self) -> f64 {
        SectionKey::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Output of one successful specialist dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistResult {
    pub topic: TopicKind,
    pub text: String,
}

/// Why a topic produced no specialist result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFailure {
    pub topic: TopicKind,
    pub reason: String,
}

impl TopicFailure {
    pub fn new(topic: TopicKind, reason: impl Into<String>) -> Self {
        Self {
            topic,
            reason: reason.into(),
        }
    }
}

/// Material handed to the synthesizer, built by the dispatcher.
#[derive(Debug, Clone)]
pub struct SynthesisInput {
    pub request: TourRequest,
    pub specialist_results: BTreeMap<TopicKind, SpecialistResult>,
}

/// Structured narration with every section present.
///
/// Topics that were not selected (or not generated) hold an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalNarration {
    introduction: String,
    sections: BTreeMap<TopicKind, String>,
    conclusion: String,
}

impl FinalNarration {
    /// Build a narration, filling any topic missing from `sections` with an
    /// empty string so every key of the enumeration is present.
    pub fn from_parts(
        introduction: impl Into<String>,
        mut sections: BTreeMap<TopicKind, String>,
        conclusion: impl Into<String>,
    ) -> Self {
        for topic in TopicKind::CANONICAL_ORDER {
            sections.entry(topic).or_default();
        }
        Self {
            introduction: introduction.into(),
            sections,
            conclusion: conclusion.into(),
        }
    }

    pub fn introduction(&self) -> &str {
        &self.introduction
    }

    pub fn conclusion(&self) -> &str {
        &self.conclusion
    }

    pub fn section(&self, topic: TopicKind) -> &str {
        self.sections.get(&topic).map(String::as_str).unwrap_or("")
    }

    pub fn get(&self, key: SectionKey) -> &str {
        match key {
            SectionKey::Introduction => self.introduction(),
            SectionKey::Topic(topic) => self.section(topic),
            SectionKey::Conclusion => self.conclusion(),
        }
    }
}

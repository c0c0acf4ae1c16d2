//! Specialist Dispatcher
//!
//! Fans out one generation call per selected topic, all in flight at once,
//! and joins on every one of them before returning. A topic that errors or
//! times out is recorded as a failure and left out of the results; its
//! siblings are unaffected. Results are merged in a single pass after the
//! join, so no task writes shared state.

use futures::future::join_all;
use sdk::errors::TourError;
use sdk::types::{SpecialistResult, TopicFailure, TopicKind, TourRequest};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::progress::ProgressReporter;
use super::WORDS_PER_MINUTE;
use crate::capabilities::SectionGenerator;

/// Even per-topic word budget: `duration × 150 / topics`, rounded down.
pub fn word_budget(duration_minutes: f64, topic_count: usize) -> u32 {
    if topic_count == 0 || !duration_minutes.is_finite() || duration_minutes <= 0.0 {
        return 0;
    }
    let total = (duration_minutes * f64::from(WORDS_PER_MINUTE)).floor();
    (total / topic_count as f64).floor() as u32
}

/// Joined outcome of a dispatch with at least one success.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub results: BTreeMap<TopicKind, SpecialistResult>,
    pub failures: Vec<TopicFailure>,
    pub word_budget: u32,
}

fn start_message(topic: TopicKind) -> &'static str {
    match topic {
        TopicKind::Architecture => "Exploring architectural landmarks...",
        TopicKind::History => "Researching historical highlights...",
        TopicKind::Culture => "Gathering cultural highlights...",
        TopicKind::Culinary => "Discovering local flavors...",
    }
}

/// Generate every selected topic concurrently.
///
/// Fails with `TourError::AllSpecialistsFailed` when no topic succeeds.
/// Dropping the returned future drops every in-flight call with it.
pub async fn dispatch(
    generator: &dyn SectionGenerator,
    request: &TourRequest,
    timeout: Duration,
    reporter: &dyn ProgressReporter,
) -> Result<DispatchOutcome, TourError> {
    let topics: Vec<TopicKind> = request.topics_in_order().collect();
    let budget = word_budget(request.duration_minutes(), topics.len());

    tracing::info!(
        "Dispatching {} specialists at {} words each",
        topics.len(),
        budget
    );

    let tasks = topics.iter().map(|&topic| {
        let context = topics.as_slice();
        async move {
            reporter.notify(topic.label(), start_message(topic), false);
            let started = Instant::now();

            let outcome = match tokio::time::timeout(
                timeout,
                generator.generate_section(topic, request.location(), context, budget),
            )
            .await
            {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {}s", timeout.as_secs())),
            };

            match &outcome {
                Ok(text) => {
                    tracing::debug!(
                        "{} specialist returned {} words in {:.1}s",
                        topic,
                        text.split_whitespace().count(),
                        started.elapsed().as_secs_f64()
                    );
                    reporter.notify(topic.label(), &format!("Completed {}", topic.key()), true);
                }
                Err(reason) => {
                    reporter.notify(topic.label(), &format!("Failed: {}", reason), true);
                }
            }

            (topic, outcome)
        }
    });

    let settled = join_all(tasks).await;

    let mut results = BTreeMap::new();
    let mut failures = Vec::new();
    for (topic, outcome) in settled {
        match outcome {
            Ok(text) => {
                results.insert(topic, SpecialistResult { topic, text });
            }
            Err(reason) => {
                tracing::warn!("{} specialist failed: {}", topic, reason);
                failures.push(TopicFailure::new(topic, reason));
            }
        }
    }

    if results.is_empty() {
        return Err(TourError::AllSpecialistsFailed { failures });
    }

    Ok(DispatchOutcome {
        results,
        failures,
        word_budget: budget,
    })
}

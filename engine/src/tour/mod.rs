//! Tour orchestration
//!
//! `TourEngine` drives one run through Planning, Dispatching, Synthesizing and
//! Assembling. Capabilities and settings are injected at construction, so
//! several engines (or several runs on one engine) never share mutable
//! state.
//!
//! # Cancellation
//!
//! Every stage races the caller's `CancellationToken`. When the token fires,
//! the stage future is dropped, which drops any in-flight capability calls,
//! and the run returns `TourError::Cancelled` with no partial narration.

use sdk::errors::TourError;
use sdk::types::{
    FinalNarration, SectionBudget, SynthesisInput, TopicFailure, TopicKind, TourRequest,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

pub mod assembler;
pub mod decode;
pub mod dispatcher;
pub mod planner;
pub mod progress;
pub mod state;
pub mod synthesizer;

pub use progress::{
    ChannelReporter, ConsoleReporter, NoopReporter, ProgressEvent, ProgressReporter,
    TracingReporter,
};
pub use state::{RunState, RunStateMachine};

use crate::capabilities::{AllocationEstimator, NarrationSynthesizer, SectionGenerator};
use crate::config::TourConfig;
use progress::{STAGE_FINAL, STAGE_PLANNER, STAGE_START, STAGE_SYNTHESIS};

/// Speaking rate used to turn minutes into words.
pub const WORDS_PER_MINUTE: u32 = 150;

/// The three capabilities a run depends on.
#[derive(Clone)]
pub struct Capabilities {
    pub generator: Arc<dyn SectionGenerator>,
    pub estimator: Arc<dyn AllocationEstimator>,
    pub synthesizer: Arc<dyn NarrationSynthesizer>,
}

impl Capabilities {
    /// Use one implementation for all three capabilities.
    pub fn shared<C>(caps: Arc<C>) -> Self
    where
        C: SectionGenerator + AllocationEstimator + NarrationSynthesizer + 'static,
    {
        Self {
            generator: Arc::clone(&caps) as Arc<dyn SectionGenerator>,
            estimator: Arc::clone(&caps) as Arc<dyn AllocationEstimator>,
            synthesizer: caps,
        }
    }
}

/// What happened to one topic during a run.
///
/// Keeps a failed topic distinguishable from one that was never selected,
/// even though both render as absent text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SectionStatus {
    NotSelected,
    Generated,
    Failed(String),
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct TourOutcome {
    pub run_id: Uuid,
    /// Assembled narration ready for speech rendering
    pub narration_text: String,
    pub narration: FinalNarration,
    /// Advisory plan from the planner
    pub budget: SectionBudget,
    /// Words requested from each specialist
    pub word_budget: u32,
    pub sections: BTreeMap<TopicKind, SectionStatus>,
    /// Every state the run entered, ending in `Done`
    pub transitions: Vec<RunState>,
    pub elapsed_ms: u128,
}

impl TourOutcome {
    pub fn failed_topics(&self) -> impl Iterator<Item = (TopicKind, &str)> + '_ {
        self.sections.iter().filter_map(|(topic, status)| match status {
            SectionStatus::Failed(reason) => Some((*topic, reason.as_str())),
            _ => None,
        })
    }
}

/// Orchestrates tour runs.
pub struct TourEngine {
    caps: Capabilities,
    settings: TourConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl TourEngine {
    /// Engine reporting progress through `tracing`.
    pub fn new(caps: Capabilities, settings: TourConfig) -> Self {
        Self {
            caps,
            settings,
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn settings(&self) -> &TourConfig {
        &self.settings
    }

    /// Run the Budget Planner alone.
    pub async fn plan(&self, request: &TourRequest) -> Result<SectionBudget, TourError> {
        planner::plan_budget(
            self.caps.estimator.as_ref(),
            request,
            self.settings.planner_timeout(),
        )
        .await
    }

    /// Perform one full run for `request`.
    pub async fn run(
        &self,
        request: &TourRequest,
        cancel: &CancellationToken,
    ) -> Result<TourOutcome, TourError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("tour_run", %run_id, location = %request.location());

        async move {
            let started = Instant::now();
            let mut machine = RunStateMachine::new();

            tracing::info!(
                "Starting tour: {} topic(s), {} minutes",
                request.topics().len(),
                request.duration_minutes()
            );

            match self.drive(&mut machine, request, cancel).await {
                Ok(stages) => {
                    let elapsed = started.elapsed();
                    tracing::info!(
                        "Tour ready: {} words in {:.1}s",
                        stages.narration_text.split_whitespace().count(),
                        elapsed.as_secs_f64()
                    );
                    Ok(TourOutcome {
                        run_id,
                        narration_text: stages.narration_text,
                        narration: stages.narration,
                        budget: stages.budget,
                        word_budget: stages.word_budget,
                        sections: stages.sections,
                        transitions: machine.into_history(),
                        elapsed_ms: elapsed.as_millis(),
                    })
                }
                Err(e) => {
                    let terminal = if e.is_cancelled() {
                        machine.cancel()
                    } else {
                        machine.fail(e.to_string())
                    };
                    if let Err(te) = terminal {
                        tracing::error!("Could not record run end: {}", te);
                    }

                    if e.is_cancelled() {
                        tracing::info!("Tour cancelled during {}", stage_of(&machine));
                    } else {
                        tracing::error!("Tour failed during {}: {}", stage_of(&machine), e);
                    }
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &self,
        machine: &mut RunStateMachine,
        request: &TourRequest,
        cancel: &CancellationToken,
    ) -> Result<CompletedStages, TourError> {
        if cancel.is_cancelled() {
            return Err(TourError::Cancelled);
        }
        self.reporter
            .notify(STAGE_START, "Starting tour research...", true);

        // Planning
        self.reporter
            .notify(STAGE_PLANNER, "Planning your personalized tour...", false);
        let budget = until_cancelled(cancel, self.plan(request)).await?;
        self.reporter
            .notify(STAGE_PLANNER, "Completed planning", true);
        enter_next(machine);

        // Dispatching
        let dispatched = until_cancelled(
            cancel,
            dispatcher::dispatch(
                self.caps.generator.as_ref(),
                request,
                self.settings.specialist_timeout(),
                self.reporter.as_ref(),
            ),
        )
        .await?;
        enter_next(machine);

        // Synthesizing
        let input = SynthesisInput {
            request: request.clone(),
            specialist_results: dispatched.results,
        };
        self.reporter
            .notify(STAGE_SYNTHESIS, "Creating your personalized tour...", false);
        let narration = until_cancelled(
            cancel,
            synthesizer::synthesize(
                self.caps.synthesizer.as_ref(),
                &input,
                self.settings.synthesis_timeout(),
            ),
        )
        .await?;
        self.reporter
            .notify(STAGE_SYNTHESIS, "Completed narration", true);
        enter_next(machine);

        // Assembling
        if cancel.is_cancelled() {
            return Err(TourError::Cancelled);
        }
        let narration_text = assembler::assemble(&narration, request.topics());
        enter_next(machine);
        self.reporter.notify(STAGE_FINAL, "", true);

        Ok(CompletedStages {
            narration_text,
            narration,
            budget,
            word_budget: dispatched.word_budget,
            sections: section_statuses(&input, &dispatched.failures),
        })
    }
}

struct CompletedStages {
    narration_text: String,
    narration: FinalNarration,
    budget: SectionBudget,
    word_budget: u32,
    sections: BTreeMap<TopicKind, SectionStatus>,
}

fn section_statuses(
    input: &SynthesisInput,
    failures: &[TopicFailure],
) -> BTreeMap<TopicKind, SectionStatus> {
    TopicKind::CANONICAL_ORDER
        .into_iter()
        .map(|topic| {
            let status = if !input.request.is_selected(topic) {
                SectionStatus::NotSelected
            } else if input.specialist_results.contains_key(&topic) {
                SectionStatus::Generated
            } else {
                let reason = failures
                    .iter()
                    .find(|f| f.topic == topic)
                    .map(|f| f.reason.clone())
                    .unwrap_or_else(|| "no result".to_string());
                SectionStatus::Failed(reason)
            };
            (topic, status)
        })
        .collect()
}

/// Race `fut` against the cancellation token; cancellation wins ties.
async fn until_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, TourError>
where
    F: Future<Output = Result<T, TourError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TourError::Cancelled),
        result = fut => result,
    }
}

fn enter_next(machine: &mut RunStateMachine) {
    if let Err(e) = machine.advance() {
        tracing::error!("Run state out of sequence: {}", e);
    }
}

/// Last non-terminal state, i.e. the stage that was running when the run ended.
fn stage_of(machine: &RunStateMachine) -> RunState {
    machine
        .history()
        .iter()
        .rev()
        .find(|s| !s.is_terminal())
        .cloned()
        .unwrap_or(RunState::Planning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::SpecialistResult;

    #[test]
    fn test_section_statuses_distinguish_failed_from_unselected() {
        let request =
            TourRequest::new("Kyoto", [TopicKind::History, TopicKind::Architecture], 10.0)
                .unwrap();
        let mut specialist_results = BTreeMap::new();
        specialist_results.insert(
            TopicKind::Architecture,
            SpecialistResult {
                topic: TopicKind::Architecture,
                text: "Temples.".to_string(),
            },
        );
        let input = SynthesisInput {
            request,
            specialist_results,
        };
        let failures = vec![TopicFailure::new(TopicKind::History, "timed out after 120s")];

        let statuses = section_statuses(&input, &failures);

        assert_eq!(statuses[&TopicKind::Architecture], SectionStatus::Generated);
        assert_eq!(
            statuses[&TopicKind::History],
            SectionStatus::Failed("timed out after 120s".to_string())
        );
        assert_eq!(statuses[&TopicKind::Culture], SectionStatus::NotSelected);
        assert_eq!(statuses[&TopicKind::Culinary], SectionStatus::NotSelected);
    }

    #[tokio::test]
    async fn test_until_cancelled_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = until_cancelled(&cancel, async { Ok::<_, TourError>(1) }).await;
        assert!(matches!(result, Err(TourError::Cancelled)));
    }

    #[test]
    fn test_stage_of_skips_terminal_state() {
        let mut machine = RunStateMachine::new();
        machine.advance().unwrap();
        machine.fail("boom").unwrap();

        assert_eq!(stage_of(&machine), RunState::Dispatching);
    }
}

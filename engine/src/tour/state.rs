//! Run state machine
//!
//! Stages advance strictly in order. `Failed` and `Cancelled` are terminal
//! and reachable from any non-terminal state. There is no resumption.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunState {
    Planning,
    Dispatching,
    Synthesizing,
    Assembling,
    Done,
    Failed(String),
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed(_) | RunState::Cancelled)
    }

    /// The stage that follows this one on the success path.
    fn successor(&self) -> Option<RunState> {
        match self {
            RunState::Planning => Some(RunState::Dispatching),
            RunState::Dispatching => Some(RunState::Synthesizing),
            RunState::Synthesizing => Some(RunState::Assembling),
            RunState::Assembling => Some(RunState::Done),
            RunState::Done | RunState::Failed(_) | RunState::Cancelled => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Planning => write!(f, "planning"),
            RunState::Dispatching => write!(f, "dispatching"),
            RunState::Synthesizing => write!(f, "synthesizing"),
            RunState::Assembling => write!(f, "assembling"),
            RunState::Done => write!(f, "done"),
            RunState::Failed(reason) => write!(f, "failed: {}", reason),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Raised when a finished run is asked to move again.
#[derive(Debug, thiserror::Error)]
#[error("run already finished ({from})")]
pub struct TransitionError {
    pub from: RunState,
}

/// Tracks the current state of one run and every state it has entered.
#[derive(Debug, Clone)]
pub struct RunStateMachine {
    history: Vec<RunState>,
}

impl Default for RunStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStateMachine {
    /// A run always starts in `Planning`.
    pub fn new() -> Self {
        Self {
            history: vec![RunState::Planning],
        }
    }

    pub fn current(&self) -> &RunState {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    /// Every state entered so far, oldest first.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn into_history(self) -> Vec<RunState> {
        self.history
    }

    /// Move to the next stage on the success path.
    pub fn advance(&mut self) -> Result<&RunState, TransitionError> {
        let current = self.current().clone();
        match current.successor() {
            Some(next) => {
                tracing::debug!("Run state {} -> {}", current, next);
                self.history.push(next);
                Ok(self.current())
            }
            None => Err(TransitionError { from: current }),
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.terminate(RunState::Failed(reason.into()))
    }

    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        self.terminate(RunState::Cancelled)
    }

    fn terminate(&mut self, to: RunState) -> Result<(), TransitionError> {
        let current = self.current();
        if current.is_terminal() {
            return Err(TransitionError {
                from: current.clone(),
            });
        }
        tracing::debug!("Run state {} -> {}", current, to);
        self.history.push(to);
        Ok(())
    }
}

//! Progress reporting
//!
//! Reporters are passive observers. `notify` is synchronous and must return
//! immediately; nothing a reporter does can influence the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use tokio::sync::mpsc;

pub const STAGE_START: &str = "start";
pub const STAGE_PLANNER: &str = "planner";
pub const STAGE_SYNTHESIS: &str = "synthesis";
pub const STAGE_FINAL: &str = "final";

/// Observer of stage start and completion.
pub trait ProgressReporter: Send + Sync {
    fn notify(&self, stage: &str, message: &str, is_done: bool);
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn notify(&self, stage: &str, message: &str, is_done: bool) {
        if is_done {
            tracing::info!(stage, done = true, "{}", message);
        } else {
            tracing::debug!(stage, done = false, "{}", message);
        }
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn notify(&self, _stage: &str, _message: &str, _is_done: bool) {}
}

/// One status line per notification on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    fn render(stage: &str, message: &str, is_done: bool) -> String {
        let marker = if is_done { "✓" } else { "…" };
        if message.is_empty() {
            format!("{} {}", marker, stage)
        } else {
            format!("{} [{}] {}", marker, stage, message)
        }
    }
}

impl ProgressReporter for ConsoleReporter {
    fn notify(&self, stage: &str, message: &str, is_done: bool) {
        let line = Self::render(stage, message, is_done);
        // stderr is unbuffered; a failed write only loses a status line
        let _ = writeln!(std::io::stderr(), "{}", line);
    }
}

/// A notification captured by `ChannelReporter`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub stage: String,
    pub message: String,
    pub is_done: bool,
    pub at: DateTime<Utc>,
}

/// Pushes events into a bounded channel without waiting.
///
/// When the channel is full or the receiver is gone the event is dropped.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::Sender<ProgressEvent>,
}

impl ChannelReporter {
    pub fn new(tx: mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// Reporter plus the receiving end of a channel holding `capacity` events.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

impl ProgressReporter for ChannelReporter {
    fn notify(&self, stage: &str, message: &str, is_done: bool) {
        let event = ProgressEvent {
            stage: stage.to_string(),
            message: message.to_string(),
            is_done,
            at: Utc::now(),
        };
        if let Err(e) = self.tx.try_send(event) {
            tracing::trace!("Dropped progress event: {}", e);
        }
    }
}

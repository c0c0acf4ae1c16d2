//! Error types and handling
//!
//! This module provides the error taxonomy shared by every stage of a tour run.
//! All errors implement the `TourErrorExt` trait which provides user-friendly
//! hints and indicates whether the caller may retry.
//!
//! # Security
//!
//! Error messages never carry API keys or raw provider credentials. Backend
//! messages are passed through as reported by the provider layer, which strips
//! authentication material before constructing them.

use crate::types::TopicFailure;
use thiserror::Error;

/// Trait for tour error extensions
///
/// Provides additional context for errors: a user-facing hint and whether the
/// failure is worth retrying.
pub trait TourErrorExt {
    /// Returns a user-friendly hint for the error
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors may be retried by the caller (with backoff). Nothing
    /// inside the engine retries automatically.
    fn is_recoverable(&self) -> bool;
}

/// Main tour error type
///
/// # Error Categories
///
/// - **Request**: the request itself is malformed (never retried)
/// - **Planning / Backend / Synthesis**: a capability call failed or returned
///   something the core could not accept
/// - **Dispatch**: every specialist failed, nothing is left to synthesize
/// - **Cancellation**: the caller stopped the run
/// - **Configuration / IO**: ambient failures outside a run
///
/// # Examples
///
/// ```
/// use tour_sdk::errors::{TourError, TourErrorExt};
///
/// let error = TourError::InvalidRequest("duration must be positive".to_string());
/// assert!(!error.is_recoverable());
///
/// let parse = TourError::SynthesisParse("missing key 'conclusion'".to_string());
/// assert!(parse.is_recoverable());
/// println!("Hint: {}", parse.user_hint());
/// ```
#[derive(Debug, Error)]
pub enum TourError {
    // Request errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // Capability errors
    #[error("Planning failed: {0}")]
    Planning(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Synthesis output could not be parsed: {0}")]
    SynthesisParse(String),

    // Dispatch errors
    #[error("All specialists failed: {}", describe_failures(.failures))]
    AllSpecialistsFailed { failures: Vec<TopicFailure> },

    // Caller-initiated
    #[error("Run cancelled")]
    Cancelled,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_failures(failures: &[TopicFailure]) -> String {
    if failures.is_empty() {
        return "no topics were dispatched".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{} ({})", f.topic, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl TourError {
    /// Cancellation is reported through the error channel but is not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl TourErrorExt for TourError {
    fn user_hint(&self) -> &str {
        match self {
            Self::InvalidRequest(_) => {
                "Provide a location, at least one topic and a positive duration"
            }
            Self::Planning(_) => "Time planning failed. Try again in a moment",
            Self::Backend(_) => "The generation backend failed. Check your API key and network",
            Self::SynthesisParse(_) => "The narration came back malformed. Try running again",
            Self::AllSpecialistsFailed { .. } => {
                "No topic could be generated. Check the backend before retrying"
            }
            Self::Cancelled => "The tour was cancelled",
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidRequest(_) | Self::AllSpecialistsFailed { .. } | Self::Cancelled => false,

            Self::Planning(_)
            | Self::Backend(_)
            | Self::SynthesisParse(_)
            | Self::Config(_)
            | Self::Io(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TopicKind;

    #[test]
    fn test_recoverability_matches_taxonomy() {
        assert!(!TourError::InvalidRequest("x".into()).is_recoverable());
        assert!(TourError::Planning("x".into()).is_recoverable());
        assert!(TourError::Backend("x".into()).is_recoverable());
        assert!(TourError::SynthesisParse("x".into()).is_recoverable());
        assert!(!TourError::AllSpecialistsFailed { failures: vec![] }.is_recoverable());
        assert!(!TourError::Cancelled.is_recoverable());
    }

    #[test]
    fn test_all_specialists_failed_lists_topics() {
        let error = TourError::AllSpecialistsFailed {
            failures: vec![
                TopicFailure::new(TopicKind::History, "timed out after 30s"),
                TopicFailure::new(TopicKind::Culinary, "rate limit exceeded"),
            ],
        };

        let message = error.to_string();
        assert!(message.contains("History (timed out after 30s)"));
        assert!(message.contains("Culinary (rate limit exceeded)"));
    }

    #[test]
    fn test_cancelled_is_not_a_failure_hint() {
        let error = TourError::Cancelled;
        assert!(error.is_cancelled());
        assert_eq!(error.user_hint(), "The tour was cancelled");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: TourError = io.into();
        assert!(matches!(error, TourError::Io(_)));
        assert!(error.is_recoverable());
    }
}

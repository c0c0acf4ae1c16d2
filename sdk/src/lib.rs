//! Tour SDK
//!
//! Shared domain types and error taxonomy for the tour engine.
//! This crate carries no I/O and no async code.

/// Error types and handling
pub mod errors;

/// Tour domain types
pub mod types;

// Re-export commonly used types
pub use errors::{TourError, TourErrorExt};
pub use types::{
    FinalNarration, SectionBudget, SectionKey, SpecialistResult, SynthesisInput, TopicFailure,
    TopicKind, TourRequest,
};

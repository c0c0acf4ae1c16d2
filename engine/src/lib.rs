//! Tour Engine Library
//!
//! This library provides the orchestration core of the tourguide engine.
//! It is used by both the `tourguide` binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// LLM provider abstraction layer
pub mod llm;

/// Capability contracts and their LLM-backed implementation
pub mod capabilities;

/// Tour orchestration module
pub mod tour;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

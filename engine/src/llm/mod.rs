//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the text-generation backends
//! (Anthropic, Ollama). The LLMProvider trait defines the contract that every
//! provider implements so the capability layer can stay backend-agnostic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::LLMConfig;
use crate::secrets::SecretString;
use sdk::errors::TourError;

pub mod anthropic;
pub mod ollama;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for TourError {
    fn from(e: LLMError) -> Self {
        TourError::Backend(e.to_string())
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "anthropic")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a completion
    ///
    /// # Arguments
    /// * `messages` - System prompt followed by the conversation turns
    /// * `max_tokens` - Upper bound on generated tokens
    ///
    /// # Returns
    /// * `Ok(String)` - The generated text
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message], max_tokens: u32) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Build the configured default provider.
///
/// Cloud providers need an API key; a missing key is a configuration error
/// rather than a failure at first request.
pub fn build_provider(
    config: &LLMConfig,
    api_key: Option<SecretString>,
) -> std::result::Result<Arc<dyn LLMProvider>, TourError> {
    match config.default_provider.as_str() {
        "anthropic" => {
            let key = api_key.ok_or_else(|| {
                TourError::Config(format!(
                    "Anthropic API key not found. Set {} or store it in the system keychain",
                    config.anthropic.api_key_env
                ))
            })?;
            Ok(Arc::new(anthropic::AnthropicProvider::new(
                config.anthropic.clone(),
                key,
            )))
        }
        "ollama" => Ok(Arc::new(ollama::OllamaProvider::new(
            config.ollama.base_url.clone(),
            config.ollama.model.clone(),
        ))),
        other => Err(TourError::Config(format!(
            "Invalid default provider '{}'. Must be one of: anthropic, ollama",
            other
        ))),
    }
}

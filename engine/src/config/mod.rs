//! Configuration management
//!
//! This module handles loading, validation, and management of the tourguide
//! configuration. Configuration is stored in TOML format at
//! ~/.tourguide/config.toml and created with defaults on first use.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **llm**: default provider and per-provider settings
//! - **tour**: per-stage timeouts and generation limits
//!
//! API keys are never stored here; see `crate::secrets`.
//!
//! # Examples
//!
//! ```no_run
//! use tour_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::TourError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const VALID_PROVIDERS: [&str; 2] = ["anthropic", "ollama"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider configuration
    pub llm: LLMConfig,

    /// Tour orchestration settings
    #[serde(default)]
    pub tour: TourConfig,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Default LLM provider (anthropic, ollama)
    pub default_provider: String,

    /// Anthropic provider settings
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,
}

/// Anthropic provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Base URL for Anthropic API
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    /// Environment variable consulted for the API key before the keychain
    #[serde(default = "default_anthropic_api_key_env")]
    pub api_key_env: String,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Tour orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TourConfig {
    /// Timeout for the time-allocation estimate (seconds)
    #[serde(default = "default_planner_timeout")]
    pub planner_timeout_secs: u64,

    /// Timeout for each specialist generation call (seconds)
    #[serde(default = "default_specialist_timeout")]
    pub specialist_timeout_secs: u64,

    /// Timeout for the synthesis call (seconds)
    #[serde(default = "default_synthesis_timeout")]
    pub synthesis_timeout_secs: u64,

    /// Generation limit for the time-allocation estimate
    #[serde(default = "default_planner_max_tokens")]
    pub planner_max_tokens: u32,

    /// Generation limit for each specialist
    #[serde(default = "default_specialist_max_tokens")]
    pub specialist_max_tokens: u32,

    /// Generation limit for the synthesis call
    #[serde(default = "default_synthesis_max_tokens")]
    pub synthesis_max_tokens: u32,
}

impl TourConfig {
    pub fn planner_timeout(&self) -> Duration {
        Duration::from_secs(self.planner_timeout_secs)
    }

    pub fn specialist_timeout(&self) -> Duration {
        Duration::from_secs(self.specialist_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            planner_timeout_secs: default_planner_timeout(),
            specialist_timeout_secs: default_specialist_timeout(),
            synthesis_timeout_secs: default_synthesis_timeout(),
            planner_max_tokens: default_planner_max_tokens(),
            specialist_max_tokens: default_specialist_max_tokens(),
            synthesis_max_tokens: default_synthesis_max_tokens(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_anthropic_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_planner_timeout() -> u64 {
    60
}

fn default_specialist_timeout() -> u64 {
    120
}

fn default_synthesis_timeout() -> u64 {
    180
}

fn default_planner_max_tokens() -> u32 {
    1024
}

fn default_specialist_max_tokens() -> u32 {
    2048
}

fn default_synthesis_max_tokens() -> u32 {
    4096
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            base_url: default_anthropic_base_url(),
            model: default_anthropic_model(),
            api_key_env: default_anthropic_api_key_env(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.tourguide/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, TourError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, TourError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| TourError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, TourError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| TourError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, TourError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                TourError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| TourError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| TourError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Created default configuration at {}", path.display());

        Ok(config)
    }

    /// Get the default configuration file path (~/.tourguide/config.toml)
    pub fn default_config_path() -> Result<PathBuf, TourError> {
        let home = dirs::home_dir()
            .ok_or_else(|| TourError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".tourguide").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LLMConfig {
                default_provider: "anthropic".to_string(),
                anthropic: AnthropicConfig::default(),
                ollama: OllamaConfig::default(),
            },
            tour: TourConfig::default(),
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level or default provider is not recognised
    /// - A timeout or generation limit is zero
    pub fn validate(&self) -> Result<(), TourError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(TourError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(TourError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        let tour = &self.tour;
        let timeouts = [
            ("planner_timeout_secs", tour.planner_timeout_secs),
            ("specialist_timeout_secs", tour.specialist_timeout_secs),
            ("synthesis_timeout_secs", tour.synthesis_timeout_secs),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(TourError::Config(format!("{} must be greater than 0", name)));
            }
        }

        let limits = [
            ("planner_max_tokens", tour.planner_max_tokens),
            ("specialist_max_tokens", tour.specialist_max_tokens),
            ("synthesis_max_tokens", tour.synthesis_max_tokens),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(TourError::Config(format!("{} must be greater than 0", name)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.default_provider, "anthropic");
        assert_eq!(config.tour.specialist_max_tokens, 2048);
        assert_eq!(config.tour.synthesis_max_tokens, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
[llm]
default_provider = "ollama"
"#,
        )
        .unwrap();

        assert_eq!(config.llm.default_provider, "ollama");
        assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.tour, TourConfig::default());
    }

    #[test]
    fn test_invalid_provider_rejected() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "gemini"
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("Invalid default provider"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = Config::from_toml_str(
            r#"
[llm]
default_provider = "anthropic"

[tour]
specialist_timeout_secs = 0
"#,
        )
        .unwrap_err();

        assert!(err.to_string().contains("specialist_timeout_secs"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.anthropic.model, deserialized.llm.anthropic.model);
        assert_eq!(config.tour, deserialized.tour);
    }
}

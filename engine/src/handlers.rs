//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Generate a tour narration
//! - plan: Show the advisory time allocation
//! - doctor: Validate configuration and check the backend
//! - key: Store or inspect the backend API key

use anyhow::{Context, Result};
use sdk::types::{SectionKey, TourRequest};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::capabilities::LlmCapabilities;
use crate::cli::TourArgs;
use crate::config::Config;
use crate::llm::{build_provider, LLMProvider};
use crate::secrets::{SecretManager, ANTHROPIC_KEY_NAME, KEYCHAIN_SERVICE};
use crate::tour::{Capabilities, ConsoleReporter, NoopReporter, ProgressReporter, TourEngine};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// File name used when `--output` names a directory: `<slug>_tour.txt`.
pub fn narration_file_name(location: &str) -> String {
    let slug: String = location
        .trim()
        .chars()
        .map(|c| {
            if c.is_whitespace() || c == '/' || c == '\\' {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .to_lowercase();
    format!("{}_tour.txt", slug)
}

/// Resolve `--output`: a directory receives the default file name.
pub fn resolve_output_path(output: &Path, location: &str) -> PathBuf {
    if output.is_dir() {
        output.join(narration_file_name(location))
    } else {
        output.to_path_buf()
    }
}

/// Resolve the API key (when the provider needs one) and build the provider.
fn provider_from_config(config: &Config) -> Result<Arc<dyn LLMProvider>> {
    let api_key = if config.llm.default_provider == "anthropic" {
        SecretManager::new(KEYCHAIN_SERVICE)
            .resolve(&config.llm.anthropic.api_key_env, ANTHROPIC_KEY_NAME)
    } else {
        None
    };

    let provider = build_provider(&config.llm, api_key)?;
    tracing::debug!("Using provider: {}", provider.name());
    Ok(provider)
}

fn engine_from_config(config: &Config, reporter: Arc<dyn ProgressReporter>) -> Result<TourEngine> {
    let provider = provider_from_config(config)?;
    let caps = Arc::new(LlmCapabilities::new(provider, &config.tour));
    Ok(TourEngine::new(Capabilities::shared(caps), config.tour.clone()).with_reporter(reporter))
}

fn request_from_args(args: &TourArgs) -> Result<TourRequest> {
    Ok(TourRequest::new(
        args.location.clone(),
        args.topics.iter().copied(),
        args.duration,
    )?)
}

/// Generate a tour narration
///
/// Progress lines go to stderr; the narration (or JSON document) goes to
/// stdout. Ctrl-C cancels the run.
pub async fn handle_run(
    args: TourArgs,
    output: Option<PathBuf>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let request = request_from_args(&args)?;

    let reporter: Arc<dyn ProgressReporter> = match format {
        OutputFormat::Text => Arc::new(ConsoleReporter),
        OutputFormat::Json => Arc::new(NoopReporter),
    };
    let engine = engine_from_config(config, reporter)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling tour");
            ctrl_c.cancel();
        }
    });

    let result = engine.run(&request, &cancel).await;
    signal_task.abort();
    let outcome = result?;

    let saved_to = match &output {
        Some(path) => {
            let path = resolve_output_path(path, request.location());
            std::fs::write(&path, &outcome.narration_text)
                .with_context(|| format!("Failed to write narration to {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    match format {
        OutputFormat::Text => {
            println!("{}", outcome.narration_text);
            println!();
            for (topic, reason) in outcome.failed_topics() {
                eprintln!("⚠ {} section skipped: {}", topic, reason);
            }
            if let Some(path) = &saved_to {
                eprintln!("✓ Narration saved to {}", path.display());
            }
            eprintln!(
                "✓ Tour completed in {:.1}s ({} words)",
                outcome.elapsed_ms as f64 / 1000.0,
                outcome.narration_text.split_whitespace().count()
            );
        }
        OutputFormat::Json => {
            let output = json!({
                "status": "done",
                "run_id": outcome.run_id,
                "location": request.location(),
                "narration": outcome.narration_text,
                "sections": outcome.narration,
                "topics": outcome.sections,
                "budget": outcome.budget,
                "word_budget": outcome.word_budget,
                "transitions": outcome.transitions,
                "elapsed_ms": outcome.elapsed_ms,
                "output": saved_to,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Show the advisory time allocation
pub async fn handle_plan(args: TourArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let request = request_from_args(&args)?;
    let engine = engine_from_config(config, Arc::new(NoopReporter))?;

    let budget = engine.plan(&request).await?;

    match format {
        OutputFormat::Text => {
            println!(
                "Time plan for {} ({} minutes)",
                request.location(),
                request.duration_minutes()
            );
            println!("============================");
            for section in SectionKey::ALL {
                let selected = match section {
                    SectionKey::Topic(topic) => request.is_selected(topic),
                    _ => true,
                };
                let marker = if selected { " " } else { "-" };
                println!(
                    "{} {:<14} {:>5.1} min",
                    marker,
                    section.key(),
                    budget.get(section)
                );
            }
            println!();
            println!("  {:<14} {:>5.1} min", "total", budget.total());
        }
        OutputFormat::Json => {
            let output = json!({
                "location": request.location(),
                "duration_minutes": request.duration_minutes(),
                "budget": budget,
                "total": budget.total(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration and check the backend
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Check 1: Configuration validation
    match config.validate() {
        Ok(()) => checks.push(("Configuration", "Valid".to_string())),
        Err(e) => {
            checks.push(("Configuration", "Invalid".to_string()));
            issues.push(e.to_string());
        }
    }
    checks.push(("Default provider", config.llm.default_provider.clone()));

    // Check 2: API key
    if config.llm.default_provider == "anthropic" {
        let manager = SecretManager::new(KEYCHAIN_SERVICE);
        if manager
            .resolve(&config.llm.anthropic.api_key_env, ANTHROPIC_KEY_NAME)
            .is_some()
        {
            checks.push(("Anthropic API key", "Configured".to_string()));
        } else {
            checks.push(("Anthropic API key", "Not configured".to_string()));
            issues.push(format!(
                "No Anthropic API key. Set {} or run 'tourguide key set'.",
                config.llm.anthropic.api_key_env
            ));
        }
    }

    // Check 3: Provider health
    match provider_from_config(config) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider health", "Available".to_string()));
            } else {
                checks.push(("Provider health", "Unavailable".to_string()));
                issues.push(format!("Provider '{}' is not reachable.", provider.name()));
            }
        }
        Err(e) => {
            checks.push(("Provider health", "Not checked".to_string()));
            tracing::debug!("Skipping provider health check: {}", e);
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Tourguide System Diagnostics");
            println!("============================");
            println!();
            for (check, status) in &checks {
                println!("  {:<20} {}", check, status);
            }
            println!();
            if issues.is_empty() {
                println!("✓ No issues found");
            } else {
                println!("Issues:");
                for issue in &issues {
                    println!("  - {}", issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks
                    .iter()
                    .map(|(check, status)| json!({ "check": check, "status": status }))
                    .collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Prompt for the Anthropic API key and store it in the keychain
pub fn handle_key_set(format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(KEYCHAIN_SERVICE);
    let secret = manager.prompt_for_secret(ANTHROPIC_KEY_NAME)?;
    manager.set_secret(ANTHROPIC_KEY_NAME, &secret)?;

    match format {
        OutputFormat::Text => println!("✓ API key stored in system keychain"),
        OutputFormat::Json => println!("{}", json!({ "stored": true })),
    }
    Ok(())
}

/// Remove the stored API key from the keychain
pub fn handle_key_delete(format: OutputFormat) -> Result<()> {
    SecretManager::new(KEYCHAIN_SERVICE).delete_secret(ANTHROPIC_KEY_NAME)?;

    match format {
        OutputFormat::Text => println!("✓ API key removed from system keychain"),
        OutputFormat::Json => println!("{}", json!({ "deleted": true })),
    }
    Ok(())
}

/// Report whether an API key can be resolved
pub fn handle_key_status(config: &Config, format: OutputFormat) -> Result<()> {
    let found = SecretManager::new(KEYCHAIN_SERVICE)
        .resolve(&config.llm.anthropic.api_key_env, ANTHROPIC_KEY_NAME)
        .is_some();

    match format {
        OutputFormat::Text => {
            if found {
                println!("✓ Anthropic API key found");
            } else {
                println!(
                    "✗ No Anthropic API key (checked ${} and the system keychain)",
                    config.llm.anthropic.api_key_env
                );
            }
        }
        OutputFormat::Json => println!("{}", json!({ "found": found })),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_file_name_slug() {
        assert_eq!(narration_file_name("Kyoto"), "kyoto_tour.txt");
        assert_eq!(
            narration_file_name("  Eiffel Tower, Paris "),
            "eiffel_tower,_paris_tour.txt"
        );
        assert_eq!(narration_file_name("Rome/Trastevere"), "rome_trastevere_tour.txt");
    }

    #[test]
    fn test_output_directory_gets_default_name() {
        let dir = tempfile::tempdir().unwrap();

        let resolved = resolve_output_path(dir.path(), "Old Town");
        assert_eq!(resolved, dir.path().join("old_town_tour.txt"));

        let explicit = dir.path().join("walk.txt");
        assert_eq!(resolve_output_path(&explicit, "Old Town"), explicit);
    }
}

//! CLI interface for tourguide
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags.

use clap::{Args, Parser, Subcommand};
use sdk::types::TopicKind;
use std::path::PathBuf;

/// Tourguide audio-tour narration engine
///
/// Plans, researches and writes a narrated walking tour for a location,
/// split across the topics you choose and sized to the time you have.
#[derive(Parser, Debug)]
#[command(name = "tourguide")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Location, topics and duration shared by `run` and `plan`
#[derive(Args, Debug, Clone)]
pub struct TourArgs {
    /// Place to build the tour for
    #[arg(short, long)]
    pub location: String,

    /// Topic to cover (architecture, history, culture, culinary); repeatable
    #[arg(short, long = "topic", value_name = "TOPIC", required = true, value_parser = parse_topic)]
    pub topics: Vec<TopicKind>,

    /// Tour length in minutes
    #[arg(short, long, value_name = "MINUTES")]
    pub duration: f64,
}

fn parse_topic(s: &str) -> Result<TopicKind, String> {
    s.parse::<TopicKind>().map_err(|e| e.to_string())
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a full tour narration
    Run {
        #[command(flatten)]
        tour: TourArgs,

        /// Write the narration text to this file (or into this directory)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show the advisory time allocation without generating the tour
    Plan {
        #[command(flatten)]
        tour: TourArgs,
    },

    /// Run system diagnostics
    Doctor,

    /// Manage the backend API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

/// API key management actions
#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Store the Anthropic API key in the system keychain
    Set,

    /// Show whether an API key can be found
    Status,

    /// Remove the stored API key from the system keychain
    Delete,
}

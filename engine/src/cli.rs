//! CLI interface for Waypoint
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for the planning agent.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Waypoint robot task-planning agent
///
/// Turns a natural-language command into an ordered list of executable robot
/// skill invocations, checking intent and feasibility along the way.
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
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

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a command through the full supervised pipeline
    Run {
        /// The natural-language command or question
        command: String,
    },

    /// Plan a command through decomposition only (no supervision)
    Plan {
        /// The natural-language command
        command: String,
    },

    /// Plan a command, then execute the plan against the simulator
    Execute {
        /// The natural-language command
        command: String,
    },

    /// Show recent run records
    History {
        /// Number of runs to show (default: 10)
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Run system diagnostics
    Doctor,

    /// Show the configured robot skill sets
    Skills,
}

//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

/// Register command arguments.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Student name (required, must be non-empty)
    #[arg(short, long)]
    pub name: String,

    /// Student email (required, must be non-empty)
    #[arg(short, long)]
    pub email: String,

    /// Course being registered for
    #[arg(short = 'C', long, default_value = "")]
    pub course: String,

    /// Contact phone number
    #[arg(short, long, default_value = "")]
    pub phone: String,
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Serve command arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Listen on this socket instead of the configured one
    #[arg(short, long, value_name = "PATH")]
    pub socket: Option<PathBuf>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for the list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Formatted table
    #[default]
    Table,
    /// JSON array, as persisted
    Json,
}

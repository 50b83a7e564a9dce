//! CLI command definitions.
//!
//! This module defines the structure of all one-shot subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Schools command arguments.
#[derive(Debug, Args)]
pub struct SchoolsCommand {
    /// Cluster name (quote names containing spaces)
    pub cluster: String,
}

/// Summary command arguments.
#[derive(Debug, Args)]
pub struct SummaryCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Export command arguments.
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Directory to write the CSV file into (defaults to the configured export directory)
    #[arg(short, long, value_name = "DIR", conflicts_with = "stdout")]
    pub output: Option<PathBuf>,

    /// Write the CSV to standard output instead of a file
    #[arg(long)]
    pub stdout: bool,
}

/// Durable store maintenance commands.
#[derive(Debug, Subcommand)]
pub enum StoreCommand {
    /// Delete every saved record
    Clear {
        /// Confirm deletion
        #[arg(short, long)]
        yes: bool,
    },
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

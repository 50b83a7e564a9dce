//! Command-line interface for roster-collector.
//!
//! This module provides the CLI structure for the `rosterc` binary, the
//! interactive session loop, and the plain-text renderers both share.

mod commands;
pub mod session;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::catalog::School;
use crate::record::TeacherRecord;
use crate::summary::Summary;

pub use commands::{ConfigCommand, ExportCommand, SchoolsCommand, StoreCommand, SummaryCommand};

/// rosterc - Collect teacher rosters offline
///
/// Select a cluster and school, stage teacher entries, save them on this
/// device, and export everything to CSV when you are back in range.
#[derive(Debug, Parser)]
#[command(name = "rosterc")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for info, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List clusters with their school counts
    Clusters,

    /// List the schools of a cluster
    Schools(SchoolsCommand),

    /// Start an interactive collection session
    Session,

    /// Show saved record counts
    Summary(SummaryCommand),

    /// Export all saved records to CSV
    Export(ExportCommand),

    /// Maintain the saved records
    #[command(subcommand)]
    Store(StoreCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

/// Print a school list with 1-based positions.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_schools(out: &mut impl Write, schools: &[School]) -> io::Result<()> {
    for (i, school) in schools.iter().enumerate() {
        writeln!(out, "{:>3}. {}  {}", i + 1, school.id, school.name)?;
    }
    Ok(())
}

/// Print staged records as the temporary list table.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_staged(out: &mut impl Write, records: &[TeacherRecord]) -> io::Result<()> {
    if records.is_empty() {
        return writeln!(out, "No teachers added yet");
    }
    writeln!(out, "{} teacher(s) in the list", records.len())?;
    writeln!(
        out,
        "{:>3}  {:<28} {:<11} {:<8} {}",
        "#", "Name", "Phone", "Grade", "Subject"
    )?;
    for (i, record) in records.iter().enumerate() {
        writeln!(
            out,
            "{:>3}  {:<28} {:<11} {:<8} {}",
            i + 1,
            record.name,
            record.phone.as_deref().unwrap_or("-"),
            record.grade_taught.as_deref().unwrap_or("-"),
            record.subject.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}

/// Print the saved-records summary.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_summary(out: &mut impl Write, summary: &Summary) -> io::Result<()> {
    writeln!(out, "All Saved Records ({})", summary.total_record_count)?;
    for school in &summary.schools {
        let name = school.school_name.as_deref().unwrap_or("(not in catalog)");
        writeln!(
            out,
            "  {} - {} [{}]: {}",
            school.school_id,
            name,
            school.count,
            school.teacher_names.join(", ")
        )?;
    }
    Ok(())
}

//! Interactive collection session.
//!
//! Reads one operator command per line, parses it with clap, and calls the
//! matching [`Session`] method. Errors are printed and the loop continues;
//! only a broken output stream ends the session early.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use tracing::warn;

use crate::error::{Error, Result};
use crate::export::ExportDocument;
use crate::record::TeacherRecord;
use crate::session::Session;
use crate::storage::KeyValueStore;

use super::{write_schools, write_staged, write_summary};

/// One line of session input.
#[derive(Debug, Parser)]
#[command(name = "session", no_binary_name = true, disable_version_flag = true)]
pub struct SessionLine {
    /// The action to perform
    #[command(subcommand)]
    pub action: SessionAction,
}

/// Session actions.
#[derive(Debug, Subcommand)]
pub enum SessionAction {
    /// Select a cluster (resets the school)
    Cluster {
        /// Cluster name; words are joined with single spaces
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// List the schools of the selected cluster
    Schools,

    /// Select a school of the selected cluster by id or list number
    School {
        /// School id, or its number from `schools`
        id: String,
    },

    /// Add a teacher to the current list
    Add(AddArgs),

    /// Show the current list
    List,

    /// Remove a teacher from the current list by its number
    Remove {
        /// Number shown by `list`
        number: usize,
    },

    /// Clear the current list without saving
    Clear,

    /// Save the current list to this device
    #[command(alias = "save")]
    Commit,

    /// Show all saved records
    Summary,

    /// Show the current selection and counts
    Status,

    /// Export all saved records to a CSV file
    Export {
        /// Directory to write into
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// End the session
    #[command(alias = "exit")]
    Quit {
        /// Quit even though the current list is not saved
        #[arg(long)]
        discard: bool,
    },
}

/// Teacher fields for `add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Full name (required)
    #[arg(long)]
    pub name: String,
    /// Mobile number, 10 digits
    #[arg(long)]
    pub phone: Option<String>,
    /// Year of birth
    #[arg(long = "yob")]
    pub year_of_birth: Option<String>,
    /// Year of joining
    #[arg(long = "yoj")]
    pub year_of_joining: Option<String>,
    /// Head Master, Assistant Teacher, CRTP etc.
    #[arg(long)]
    pub designation: Option<String>,
    /// Grades taught, e.g. 1-5
    #[arg(long)]
    pub grade: Option<String>,
    /// Subject taught
    #[arg(long)]
    pub subject: Option<String>,
    /// Notes
    #[arg(long)]
    pub notes: Option<String>,
}

impl From<AddArgs> for TeacherRecord {
    fn from(args: AddArgs) -> Self {
        TeacherRecord {
            name: args.name,
            phone: args.phone,
            year_of_birth: args.year_of_birth,
            year_of_joining: args.year_of_joining,
            designation: args.designation,
            grade_taught: args.grade,
            subject: args.subject,
            notes: args.notes,
        }
        .normalized()
    }
}

/// Where session exports go.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Default export directory.
    pub export_dir: PathBuf,
    /// Export file name prefix.
    pub file_prefix: String,
}

enum Flow {
    Continue,
    Quit,
}

/// Drive `session` from `input` until `quit` or end of input.
///
/// # Errors
///
/// Returns an error only if reading input or writing output fails.
pub fn run<S, R, W>(
    session: &mut Session<'_, S>,
    options: &SessionOptions,
    input: R,
    out: &mut W,
) -> io::Result<()>
where
    S: KeyValueStore,
    R: BufRead,
    W: Write,
{
    writeln!(out, "Type `help` for commands.")?;
    write_prompt(session, out)?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            write_prompt(session, out)?;
            continue;
        }

        let tokens = match split_line(line) {
            Ok(tokens) => tokens,
            Err(message) => {
                writeln!(out, "error: {message}")?;
                write_prompt(session, out)?;
                continue;
            }
        };

        match SessionLine::try_parse_from(tokens) {
            Ok(parsed) => match dispatch(session, options, parsed.action, out) {
                Ok(Flow::Quit) => return Ok(()),
                Ok(Flow::Continue) => {}
                Err(Error::Io(e)) => return Err(e),
                Err(e) => {
                    writeln!(out, "error: {e}")?;
                    if e.is_retryable() {
                        writeln!(out, "Nothing was lost; run the command again.")?;
                    } else if e.is_selection_error() {
                        writeln!(out, "Type `status` to see the current selection.")?;
                    }
                }
            },
            Err(e) => write!(out, "{}", e.render())?,
        }
        write_prompt(session, out)?;
    }

    writeln!(out)?;
    if session.staged_len() > 0 {
        let school = session.selected_school().map_or("?", |s| s.id.as_str());
        warn!(
            "Session input ended with {} unsaved record(s) for school {}",
            session.staged_len(),
            school
        );
        writeln!(
            out,
            "warning: {} staged record(s) for school {} were not saved",
            session.staged_len(),
            school
        )?;
    }
    Ok(())
}

fn dispatch<S: KeyValueStore, W: Write>(
    session: &mut Session<'_, S>,
    options: &SessionOptions,
    action: SessionAction,
    out: &mut W,
) -> Result<Flow> {
    match action {
        SessionAction::Cluster { name } => {
            let name = name.join(" ");
            let schools = session.select_cluster(&name)?;
            writeln!(out, "Cluster {name}: {} school(s)", schools.len())?;
            write_schools(out, schools)?;
        }
        SessionAction::Schools => {
            let cluster = session.selected_cluster().ok_or(Error::NoClusterSelected)?;
            write_schools(out, session.catalog().schools_of(cluster)?)?;
        }
        SessionAction::School { id } => {
            let id = resolve_school_id(session, &id)?;
            let school = session.select_school(&id)?;
            writeln!(out, "Current school: {} ({})", school.name, school.id)?;
        }
        SessionAction::Add(args) => {
            let record = TeacherRecord::from(args);
            let name = record.name.clone();
            let count = session.add(record)?;
            writeln!(out, "Added {name} ({count} in list)")?;
        }
        SessionAction::List => write_staged(out, session.staged()?)?,
        SessionAction::Remove { number } => {
            let len = session.staged_len();
            let removed = match number.checked_sub(1) {
                Some(index) => session.remove_at(index),
                None => Err(Error::IndexOutOfRange { index: 0, len }),
            }
            // Report the number as typed, not the 0-based index.
            .map_err(|e| match e {
                Error::IndexOutOfRange { len, .. } => Error::IndexOutOfRange { index: number, len },
                other => other,
            })?;
            writeln!(out, "Removed {}", removed.name)?;
        }
        SessionAction::Clear => {
            let dropped = session.clear_staged()?;
            writeln!(out, "Cleared {dropped} teacher(s) from the list")?;
        }
        SessionAction::Commit => {
            let committed = session.commit()?;
            if committed == 0 {
                writeln!(out, "Nothing to save")?;
            } else {
                writeln!(
                    out,
                    "Saved {committed} teacher(s); {} record(s) on this device",
                    session.store().total_count()
                )?;
            }
        }
        SessionAction::Summary => write_summary(out, &session.summary())?,
        SessionAction::Status => {
            writeln!(
                out,
                "Cluster:  {}",
                session.selected_cluster().unwrap_or("-")
            )?;
            match session.selected_school() {
                Some(school) => writeln!(out, "School:   {} ({})", school.name, school.id)?,
                None => writeln!(out, "School:   -")?,
            }
            writeln!(out, "Staged:   {}", session.staged_len())?;
            writeln!(out, "Saved:    {}", session.store().total_count())?;
        }
        SessionAction::Export { output } => {
            let document = session.export()?;
            let dir = output.unwrap_or_else(|| options.export_dir.clone());
            let file_name =
                ExportDocument::file_name(&options.file_prefix, Local::now().date_naive());
            let path = document.save_to(&dir, &file_name)?;
            writeln!(
                out,
                "Exported {} row(s) to {}",
                document.rows(),
                path.display()
            )?;
        }
        SessionAction::Quit { discard } => {
            let staged = session.staged_len();
            if staged > 0 && !discard {
                writeln!(
                    out,
                    "{staged} teacher(s) in the list are not saved. Use `commit`, `clear`, or `quit --discard`."
                )?;
                return Ok(Flow::Continue);
            }
            return Ok(Flow::Quit);
        }
    }
    Ok(Flow::Continue)
}

/// Accept either a school id or its 1-based number in the cluster listing.
fn resolve_school_id<S: KeyValueStore>(session: &Session<'_, S>, input: &str) -> Result<String> {
    if session.catalog().contains_school(input) {
        return Ok(input.to_string());
    }
    let Some(cluster) = session.selected_cluster() else {
        return Err(Error::NoClusterSelected);
    };
    let schools = session.catalog().schools_of(cluster)?;
    input
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| schools.get(i))
        .map(|s| s.id.clone())
        .ok_or_else(|| Error::school_not_found(input))
}

fn write_prompt<S: KeyValueStore, W: Write>(session: &Session<'_, S>, out: &mut W) -> io::Result<()> {
    let cluster = session.selected_cluster().unwrap_or("-");
    match session.selected_school() {
        Some(school) => write!(out, "[{cluster} / {}: {}] > ", school.id, session.staged_len())?,
        None => write!(out, "[{cluster}] > ")?,
    }
    out.flush()
}

/// Split a command line into words; double quotes group words.
///
/// Inside quotes, `\"` and `\\` stand for a literal quote and backslash.
///
/// # Errors
///
/// Returns a message if a quote is left open.
pub fn split_line(line: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut in_quotes = false;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                in_word = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(next @ ('"' | '\\')) => word.push(next),
                Some(next) => {
                    word.push('\\');
                    word.push(next);
                }
                None => word.push('\\'),
            },
            c if c.is_whitespace() && !in_quotes => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            c => {
                word.push(c);
                in_word = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if in_word {
        words.push(word);
    }
    Ok(words)
}

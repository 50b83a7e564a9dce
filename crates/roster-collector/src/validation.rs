//! Field rules for teacher records.
//!
//! Numeric fields are checked against anchored regex patterns compiled once
//! per process. Only ASCII digits are accepted.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::record::{TeacherField, TeacherRecord};

/// A compiled rule for one optional record field.
#[derive(Debug)]
pub struct FieldPattern {
    /// The field this rule applies to.
    pub field: TeacherField,

    /// Message shown to the operator when the value does not match.
    pub description: &'static str,

    /// The compiled regex.
    regex: Regex,
}

impl FieldPattern {
    /// Create a new field pattern.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(field: TeacherField, description: &'static str, pattern: &str) -> Self {
        Self {
            field,
            description,
            regex: Regex::new(pattern).expect("Invalid regex pattern"),
        }
    }

    /// Check if the value satisfies this rule.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// Built-in rules for the optional numeric fields.
pub fn field_patterns() -> &'static [FieldPattern] {
    static PATTERNS: OnceLock<Vec<FieldPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            FieldPattern::new(
                TeacherField::Phone,
                "must be exactly 10 digits",
                r"^[0-9]{10}$",
            ),
            FieldPattern::new(
                TeacherField::YearOfBirth,
                "must be a 4-digit year",
                r"^[0-9]{4}$",
            ),
            FieldPattern::new(
                TeacherField::YearOfJoining,
                "must be a 4-digit year",
                r"^[0-9]{4}$",
            ),
        ]
    })
}

/// Validate a record, reporting the first offending field.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the name is empty or an optional numeric
/// field is present but malformed.
pub fn validate(record: &TeacherRecord) -> Result<()> {
    if record.name.trim().is_empty() {
        return Err(Error::validation(TeacherField::Name, "is required"));
    }

    for pattern in field_patterns() {
        if let Some(value) = record.field(pattern.field) {
            if !pattern.matches(value) {
                return Err(Error::validation(
                    pattern.field,
                    format!("{} (got \"{value}\")", pattern.description),
                ));
            }
        }
    }

    Ok(())
}

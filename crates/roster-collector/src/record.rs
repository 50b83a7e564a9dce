//! Teacher record types.
//!
//! A [`TeacherRecord`] is a value object: it has no identity beyond its
//! position in a staging buffer or a school's committed list.

use serde::{Deserialize, Serialize};

/// The fields of a teacher record, in export column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeacherField {
    /// Full name (required).
    Name,
    /// Ten-digit mobile number.
    Phone,
    /// Four-digit year of birth.
    YearOfBirth,
    /// Four-digit year of joining service.
    YearOfJoining,
    /// Head Master, Assistant Teacher, CRTP and so on.
    Designation,
    /// Grades taught, e.g. "1-5".
    GradeTaught,
    /// Subject taught.
    Subject,
    /// Free-form notes.
    Notes,
}

impl TeacherField {
    /// All fields in export column order.
    pub const ALL: [Self; 8] = [
        Self::Name,
        Self::Phone,
        Self::YearOfBirth,
        Self::YearOfJoining,
        Self::Designation,
        Self::GradeTaught,
        Self::Subject,
        Self::Notes,
    ];

    /// Column heading used in the CSV export.
    #[must_use]
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Phone => "Phone",
            Self::YearOfBirth => "YearOfBirth",
            Self::YearOfJoining => "YearOfJoining",
            Self::Designation => "Designation",
            Self::GradeTaught => "GradeTaught",
            Self::Subject => "Subject",
            Self::Notes => "Notes",
        }
    }
}

impl std::fmt::Display for TeacherField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Phone => write!(f, "phone"),
            Self::YearOfBirth => write!(f, "year of birth"),
            Self::YearOfJoining => write!(f, "year of joining"),
            Self::Designation => write!(f, "designation"),
            Self::GradeTaught => write!(f, "grade taught"),
            Self::Subject => write!(f, "subject"),
            Self::Notes => write!(f, "notes"),
        }
    }
}

/// One teacher's entry.
///
/// Optional fields that were left blank are `None`; they are omitted from
/// the persisted JSON and render as empty CSV cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRecord {
    /// Teacher's full name.
    pub name: String,

    /// Mobile number, exactly 10 digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    /// Year of birth, 4 digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_of_birth: Option<String>,

    /// Year of joining, 4 digits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year_of_joining: Option<String>,

    /// Designation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,

    /// Grades taught.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade_taught: Option<String>,

    /// Subject taught.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl TeacherRecord {
    /// Create a record with only a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Set the phone number.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = optional(phone);
        self
    }

    /// Set the year of birth.
    #[must_use]
    pub fn with_year_of_birth(mut self, year: impl Into<String>) -> Self {
        self.year_of_birth = optional(year);
        self
    }

    /// Set the year of joining.
    #[must_use]
    pub fn with_year_of_joining(mut self, year: impl Into<String>) -> Self {
        self.year_of_joining = optional(year);
        self
    }

    /// Set the designation.
    #[must_use]
    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = optional(designation);
        self
    }

    /// Set the grades taught.
    #[must_use]
    pub fn with_grade_taught(mut self, grade: impl Into<String>) -> Self {
        self.grade_taught = optional(grade);
        self
    }

    /// Set the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = optional(subject);
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = optional(notes);
        self
    }

    /// Trim every field and turn blank optional fields into `None`.
    ///
    /// Records built with struct literals (or decoded from a host form) go
    /// through this before validation so that `Some("")` never reaches storage.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.and_then(optional),
            year_of_birth: self.year_of_birth.and_then(optional),
            year_of_joining: self.year_of_joining.and_then(optional),
            designation: self.designation.and_then(optional),
            grade_taught: self.grade_taught.and_then(optional),
            subject: self.subject.and_then(optional),
            notes: self.notes.and_then(optional),
        }
    }

    /// Get the value of a field, `None` when absent.
    #[must_use]
    pub fn field(&self, field: TeacherField) -> Option<&str> {
        match field {
            TeacherField::Name => Some(self.name.as_str()),
            TeacherField::Phone => self.phone.as_deref(),
            TeacherField::YearOfBirth => self.year_of_birth.as_deref(),
            TeacherField::YearOfJoining => self.year_of_joining.as_deref(),
            TeacherField::Designation => self.designation.as_deref(),
            TeacherField::GradeTaught => self.grade_taught.as_deref(),
            TeacherField::Subject => self.subject.as_deref(),
            TeacherField::Notes => self.notes.as_deref(),
        }
    }
}

fn optional(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

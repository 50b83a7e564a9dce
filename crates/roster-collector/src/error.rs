//! Error types for roster-collector.
//!
//! This module defines all error types used throughout the crate. Every
//! variant is recoverable: the operator corrects input or retries, and
//! staged or committed records are never discarded because of an error.

use std::path::PathBuf;
use thiserror::Error;

use crate::record::TeacherField;

/// The main error type for roster-collector operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Lookup and Selection Errors ===
    /// A cluster or school identifier is not in the catalog.
    #[error("unknown {kind} '{id}'")]
    NotFound {
        /// What was looked up ("cluster" or "school").
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// A school was selected before any cluster.
    #[error("no cluster selected")]
    NoClusterSelected,

    /// A staging operation was attempted before selecting a school.
    #[error("no school selected")]
    NoSchoolSelected,

    /// The school does not belong to the selected cluster.
    #[error("school '{school_id}' is not part of cluster '{cluster}'")]
    InvalidSelection {
        /// The requested school.
        school_id: String,
        /// The currently selected cluster.
        cluster: String,
    },

    /// Switching selection would drop staged records that were never committed.
    #[error(
        "{count} staged record(s) for school '{school_id}' are not saved; commit or clear them first"
    )]
    UnsavedStagedRecords {
        /// School whose buffer still holds records.
        school_id: String,
        /// Number of staged records.
        count: usize,
    },

    // === Staging Errors ===
    /// A teacher record field is malformed.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// The offending field.
        field: TeacherField,
        /// What is wrong with it.
        reason: String,
    },

    /// Removal of a staged entry that does not exist.
    #[error("no staged record at position {index} (buffer holds {len})")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Current buffer length.
        len: usize,
    },

    // === Durable Store Errors ===
    /// Writing committed records failed; nothing was appended.
    #[error("failed to save records for school '{school_id}': {source}")]
    CommitFailed {
        /// School whose batch was being committed.
        school_id: String,
        /// The underlying storage error.
        #[source]
        source: Box<Error>,
    },

    /// The persisted record mapping could not be decoded.
    #[error("stored records under key '{key}' are unreadable: {message}")]
    StoreCorrupt {
        /// Storage key that holds the mapping.
        key: String,
        /// Decoder message.
        message: String,
    },

    /// A key-value backend rejected a write.
    #[error("storage write failed for key '{key}': {message}")]
    StorageWrite {
        /// Key being written.
        key: String,
        /// Description of what went wrong.
        message: String,
    },

    // === Export Errors ===
    /// Building or handing off the export document failed.
    #[error("export failed: {message}")]
    ExportFailed {
        /// Description of what went wrong.
        message: String,
    },

    // === Catalog Errors ===
    /// The catalog file is malformed or inconsistent.
    #[error("invalid catalog: {message}")]
    CatalogInvalid {
        /// Description of the problem.
        message: String,
    },

    // === Database Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for roster-collector operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a cluster-not-found error.
    #[must_use]
    pub fn cluster_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "cluster",
            id: id.into(),
        }
    }

    /// Create a school-not-found error.
    #[must_use]
    pub fn school_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "school",
            id: id.into(),
        }
    }

    /// Create a validation error for a record field.
    #[must_use]
    pub fn validation(field: TeacherField, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Create an export error.
    #[must_use]
    pub fn export_failed(message: impl Into<String>) -> Self {
        Self::ExportFailed {
            message: message.into(),
        }
    }

    /// Check if this error is a record validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error came from cluster/school selection.
    #[must_use]
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::NoClusterSelected
                | Self::NoSchoolSelected
                | Self::InvalidSelection { .. }
                | Self::UnsavedStagedRecords { .. }
        )
    }

    /// Check if retrying the same operation may succeed.
    ///
    /// Commit and export failures leave all data in place.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::CommitFailed { .. } | Self::ExportFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::cluster_not_found("NOWHERE");
        assert_eq!(err.to_string(), "unknown cluster 'NOWHERE'");

        let err = Error::school_not_found("123");
        assert_eq!(err.to_string(), "unknown school '123'");
    }

    #[test]
    fn test_validation_display_names_field() {
        let err = Error::validation(TeacherField::Phone, "must be exactly 10 digits");
        assert_eq!(err.to_string(), "invalid phone: must be exactly 10 digits");
        assert!(err.is_validation());
        assert!(!err.is_selection_error());
    }

    #[test]
    fn test_selection_errors() {
        assert!(Error::NoClusterSelected.is_selection_error());
        assert!(Error::NoSchoolSelected.is_selection_error());
        assert!(Error::InvalidSelection {
            school_id: "1".to_string(),
            cluster: "A".to_string(),
        }
        .is_selection_error());
        assert!(Error::UnsavedStagedRecords {
            school_id: "1".to_string(),
            count: 2,
        }
        .is_selection_error());
    }

    #[test]
    fn test_unsaved_staged_records_display() {
        let err = Error::UnsavedStagedRecords {
            school_id: "29050300106".to_string(),
            count: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("29050300106"));
        assert!(msg.contains('3'));
    }

    #[test]
    fn test_commit_failed_is_retryable() {
        let err = Error::CommitFailed {
            school_id: "29050300106".to_string(),
            source: Box::new(Error::StorageWrite {
                key: "teacher_records".to_string(),
                message: "quota exceeded".to_string(),
            }),
        };
        assert!(err.is_retryable());
        let msg = err.to_string();
        assert!(msg.contains("29050300106"));
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn test_export_failed() {
        let err = Error::export_failed("disk full");
        assert_eq!(err.to_string(), "export failed: disk full");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_index_out_of_range_display() {
        let err = Error::IndexOutOfRange { index: 5, len: 2 };
        assert_eq!(
            err.to_string(),
            "no staged record at position 5 (buffer holds 2)"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "records_key must not be empty".to_string(),
        };
        assert!(err.to_string().contains("records_key"));
    }

    #[test]
    fn test_store_corrupt_display() {
        let err = Error::StoreCorrupt {
            key: "teacher_records".to_string(),
            message: "expected value".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("teacher_records"));
        assert!(msg.contains("expected value"));
    }
}

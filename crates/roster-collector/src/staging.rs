//! In-session staging buffer.
//!
//! Holds teacher records entered for one school that have not yet been
//! committed to the durable store.

use tracing::debug;

use crate::error::{Error, Result};
use crate::record::TeacherRecord;
use crate::validation;

/// Ordered, not-yet-committed records for a single school.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingBuffer {
    school_id: String,
    records: Vec<TeacherRecord>,
}

impl StagingBuffer {
    /// Create an empty buffer for a school.
    #[must_use]
    pub fn new(school_id: impl Into<String>) -> Self {
        Self {
            school_id: school_id.into(),
            records: Vec::new(),
        }
    }

    /// The school this buffer is scoped to.
    #[must_use]
    pub fn school_id(&self) -> &str {
        &self.school_id
    }

    /// Normalize, validate and append a record.
    ///
    /// Identical records are allowed; two teachers may share a name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the offending field. The buffer is
    /// unchanged on error.
    pub fn add(&mut self, record: TeacherRecord) -> Result<usize> {
        let record = record.normalized();
        validation::validate(&record)?;
        debug!(
            "Staged '{}' for school {} ({} staged)",
            record.name,
            self.school_id,
            self.records.len() + 1
        );
        self.records.push(record);
        Ok(self.records.len())
    }

    /// Remove the record at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if there is no record at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<TeacherRecord> {
        if index >= self.records.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        let removed = self.records.remove(index);
        debug!("Removed staged '{}' from school {}", removed.name, self.school_id);
        Ok(removed)
    }

    /// Discard every staged record, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.records.len();
        self.records.clear();
        if dropped > 0 {
            debug!("Cleared {} staged record(s) for school {}", dropped, self.school_id);
        }
        dropped
    }

    /// Number of staged records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Staged records in insertion order.
    #[must_use]
    pub fn list(&self) -> &[TeacherRecord] {
        &self.records
    }
}

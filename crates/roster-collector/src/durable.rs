//! Durable per-school record store.
//!
//! The whole mapping of school id to committed records lives under one key
//! of a [`KeyValueStore`] as JSON. Every change builds the complete
//! replacement mapping, writes it with a single `set`, and only then swaps
//! it into memory. A failed write leaves both the backend and the in-memory
//! view exactly as they were.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::record::TeacherRecord;
use crate::storage::KeyValueStore;

/// Default key under which records are persisted.
pub const DEFAULT_RECORDS_KEY: &str = "teacher_records";

/// Committed records grouped by school id.
pub type RecordMap = BTreeMap<String, Vec<TeacherRecord>>;

/// Persistent mapping from school id to committed teacher records.
#[derive(Debug)]
pub struct DurableStore<S> {
    backend: S,
    key: String,
    records: RecordMap,
}

impl<S: KeyValueStore> DurableStore<S> {
    /// Load the store from `backend`, treating a missing key as empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreCorrupt`] if the stored bytes cannot be decoded,
    /// or the backend's read error.
    pub fn open(backend: S, key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let records = match backend.get(&key)? {
            Some(bytes) => {
                serde_json::from_slice::<RecordMap>(&bytes).map_err(|e| Error::StoreCorrupt {
                    key: key.clone(),
                    message: e.to_string(),
                })?
            }
            None => RecordMap::new(),
        };
        debug!(
            "Loaded {} record(s) for {} school(s) from key '{}'",
            records.values().map(Vec::len).sum::<usize>(),
            records.len(),
            key
        );
        Ok(Self {
            backend,
            key,
            records,
        })
    }

    /// Append `records` to the school's committed list.
    ///
    /// Returns the number of records appended. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the school is not in the catalog, or
    /// [`Error::CommitFailed`] if the write fails; in both cases nothing is
    /// appended.
    pub fn commit(
        &mut self,
        catalog: &Catalog,
        school_id: &str,
        records: &[TeacherRecord],
    ) -> Result<usize> {
        if !catalog.contains_school(school_id) {
            return Err(Error::school_not_found(school_id));
        }
        if records.is_empty() {
            return Ok(0);
        }

        let mut next = self.records.clone();
        next.entry(school_id.to_string())
            .or_default()
            .extend_from_slice(records);

        self.persist(next).map_err(|source| {
            warn!("Commit for school {} failed: {}", school_id, source);
            Error::CommitFailed {
                school_id: school_id.to_string(),
                source: Box::new(source),
            }
        })?;

        info!(
            "Committed {} record(s) for school {} ({} total)",
            records.len(),
            school_id,
            self.total_count()
        );
        Ok(records.len())
    }

    /// Remove every committed record, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns the backend's write error; the store is unchanged on failure.
    pub fn clear(&mut self) -> Result<usize> {
        let removed = self.total_count();
        self.persist(RecordMap::new())?;
        info!("Cleared {} committed record(s)", removed);
        Ok(removed)
    }

    /// All committed records, keyed by school id.
    #[must_use]
    pub fn all_records(&self) -> &RecordMap {
        &self.records
    }

    /// Committed records for one school (empty if none).
    #[must_use]
    pub fn records_for(&self, school_id: &str) -> &[TeacherRecord] {
        self.records
            .get(school_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Total committed records across all schools.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// The storage key in use.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Borrow the backend.
    #[must_use]
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Serialize and write `next`, then adopt it as the in-memory view.
    fn persist(&mut self, next: RecordMap) -> Result<()> {
        let bytes = serde_json::to_vec(&next)?;
        self.backend.set(&self.key, &bytes)?;
        self.records = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FlakyStore, MemoryStore};

    const SCHOOL: &str = "29050300106";
    const OTHER_SCHOOL: &str = "29050301468";

    fn catalog() -> Catalog {
        Catalog::bundled().unwrap()
    }

    fn names(records: &[TeacherRecord]) -> Vec<&str> {
        records.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_open_empty() {
        let store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();
        assert_eq!(store.total_count(), 0);
        assert!(store.all_records().is_empty());
        assert!(store.records_for(SCHOOL).is_empty());
        assert_eq!(store.key(), DEFAULT_RECORDS_KEY);
    }

    #[test]
    fn test_commit_appends() {
        let catalog = catalog();
        let mut store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();

        let first = [TeacherRecord::new("Asha"), TeacherRecord::new("Ravi")];
        let second = [TeacherRecord::new("Meena")];
        assert_eq!(store.commit(&catalog, SCHOOL, &first).unwrap(), 2);
        assert_eq!(store.commit(&catalog, SCHOOL, &second).unwrap(), 1);

        assert_eq!(names(store.records_for(SCHOOL)), ["Asha", "Ravi", "Meena"]);
        assert_eq!(store.total_count(), 3);
    }

    #[test]
    fn test_commit_keeps_schools_apart() {
        let catalog = catalog();
        let mut store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();

        store
            .commit(&catalog, SCHOOL, &[TeacherRecord::new("Asha")])
            .unwrap();
        store
            .commit(&catalog, OTHER_SCHOOL, &[TeacherRecord::new("Ravi")])
            .unwrap();

        assert_eq!(names(store.records_for(SCHOOL)), ["Asha"]);
        assert_eq!(names(store.records_for(OTHER_SCHOOL)), ["Ravi"]);
        assert_eq!(store.all_records().len(), 2);
    }

    #[test]
    fn test_commit_unknown_school() {
        let catalog = catalog();
        let mut store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();

        let err = store
            .commit(&catalog, "00000000000", &[TeacherRecord::new("Asha")])
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "school", .. }));
        assert_eq!(store.total_count(), 0);
    }

    #[test]
    fn test_commit_empty_batch_is_noop() {
        let catalog = catalog();
        let mut store = DurableStore::open(FlakyStore::default(), DEFAULT_RECORDS_KEY).unwrap();
        store.backend.write_switch().set(true);

        assert_eq!(store.commit(&catalog, SCHOOL, &[]).unwrap(), 0);
        assert!(store.all_records().is_empty());
    }

    #[test]
    fn test_commit_failure_changes_nothing() {
        let catalog = catalog();
        let mut store = DurableStore::open(FlakyStore::default(), DEFAULT_RECORDS_KEY).unwrap();
        store
            .commit(&catalog, SCHOOL, &[TeacherRecord::new("Asha")])
            .unwrap();

        store.backend.write_switch().set(true);
        let err = store
            .commit(&catalog, SCHOOL, &[TeacherRecord::new("Ravi")])
            .unwrap_err();
        assert!(matches!(err, Error::CommitFailed { .. }));
        assert!(err.is_retryable());
        assert_eq!(names(store.records_for(SCHOOL)), ["Asha"]);

        let persisted: RecordMap =
            serde_json::from_slice(&store.backend().get(DEFAULT_RECORDS_KEY).unwrap().unwrap())
                .unwrap();
        assert_eq!(persisted[SCHOOL].len(), 1);

        store.backend.write_switch().set(false);
        store
            .commit(&catalog, SCHOOL, &[TeacherRecord::new("Ravi")])
            .unwrap();
        assert_eq!(names(store.records_for(SCHOOL)), ["Asha", "Ravi"]);
    }

    #[test]
    fn test_reopen_sees_commits() {
        let catalog = catalog();
        let mut store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();
        let record = TeacherRecord::new("Asha Patil")
            .with_phone("9812345678")
            .with_subject("Kannada");
        store
            .commit(&catalog, SCHOOL, std::slice::from_ref(&record))
            .unwrap();

        let backend = store.backend().clone();
        let reopened = DurableStore::open(backend, DEFAULT_RECORDS_KEY).unwrap();
        assert_eq!(reopened.records_for(SCHOOL), [record]);
    }

    #[test]
    fn test_open_corrupt_bytes() {
        let mut backend = MemoryStore::new();
        backend.set(DEFAULT_RECORDS_KEY, b"not json").unwrap();

        let err = DurableStore::open(backend, DEFAULT_RECORDS_KEY).unwrap_err();
        assert!(matches!(err, Error::StoreCorrupt { .. }));
    }

    #[test]
    fn test_clear() {
        let catalog = catalog();
        let mut store = DurableStore::open(MemoryStore::new(), DEFAULT_RECORDS_KEY).unwrap();
        store
            .commit(
                &catalog,
                SCHOOL,
                &[TeacherRecord::new("Asha"), TeacherRecord::new("Ravi")],
            )
            .unwrap();

        assert_eq!(store.clear().unwrap(), 2);
        assert_eq!(store.total_count(), 0);

        let reopened = DurableStore::open(store.backend().clone(), DEFAULT_RECORDS_KEY).unwrap();
        assert_eq!(reopened.total_count(), 0);
    }

    #[test]
    fn test_clear_failure_keeps_records() {
        let catalog = catalog();
        let mut store = DurableStore::open(FlakyStore::default(), DEFAULT_RECORDS_KEY).unwrap();
        store
            .commit(&catalog, SCHOOL, &[TeacherRecord::new("Asha")])
            .unwrap();

        store.backend.write_switch().set(true);
        assert!(store.clear().is_err());
        assert_eq!(store.total_count(), 1);
    }
}

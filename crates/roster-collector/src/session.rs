//! Operator session: cluster/school selection and the active staging buffer.
//!
//! A [`Session`] replaces the click handlers of a form-driven UI with plain
//! method calls. It borrows the catalog, owns the durable store, and keeps
//! at most one staging buffer, always scoped to the selected school.
//!
//! Switching cluster or school while records are staged is refused with
//! [`Error::UnsavedStagedRecords`]; the operator must commit or clear first.

use tracing::{debug, warn};

use crate::catalog::{Catalog, School};
use crate::durable::DurableStore;
use crate::error::{Error, Result};
use crate::export::{export_all, ExportDocument};
use crate::record::TeacherRecord;
use crate::staging::StagingBuffer;
use crate::storage::KeyValueStore;
use crate::summary::{summarize, Summary};

/// Selection state plus the staging buffer for the selected school.
#[derive(Debug)]
pub struct Session<'c, S> {
    catalog: &'c Catalog,
    store: DurableStore<S>,
    cluster: Option<&'c str>,
    staging: Option<StagingBuffer>,
}

impl<'c, S: KeyValueStore> Session<'c, S> {
    /// Start a session with nothing selected.
    #[must_use]
    pub fn new(catalog: &'c Catalog, store: DurableStore<S>) -> Self {
        Self {
            catalog,
            store,
            cluster: None,
            staging: None,
        }
    }

    /// The catalog this session selects from.
    #[must_use]
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// The durable store.
    #[must_use]
    pub fn store(&self) -> &DurableStore<S> {
        &self.store
    }

    /// End the session, returning the durable store.
    ///
    /// Anything still staged is dropped; callers check [`Self::staged_len`] first.
    #[must_use]
    pub fn into_store(self) -> DurableStore<S> {
        self.store
    }

    /// The selected cluster name.
    #[must_use]
    pub fn selected_cluster(&self) -> Option<&'c str> {
        self.cluster
    }

    /// The selected school.
    #[must_use]
    pub fn selected_school(&self) -> Option<&'c School> {
        let id = self.staging.as_ref()?.school_id();
        self.catalog.locate(id).map(|(_, school)| school)
    }

    /// Select a cluster, clearing the school selection.
    ///
    /// Returns the cluster's schools.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown cluster, or
    /// [`Error::UnsavedStagedRecords`] if records are staged.
    pub fn select_cluster(&mut self, cluster_id: &str) -> Result<&'c [School]> {
        let cluster = self
            .catalog
            .cluster(cluster_id)
            .ok_or_else(|| Error::cluster_not_found(cluster_id))?;
        self.ensure_nothing_staged()?;

        self.cluster = Some(cluster.name.as_str());
        self.staging = None;
        debug!("Selected cluster {}", cluster.name);
        Ok(&cluster.schools)
    }

    /// Select a school within the selected cluster and start an empty buffer.
    ///
    /// Selecting the school that is already selected keeps its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoClusterSelected`], [`Error::NotFound`] for an unknown
    /// school, [`Error::InvalidSelection`] for a school of another cluster, or
    /// [`Error::UnsavedStagedRecords`] if another school has staged records.
    pub fn select_school(&mut self, school_id: &str) -> Result<&'c School> {
        let cluster = self.cluster.ok_or(Error::NoClusterSelected)?;
        let (owner, school) = self
            .catalog
            .locate(school_id)
            .ok_or_else(|| Error::school_not_found(school_id))?;
        if owner.name != cluster {
            return Err(Error::InvalidSelection {
                school_id: school_id.to_string(),
                cluster: cluster.to_string(),
            });
        }

        if self.staging.as_ref().map(StagingBuffer::school_id) == Some(school_id) {
            return Ok(school);
        }
        self.ensure_nothing_staged()?;

        self.staging = Some(StagingBuffer::new(school_id));
        debug!("Selected school {} ({})", school.id, school.name);
        Ok(school)
    }

    /// Validate and stage a record for the selected school.
    ///
    /// Returns the new number of staged records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchoolSelected`] or [`Error::Validation`].
    pub fn add(&mut self, record: TeacherRecord) -> Result<usize> {
        self.buffer_mut()?.add(record)
    }

    /// Remove one staged record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchoolSelected`] or [`Error::IndexOutOfRange`].
    pub fn remove_at(&mut self, index: usize) -> Result<TeacherRecord> {
        self.buffer_mut()?.remove_at(index)
    }

    /// Discard all staged records, returning how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchoolSelected`].
    pub fn clear_staged(&mut self) -> Result<usize> {
        Ok(self.buffer_mut()?.clear())
    }

    /// Staged records for the selected school.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchoolSelected`].
    pub fn staged(&self) -> Result<&[TeacherRecord]> {
        self.staging
            .as_ref()
            .map(StagingBuffer::list)
            .ok_or(Error::NoSchoolSelected)
    }

    /// Number of staged records (0 when no school is selected).
    #[must_use]
    pub fn staged_len(&self) -> usize {
        self.staging.as_ref().map_or(0, StagingBuffer::len)
    }

    /// Commit the staging buffer to the durable store, then empty it.
    ///
    /// Returns how many records were committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSchoolSelected`] or [`Error::CommitFailed`]. On
    /// failure the buffer is left intact for a retry.
    pub fn commit(&mut self) -> Result<usize> {
        let buffer = self.staging.as_mut().ok_or(Error::NoSchoolSelected)?;
        let committed = self
            .store
            .commit(self.catalog, buffer.school_id(), buffer.list())?;
        buffer.clear();
        Ok(committed)
    }

    /// Summary of committed records.
    #[must_use]
    pub fn summary(&self) -> Summary {
        summarize(self.catalog, &self.store)
    }

    /// Export all committed records as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExportFailed`].
    pub fn export(&self) -> Result<ExportDocument> {
        export_all(self.catalog, &self.store)
    }

    fn buffer_mut(&mut self) -> Result<&mut StagingBuffer> {
        self.staging.as_mut().ok_or(Error::NoSchoolSelected)
    }

    fn ensure_nothing_staged(&self) -> Result<()> {
        match &self.staging {
            Some(buffer) if !buffer.is_empty() => {
                warn!(
                    "Refusing selection change: {} staged record(s) for school {}",
                    buffer.len(),
                    buffer.school_id()
                );
                Err(Error::UnsavedStagedRecords {
                    school_id: buffer.school_id().to_string(),
                    count: buffer.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

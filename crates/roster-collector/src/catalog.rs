//! Read-only cluster and school catalog.
//!
//! The Bhalaki block catalog is compiled into the binary. A replacement
//! file in the same JSON layout can be loaded instead.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Catalog JSON compiled into the binary.
const BUNDLED_CATALOG: &str = include_str!("../data/catalog.json");

/// A single school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct School {
    /// UDISE-style school code, unique across the catalog.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// An administrative cluster and its schools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster name, which doubles as its identifier.
    pub name: String,
    /// Schools in catalog order.
    pub schools: Vec<School>,
}

/// In-memory index of clusters and schools.
#[derive(Debug, Clone)]
pub struct Catalog {
    clusters: Vec<Cluster>,
    /// school id -> (cluster index, school index)
    index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    /// Build a catalog, checking that names and school ids are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogInvalid`] on empty or duplicate identifiers.
    pub fn new(clusters: Vec<Cluster>) -> Result<Self> {
        let mut index = HashMap::new();
        let mut seen_clusters = HashMap::new();

        for (ci, cluster) in clusters.iter().enumerate() {
            if cluster.name.trim().is_empty() {
                return Err(Error::CatalogInvalid {
                    message: format!("cluster #{ci} has an empty name"),
                });
            }
            if seen_clusters.insert(cluster.name.as_str(), ci).is_some() {
                return Err(Error::CatalogInvalid {
                    message: format!("duplicate cluster '{}'", cluster.name),
                });
            }
            for (si, school) in cluster.schools.iter().enumerate() {
                if school.id.trim().is_empty() {
                    return Err(Error::CatalogInvalid {
                        message: format!("school #{si} in '{}' has an empty id", cluster.name),
                    });
                }
                if index.insert(school.id.clone(), (ci, si)).is_some() {
                    return Err(Error::CatalogInvalid {
                        message: format!("duplicate school id '{}'", school.id),
                    });
                }
            }
        }

        Ok(Self { clusters, index })
    }

    /// The catalog bundled with the application.
    ///
    /// # Errors
    ///
    /// Returns an error only if the bundled file is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_CATALOG)
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the catalog is inconsistent.
    pub fn from_json(json: &str) -> Result<Self> {
        let clusters: Vec<Cluster> =
            serde_json::from_str(json).map_err(|e| Error::CatalogInvalid {
                message: e.to_string(),
            })?;
        Self::new(clusters)
    }

    /// Load a catalog file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// All clusters in catalog order.
    #[must_use]
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Look up a cluster by name.
    #[must_use]
    pub fn cluster(&self, cluster_id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.name == cluster_id)
    }

    /// Schools of a cluster in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the cluster is unknown.
    pub fn schools_of(&self, cluster_id: &str) -> Result<&[School]> {
        self.cluster(cluster_id)
            .map(|c| c.schools.as_slice())
            .ok_or_else(|| Error::cluster_not_found(cluster_id))
    }

    /// Find a school and the cluster that owns it.
    #[must_use]
    pub fn locate(&self, school_id: &str) -> Option<(&Cluster, &School)> {
        let &(ci, si) = self.index.get(school_id)?;
        let cluster = &self.clusters[ci];
        Some((cluster, &cluster.schools[si]))
    }

    /// Check whether the school id exists.
    #[must_use]
    pub fn contains_school(&self, school_id: &str) -> bool {
        self.index.contains_key(school_id)
    }

    /// Total number of schools.
    #[must_use]
    pub fn school_count(&self) -> usize {
        self.index.len()
    }
}

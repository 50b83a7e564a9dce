//! Read-only aggregation over committed records.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::durable::DurableStore;
use crate::export::schools_in_export_order;
use crate::storage::KeyValueStore;

/// Committed records for one school.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchoolSummary {
    /// Owning cluster, `None` if the school is no longer in the catalog.
    pub cluster: Option<String>,
    /// School id.
    pub school_id: String,
    /// School name, `None` if the school is no longer in the catalog.
    pub school_name: Option<String>,
    /// Number of committed records.
    pub count: usize,
    /// Teacher names in committed order.
    pub teacher_names: Vec<String>,
}

/// Totals over the durable store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Sum of all committed records.
    pub total_record_count: usize,
    /// Committed record count per school id.
    pub per_school_counts: BTreeMap<String, usize>,
    /// Per-school listing in export order.
    pub schools: Vec<SchoolSummary>,
}

/// Recompute the summary from the current store contents.
#[must_use]
pub fn summarize<S: KeyValueStore>(catalog: &Catalog, store: &DurableStore<S>) -> Summary {
    let schools: Vec<SchoolSummary> = schools_in_export_order(catalog, store.all_records())
        .into_iter()
        .map(|entry| SchoolSummary {
            cluster: entry.cluster.map(str::to_string),
            school_id: entry.school_id.to_string(),
            school_name: entry.school_name.map(str::to_string),
            count: entry.records.len(),
            teacher_names: entry.records.iter().map(|r| r.name.clone()).collect(),
        })
        .collect();

    Summary {
        total_record_count: store.total_count(),
        per_school_counts: schools
            .iter()
            .map(|s| (s.school_id.clone(), s.count))
            .collect(),
        schools,
    }
}

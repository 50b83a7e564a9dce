//! CSV export of all committed records.
//!
//! Rows follow catalog order: clusters as bundled, schools as listed within
//! each cluster, records as committed. Records kept under school ids the
//! current catalog does not know come last, by ascending id, with empty
//! cluster and school name cells.

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::info;

use crate::catalog::Catalog;
use crate::durable::{DurableStore, RecordMap};
use crate::error::{Error, Result};
use crate::record::{TeacherField, TeacherRecord};
use crate::storage::KeyValueStore;

/// Column headings of the export, in order.
pub const COLUMNS: [&str; 11] = [
    "Cluster",
    "SchoolID",
    "SchoolName",
    "Name",
    "Phone",
    "YearOfBirth",
    "YearOfJoining",
    "Designation",
    "GradeTaught",
    "Subject",
    "Notes",
];

/// Row terminator.
pub const LINE_ENDING: &str = "\r\n";

/// Default prefix of exported file names.
pub const DEFAULT_FILE_PREFIX: &str = "bhalaki_teachers";

/// A generated CSV document, ready to hand to the host for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    contents: String,
    rows: usize,
}

impl ExportDocument {
    /// The CSV text.
    #[must_use]
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// The CSV text as UTF-8 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_bytes()
    }

    /// Number of data rows (excluding the header).
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// File name for an export taken on `date`, e.g. `bhalaki_teachers_2024-06-01.csv`.
    #[must_use]
    pub fn file_name(prefix: &str, date: NaiveDate) -> String {
        format!("{prefix}_{}.csv", date.format("%Y-%m-%d"))
    }

    /// Write the document into `dir` as `file_name`.
    ///
    /// The file is written next to its final name and renamed into place, so
    /// a failed save never leaves a truncated export behind. The data is
    /// synced before the rename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExportFailed`] if the directory or file cannot be written.
    pub fn save_to(&self, dir: &Path, file_name: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|e| {
            Error::export_failed(format!("cannot create {}: {e}", dir.display()))
        })?;

        let target = dir.join(file_name);
        let partial = dir.join(format!(".{file_name}.partial"));
        write_synced(&partial, self.as_bytes())
            .and_then(|()| std::fs::rename(&partial, &target))
            .map_err(|e| {
                let _ = std::fs::remove_file(&partial);
                Error::export_failed(format!("cannot write {}: {e}", target.display()))
            })?;

        info!("Saved export with {} row(s) to {}", self.rows, target.display());
        Ok(target)
    }
}

/// Write `bytes` to `path` and flush them to the device before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// One school's slice of the export, with its catalog context.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SchoolEntry<'a> {
    pub cluster: Option<&'a str>,
    pub school_id: &'a str,
    pub school_name: Option<&'a str>,
    pub records: &'a [TeacherRecord],
}

/// Schools with committed records, in export order.
pub(crate) fn schools_in_export_order<'a>(
    catalog: &'a Catalog,
    records: &'a RecordMap,
) -> Vec<SchoolEntry<'a>> {
    let mut entries = Vec::with_capacity(records.len());

    for cluster in catalog.clusters() {
        for school in &cluster.schools {
            if let Some(list) = records.get(&school.id).filter(|l| !l.is_empty()) {
                entries.push(SchoolEntry {
                    cluster: Some(cluster.name.as_str()),
                    school_id: &school.id,
                    school_name: Some(school.name.as_str()),
                    records: list,
                });
            }
        }
    }

    for (school_id, list) in records {
        if !list.is_empty() && !catalog.contains_school(school_id) {
            entries.push(SchoolEntry {
                cluster: None,
                school_id,
                school_name: None,
                records: list,
            });
        }
    }

    entries
}

/// Flatten every committed record into one CSV document.
///
/// # Errors
///
/// Returns [`Error::ExportFailed`] if the document cannot be assembled.
pub fn export_all<S: KeyValueStore>(
    catalog: &Catalog,
    store: &DurableStore<S>,
) -> Result<ExportDocument> {
    let entries = schools_in_export_order(catalog, store.all_records());

    let mut contents = String::new();
    let mut rows = 0;
    write_row(&mut contents, COLUMNS.iter().copied())?;

    for entry in &entries {
        for record in entry.records {
            let context = [
                entry.cluster.unwrap_or_default(),
                entry.school_id,
                entry.school_name.unwrap_or_default(),
            ];
            let fields = TeacherField::ALL
                .iter()
                .map(|f| record.field(*f).unwrap_or_default());
            write_row(&mut contents, context.into_iter().chain(fields))?;
            rows += 1;
        }
    }

    info!("Exported {} row(s) from {} school(s)", rows, entries.len());
    Ok(ExportDocument { contents, rows })
}

fn write_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>) -> Result<()> {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            out.push(',');
        }
        write!(out, "{}", csv_quote(cell))
            .map_err(|e| Error::export_failed(format!("cannot format row: {e}")))?;
    }
    out.push_str(LINE_ENDING);
    Ok(())
}

/// Quote a cell if it contains a delimiter, quote or line break.
#[must_use]
pub fn csv_quote(s: &str) -> std::borrow::Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\"")).into()
    } else {
        s.into()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{Cluster, School};
    use crate::storage::MemoryStore;

    /// RFC 4180 reader used to check exports round-trip.
    pub(crate) fn parse_csv(text: &str) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        let mut row = Vec::new();
        let mut cell = String::new();
        let mut in_quotes = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            if in_quotes {
                match ch {
                    '"' if chars.peek() == Some(&'"') => {
                        cell.push('"');
                        chars.next();
                    }
                    '"' => in_quotes = false,
                    _ => cell.push(ch),
                }
                continue;
            }
            match ch {
                '"' => in_quotes = true,
                ',' => row.push(std::mem::take(&mut cell)),
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    row.push(std::mem::take(&mut cell));
                    rows.push(std::mem::take(&mut row));
                }
                _ => cell.push(ch),
            }
        }
        if !cell.is_empty() || !row.is_empty() {
            row.push(cell);
            rows.push(row);
        }
        rows
    }

    fn store_with(
        catalog: &Catalog,
        batches: &[(&str, Vec<TeacherRecord>)],
    ) -> DurableStore<MemoryStore> {
        let mut store = DurableStore::open(MemoryStore::new(), "k").unwrap();
        for (school, records) in batches {
            store.commit(catalog, school, records).unwrap();
        }
        store
    }

    #[test]
    fn test_empty_store_exports_header_only() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(&catalog, &[]);

        let doc = export_all(&catalog, &store).unwrap();
        assert_eq!(doc.rows(), 0);
        assert_eq!(doc.contents(), format!("{}\r\n", COLUMNS.join(",")));
    }

    #[test]
    fn test_single_record_row() {
        let catalog = Catalog::bundled().unwrap();
        let record = TeacherRecord::new("Asha Patil")
            .with_phone("9812345678")
            .with_subject("Kannada");
        let store = store_with(&catalog, &[("29050300106", vec![record])]);

        let doc = export_all(&catalog, &store).unwrap();
        let rows = parse_csv(doc.contents());
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            [
                "ALWAI MARATHI",
                "29050300106",
                "GOVT. HPS MAR. ALWAI",
                "Asha Patil",
                "9812345678",
                "",
                "",
                "",
                "",
                "Kannada",
                ""
            ]
        );
    }

    #[test]
    fn test_absent_fields_are_empty_cells() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(&catalog, &[("29050300106", vec![TeacherRecord::new("A")])]);

        let doc = export_all(&catalog, &store).unwrap();
        assert!(!doc.contents().contains("null"));
        assert!(!doc.contents().contains("undefined"));
        assert!(doc
            .contents()
            .ends_with("29050300106,GOVT. HPS MAR. ALWAI,A,,,,,,,\r\n"));
    }

    #[test]
    fn test_special_characters_round_trip() {
        let catalog = Catalog::bundled().unwrap();
        let record = TeacherRecord::new("D'Souza, \"Tony\"")
            .with_subject("Math, Science")
            .with_notes("first line\nsecond line\r\nthird");
        let store = store_with(&catalog, &[("29050300106", vec![record.clone()])]);

        let doc = export_all(&catalog, &store).unwrap();
        let rows = parse_csv(doc.contents());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][3], record.name);
        assert_eq!(rows[1][9], "Math, Science");
        assert_eq!(rows[1][10], "first line\nsecond line\r\nthird");
    }

    #[test]
    fn test_row_count_matches_total() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(
            &catalog,
            &[
                ("29050301468", vec![TeacherRecord::new("B1")]),
                (
                    "29050300106",
                    vec![TeacherRecord::new("A1"), TeacherRecord::new("A2")],
                ),
                ("29050300106", vec![TeacherRecord::new("A3")]),
            ],
        );

        let doc = export_all(&catalog, &store).unwrap();
        assert_eq!(doc.rows(), store.total_count());
        assert_eq!(parse_csv(doc.contents()).len(), store.total_count() + 1);
    }

    #[test]
    fn test_catalog_order_not_commit_order() {
        let catalog = Catalog::bundled().unwrap();
        // AMBESANGVI committed first, ALWAI MARATHI still exports first.
        let store = store_with(
            &catalog,
            &[
                ("29050301468", vec![TeacherRecord::new("B1")]),
                ("29050309104", vec![TeacherRecord::new("A2")]),
                ("29050300106", vec![TeacherRecord::new("A1")]),
            ],
        );

        let doc = export_all(&catalog, &store).unwrap();
        let names: Vec<_> = parse_csv(doc.contents())
            .into_iter()
            .skip(1)
            .map(|r| r[3].clone())
            .collect();
        assert_eq!(names, ["A1", "A2", "B1"]);

        let again = export_all(&catalog, &store).unwrap();
        assert_eq!(doc, again);
    }

    #[test]
    fn test_unknown_school_ids_exported_last() {
        let full = Catalog::new(vec![Cluster {
            name: "C".to_string(),
            schools: vec![
                School {
                    id: "1".to_string(),
                    name: "One".to_string(),
                },
                School {
                    id: "2".to_string(),
                    name: "Two".to_string(),
                },
            ],
        }])
        .unwrap();
        let store = store_with(
            &full,
            &[
                ("2", vec![TeacherRecord::new("Gone")]),
                ("1", vec![TeacherRecord::new("Kept")]),
            ],
        );

        let reduced = Catalog::new(vec![Cluster {
            name: "C".to_string(),
            schools: vec![School {
                id: "1".to_string(),
                name: "One".to_string(),
            }],
        }])
        .unwrap();

        let rows = parse_csv(export_all(&reduced, &store).unwrap().contents());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][..4], ["C", "1", "One", "Kept"]);
        assert_eq!(rows[2][..4], ["", "2", "", "Gone"]);
    }

    #[test]
    fn test_export_does_not_mutate_store() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(&catalog, &[("29050300106", vec![TeacherRecord::new("A")])]);
        let before = store.all_records().clone();

        export_all(&catalog, &store).unwrap();
        assert_eq!(store.all_records(), &before);
    }

    #[test]
    fn test_csv_quote() {
        assert_eq!(csv_quote("plain"), "plain");
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_quote("two\nlines"), "\"two\nlines\"");
        assert_eq!(csv_quote(""), "");
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert_eq!(
            ExportDocument::file_name(DEFAULT_FILE_PREFIX, date),
            "bhalaki_teachers_2024-06-01.csv"
        );
    }

    #[test]
    fn test_save_to() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(&catalog, &[("29050300106", vec![TeacherRecord::new("A")])]);
        let doc = export_all(&catalog, &store).unwrap();

        let dir = std::env::temp_dir().join(format!(
            "roster_collector_export_{}",
            std::process::id()
        ));
        let path = doc.save_to(&dir, "out.csv").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), doc.contents());
        assert!(!dir.join(".out.csv.partial").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_to_unwritable_dir() {
        let catalog = Catalog::bundled().unwrap();
        let store = store_with(&catalog, &[("29050300106", vec![TeacherRecord::new("A")])]);
        let doc = export_all(&catalog, &store).unwrap();

        let blocker = std::env::temp_dir().join(format!(
            "roster_collector_export_blocker_{}",
            std::process::id()
        ));
        std::fs::write(&blocker, b"plain file").unwrap();

        let err = doc.save_to(&blocker.join("exports"), "out.csv").unwrap_err();
        assert!(matches!(err, Error::ExportFailed { .. }));
        assert!(err.is_retryable());
        assert_eq!(std::fs::read(&blocker).unwrap(), b"plain file");

        let _ = std::fs::remove_file(&blocker);
    }
}

//! CSV output formatter for scan and resolve results.
//!
//! Provides machine-readable CSV output for spreadsheets and data analysis.
//! One row is generated for each file in a duplicate group.
//!
//! # Columns
//!
//! - `group_id`: Numeric ID identifying the duplicate group (1-based)
//! - `checksum`: Content checksum reported by the backend
//! - `id`: Backend file id
//! - `name`: File name
//! - `size`: File size in bytes
//! - `modified`: Last modified time, empty if unknown
//! - `parents`: Parent folder ids separated by `;`
//! - `action`: `keep` or `trash`
//! - `reason`: Rule that selected the file, empty for kept files

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::duplicates::{DuplicateGroup, RemovalSet};

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    checksum: &'a str,
    id: &'a str,
    name: &'a str,
    size: u64,
    modified: &'a str,
    parents: String,
    action: &'static str,
    reason: String,
}

/// CSV output formatter.
pub struct CsvOutput<'a> {
    groups: &'a [DuplicateGroup],
    removal: &'a RemovalSet,
}

impl<'a> CsvOutput<'a> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], removal: &'a RemovalSet) -> Self {
        Self { groups, removal }
    }

    /// Write the CSV output to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        for (idx, group) in self.groups.iter().enumerate() {
            for file in &group.files {
                let reason = self.removal.reason_for(&file.id);
                let row = CsvRow {
                    group_id: idx + 1,
                    checksum: &group.checksum,
                    id: &file.id,
                    name: &file.name,
                    size: file.size_or_zero(),
                    modified: file.modified_or_empty(),
                    parents: file.parents.join(";"),
                    action: if reason.is_some() { "trash" } else { "keep" },
                    reason: reason.map(ToString::to_string).unwrap_or_default(),
                };
                csv_writer.serialize(row)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::FileRecord;
    use crate::duplicates::{KeepStrategy, SelectionEngine};

    fn groups() -> Vec<DuplicateGroup> {
        vec![DuplicateGroup::new(
            "c1",
            vec![
                FileRecord::new("a", "report, final.pdf")
                    .with_checksum("c1")
                    .with_size(5)
                    .with_modified_time("2023-01-01T00:00:00Z")
                    .with_parent("P1")
                    .with_parent("P2"),
                FileRecord::new("b", "report.pdf").with_checksum("c1").with_size(5),
            ],
        )]
    }

    #[test]
    fn test_csv_output_basic() {
        let groups = groups();
        let mut engine = SelectionEngine::new(&groups);
        engine.apply_keep_strategy(KeepStrategy::Newest);
        let removal = engine.finish();

        let csv = CsvOutput::new(&groups, &removal).to_string().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "group_id,checksum,id,name,size,modified,parents,action,reason"
        );
        assert_eq!(
            lines[1],
            "1,c1,a,\"report, final.pdf\",5,2023-01-01T00:00:00Z,P1;P2,keep,"
        );
        assert_eq!(lines[2], "1,c1,b,report.pdf,5,,,trash,keep newest");
    }

    #[test]
    fn test_csv_output_empty() {
        let removal = RemovalSet::new();
        let csv = CsvOutput::new(&[], &removal).to_string().unwrap();
        assert!(csv.is_empty());
    }
}

//! JSON output formatter for scan and resolve results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "checksum": "d41d8cd98f00b204e9800998ecf8427e",
//!       "size": 1024,
//!       "files": [
//!         { "id": "1a2b", "name": "report.pdf", "size": 1024,
//!           "modified_time": "2023-01-01T00:00:00Z", "parents": ["F1"],
//!           "action": "keep" }
//!       ]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 5,
//!     "marked_for_removal": 6,
//!     "exit_code": 0,
//!     "exit_code_name": "DD000"
//!   }
//! }
//! ```

use std::io::Write;

use serde::Serialize;

use crate::drive::FileRecord;
use crate::duplicates::{DuplicateGroup, RemovalSet, ResolveReport};
use crate::error::ExitCode;

/// A single file inside a duplicate group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Backend file id
    pub id: String,
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Modification time, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    /// Parent folder ids
    pub parents: Vec<String>,
    /// "keep" or "trash"
    pub action: &'static str,
    /// Rule that selected the file for removal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl JsonFile {
    fn new(file: &FileRecord, removal: &RemovalSet) -> Self {
        let reason = removal.reason_for(&file.id).map(ToString::to_string);
        Self {
            id: file.id.clone(),
            name: file.name.clone(),
            size: file.size_or_zero(),
            modified_time: file.modified_time.clone(),
            parents: file.parents.clone(),
            action: if reason.is_some() { "trash" } else { "keep" },
            reason,
        }
    }
}

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Content checksum
    pub checksum: String,
    /// Size of one copy in bytes
    pub size: u64,
    /// Every copy, in listing order
    pub files: Vec<JsonFile>,
}

impl JsonDuplicateGroup {
    /// Create a JSON duplicate group, flagging files present in `removal`.
    #[must_use]
    pub fn from_duplicate_group(group: &DuplicateGroup, removal: &RemovalSet) -> Self {
        Self {
            checksum: group.checksum.clone(),
            size: group.files.first().map_or(0, FileRecord::size_or_zero),
            files: group.files.iter().map(|f| JsonFile::new(f, removal)).collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of files listed
    pub total_files: usize,
    /// Total size of all listed files in bytes
    pub total_size: u64,
    /// Files without a checksum
    pub without_checksum: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of redundant copies
    pub duplicate_files: usize,
    /// Space held by redundant copies (bytes)
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Number of files selected for removal
    pub marked_for_removal: usize,
    /// Groups where every copy is selected
    pub fully_removed_groups: Vec<String>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Files moved to the trash
    pub trashed: usize,
    /// Files that could not be trashed
    pub failed: usize,
    /// Files skipped after an interruption
    pub not_attempted: usize,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "DD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Create a JSON summary from a resolve report and an exit code.
    #[must_use]
    pub fn from_report(report: &ResolveReport, exit_code: ExitCode) -> Self {
        let summary = &report.scan.summary;
        let trash = report.trash.as_ref();
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            without_checksum: summary.without_checksum,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: summary.scan_duration.as_millis() as u64,
            marked_for_removal: report.removal.len(),
            fully_removed_groups: report.fully_removed_groups.clone(),
            dry_run: report.dry_run,
            trashed: trash.map_or(0, |t| t.success_count()),
            failed: trash.map_or(0, |t| t.failure_count()),
            not_attempted: trash.map_or(0, |t| t.not_attempted),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// List of duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Create a new JSON output from a resolve report and exit code.
    #[must_use]
    pub fn new(report: &ResolveReport, exit_code: ExitCode) -> Self {
        Self {
            duplicates: report
                .scan
                .groups
                .iter()
                .map(|g| JsonDuplicateGroup::from_duplicate_group(g, &report.removal))
                .collect(),
            summary: JsonSummary::from_report(report, exit_code),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)
    }
}

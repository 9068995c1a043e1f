//! Checksum grouping and duplicate group management.
//!
//! # Overview
//!
//! Grouping is the first stage of duplicate resolution. It partitions the
//! flat file listing into buckets keyed by the backend-supplied content
//! checksum and keeps only buckets with two or more members.
//!
//! Ordering is part of the contract:
//! - members of a group keep their listing order, which makes "first in scan
//!   order" a reproducible tie-break for the selection rules;
//! - groups are returned in the order their checksum was first seen.
//!
//! # Example
//!
//! ```
//! use drivedupe::drive::FileRecord;
//! use drivedupe::duplicates::group_by_checksum;
//!
//! let files = vec![
//!     FileRecord::new("1", "a.txt").with_checksum("aaa"),
//!     FileRecord::new("2", "b.txt").with_checksum("aaa"),
//!     FileRecord::new("3", "c.txt").with_checksum("ccc"),
//!     FileRecord::new("4", "form.gdoc"), // no checksum: never a duplicate
//! ];
//!
//! let (groups, stats) = group_by_checksum(files);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].checksum, "aaa");
//! assert_eq!(stats.without_checksum, 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::drive::FileRecord;

/// Log grouping progress every this many files.
const PROGRESS_INTERVAL: usize = 100;

/// Files sharing one content checksum.
///
/// Membership is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Content checksum shared by every file in the group
    pub checksum: String,
    /// Members in listing order
    pub files: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    #[must_use]
    pub fn new(checksum: impl Into<String>, files: Vec<FileRecord>) -> Self {
        Self {
            checksum: checksum.into(),
            files,
        }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all copies in bytes.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(FileRecord::size_or_zero).sum()
    }

    /// Space held by the redundant copies (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        match self.files.first() {
            Some(first) if self.files.len() > 1 => {
                self.total_size().saturating_sub(first.size_or_zero())
            }
            _ => 0,
        }
    }

    /// Number of redundant copies (total - 1).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Ids of the members, in listing order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.id.as_str()).collect()
    }
}

/// Statistics from the grouping stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Files skipped because they carry no checksum
    pub without_checksum: usize,
    /// Number of distinct checksums seen
    pub unique_checksums: usize,
    /// Number of files that ended up in a duplicate group
    pub potential_duplicates: usize,
    /// Number of groups with 2+ files
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Files that could not take part in duplicate detection, as a percentage.
    #[must_use]
    pub fn unchecked_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.without_checksum as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Group files by content checksum.
///
/// Iterates the input once. Files without a (non-empty) checksum are
/// skipped. Only checksums shared by two or more files produce a group.
///
/// # Returns
///
/// A tuple of:
/// - `Vec<DuplicateGroup>` - groups in first-seen checksum order
/// - `GroupingStats` - statistics about the grouping
#[must_use]
pub fn group_by_checksum(
    files: impl IntoIterator<Item = FileRecord>,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut stats = GroupingStats::default();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<DuplicateGroup> = Vec::new();

    for file in files {
        stats.total_files += 1;
        stats.total_size += file.size_or_zero();

        match file.content_checksum() {
            Some(checksum) => match index.get(checksum) {
                Some(&slot) => buckets[slot].files.push(file),
                None => {
                    let checksum = checksum.to_string();
                    index.insert(checksum.clone(), buckets.len());
                    buckets.push(DuplicateGroup::new(checksum, vec![file]));
                }
            },
            None => {
                stats.without_checksum += 1;
                log::trace!("No checksum for {} ({}), skipping", file.name, file.id);
            }
        }

        if stats.total_files % PROGRESS_INTERVAL == 0 {
            log::debug!("Checked {} files", stats.total_files);
        }
    }

    stats.unique_checksums = buckets.len();

    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|group| group.len() > 1)
        .inspect(|group| {
            stats.potential_duplicates += group.len();
            log::debug!(
                "Checksum {}: {} copies",
                group.checksum,
                group.len()
            );
        })
        .collect();
    stats.duplicate_groups = groups.len();

    log::info!(
        "Checked {} files: {} duplicate group(s), {} file(s) without checksum",
        stats.total_files,
        stats.duplicate_groups,
        stats.without_checksum
    );

    (groups, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(id: &str, checksum: &str, size: u64) -> FileRecord {
        FileRecord::new(id, format!("{id}.txt"))
            .with_checksum(checksum)
            .with_size(size)
    }

    #[test]
    fn test_group_by_checksum_empty_input() {
        let (groups, stats) = group_by_checksum(Vec::new());

        assert!(groups.is_empty());
        assert_eq!(stats, GroupingStats::default());
    }

    #[test]
    fn test_group_by_checksum_all_unique() {
        let files = vec![
            make_file("a", "1", 10),
            make_file("b", "2", 10),
            make_file("c", "3", 10),
        ];
        let (groups, stats) = group_by_checksum(files);

        assert!(groups.is_empty());
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.unique_checksums, 3);
        assert_eq!(stats.potential_duplicates, 0);
    }

    #[test]
    fn test_group_by_checksum_with_duplicates() {
        let files = vec![
            make_file("a", "x", 100),
            make_file("b", "y", 200),
            make_file("c", "x", 100),
        ];
        let (groups, stats) = group_by_checksum(files);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].checksum, "x");
        assert_eq!(groups[0].ids(), vec!["a", "c"]);
        assert_eq!(stats.total_size, 400);
        assert_eq!(stats.potential_duplicates, 2);
        assert_eq!(stats.duplicate_groups, 1);
    }

    #[test]
    fn test_members_keep_listing_order() {
        let files = vec![
            make_file("z", "x", 1),
            make_file("m", "x", 1),
            make_file("a", "x", 1),
        ];
        let (groups, _) = group_by_checksum(files);
        assert_eq!(groups[0].ids(), vec!["z", "m", "a"]);
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let files = vec![
            make_file("1", "second", 1),
            make_file("2", "first", 1),
            make_file("3", "first", 1),
            make_file("4", "second", 1),
        ];
        let (groups, _) = group_by_checksum(files);

        let order: Vec<&str> = groups.iter().map(|g| g.checksum.as_str()).collect();
        assert_eq!(order, vec!["second", "first"]);
    }

    #[test]
    fn test_missing_and_empty_checksums_skipped() {
        let files = vec![
            FileRecord::new("a", "doc"),
            FileRecord::new("b", "doc"),
            FileRecord::new("c", "doc").with_checksum(""),
            FileRecord::new("d", "doc").with_checksum(""),
        ];
        let (groups, stats) = group_by_checksum(files);

        assert!(groups.is_empty());
        assert_eq!(stats.without_checksum, 4);
        assert!((stats.unchecked_rate() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_duplicate_group_wasted_space() {
        let group = DuplicateGroup::new(
            "x",
            vec![
                make_file("a", "x", 1000),
                make_file("b", "x", 1000),
                make_file("c", "x", 1000),
            ],
        );

        assert_eq!(group.total_size(), 3000);
        assert_eq!(group.wasted_space(), 2000);
        assert_eq!(group.duplicate_count(), 2);
    }

    #[test]
    fn test_duplicate_group_single_file() {
        let group = DuplicateGroup::new("x", vec![make_file("a", "x", 1000)]);

        assert_eq!(group.wasted_space(), 0);
        assert_eq!(group.duplicate_count(), 0);
    }

    #[test]
    fn test_grouping_stats_unchecked_rate_empty() {
        assert_eq!(GroupingStats::default().unchecked_rate(), 0.0);
    }

    #[test]
    fn test_large_file_count_performance() {
        use std::time::Instant;

        let files: Vec<FileRecord> = (0..100_000)
            .map(|i| make_file(&format!("f{i}"), &format!("{}", i % 40_000), 10))
            .collect();

        let start = Instant::now();
        let (groups, stats) = group_by_checksum(files);
        let elapsed = start.elapsed();

        assert_eq!(stats.total_files, 100_000);
        assert_eq!(groups.len(), 40_000);
        assert!(
            elapsed.as_secs() < 2,
            "Grouping took too long: {:?}",
            elapsed
        );
    }
}

//! Selection rules that decide which copies in each duplicate group are
//! redundant.
//!
//! # Overview
//!
//! The [`SelectionEngine`] walks the groups produced by
//! [`group_by_checksum`](super::group_by_checksum) and accumulates a
//! [`RemovalSet`]. Two rule classes are available and may be combined; their
//! results are unioned by file id:
//!
//! - **Keep one per group** ([`SelectionEngine::apply_keep_strategy`]): sort
//!   each group by the [`KeepStrategy`] key and mark every member except the
//!   first. Sorting is stable, so ties keep the earliest file in scan order.
//! - **Folder override** ([`SelectionEngine::apply_folder_override`]): mark
//!   every group member located in a given folder, even a file that a keep
//!   strategy preserved.
//!
//! [`SelectionEngine::finish`] consumes the engine and hands the final set
//! over to the removal executor.
//!
//! # Example
//!
//! ```
//! use drivedupe::drive::FileRecord;
//! use drivedupe::duplicates::{group_by_checksum, KeepStrategy, SelectionEngine};
//!
//! let files = vec![
//!     FileRecord::new("A", "a").with_checksum("x").with_modified_time("2023-01-01"),
//!     FileRecord::new("B", "b").with_checksum("x").with_modified_time("2023-06-01"),
//! ];
//! let (groups, _) = group_by_checksum(files);
//!
//! let mut engine = SelectionEngine::new(&groups);
//! engine.apply_keep_strategy(KeepStrategy::Oldest);
//! let removal = engine.finish();
//!
//! assert!(removal.contains("B"));
//! assert!(!removal.contains("A"));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::groups::DuplicateGroup;
use crate::drive::FileRecord;

/// Policy choosing the single surviving member of a duplicate group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeepStrategy {
    /// Keep the earliest modification time.
    ///
    /// The storage backend does not expose a reliable creation time, so
    /// "oldest" is approximated by the last modification timestamp.
    Oldest,
    /// Keep the latest modification time
    Newest,
    /// Keep the smallest size
    Smallest,
    /// Keep the largest size
    Largest,
    /// Keep the shortest name (in characters)
    ShortestName,
    /// Keep the longest name (in characters)
    LongestName,
}

impl KeepStrategy {
    /// Every strategy, in documentation order.
    pub const ALL: [KeepStrategy; 6] = [
        Self::Oldest,
        Self::Newest,
        Self::Smallest,
        Self::Largest,
        Self::ShortestName,
        Self::LongestName,
    ];

    /// The name accepted on the command line and in config files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oldest => "oldest",
            Self::Newest => "newest",
            Self::Smallest => "smallest",
            Self::Largest => "largest",
            Self::ShortestName => "shortest_name",
            Self::LongestName => "longest_name",
        }
    }

    /// Compare two files so that the file to keep sorts first.
    ///
    /// Descending strategies reverse the key comparison rather than the
    /// sequence, which keeps equal keys in their original order.
    #[must_use]
    pub fn compare(self, a: &FileRecord, b: &FileRecord) -> Ordering {
        match self {
            Self::Oldest => a.modified_or_empty().cmp(b.modified_or_empty()),
            Self::Newest => b.modified_or_empty().cmp(a.modified_or_empty()),
            Self::Smallest => a.size_or_zero().cmp(&b.size_or_zero()),
            Self::Largest => b.size_or_zero().cmp(&a.size_or_zero()),
            Self::ShortestName => name_len(a).cmp(&name_len(b)),
            Self::LongestName => name_len(b).cmp(&name_len(a)),
        }
    }

    /// Closest known strategy name to `input`, if any is reasonably near.
    #[must_use]
    pub fn suggest(input: &str) -> Option<&'static str> {
        let input = input.to_lowercase();
        Self::ALL
            .iter()
            .map(|s| (s.as_str(), strsim::levenshtein(&input, s.as_str())))
            .filter(|(_, distance)| *distance <= 3)
            .min_by_key(|(_, distance)| *distance)
            .map(|(name, _)| name)
    }
}

fn name_len(file: &FileRecord) -> usize {
    file.name.chars().count()
}

impl fmt::Display for KeepStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised strategy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown keep strategy '{name}'{}", suggestion_hint(.suggestion))]
pub struct UnknownStrategy {
    /// The name that was given
    pub name: String,
    /// Nearest valid name, if one is close
    pub suggestion: Option<&'static str>,
}

fn suggestion_hint(suggestion: &Option<&'static str>) -> String {
    suggestion
        .map(|s| format!(" (did you mean '{s}'?)"))
        .unwrap_or_default()
}

impl FromStr for KeepStrategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| UnknownStrategy {
                name: s.to_string(),
                suggestion: Self::suggest(&normalized),
            })
    }
}

/// Why a file was put in the removal set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum MarkReason {
    /// Not the survivor chosen by a keep strategy
    KeepStrategy {
        /// The strategy that was applied
        strategy: KeepStrategy,
    },
    /// Located in a folder whose duplicates are always removed
    FolderOverride {
        /// The folder id
        folder_id: String,
    },
    /// Chosen during a supervised pairwise scan
    Pairwise,
}

impl fmt::Display for MarkReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepStrategy { strategy } => write!(f, "keep {strategy}"),
            Self::FolderOverride { folder_id } => write!(f, "in folder {folder_id}"),
            Self::Pairwise => f.write_str("pairwise"),
        }
    }
}

/// A file selected for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedFile {
    /// The file to remove
    pub file: FileRecord,
    /// The first rule that marked it
    pub reason: MarkReason,
}

/// Files to remove, unique by id.
///
/// Iteration yields files in the order they were first marked. A file
/// marked by several rules keeps the reason of the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MarkedFile>", into = "Vec<MarkedFile>")]
pub struct RemovalSet {
    entries: Vec<MarkedFile>,
    index: HashMap<String, usize>,
}

impl From<Vec<MarkedFile>> for RemovalSet {
    fn from(entries: Vec<MarkedFile>) -> Self {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry.file, entry.reason);
        }
        set
    }
}

impl From<RemovalSet> for Vec<MarkedFile> {
    fn from(set: RemovalSet) -> Self {
        set.entries
    }
}

impl RemovalSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. Returns `false` if a file with the same id is present.
    pub fn insert(&mut self, file: FileRecord, reason: MarkReason) -> bool {
        if self.index.contains_key(&file.id) {
            return false;
        }
        self.index.insert(file.id.clone(), self.entries.len());
        self.entries.push(MarkedFile { file, reason });
        true
    }

    /// Check whether the file with `id` is marked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The rule that first marked the file with `id`.
    #[must_use]
    pub fn reason_for(&self, id: &str) -> Option<&MarkReason> {
        self.index.get(id).map(|&i| &self.entries[i].reason)
    }

    /// Number of marked files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is marked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Marked entries in first-marked order.
    pub fn iter(&self) -> impl Iterator<Item = &MarkedFile> {
        self.entries.iter()
    }

    /// Marked files in first-marked order.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.entries.iter().map(|e| &e.file)
    }

    /// Ids of the marked files, in first-marked order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.file.id.as_str())
    }

    /// Sum of the sizes of the marked files.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files().map(FileRecord::size_or_zero).sum()
    }

    /// Checksums of the groups in which every copy is marked.
    ///
    /// Removing such a plan would leave no surviving copy of the content.
    #[must_use]
    pub fn groups_fully_removed(&self, groups: &[DuplicateGroup]) -> Vec<String> {
        groups
            .iter()
            .filter(|g| !g.is_empty() && g.files.iter().all(|f| self.contains(&f.id)))
            .map(|g| g.checksum.clone())
            .collect()
    }
}

impl<'a> IntoIterator for &'a RemovalSet {
    type Item = &'a MarkedFile;
    type IntoIter = std::slice::Iter<'a, MarkedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Receives selection diagnostics.
///
/// All methods default to no-ops.
pub trait SelectionObserver {
    /// Called when a file is newly marked for removal.
    fn on_marked(&self, _file: &FileRecord, _reason: &MarkReason) {}

    /// Called for non-fatal problems, such as an unknown strategy name.
    fn on_warning(&self, _message: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SelectionObserver for NoopObserver {}

static NOOP_OBSERVER: NoopObserver = NoopObserver;

/// Applies selection rules over a fixed set of duplicate groups.
pub struct SelectionEngine<'a> {
    groups: &'a [DuplicateGroup],
    removal: RemovalSet,
    observer: &'a dyn SelectionObserver,
}

impl fmt::Debug for SelectionEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionEngine")
            .field("groups", &self.groups.len())
            .field("marked", &self.removal.len())
            .finish_non_exhaustive()
    }
}

impl<'a> SelectionEngine<'a> {
    /// Create an engine over `groups` with nothing marked.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup]) -> Self {
        Self {
            groups,
            removal: RemovalSet::new(),
            observer: &NOOP_OBSERVER,
        }
    }

    /// Report diagnostics to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn SelectionObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Keep one file per group according to `strategy` and mark the rest.
    ///
    /// Returns the number of files newly marked by this call.
    pub fn apply_keep_strategy(&mut self, strategy: KeepStrategy) -> usize {
        let mut newly_marked = 0;

        for group in self.groups.iter().filter(|g| g.len() > 1) {
            let mut order: Vec<&FileRecord> = group.files.iter().collect();
            order.sort_by(|a, b| strategy.compare(a, b));

            log::debug!(
                "Checksum {}: keeping {} ({}) by {}",
                group.checksum,
                order[0].name,
                order[0].id,
                strategy
            );

            for file in &order[1..] {
                if self.mark(file, MarkReason::KeepStrategy { strategy }) {
                    newly_marked += 1;
                }
            }
        }

        log::info!(
            "Keep strategy '{}' marked {} file(s) for removal",
            strategy,
            newly_marked
        );
        newly_marked
    }

    /// Like [`apply_keep_strategy`](Self::apply_keep_strategy) but takes the
    /// strategy by name.
    ///
    /// An unknown name marks nothing and emits a warning.
    pub fn apply_keep_strategy_named(&mut self, name: &str) -> usize {
        match name.parse::<KeepStrategy>() {
            Ok(strategy) => self.apply_keep_strategy(strategy),
            Err(err) => {
                let message = format!("{err}, no files marked by keep strategy");
                log::warn!("{}", message);
                self.observer.on_warning(&message);
                0
            }
        }
    }

    /// Mark every group member whose parents include `folder_id`.
    ///
    /// Returns the number of files newly marked by this call.
    pub fn apply_folder_override(&mut self, folder_id: &str) -> usize {
        let mut newly_marked = 0;

        for group in self.groups {
            for file in group.files.iter().filter(|f| f.is_in_folder(folder_id)) {
                let reason = MarkReason::FolderOverride {
                    folder_id: folder_id.to_string(),
                };
                if self.mark(file, reason) {
                    newly_marked += 1;
                }
            }
        }

        log::info!(
            "Folder override '{}' marked {} file(s) for removal",
            folder_id,
            newly_marked
        );
        newly_marked
    }

    /// Everything marked so far.
    #[must_use]
    pub fn collect_removal_set(&self) -> &RemovalSet {
        &self.removal
    }

    /// Consume the engine and return the final removal set.
    #[must_use]
    pub fn finish(self) -> RemovalSet {
        self.removal
    }

    fn mark(&mut self, file: &FileRecord, reason: MarkReason) -> bool {
        if self.removal.contains(&file.id) {
            return false;
        }
        log::debug!("Marked {} (ID: {}) for removal: {}", file.name, file.id, reason);
        self.observer.on_marked(file, &reason);
        self.removal.insert(file.clone(), reason)
    }
}

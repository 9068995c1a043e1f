//! Duplicate finder: the scan and resolve entry points.
//!
//! # Overview
//!
//! This module wires the pipeline together:
//! 1. **Listing**: stream file metadata from the backend (see [`crate::drive::FileLister`])
//! 2. **Grouping**: bucket files by checksum (see [`crate::duplicates::groups`])
//! 3. **Selection**: apply keep strategy and folder override (see [`crate::duplicates::selection`])
//! 4. **Removal**: move the selected files to the trash (see [`crate::actions::trash`])
//!
//! [`DuplicateFinder::scan`] stops after step 2. [`DuplicateFinder::resolve`]
//! runs the full pipeline, skipping step 4 on a dry run.
//! [`DuplicateFinder::scan_pairwise`] replaces steps 2 and 3 with the
//! supervised [`PairwiseDeduper`].
//!
//! # Example
//!
//! ```
//! use drivedupe::drive::{FileRecord, MemoryDrive};
//! use drivedupe::duplicates::{DuplicateFinder, ResolveRequest, ScanRequest};
//!
//! let drive = MemoryDrive::from_files([
//!     FileRecord::new("a", "x.txt").with_checksum("c1").with_modified_time("2023-01-01"),
//!     FileRecord::new("b", "x.txt").with_checksum("c1").with_modified_time("2024-01-01"),
//! ]);
//!
//! let finder = DuplicateFinder::new(&drive);
//! let request = ResolveRequest::new(ScanRequest::default()).with_keep_strategy("oldest");
//! let report = finder.resolve(&request).unwrap();
//!
//! assert!(report.removal.contains("b"));
//! assert!(drive.is_trashed("b"));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;

use super::groups::{group_by_checksum, DuplicateGroup, GroupingStats};
use super::pairwise::{PairResolver, PairwiseDeduper, PairwiseStats};
use super::selection::{RemovalSet, SelectionEngine, SelectionObserver};
use crate::actions::trash::{trash_batch, BatchTrashResult, TrashConfig, TrashProgressCallback};
use crate::drive::{DriveBackend, DriveError, FileLister, FileRecord, ListScope, ListingCallback};

/// Errors that abort a scan.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// Listing failed. A partial listing is never grouped.
    #[error("Listing failed: {0}")]
    Listing(#[from] DriveError),
}

/// Which files to scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    /// Restrict the scan to this folder
    pub folder_id: Option<String>,
    /// Include subfolders of `folder_id`
    pub recursive: bool,
}

impl ScanRequest {
    /// Scan a single folder.
    #[must_use]
    pub fn folder(folder_id: impl Into<String>) -> Self {
        Self {
            folder_id: Some(folder_id.into()),
            recursive: false,
        }
    }

    /// Enable/disable recursive traversal.
    #[must_use]
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn scope(&self) -> ListScope {
        ListScope {
            folder_id: self.folder_id.clone(),
            recursive: self.recursive,
        }
    }
}

/// Summary of a completed scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanSummary {
    /// Total number of files listed
    pub total_files: usize,
    /// Total size of all listed files in bytes
    pub total_size: u64,
    /// Files without a checksum (never duplicates)
    pub without_checksum: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Total number of redundant copies (excluding one original per group)
    pub duplicate_files: usize,
    /// Space held by the redundant copies
    pub reclaimable_space: u64,
    /// Duration of the listing and grouping
    #[serde(with = "duration_secs")]
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Calculate the percentage of space that is wasted by duplicates.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Duplicate groups plus statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Groups in first-seen checksum order
    pub groups: Vec<DuplicateGroup>,
    /// Grouping statistics
    pub stats: GroupingStats,
    /// Scan summary
    pub summary: ScanSummary,
}

impl ScanReport {
    fn new(groups: Vec<DuplicateGroup>, stats: GroupingStats, scan_duration: Duration) -> Self {
        let summary = ScanSummary {
            total_files: stats.total_files,
            total_size: stats.total_size,
            without_checksum: stats.without_checksum,
            duplicate_groups: groups.len(),
            duplicate_files: groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            reclaimable_space: groups.iter().map(DuplicateGroup::wasted_space).sum(),
            scan_duration,
        };
        Self {
            groups,
            stats,
            summary,
        }
    }

    /// Check whether any duplicates were found.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// A scan followed by selection and, unless dry-running, removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// What to scan
    pub scan: ScanRequest,
    /// Keep-one-per-group strategy name
    pub keep_strategy: Option<String>,
    /// Folder whose duplicates are always removed
    pub trash_folder_id: Option<String>,
    /// Report only, never trash
    pub dry_run: bool,
}

impl ResolveRequest {
    /// Create a request that selects nothing.
    #[must_use]
    pub fn new(scan: ScanRequest) -> Self {
        Self {
            scan,
            ..Self::default()
        }
    }

    /// Set the keep strategy by name.
    #[must_use]
    pub fn with_keep_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.keep_strategy = Some(strategy.into());
        self
    }

    /// Set the folder override.
    #[must_use]
    pub fn with_trash_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.trash_folder_id = Some(folder_id.into());
        self
    }

    /// Enable/disable dry run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Check whether any selection rule is requested.
    #[must_use]
    pub fn has_rules(&self) -> bool {
        self.keep_strategy.is_some() || self.trash_folder_id.is_some()
    }
}

/// Outcome of a resolve run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolveReport {
    /// The underlying scan
    pub scan: ScanReport,
    /// Files selected for removal
    pub removal: RemovalSet,
    /// Checksums of groups where every copy is selected
    pub fully_removed_groups: Vec<String>,
    /// Removal outcome; `None` when nothing was executed
    pub trash: Option<BatchTrashResult>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Outcome of a pairwise run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PairwiseReport {
    /// Files selected for removal
    pub removal: RemovalSet,
    /// Pairwise counters
    pub stats: PairwiseStats,
    /// Removal outcome; `None` when nothing was executed
    pub trash: Option<BatchTrashResult>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Orchestrates listing, grouping, selection and removal over one backend.
pub struct DuplicateFinder<'a, B: DriveBackend + ?Sized> {
    backend: &'a B,
    shutdown_flag: Option<Arc<AtomicBool>>,
    listing_callback: Option<&'a dyn ListingCallback>,
    trash_callback: Option<&'a dyn TrashProgressCallback>,
    observer: Option<&'a dyn SelectionObserver>,
    continue_on_error: bool,
}

impl<B: DriveBackend + ?Sized> std::fmt::Debug for DuplicateFinder<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("shutdown_flag", &self.shutdown_flag)
            .field("listing_callback", &self.listing_callback.map(|_| "<callback>"))
            .field("trash_callback", &self.trash_callback.map(|_| "<callback>"))
            .field("observer", &self.observer.map(|_| "<observer>"))
            .field("continue_on_error", &self.continue_on_error)
            .finish_non_exhaustive()
    }
}

impl<'a, B: DriveBackend + ?Sized> DuplicateFinder<'a, B> {
    /// Create a finder over `backend`.
    #[must_use]
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            shutdown_flag: None,
            listing_callback: None,
            trash_callback: None,
            observer: None,
            continue_on_error: true,
        }
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report listing progress to `callback`.
    #[must_use]
    pub fn with_listing_callback(mut self, callback: &'a dyn ListingCallback) -> Self {
        self.listing_callback = Some(callback);
        self
    }

    /// Report removal progress to `callback`.
    #[must_use]
    pub fn with_trash_callback(mut self, callback: &'a dyn TrashProgressCallback) -> Self {
        self.trash_callback = Some(callback);
        self
    }

    /// Report selection diagnostics to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn SelectionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Enable/disable continuing after a failed removal.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn lister(&self) -> FileLister<'a, B> {
        let lister = FileLister::new(self.backend);
        match self.listing_callback {
            Some(callback) => lister.with_callback(callback),
            None => lister,
        }
    }

    /// Stream the listing for `request`, aborting on the first error.
    fn for_each_file(
        &self,
        request: &ScanRequest,
        mut visit: impl FnMut(FileRecord),
    ) -> Result<(), FinderError> {
        if request.recursive && request.folder_id.is_none() {
            log::debug!("Recursive scan without a folder covers the whole account");
        }

        for file in self.lister().list_files(&request.scope()) {
            if self.is_shutdown_requested() {
                return Err(FinderError::Interrupted);
            }
            visit(file?);
        }
        Ok(())
    }

    /// List and group files.
    ///
    /// # Errors
    ///
    /// - `Listing` if any page request fails
    /// - `Interrupted` if shutdown was requested during listing
    pub fn scan(&self, request: &ScanRequest) -> Result<ScanReport, FinderError> {
        let start_time = Instant::now();
        match &request.folder_id {
            Some(folder) => log::info!(
                "Starting duplicate scan of folder {}{}",
                folder,
                if request.recursive { " (recursive)" } else { "" }
            ),
            None => log::info!("Starting duplicate scan of all files"),
        }

        let mut files = Vec::new();
        self.for_each_file(request, |file| files.push(file))?;
        log::info!("Total files retrieved: {}", files.len());

        let (groups, stats) = group_by_checksum(files);
        let report = ScanReport::new(groups, stats, start_time.elapsed());

        log::info!(
            "Found {} duplicate group(s), {} redundant file(s), {} reclaimable",
            report.summary.duplicate_groups,
            report.summary.duplicate_files,
            bytesize::ByteSize(report.summary.reclaimable_space)
        );
        Ok(report)
    }

    /// Apply the selection rules of `request` to a finished scan.
    ///
    /// Rules are applied keep strategy first, then folder override.
    #[must_use]
    pub fn select(&self, scan: &ScanReport, request: &ResolveRequest) -> RemovalSet {
        let mut engine = SelectionEngine::new(&scan.groups);
        if let Some(observer) = self.observer {
            engine = engine.with_observer(observer);
        }

        if let Some(strategy) = &request.keep_strategy {
            engine.apply_keep_strategy_named(strategy);
        }
        if let Some(folder_id) = &request.trash_folder_id {
            engine.apply_folder_override(folder_id);
        }

        let removal = engine.finish();
        if removal.is_empty() {
            log::info!("No files were marked for trashing based on the provided selection criteria.");
        }
        removal
    }

    /// Scan and select, without removing anything.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`scan`](Self::scan).
    pub fn plan(&self, request: &ResolveRequest) -> Result<ResolveReport, FinderError> {
        let scan = self.scan(&request.scan)?;
        let removal = self.select(&scan, request);

        let fully_removed_groups = removal.groups_fully_removed(&scan.groups);
        for checksum in &fully_removed_groups {
            log::warn!(
                "Every copy with checksum {} is selected for removal",
                checksum
            );
        }

        Ok(ResolveReport {
            scan,
            removal,
            fully_removed_groups,
            trash: None,
            dry_run: request.dry_run,
        })
    }

    /// Trash the files selected in `report`.
    ///
    /// Does nothing on a dry run or when the selection is empty.
    pub fn execute(&self, report: &mut ResolveReport) {
        if report.dry_run || report.removal.is_empty() {
            return;
        }
        log::info!(
            "Proceeding to trash {} files based on selection criteria.",
            report.removal.len()
        );
        report.trash = Some(self.trash(&report.removal));
    }

    /// Scan, select, and trash unless `request.dry_run` is set.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`scan`](Self::scan). Individual removal
    /// failures are reported in [`ResolveReport::trash`].
    pub fn resolve(&self, request: &ResolveRequest) -> Result<ResolveReport, FinderError> {
        let mut report = self.plan(request)?;
        self.execute(&mut report);
        Ok(report)
    }

    /// Stream files through a [`PairwiseDeduper`], then trash unless dry-running.
    ///
    /// # Errors
    ///
    /// - `Listing` if any page request fails
    /// - `Interrupted` if shutdown was requested during listing
    pub fn scan_pairwise(
        &self,
        request: &ScanRequest,
        resolver: &mut dyn PairResolver,
        dry_run: bool,
    ) -> Result<PairwiseReport, FinderError> {
        let mut deduper = PairwiseDeduper::new();
        self.for_each_file(request, |file| {
            deduper.observe(file, resolver);
        })?;

        let (removal, stats) = deduper.finish();
        log::info!(
            "Pairwise scan checked {} file(s), selected {} for removal",
            stats.observed,
            removal.len()
        );

        let trash = (!dry_run && !removal.is_empty()).then(|| self.trash(&removal));

        Ok(PairwiseReport {
            removal,
            stats,
            trash,
            dry_run,
        })
    }

    /// Trash everything in `removal` with this finder's settings.
    pub fn trash(&self, removal: &RemovalSet) -> BatchTrashResult {
        let mut config = TrashConfig::default().with_continue_on_error(self.continue_on_error);
        if let Some(flag) = &self.shutdown_flag {
            config = config.with_shutdown_flag(flag.clone());
        }
        trash_batch(self.backend, removal, &config, self.trash_callback)
    }
}

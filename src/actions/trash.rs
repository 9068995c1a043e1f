//! Moving marked files to the backend trash.
//!
//! # Overview
//!
//! Removal is strictly sequential: one backend call per file, in
//! removal-set order. A failure affects only its own file. It is logged
//! with the file name and id, counted, and the batch continues (unless
//! `continue_on_error` is off). There is no retry.
//!
//! Trashing is reversible on the backend side, so no local confirmation
//! happens here; the CLI asks before calling into this module.
//!
//! # Example
//!
//! ```
//! use drivedupe::actions::trash::{trash_batch, NoopTrashCallback, TrashConfig};
//! use drivedupe::drive::{FileRecord, MemoryDrive};
//! use drivedupe::duplicates::{MarkReason, RemovalSet};
//!
//! let drive = MemoryDrive::from_files([FileRecord::new("f1", "copy.txt")]);
//! let mut removal = RemovalSet::new();
//! removal.insert(FileRecord::new("f1", "copy.txt"), MarkReason::Pairwise);
//!
//! let result = trash_batch(&drive, &removal, &TrashConfig::default(), None::<&NoopTrashCallback>);
//! assert_eq!(result.summary(), "Trashed 1 file(s), 0 failed");
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::drive::{DriveBackend, DriveError, FileRecord};
use crate::duplicates::RemovalSet;

/// Error type for trash operations.
#[derive(Debug, Error)]
pub enum TrashError {
    /// The file no longer exists on the backend.
    #[error("file not found: {name} (ID: {id})")]
    NotFound { id: String, name: String },

    /// The backend rejected or failed the request.
    #[error("failed to trash {name} (ID: {id}): {source}")]
    Backend {
        id: String,
        name: String,
        #[source]
        source: DriveError,
    },
}

impl TrashError {
    fn from_drive(file: &FileRecord, err: DriveError) -> Self {
        match err {
            DriveError::NotFound(_) => Self::NotFound {
                id: file.id.clone(),
                name: file.name.clone(),
            },
            source => Self::Backend {
                id: file.id.clone(),
                name: file.name.clone(),
                source,
            },
        }
    }

    /// Id of the file the error refers to.
    #[must_use]
    pub fn file_id(&self) -> &str {
        match self {
            Self::NotFound { id, .. } | Self::Backend { id, .. } => id,
        }
    }
}

/// A file that was moved to the trash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashResult {
    /// File id
    pub id: String,
    /// File name
    pub name: String,
    /// Size in bytes (0 if unknown)
    pub size: u64,
}

/// A file that could not be trashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrashFailure {
    /// File id
    pub id: String,
    /// File name
    pub name: String,
    /// Error message
    pub error: String,
}

/// Results of a batch trash operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchTrashResult {
    /// Successfully trashed files.
    pub successes: Vec<TrashResult>,
    /// Failed files with their errors.
    pub failures: Vec<TrashFailure>,
    /// Files skipped because the batch stopped early.
    pub not_attempted: usize,
    /// Whether the batch stopped because of a shutdown request.
    pub interrupted: bool,
    /// Total bytes moved to the trash.
    pub bytes_freed: u64,
}

impl BatchTrashResult {
    /// Number of successfully trashed files.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed files.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Number of files a backend call was made for.
    #[must_use]
    pub fn attempted_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if every file was attempted and trashed.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.not_attempted == 0
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Trashed {} file(s), {} failed",
            self.success_count(),
            self.failure_count()
        );
        if self.not_attempted > 0 {
            summary.push_str(&format!(", {} not attempted", self.not_attempted));
        }
        summary
    }
}

/// Configuration for trash operations.
#[derive(Debug, Clone)]
pub struct TrashConfig {
    /// Process remaining files after a failure.
    pub continue_on_error: bool,
    /// Stop between files once this flag is set.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            shutdown_flag: None,
        }
    }
}

impl TrashConfig {
    /// Enable/disable continue on error.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Set the shutdown flag checked between files.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Callback trait for trash progress reporting.
pub trait TrashProgressCallback {
    /// Called before each backend call.
    fn on_before_trash(&self, file: &FileRecord, index: usize, total: usize);

    /// Called after a file was trashed.
    fn on_trash_success(&self, file: &FileRecord);

    /// Called after a file failed.
    fn on_trash_failure(&self, file: &FileRecord, error: &str);

    /// Called when the batch completes.
    fn on_complete(&self, result: &BatchTrashResult);
}

/// Callback that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTrashCallback;

impl TrashProgressCallback for NoopTrashCallback {
    fn on_before_trash(&self, _: &FileRecord, _: usize, _: usize) {}
    fn on_trash_success(&self, _: &FileRecord) {}
    fn on_trash_failure(&self, _: &FileRecord, _: &str) {}
    fn on_complete(&self, _: &BatchTrashResult) {}
}

/// Move a single file to the trash.
///
/// # Errors
///
/// - `NotFound` if the backend no longer knows the file
/// - `Backend` for any other backend failure
pub fn trash_one<B: DriveBackend + ?Sized>(
    backend: &B,
    file: &FileRecord,
) -> Result<TrashResult, TrashError> {
    backend
        .trash_file(&file.id)
        .map_err(|e| TrashError::from_drive(file, e))?;

    log::info!(
        "Successfully moved file {} (ID: {}) to trash.",
        file.name,
        file.id
    );

    Ok(TrashResult {
        id: file.id.clone(),
        name: file.name.clone(),
        size: file.size_or_zero(),
    })
}

/// Trash every file in a removal set.
pub fn trash_batch<B, C>(
    backend: &B,
    removal: &RemovalSet,
    config: &TrashConfig,
    callback: Option<&C>,
) -> BatchTrashResult
where
    B: DriveBackend + ?Sized,
    C: TrashProgressCallback + ?Sized,
{
    let files: Vec<&FileRecord> = removal.files().collect();
    trash_files(backend, &files, config, callback)
}

/// Trash `files` in order.
///
/// Stops early when the shutdown flag is set, or after the first failure if
/// `continue_on_error` is off. Files not reached are counted in
/// `not_attempted`.
pub fn trash_files<B, C>(
    backend: &B,
    files: &[&FileRecord],
    config: &TrashConfig,
    callback: Option<&C>,
) -> BatchTrashResult
where
    B: DriveBackend + ?Sized,
    C: TrashProgressCallback + ?Sized,
{
    let mut result = BatchTrashResult::default();
    let total = files.len();

    for (index, file) in files.iter().enumerate() {
        if config.is_shutdown_requested() {
            log::warn!("Shutdown requested, stopping after {} of {} file(s)", index, total);
            result.interrupted = true;
            result.not_attempted = total - index;
            break;
        }

        if let Some(cb) = callback {
            cb.on_before_trash(file, index, total);
        }

        match trash_one(backend, file) {
            Ok(trashed) => {
                result.bytes_freed += trashed.size;
                if let Some(cb) = callback {
                    cb.on_trash_success(file);
                }
                result.successes.push(trashed);
            }
            Err(e) => {
                let error_msg = e.to_string();
                log::error!(
                    "An error occurred while moving file {} (ID: {}) to trash: {}",
                    file.name,
                    file.id,
                    error_msg
                );

                if let Some(cb) = callback {
                    cb.on_trash_failure(file, &error_msg);
                }

                result.failures.push(TrashFailure {
                    id: file.id.clone(),
                    name: file.name.clone(),
                    error: error_msg,
                });

                if !config.continue_on_error {
                    log::info!("Stopping batch trash due to error (continue_on_error=false)");
                    result.not_attempted = total - index - 1;
                    break;
                }
            }
        }
    }

    if let Some(cb) = callback {
        cb.on_complete(&result);
    }

    log::info!("{}", result.summary());

    result
}

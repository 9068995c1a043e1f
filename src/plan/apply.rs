//! Executing a saved plan, resumably.

use std::cell::{Cell, RefCell};
use std::path::Path;

use serde::Serialize;

use crate::actions::trash::{trash_files, BatchTrashResult, TrashConfig, TrashProgressCallback};
use crate::drive::{DriveBackend, FileRecord};
use crate::plan::data::RemovalPlan;
use crate::plan::io::PlanError;

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyOutcome {
    /// Files trashed by earlier runs
    pub previously_completed: usize,
    /// Files this run tried to trash (or would have, on a dry run)
    pub pending: Vec<FileRecord>,
    /// Removal outcome; `None` on a dry run
    pub result: Option<BatchTrashResult>,
}

/// Rewrites the plan after each trashed file.
struct PlanRecorder<'a> {
    plan: RefCell<RemovalPlan>,
    path: &'a Path,
    inner: Option<&'a dyn TrashProgressCallback>,
    save_failures: Cell<usize>,
}

impl PlanRecorder<'_> {
    fn persist(&self) {
        if let Err(e) = self.plan.borrow().save(self.path) {
            self.save_failures.set(self.save_failures.get() + 1);
            log::warn!("Could not record progress in {}: {}", self.path.display(), e);
        }
    }
}

impl TrashProgressCallback for PlanRecorder<'_> {
    fn on_before_trash(&self, file: &FileRecord, index: usize, total: usize) {
        if let Some(cb) = self.inner {
            cb.on_before_trash(file, index, total);
        }
    }

    fn on_trash_success(&self, file: &FileRecord) {
        self.plan.borrow_mut().mark_completed(&file.id);
        self.persist();
        if let Some(cb) = self.inner {
            cb.on_trash_success(file);
        }
    }

    fn on_trash_failure(&self, file: &FileRecord, error: &str) {
        if let Some(cb) = self.inner {
            cb.on_trash_failure(file, error);
        }
    }

    fn on_complete(&self, result: &BatchTrashResult) {
        if let Some(cb) = self.inner {
            cb.on_complete(result);
        }
    }
}

/// Trash the pending files of the plan stored at `path`.
///
/// Completed ids are written back to `path` after every successful file, so
/// a later run resumes where this one stopped.
///
/// # Errors
///
/// - Any error from [`RemovalPlan::load`]
/// - The final save of the plan, if it fails
pub fn apply_plan<B: DriveBackend + ?Sized>(
    backend: &B,
    path: &Path,
    config: &TrashConfig,
    callback: Option<&dyn TrashProgressCallback>,
    dry_run: bool,
) -> Result<ApplyOutcome, PlanError> {
    let plan = RemovalPlan::load(path)?;
    let previously_completed = plan.completed.len();
    let pending: Vec<FileRecord> = plan.pending().into_iter().cloned().collect();

    if pending.is_empty() {
        log::info!("Plan {} is already complete", path.display());
    }
    if dry_run || pending.is_empty() {
        return Ok(ApplyOutcome {
            previously_completed,
            pending,
            result: None,
        });
    }

    log::info!(
        "Resuming plan {}: {} file(s) pending, {} already trashed",
        path.display(),
        pending.len(),
        previously_completed
    );

    let recorder = PlanRecorder {
        plan: RefCell::new(plan),
        path,
        inner: callback,
        save_failures: Cell::new(0),
    };
    let refs: Vec<&FileRecord> = pending.iter().collect();
    let result = trash_files(backend, &refs, config, Some(&recorder));

    if recorder.save_failures.get() > 0 {
        // One last attempt so the recorded progress is not lost
        recorder.plan.borrow().save(path)?;
    }

    Ok(ApplyOutcome {
        previously_completed,
        pending,
        result: Some(result),
    })
}

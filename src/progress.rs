//! Progress reporting utilities using indicatif.
//!
//! [`Progress`] implements both [`ListingCallback`] and
//! [`TrashProgressCallback`]: a spinner counts files while Drive is listed,
//! and a bar tracks the removal batch. In quiet mode nothing is drawn.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::actions::{BatchTrashResult, TrashProgressCallback};
use crate::drive::{FileRecord, ListingCallback};

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    listing: Mutex<Option<ProgressBar>>,
    trashing: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

fn slot(bar: &Mutex<Option<ProgressBar>>) -> MutexGuard<'_, Option<ProgressBar>> {
    bar.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use drivedupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// progress.finish_listing();
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        let multi = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self {
            multi,
            listing: Mutex::new(None),
            trashing: Mutex::new(None),
            quiet,
        }
    }

    fn listing_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn trash_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.red/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    /// The listing spinner, created on first use.
    fn with_listing(&self, update: impl FnOnce(&ProgressBar)) {
        if self.quiet {
            return;
        }
        let mut listing = slot(&self.listing);
        let pb = listing.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::listing_style());
            pb.set_message("Listing Drive files");
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        update(pb);
    }

    /// Stop the listing spinner, leaving the final count on screen.
    pub fn finish_listing(&self) {
        if let Some(pb) = slot(&self.listing).take() {
            pb.finish_with_message("Listing complete");
        }
    }

    /// Run `f` with every bar hidden, e.g. while prompting on the terminal.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.multi.suspend(f)
    }
}

impl ListingCallback for Progress {
    fn on_folders_discovered(&self, count: usize) {
        self.with_listing(|pb| pb.set_message(format!("Listing {count} folder(s)")));
    }

    fn on_page(&self, files_so_far: usize) {
        self.with_listing(|pb| pb.set_position(files_so_far as u64));
    }

    fn on_folder_complete(&self, index: usize, total: usize, files_so_far: usize) {
        self.with_listing(|pb| {
            pb.set_position(files_so_far as u64);
            pb.set_message(format!("Listed folder {index}/{total}"));
        });
    }
}

impl TrashProgressCallback for Progress {
    fn on_before_trash(&self, file: &FileRecord, index: usize, total: usize) {
        if self.quiet {
            return;
        }
        let mut trashing = slot(&self.trashing);
        let pb = trashing.get_or_insert_with(|| {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::trash_style());
            pb
        });
        pb.set_position(index as u64);
        pb.set_message(truncate_name(&file.name, 30));
    }

    fn on_trash_success(&self, _file: &FileRecord) {
        if let Some(pb) = slot(&self.trashing).as_ref() {
            pb.inc(1);
        }
    }

    fn on_trash_failure(&self, _file: &FileRecord, _error: &str) {
        if let Some(pb) = slot(&self.trashing).as_ref() {
            pb.inc(1);
        }
    }

    fn on_complete(&self, result: &BatchTrashResult) {
        if let Some(pb) = slot(&self.trashing).take() {
            pb.finish_with_message(result.summary());
        }
    }
}

/// Shorten a file name for display in the progress bar.
fn truncate_name(name: &str, max_chars: usize) -> String {
    let count = name.chars().count();
    if count <= max_chars {
        return name.to_string();
    }
    let tail: String = name.chars().skip(count - (max_chars - 3)).collect();
    format!("...{tail}")
}

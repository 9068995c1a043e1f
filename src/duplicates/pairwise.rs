//! Supervised, streaming duplicate resolution.
//!
//! [`PairwiseDeduper`] consumes files one at a time as the listing produces
//! them, without waiting for the full scan. The first file seen for a
//! checksum becomes the reference for that checksum. Each later copy is
//! compared against the reference only:
//!
//! - same name: the later copy is marked automatically;
//! - different name: a [`PairResolver`] decides.
//!
//! The reference is never replaced, even after it has been marked. With
//! three or more copies, later copies are therefore never compared with
//! each other. This mode is kept for interactive use; the batch
//! [`SelectionEngine`](super::SelectionEngine) is the preferred path.

use std::collections::HashMap;

use serde::Serialize;

use super::selection::{MarkReason, RemovalSet};
use crate::drive::FileRecord;

/// Two same-content files with different names.
#[derive(Debug, Clone, Copy)]
pub struct AmbiguousPair<'a> {
    /// First file seen with this checksum
    pub reference: &'a FileRecord,
    /// The file just observed
    pub candidate: &'a FileRecord,
}

/// Outcome chosen by a [`PairResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairDecision {
    /// Remove the reference file
    TrashReference,
    /// Remove the newly observed file
    TrashCandidate,
    /// Remove neither
    Skip,
}

/// Decides what to do with an [`AmbiguousPair`].
pub trait PairResolver {
    /// Choose which file of the pair, if any, to remove.
    fn resolve(&mut self, pair: &AmbiguousPair<'_>) -> PairDecision;
}

impl<F> PairResolver for F
where
    F: FnMut(&AmbiguousPair<'_>) -> PairDecision,
{
    fn resolve(&mut self, pair: &AmbiguousPair<'_>) -> PairDecision {
        self(pair)
    }
}

/// What happened to one observed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The file has no checksum and was ignored
    NoChecksum,
    /// First file for its checksum
    Reference,
    /// Same name as the reference, marked automatically
    AutoMarked,
    /// The resolver was consulted
    Resolved(PairDecision),
}

/// Counters for a pairwise run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PairwiseStats {
    /// Files passed to `observe`
    pub observed: usize,
    /// Files ignored for lack of a checksum
    pub without_checksum: usize,
    /// Copies marked because their name matched the reference
    pub auto_marked: usize,
    /// Pairs handed to the resolver
    pub resolved: usize,
    /// Pairs the resolver skipped
    pub skipped: usize,
}

/// Streaming deduplicator comparing each copy against the first-seen file.
#[derive(Debug, Default)]
pub struct PairwiseDeduper {
    references: HashMap<String, FileRecord>,
    removal: RemovalSet,
    stats: PairwiseStats,
}

impl PairwiseDeduper {
    /// Create an empty deduplicator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one file.
    pub fn observe(&mut self, file: FileRecord, resolver: &mut dyn PairResolver) -> Observation {
        self.stats.observed += 1;

        let Some(checksum) = file.content_checksum().map(str::to_string) else {
            self.stats.without_checksum += 1;
            return Observation::NoChecksum;
        };

        let Some(reference) = self.references.get(&checksum) else {
            log::debug!("Reference for {}: {} ({})", checksum, file.name, file.id);
            self.references.insert(checksum, file);
            return Observation::Reference;
        };

        if reference.name == file.name {
            log::info!(
                "Duplicate found: {} (ID: {}) matches {} (ID: {})",
                file.name,
                file.id,
                reference.name,
                reference.id
            );
            self.stats.auto_marked += 1;
            self.removal.insert(file, MarkReason::Pairwise);
            return Observation::AutoMarked;
        }

        self.stats.resolved += 1;
        let decision = resolver.resolve(&AmbiguousPair {
            reference,
            candidate: &file,
        });

        match decision {
            PairDecision::TrashReference => {
                let reference = reference.clone();
                self.removal.insert(reference, MarkReason::Pairwise);
            }
            PairDecision::TrashCandidate => {
                self.removal.insert(file, MarkReason::Pairwise);
            }
            PairDecision::Skip => {
                self.stats.skipped += 1;
            }
        }
        Observation::Resolved(decision)
    }

    /// Files marked so far.
    #[must_use]
    pub fn removal_set(&self) -> &RemovalSet {
        &self.removal
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &PairwiseStats {
        &self.stats
    }

    /// Consume the deduplicator and return the marked files and counters.
    #[must_use]
    pub fn finish(self) -> (RemovalSet, PairwiseStats) {
        (self.removal, self.stats)
    }
}

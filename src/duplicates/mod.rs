//! Duplicate detection and resolution module.
//!
//! This module provides functionality for:
//! - Checksum-based file grouping
//! - Selection rules choosing redundant copies (keep strategy, folder override)
//! - Supervised pairwise resolution over a streaming listing
//! - The scan and resolve entry points tying them to a backend

pub mod finder;
pub mod groups;
pub mod pairwise;
pub mod selection;

pub use finder::{
    DuplicateFinder, FinderError, PairwiseReport, ResolveReport, ResolveRequest, ScanReport,
    ScanRequest, ScanSummary,
};
pub use groups::{group_by_checksum, DuplicateGroup, GroupingStats};
pub use pairwise::{
    AmbiguousPair, Observation, PairDecision, PairResolver, PairwiseDeduper, PairwiseStats,
};
pub use selection::{
    KeepStrategy, MarkReason, MarkedFile, NoopObserver, RemovalSet, SelectionEngine,
    SelectionObserver, UnknownStrategy,
};

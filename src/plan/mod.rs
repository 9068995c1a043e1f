//! Removal plans: persisted removal sets that can be executed later.
//!
//! A scan-and-resolve run may save its final removal set instead of (or in
//! addition to) trashing it right away. Applying a plan trashes the files
//! that are still pending and records each completed id back into the
//! file, so an interrupted run resumes without repeating work.
//!
//! # Features
//!
//! * **Integrity**: Each plan file is wrapped in an envelope with a SHA256 checksum.
//! * **Versioning**: Plans carry a format version and other versions are rejected.
//! * **Resumability**: Completed ids are stored in the plan itself.
//!
//! # Architecture
//!
//! * [`data`]: Serializable plan model.
//! * [`io`]: Saving, loading, and verifying plan files.
//! * [`apply`]: Executing a plan and recording progress.

pub mod apply;
pub mod data;
pub mod io;

pub use apply::{apply_plan, ApplyOutcome};
pub use data::{PlanSettings, RemovalPlan, PLAN_VERSION};
pub use io::PlanError;

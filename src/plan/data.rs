//! Data structures for removal plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::drive::FileRecord;
use crate::duplicates::{RemovalSet, ResolveRequest};

/// Current version of the plan file format.
pub const PLAN_VERSION: u32 = 1;

/// A saved removal set with completion tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalPlan {
    /// Format version.
    pub version: u32,
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Settings of the scan that produced the plan.
    pub settings: PlanSettings,
    /// Files to trash, in execution order.
    pub removal: RemovalSet,
    /// Ids already trashed by a previous run.
    pub completed: BTreeSet<String>,
}

impl RemovalPlan {
    /// Create a new plan with current timestamp and default version.
    #[must_use]
    pub fn new(settings: PlanSettings, removal: RemovalSet) -> Self {
        Self {
            version: PLAN_VERSION,
            created_at: Utc::now(),
            settings,
            removal,
            completed: BTreeSet::new(),
        }
    }

    /// Files not yet trashed, in plan order.
    #[must_use]
    pub fn pending(&self) -> Vec<&FileRecord> {
        self.removal
            .files()
            .filter(|f| !self.completed.contains(&f.id))
            .collect()
    }

    /// Record `id` as trashed. Ids outside the plan are ignored.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        self.removal.contains(id) && self.completed.insert(id.to_string())
    }

    /// Check whether every file has been trashed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed.len() >= self.removal.len()
    }
}

/// Scan settings recorded in a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSettings {
    /// Folder the scan was restricted to.
    pub folder_id: Option<String>,
    /// Whether subfolders were included.
    pub recursive: bool,
    /// Keep strategy that was applied.
    pub keep_strategy: Option<String>,
    /// Folder override that was applied.
    pub trash_folder_id: Option<String>,
}

impl From<&ResolveRequest> for PlanSettings {
    fn from(request: &ResolveRequest) -> Self {
        Self {
            folder_id: request.scan.folder_id.clone(),
            recursive: request.scan.recursive,
            keep_strategy: request.keep_strategy.clone(),
            trash_folder_id: request.trash_folder_id.clone(),
        }
    }
}

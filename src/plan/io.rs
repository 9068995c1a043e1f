//! I/O operations for removal plans.

use crate::plan::data::{RemovalPlan, PLAN_VERSION};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for plan persistence.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Reading or writing the plan file failed.
    #[error("I/O error for plan file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The plan could not be serialized.
    #[error("Failed to serialize plan: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The file is not a valid plan envelope.
    #[error("Failed to parse plan envelope. The file might be corrupted: {0}")]
    Parse(#[source] serde_json::Error),

    /// The stored checksum does not match the plan contents.
    #[error("Plan integrity check failed: checksum mismatch. The file may have been tampered with or corrupted.")]
    ChecksumMismatch,

    /// The plan was written by an incompatible version.
    #[error("Unsupported plan version: {found}. Current version is {expected}.")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Envelope for plan files to include integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct PlanEnvelope {
    /// SHA256 checksum of the serialized plan data.
    checksum: String,
    /// The actual plan data.
    plan: RemovalPlan,
}

fn checksum_of(plan: &RemovalPlan) -> Result<String, PlanError> {
    // Compact serialization is the hashed form; the file itself is pretty-printed
    let plan_json = serde_json::to_string(plan).map_err(PlanError::Serialize)?;
    let mut hasher = Sha256::new();
    hasher.update(plan_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

impl RemovalPlan {
    /// Serializes the plan to a JSON string with an integrity checksum.
    ///
    /// # Errors
    ///
    /// Returns `Serialize` if the plan cannot be encoded.
    pub fn to_json(&self) -> Result<String, PlanError> {
        let envelope = PlanEnvelope {
            checksum: checksum_of(self)?,
            plan: self.clone(),
        };
        serde_json::to_string_pretty(&envelope).map_err(PlanError::Serialize)
    }

    /// Saves the plan to a file with an integrity checksum.
    ///
    /// The file is written next to `path` and then renamed over it, so an
    /// interrupted save leaves the previous version intact.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PlanError> {
        let json = self.to_json()?;
        let io_err = |source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, json.as_bytes()).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        log::debug!("Saved removal plan to {}", path.display());
        Ok(())
    }

    /// Loads a plan from a file and verifies its integrity.
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `Parse` if it is not a plan envelope
    /// - `ChecksumMismatch` if the contents were modified
    /// - `UnsupportedVersion` for plans from another format version
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: PlanEnvelope = serde_json::from_str(&content).map_err(PlanError::Parse)?;

        if checksum_of(&envelope.plan)? != envelope.checksum {
            return Err(PlanError::ChecksumMismatch);
        }

        let plan = envelope.plan;
        if plan.version != PLAN_VERSION {
            return Err(PlanError::UnsupportedVersion {
                found: plan.version,
                expected: PLAN_VERSION,
            });
        }

        log::info!(
            "Loaded removal plan: {} file(s), {} already trashed",
            plan.removal.len(),
            plan.completed.len()
        );
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::FileRecord;
    use crate::duplicates::{KeepStrategy, MarkReason, RemovalSet};
    use crate::plan::data::PlanSettings;
    use tempfile::tempdir;

    fn sample_plan() -> RemovalPlan {
        let mut removal = RemovalSet::new();
        removal.insert(
            FileRecord::new("f1", "copy.pdf").with_size(42).with_checksum("abc"),
            MarkReason::KeepStrategy {
                strategy: KeepStrategy::Oldest,
            },
        );
        removal.insert(
            FileRecord::new("f2", "other.pdf"),
            MarkReason::FolderOverride {
                folder_id: "F1".to_string(),
            },
        );
        RemovalPlan::new(PlanSettings::default(), removal)
    }

    #[test]
    fn test_plan_to_json() {
        let json = sample_plan().to_json().unwrap();
        assert!(json.contains("\"checksum\":"));
        assert!(json.contains("\"plan\":"));
        assert!(json.contains("\"md5Checksum\": \"abc\""));
    }

    #[test]
    fn test_plan_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");

        let mut plan = sample_plan();
        plan.mark_completed("f1");
        plan.save(&path).unwrap();

        let loaded = RemovalPlan::load(&path).unwrap();
        assert_eq!(loaded, plan);
        assert!(loaded.removal.contains("f2"));
        assert_eq!(loaded.pending().len(), 1);
        assert!(!dir.path().join("plan.json.tmp").exists());
    }

    #[test]
    fn test_plan_load_tampered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        sample_plan().save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("other.pdf", "victim.pdf")).unwrap();

        assert!(matches!(
            RemovalPlan::load(&path),
            Err(PlanError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_plan_load_invalid_version() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");

        let mut plan = sample_plan();
        plan.version = 999;
        plan.save(&path).unwrap();

        let err = RemovalPlan::load(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported plan version"));
    }

    #[test]
    fn test_plan_load_invalid_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ invalid json }").unwrap();

        assert!(matches!(RemovalPlan::load(&path), Err(PlanError::Parse(_))));
    }

    #[test]
    fn test_plan_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = RemovalPlan::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }
}

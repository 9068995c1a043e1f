//! File actions module.
//!
//! This module provides functionality for:
//! - Moving files to the backend trash, one at a time
//! - Batch operations with progress reporting and graceful interruption
//!
//! ```
//! use drivedupe::actions::trash::trash_one;
//! use drivedupe::drive::{FileRecord, MemoryDrive};
//!
//! let file = FileRecord::new("f1", "copy.txt");
//! let drive = MemoryDrive::from_files([file.clone()]);
//! let result = trash_one(&drive, &file).unwrap();
//! assert_eq!(result.id, "f1");
//! ```

pub mod trash;

// Re-export commonly used types
pub use trash::{
    trash_batch, trash_files, trash_one, BatchTrashResult, NoopTrashCallback, TrashConfig,
    TrashError, TrashFailure, TrashProgressCallback, TrashResult,
};

//! Output formatters for duplicate scan results.
//!
//! This module provides different output formats for scan results:
//! - Text for reading in a terminal
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use drivedupe::drive::MemoryDrive;
//! use drivedupe::duplicates::{DuplicateFinder, ResolveRequest, ScanRequest};
//! use drivedupe::error::ExitCode;
//! use drivedupe::output::json::JsonOutput;
//!
//! let drive = MemoryDrive::new();
//! let report = DuplicateFinder::new(&drive)
//!     .plan(&ResolveRequest::new(ScanRequest::default()))
//!     .unwrap();
//!
//! // Output as JSON to stdout
//! let output = JsonOutput::new(&report, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use csv::{CsvOutput, CsvOutputError};
pub use json::JsonOutput;
pub use text::{TextOutput, NO_DUPLICATES_MESSAGE};

//! Command-line interface definitions for DriveDupe.
//!
//! This module defines all CLI arguments, subcommands, and options using the clap derive API.
//! The CLI follows standard conventions with global options (verbosity, color, config) and
//! subcommands for different operations.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates across the whole account
//! drivedupe scan
//!
//! # Preview which copies a rule would trash inside one folder tree
//! drivedupe scan --folder 1AbC --recursive --keep-strategy oldest --dry-run
//!
//! # Save the selection now, trash it later
//! drivedupe scan --keep-strategy newest --save-plan plan.json
//! drivedupe apply plan.json
//!
//! # Machine-readable output
//! drivedupe scan --output json
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Find and trash duplicate files in Google Drive.
///
/// DriveDupe lists files through the Drive API, groups them by the content
/// checksum Drive reports, and moves the copies selected by your rules to
/// the Drive trash.
#[derive(Debug, Parser)]
#[command(name = "drivedupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as structured JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// OAuth token file (authorized-user JSON)
    #[arg(long, global = true, value_name = "PATH")]
    pub token: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for DriveDupe.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan for duplicate files and optionally trash redundant copies
    Scan(ScanArgs),
    /// Compare each file against the first copy seen, asking when names differ
    Pairwise(PairwiseArgs),
    /// Trash the files recorded in a saved removal plan
    Apply(ApplyArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Limit the scan to files directly inside this folder
    #[arg(long, value_name = "ID")]
    pub folder: Option<String>,

    /// Include every subfolder of --folder
    #[arg(short, long)]
    pub recursive: bool,

    /// Trash the copies selected by the removal rules
    ///
    /// Without --keep-strategy or --trash-folder-id nothing is selected.
    #[arg(long)]
    pub delete: bool,

    /// Which copy of each group survives
    ///
    /// One of: oldest, newest, smallest, largest, shortest_name, longest_name.
    /// Implies --delete.
    #[arg(long, value_name = "STRATEGY")]
    pub keep_strategy: Option<String>,

    /// Trash every duplicate located in this folder. Implies --delete.
    #[arg(long, value_name = "ID")]
    pub trash_folder_id: Option<String>,

    /// Report what would be trashed without trashing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Output format (defaults to the configured format, or text)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Save the selected files to a removal plan for `drivedupe apply`
    #[arg(long, value_name = "PATH")]
    pub save_plan: Option<PathBuf>,

    /// Allow trashing when every copy of a group is selected
    #[arg(long)]
    pub allow_full_removal: bool,

    /// Skip the confirmation prompt before trashing
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl ScanArgs {
    /// Whether this run asks for removal at all.
    #[must_use]
    pub fn wants_removal(&self) -> bool {
        self.delete || self.keep_strategy.is_some() || self.trash_folder_id.is_some()
    }
}

/// Arguments for the pairwise subcommand.
#[derive(Debug, Args)]
pub struct PairwiseArgs {
    /// Limit the scan to files directly inside this folder
    #[arg(long, value_name = "ID")]
    pub folder: Option<String>,

    /// Include every subfolder of --folder
    #[arg(short, long)]
    pub recursive: bool,

    /// Decide interactively but trash nothing
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the apply subcommand.
#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Removal plan written by `drivedupe scan --save-plan`
    #[arg(value_name = "PLAN")]
    pub plan: PathBuf,

    /// List the pending files without trashing them
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt before trashing
    #[arg(short = 'y', long)]
    pub yes: bool,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Text,
    /// JSON output for scripting
    Json,
    /// CSV output for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

//! Subcommand implementations.
//!
//! Each command works against any [`DriveBackend`] and writes its report to
//! a caller-supplied writer, so the same code path runs against Drive from
//! the binary and against [`MemoryDrive`](crate::drive::MemoryDrive) in tests.

use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::TrashConfig;
use crate::cli::{ApplyArgs, OutputFormat, PairwiseArgs, ScanArgs};
use crate::config::Config;
use crate::drive::DriveBackend;
use crate::duplicates::{
    DuplicateFinder, PairResolver, RemovalSet, ResolveReport, ResolveRequest, ScanRequest,
};
use crate::error::ExitCode;
use crate::output::text::{write_removal_list, write_trash_result};
use crate::output::{CsvOutput, JsonOutput, TextOutput};
use crate::plan::{apply_plan, PlanSettings, RemovalPlan};
use crate::progress::Progress;

/// Asks the operator to approve a removal.
pub type Confirm<'a> = dyn FnMut(&str) -> io::Result<bool> + 'a;

/// Process-wide settings shared by every command.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Hide progress bars
    pub quiet: bool,
    /// Set by Ctrl+C
    pub shutdown: Arc<AtomicBool>,
}

impl RunContext {
    /// A context with a fresh shutdown flag.
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an existing shutdown flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = flag;
        self
    }
}

/// Build the resolve request for `scan`, filling unset rules from `config`.
///
/// Configured rules only apply when the command line asks for removal.
#[must_use]
pub fn resolve_request(args: &ScanArgs, config: &Config) -> ResolveRequest {
    let scan = ScanRequest {
        folder_id: args.folder.clone(),
        recursive: args.recursive,
    };
    let mut request = ResolveRequest::new(scan).with_dry_run(args.dry_run);

    if !args.wants_removal() {
        log::info!("'--delete' flag was not used. No files will be moved to trash.");
        return request;
    }

    if let Some(strategy) = args.keep_strategy.as_ref().or(config.keep_strategy.as_ref()) {
        request = request.with_keep_strategy(strategy.clone());
    }
    if let Some(folder) = args
        .trash_folder_id
        .as_ref()
        .or(config.trash_folder_id.as_ref())
    {
        request = request.with_trash_folder(folder.clone());
    }
    if !request.has_rules() {
        log::warn!("'--delete' needs --keep-strategy or --trash-folder-id; no files will be selected.");
    }
    request
}

fn write_report(
    out: &mut dyn Write,
    format: OutputFormat,
    report: &ResolveReport,
    exit_code: ExitCode,
) -> Result<()> {
    match format {
        OutputFormat::Text => TextOutput::new(report).write_to(&mut *out)?,
        OutputFormat::Json => JsonOutput::new(report, exit_code).write_to(&mut *out)?,
        OutputFormat::Csv => CsvOutput::new(&report.scan.groups, &report.removal).write_to(&mut *out)?,
    }
    Ok(())
}

/// `drivedupe scan`.
///
/// # Errors
///
/// - Listing failures and interruption during listing
/// - Refusal to trash every copy of a group without `--allow-full-removal`
/// - Failures writing the report or the plan file
pub fn run_scan<B: DriveBackend + ?Sized>(
    backend: &B,
    args: &ScanArgs,
    config: &Config,
    ctx: &RunContext,
    confirm: &mut Confirm<'_>,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let format = args.output.unwrap_or(config.output);
    let request = resolve_request(args, config);

    let progress = Progress::new(ctx.quiet);
    let finder = DuplicateFinder::new(backend)
        .with_shutdown_flag(Arc::clone(&ctx.shutdown))
        .with_listing_callback(&progress)
        .with_trash_callback(&progress);

    let planned = finder.plan(&request);
    progress.finish_listing();
    let mut report = planned?;

    if !report.scan.has_duplicates() {
        write_report(out, format, &report, ExitCode::NoDuplicates)?;
        return Ok(ExitCode::NoDuplicates);
    }

    let wants_trash = !report.dry_run && !report.removal.is_empty();
    if format == OutputFormat::Text {
        TextOutput::new(&report).write_to(&mut *out)?;
    }

    let acts_on_removal = wants_trash || (args.save_plan.is_some() && !report.removal.is_empty());
    if acts_on_removal && !report.fully_removed_groups.is_empty() && !args.allow_full_removal {
        bail!(
            "every copy of {} duplicate group(s) is selected for removal; \
             re-run with --allow-full-removal to trash them anyway",
            report.fully_removed_groups.len()
        );
    }

    if let Some(path) = &args.save_plan {
        let plan = RemovalPlan::new(PlanSettings::from(&request), report.removal.clone());
        plan.save(path)
            .with_context(|| format!("Failed to save removal plan to {}", path.display()))?;
        log::info!(
            "Saved removal plan with {} file(s) to {}; run `drivedupe apply {}` to trash them",
            report.removal.len(),
            path.display(),
            path.display()
        );
    } else if wants_trash {
        let question = format!("Move {} file(s) to the Drive trash?", report.removal.len());
        if args.yes || progress.suspend(|| confirm(&question))? {
            finder.execute(&mut report);
        } else {
            log::info!("Aborted. No files were moved to trash.");
        }
    }

    let exit_code = report
        .trash
        .as_ref()
        .map_or(ExitCode::Success, ExitCode::from_trash_result);

    match format {
        OutputFormat::Text => {
            if let Some(result) = &report.trash {
                write_trash_result(&mut *out, result)?;
            }
        }
        _ => write_report(out, format, &report, exit_code)?,
    }
    Ok(exit_code)
}

/// `drivedupe pairwise`.
///
/// # Errors
///
/// Listing failures, interruption during listing, or failures writing the report.
pub fn run_pairwise<B: DriveBackend + ?Sized>(
    backend: &B,
    args: &PairwiseArgs,
    ctx: &RunContext,
    resolver: &mut dyn PairResolver,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let request = ScanRequest {
        folder_id: args.folder.clone(),
        recursive: args.recursive,
    };
    let progress = Progress::new(ctx.quiet);
    let finder = DuplicateFinder::new(backend)
        .with_shutdown_flag(Arc::clone(&ctx.shutdown))
        .with_trash_callback(&progress);

    let report = finder.scan_pairwise(&request, resolver, args.dry_run)?;
    let stats = &report.stats;

    writeln!(
        out,
        "Checked {} file(s): {} same-name copies marked, {} pair(s) decided, {} skipped",
        stats.observed, stats.auto_marked, stats.resolved, stats.skipped
    )?;
    if stats.auto_marked + stats.resolved == 0 {
        writeln!(out, "{}", crate::output::NO_DUPLICATES_MESSAGE)?;
        return Ok(ExitCode::NoDuplicates);
    }

    write_removal_list(&mut *out, &report.removal)?;
    match &report.trash {
        Some(result) => {
            write_trash_result(&mut *out, result)?;
            Ok(ExitCode::from_trash_result(result))
        }
        None => {
            if report.dry_run && !report.removal.is_empty() {
                writeln!(out, "Dry run: no files were moved to trash.")?;
            }
            Ok(ExitCode::Success)
        }
    }
}

/// `drivedupe apply`.
///
/// # Errors
///
/// A missing, corrupt, or unsupported plan file, or failures recording progress.
pub fn run_apply<B: DriveBackend + ?Sized>(
    backend: &B,
    args: &ApplyArgs,
    ctx: &RunContext,
    confirm: &mut Confirm<'_>,
    out: &mut dyn Write,
) -> Result<ExitCode> {
    let path: &Path = &args.plan;
    let plan = RemovalPlan::load(path)
        .with_context(|| format!("Failed to load removal plan {}", path.display()))?;

    let mut pending = RemovalSet::new();
    for entry in &plan.removal {
        if !plan.completed.contains(&entry.file.id) {
            pending.insert(entry.file.clone(), entry.reason.clone());
        }
    }
    writeln!(
        out,
        "Plan {} from {}: {} file(s) pending, {} already trashed",
        path.display(),
        plan.created_at.format("%Y-%m-%d %H:%M UTC"),
        pending.len(),
        plan.completed.len()
    )?;

    if pending.is_empty() {
        writeln!(out, "Nothing left to trash.")?;
        return Ok(ExitCode::Success);
    }
    if args.dry_run {
        write_removal_list(&mut *out, &pending)?;
        writeln!(out, "Dry run: no files were moved to trash.")?;
        return Ok(ExitCode::Success);
    }

    let progress = Progress::new(ctx.quiet);
    let question = format!("Move {} file(s) to the Drive trash?", pending.len());
    if !args.yes && !progress.suspend(|| confirm(&question))? {
        log::info!("Aborted. No files were moved to trash.");
        return Ok(ExitCode::Success);
    }

    let config = TrashConfig::default().with_shutdown_flag(Arc::clone(&ctx.shutdown));
    let outcome = apply_plan(backend, path, &config, Some(&progress), false)?;
    match &outcome.result {
        Some(result) => {
            write_trash_result(&mut *out, result)?;
            Ok(ExitCode::from_trash_result(result))
        }
        None => Ok(ExitCode::Success),
    }
}

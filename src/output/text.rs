//! Human-readable terminal report.
//!
//! Lists every duplicate group with its copies, marks which copies are
//! selected for removal, and ends with a summary. Colours come from `yansi`
//! and follow its global switch, so `--no-color` and `NO_COLOR` apply here
//! without extra plumbing.

use std::io::{self, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::actions::BatchTrashResult;
use crate::duplicates::{DuplicateGroup, RemovalSet, ResolveReport};

/// Message printed when a scan finds nothing.
pub const NO_DUPLICATES_MESSAGE: &str = "No duplicate files found.";

/// Text report formatter.
pub struct TextOutput<'a> {
    report: &'a ResolveReport,
}

impl<'a> TextOutput<'a> {
    /// Create a formatter for `report`.
    #[must_use]
    pub fn new(report: &'a ResolveReport) -> Self {
        Self { report }
    }

    /// Write the full report.
    ///
    /// # Errors
    ///
    /// Returns any error from `writer`.
    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let report = self.report;
        let summary = &report.scan.summary;

        if !report.scan.has_duplicates() {
            writeln!(writer, "{NO_DUPLICATES_MESSAGE}")?;
            return Ok(());
        }

        writeln!(
            writer,
            "Found {} duplicate group(s) among {} file(s): {} redundant copies, {} reclaimable",
            summary.duplicate_groups.bold(),
            summary.total_files,
            summary.duplicate_files,
            ByteSize::b(summary.reclaimable_space).to_string().bold()
        )?;
        if summary.without_checksum > 0 {
            writeln!(
                writer,
                "{}",
                format!(
                    "{} file(s) without checksum were not compared",
                    summary.without_checksum
                )
                .dim()
            )?;
        }

        for group in &report.scan.groups {
            writeln!(writer)?;
            write_group(&mut writer, group, &report.removal)?;
        }

        writeln!(writer)?;
        for checksum in &report.fully_removed_groups {
            writeln!(
                writer,
                "{} every copy with MD5 {} is selected for removal",
                "Warning:".yellow().bold(),
                checksum
            )?;
        }

        if report.removal.is_empty() {
            writeln!(writer, "No files selected for removal.")?;
        } else {
            writeln!(
                writer,
                "{} file(s) selected for removal ({})",
                report.removal.len().bold(),
                ByteSize::b(report.removal.total_size())
            )?;
        }

        match &report.trash {
            Some(result) => write_trash_result(&mut writer, result)?,
            None if report.dry_run && !report.removal.is_empty() => {
                writeln!(writer, "{}", "Dry run: no files were moved to trash.".cyan())?;
            }
            None => {}
        }
        Ok(())
    }

    /// Render the report into a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn write_group<W: Write>(
    writer: &mut W,
    group: &DuplicateGroup,
    removal: &RemovalSet,
) -> io::Result<()> {
    let each = group.files.first().map_or(0, |f| f.size_or_zero());
    writeln!(
        writer,
        "MD5: {} ({} copies, {} each)",
        group.checksum.bold(),
        group.len(),
        ByteSize::b(each)
    )?;

    for file in &group.files {
        let line = format!("    - {} (ID: {})", file.name, file.id);
        match removal.reason_for(&file.id) {
            Some(reason) => writeln!(writer, "{}  {}", line.red(), format!("[trash: {reason}]").red())?,
            None if removal.is_empty() => writeln!(writer, "{line}")?,
            None => writeln!(writer, "{}  {}", line.green(), "[keep]".green())?,
        }
    }
    Ok(())
}

/// Write the outcome of a removal batch, listing every failure.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_trash_result<W: Write + ?Sized>(writer: &mut W, result: &BatchTrashResult) -> io::Result<()> {
    for failure in &result.failures {
        writeln!(
            writer,
            "{} {} (ID: {}): {}",
            "Failed:".red().bold(),
            failure.name,
            failure.id,
            failure.error
        )?;
    }
    let summary = result.summary();
    if result.all_succeeded() {
        writeln!(writer, "{}, freed {}", summary.green(), ByteSize::b(result.bytes_freed))
    } else {
        writeln!(writer, "{}, freed {}", summary.yellow(), ByteSize::b(result.bytes_freed))
    }
}

/// Write a plain list of files selected for removal.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_removal_list<W: Write + ?Sized>(writer: &mut W, removal: &RemovalSet) -> io::Result<()> {
    if removal.is_empty() {
        return writeln!(writer, "No files selected for removal.");
    }
    writeln!(writer, "{} file(s) selected for removal:", removal.len())?;
    for entry in removal {
        writeln!(
            writer,
            "    - {} (ID: {})  [{}]",
            entry.file.name, entry.file.id, entry.reason
        )?;
    }
    Ok(())
}

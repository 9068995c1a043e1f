//! Terminal prompts: confirmation before trashing, and the operator side of
//! pairwise mode.

use std::io::{self, BufRead, Write};

use bytesize::ByteSize;
use yansi::Paint;

use crate::drive::FileRecord;
use crate::duplicates::{AmbiguousPair, PairDecision, PairResolver};

/// Ask a yes/no question on `output`, reading the answer from `input`.
///
/// An empty answer returns `default` when one is given, otherwise the
/// question is repeated. End of input counts as "no".
///
/// # Errors
///
/// Returns any I/O error from reading or writing.
pub fn confirm_with<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
    prompt: &str,
    default: Option<bool>,
) -> io::Result<bool> {
    let mut line = String::new();
    loop {
        String::clear(&mut line);
        match default {
            Some(true) => write!(output, "{} (Y/n): ", prompt)?,
            Some(false) | None => write!(output, "{} (y/N): ", prompt)?,
        }
        output.flush()?;

        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(false);
        }

        match line.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "N" | "NO" => return Ok(false),
            "" => {
                if let Some(default) = default {
                    return Ok(default);
                }
            }
            _ => {}
        }
    }
}

/// [`confirm_with`] reading stdin and asking on stderr.
///
/// # Errors
///
/// Returns any I/O error from the terminal.
pub fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    confirm_with(io::stdin().lock(), io::stderr(), prompt, default)
}

/// Asks the operator which file of an ambiguous pair to trash.
pub struct TerminalResolver<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalResolver<R, W> {
    /// A resolver reading answers from `input` and writing questions to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn describe(&mut self, label: &str, file: &FileRecord) -> io::Result<()> {
        let modified = file.modified_time.as_deref().unwrap_or("unknown");
        writeln!(
            self.output,
            "  [{}] {} (ID: {}, {}, modified {})",
            label.bold(),
            file.name,
            file.id,
            ByteSize::b(file.size_or_zero()),
            modified
        )
    }

    fn ask(&mut self, pair: &AmbiguousPair<'_>) -> io::Result<PairDecision> {
        writeln!(self.output)?;
        writeln!(
            self.output,
            "{} {}",
            "Same content, different names:".yellow().bold(),
            pair.reference.content_checksum().unwrap_or_default()
        )?;
        self.describe("1", pair.reference)?;
        self.describe("2", pair.candidate)?;

        let mut line = String::new();
        loop {
            String::clear(&mut line);
            write!(self.output, "Trash [1], trash [2], or [s]kip? ")?;
            self.output.flush()?;

            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(PairDecision::Skip);
            }
            match line.trim().to_lowercase().as_str() {
                "1" => return Ok(PairDecision::TrashReference),
                "2" => return Ok(PairDecision::TrashCandidate),
                "s" | "skip" | "" => return Ok(PairDecision::Skip),
                other => writeln!(self.output, "Unrecognised answer '{other}'")?,
            }
        }
    }
}

impl<R: BufRead, W: Write> PairResolver for TerminalResolver<R, W> {
    fn resolve(&mut self, pair: &AmbiguousPair<'_>) -> PairDecision {
        self.ask(pair).unwrap_or_else(|e| {
            log::warn!(
                "Could not read an answer for {} and {}, skipping: {}",
                pair.reference.id,
                pair.candidate.id,
                e
            );
            PairDecision::Skip
        })
    }
}

//! Implementation of `flowlint validate <paths...>`.
//!
//! Checks every document against a rule set and prints one report per
//! document to stdout, sorted by path.
//!
//! Flags:
//! - `--fix`: apply verified repairs and write the documents back, saving
//!   `<path>.bak` first unless `--no-backup`.
//! - `--style human|machine`: report layout.
//! - `--rules FILE` / `--profile NAME`: which rules to apply.
//!
//! Exit codes:
//! - 0 = every document is valid (after repair, with `--fix`)
//! - 1 = at least one document has errors or could not be read
//! - 2 = bad rules, unknown profile, or a failed write
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use flowlint_core::{
    Pipeline, ReportFormatter, ReportStyle, SourceDocument, ValidationReport, failed_load,
};
use tracing::{info, warn};

use crate::cmd::emit;
use crate::cmd::rules::{load_rules_file, profile_rules};
use crate::error::CliError;
use crate::io::{read_document, write_back};

/// Parsed `validate` arguments plus the global flags it needs.
#[derive(Debug, Clone)]
pub struct ValidateArgs {
    /// Documents to check.
    pub paths: Vec<PathBuf>,
    /// Apply and write back repairs.
    pub fix: bool,
    /// Report layout.
    pub style: ReportStyle,
    /// Custom rules file; overrides `profile`.
    pub rules: Option<PathBuf>,
    /// Built-in profile name.
    pub profile: String,
    /// Save `<path>.bak` before writing.
    pub backup: bool,
    /// Size limit per document, in bytes.
    pub max_file_size: u64,
    /// ANSI colors in human output.
    pub colors: bool,
}

/// One document's result, plus what is needed to write its repair back.
struct Checked {
    report: ValidationReport,
    write: Option<(SourceDocument, SourceDocument)>,
}

/// Runs the `validate` command.
///
/// Reports are printed even when a write-back fails; the write failure is
/// returned afterwards.
///
/// # Errors
///
/// - [`CliError::RulesUnreadable`], [`CliError::InvalidRules`],
///   [`CliError::UnknownProfile`]: the rules could not be set up. Nothing is
///   checked.
/// - [`CliError::WriteFailed`]: a repaired document could not be saved.
/// - [`CliError::ValidationFailed`]: at least one document is invalid.
pub fn run(args: &ValidateArgs) -> Result<(), CliError> {
    let rules = match &args.rules {
        Some(path) => load_rules_file(path)?,
        None => profile_rules(&args.profile)?,
    };
    info!(
        rules = rules.name(),
        count = rules.len(),
        documents = args.paths.len(),
        fix = args.fix,
        "validating"
    );
    let pipeline = Pipeline::new(rules).with_fix(args.fix);

    let checked = check_all(&pipeline, &args.paths, args.max_file_size);

    let mut write_error = None;
    let mut reports = Vec::with_capacity(checked.len());
    for item in checked {
        if let Some((original, repaired)) = &item.write {
            if let Err(e) = write_back(original, repaired, args.backup) {
                warn!(path = %original.path().display(), "write-back failed");
                if write_error.is_none() {
                    write_error = Some(e);
                }
            } else {
                info!(
                    path = %original.path().display(),
                    repairs = item.report.applied_repairs.len(),
                    "wrote repaired document"
                );
            }
        }
        reports.push(item.report);
    }

    let formatter = ReportFormatter::new().with_colors(args.colors);
    let text = if reports.len() == 1 {
        formatter.format(&reports[0], args.style)
    } else {
        formatter.format_batch(&reports, args.style)
    };
    emit(&text)?;

    if let Some(e) = write_error {
        return Err(e);
    }
    if reports.iter().all(ValidationReport::is_valid) {
        Ok(())
    } else {
        Err(CliError::ValidationFailed)
    }
}

/// Checks `paths` on scoped worker threads. Results come back in input order.
fn check_all(pipeline: &Pipeline, paths: &[PathBuf], max_file_size: u64) -> Vec<Checked> {
    let workers = std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .clamp(1, paths.len().max(1));
    let chunk = paths.len().div_ceil(workers).max(1);

    std::thread::scope(|scope| {
        let handles: Vec<_> = paths
            .chunks(chunk)
            .map(|batch| {
                scope.spawn(move || {
                    batch
                        .iter()
                        .map(|path| check_one(pipeline, path, max_file_size))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(batch) => batch,
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    })
}

fn check_one(pipeline: &Pipeline, path: &Path, max_file_size: u64) -> Checked {
    let document = match read_document(path, max_file_size) {
        Ok(document) => document,
        Err(failure) => {
            warn!(path = %path.display(), %failure, "could not read document");
            return Checked {
                report: failed_load(path, &failure),
                write: None,
            };
        }
    };
    let outcome = pipeline.run(&document);
    info!(
        path = %path.display(),
        valid = outcome.report.is_valid(),
        errors = outcome.report.error_count(),
        warnings = outcome.report.warning_count(),
        "checked"
    );
    Checked {
        write: outcome.repaired.map(|repaired| (document, repaired)),
        report: outcome.report,
    }
}

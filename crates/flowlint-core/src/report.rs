//! Per-document validation reports and their text renderings.
//!
//! Two styles are supported:
//!
//! - **Machine**: one tab-separated line per finding,
//!   `severity\tpath\tline:col\tmessage`, sorted by severity (errors first)
//!   and then line, followed by one `fixed\t...` line per applied repair.
//!   Stable across runs, so CI logs diff cleanly.
//! - **Human**: a `PASS`/`FAIL` summary line per document, then one indented
//!   line per finding. Optionally colored.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::repair::RepairAction;
use crate::validation::{Diagnostic, Severity};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_GREEN: &str = "\x1b[32m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_CYAN: &str = "\x1b[36m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

/// Everything found (and fixed) in one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// The document's path.
    pub path: PathBuf,
    /// Findings that still stand, in pipeline order.
    pub diagnostics: Vec<Diagnostic>,
    /// Repairs that were applied; empty unless fixing ran and succeeded.
    pub applied_repairs: Vec<RepairAction>,
}

impl ValidationReport {
    /// A report with no repairs.
    pub fn new(path: impl Into<PathBuf>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            path: path.into(),
            diagnostics,
            applied_repairs: Vec::new(),
        }
    }

    /// Attaches the repairs that were applied.
    #[must_use]
    pub fn with_repairs(mut self, applied_repairs: Vec<RepairAction>) -> Self {
        self.applied_repairs = applied_repairs;
        self
    }

    /// `true` when no Error-severity diagnostic remains.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Number of Error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of Warning-severity diagnostics.
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Diagnostics sorted by severity (errors first), then line. Findings
    /// without a position sort as line 0; ties keep pipeline order.
    pub fn sorted_diagnostics(&self) -> Vec<&Diagnostic> {
        let mut sorted: Vec<&Diagnostic> = self.diagnostics.iter().collect();
        sorted.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| line_of(a).cmp(&line_of(b)))
        });
        sorted
    }
}

fn line_of(diag: &Diagnostic) -> usize {
    diag.line_col().map_or(0, |(line, _)| line)
}

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportStyle {
    /// Summary line plus indented details.
    #[default]
    Human,
    /// Tab-separated lines for tools.
    Machine,
}

impl fmt::Display for ReportStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Human => "human",
            Self::Machine => "machine",
        })
    }
}

/// Renders reports; carries presentation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFormatter {
    colors: bool,
}

impl ReportFormatter {
    /// A formatter without colors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables ANSI colors in human output. Machine output is
    /// never colored.
    #[must_use]
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Renders one report.
    pub fn format(&self, report: &ValidationReport, style: ReportStyle) -> String {
        let mut out = String::new();
        match style {
            ReportStyle::Human => self.write_human(&mut out, report),
            ReportStyle::Machine => write_machine(&mut out, report),
        }
        out
    }

    /// Renders several reports in path order. Human output ends with a
    /// totals line.
    pub fn format_batch(&self, reports: &[ValidationReport], style: ReportStyle) -> String {
        let mut sorted: Vec<&ValidationReport> = reports.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));
        let mut out = String::new();
        for report in &sorted {
            match style {
                ReportStyle::Human => self.write_human(&mut out, report),
                ReportStyle::Machine => write_machine(&mut out, report),
            }
        }
        if style == ReportStyle::Human {
            let failed = sorted.iter().filter(|r| !r.is_valid()).count();
            let passed = sorted.len() - failed;
            out.push_str(&format!(
                "{} checked: {passed} passed, {failed} failed\n",
                plural(sorted.len(), "document", "documents")
            ));
        }
        out
    }

    fn paint(&self, out: &mut String, color: &str, text: &str) {
        if self.colors {
            out.push_str(color);
            out.push_str(text);
            out.push_str(ANSI_RESET);
        } else {
            out.push_str(text);
        }
    }

    fn write_human(&self, out: &mut String, report: &ValidationReport) {
        let path = report.path.display();
        if report.is_valid() {
            self.paint(out, &format!("{ANSI_BOLD}{ANSI_GREEN}"), "PASS");
        } else {
            self.paint(out, &format!("{ANSI_BOLD}{ANSI_RED}"), "FAIL");
        }
        out.push_str(&format!(" {path}"));

        let errors = report.error_count();
        let warnings = report.warning_count();
        let repairs = report.applied_repairs.len();
        if errors == 0 && warnings == 0 && repairs == 0 {
            out.push_str(" (no issues found)\n");
            return;
        }
        let mut counts = vec![
            plural(errors, "error", "errors"),
            plural(warnings, "warning", "warnings"),
        ];
        if repairs > 0 {
            counts.push(format!("{} applied", plural(repairs, "repair", "repairs")));
        }
        out.push_str(&format!(" ({})\n", counts.join(", ")));

        for diag in report.sorted_diagnostics() {
            let (tag, color) = match diag.severity {
                Severity::Error => ("[E]", ANSI_RED),
                Severity::Warning => ("[W]", ANSI_YELLOW),
            };
            out.push_str("  ");
            self.paint(out, color, tag);
            out.push_str(&format!(" {}  {}", position(diag), diag.code));
            if let Some(location) = &diag.location {
                out.push_str(&format!("  {location}"));
            }
            out.push_str(&format!(": {}\n", flatten(&diag.message)));
        }
        for action in &report.applied_repairs {
            out.push_str("  ");
            self.paint(out, ANSI_CYAN, "[F]");
            out.push_str(&format!(
                " {}  {}  {}: {}\n",
                action.span.start, action.rule_id, action.location, action.description
            ));
        }
    }
}

fn write_machine(out: &mut String, report: &ValidationReport) {
    let path = machine_path(&report.path);
    for diag in report.sorted_diagnostics() {
        out.push_str(&format!(
            "{}\t{path}\t{}\t{}\n",
            diag.severity,
            position(diag),
            flatten(&diag.message)
        ));
    }
    for action in &report.applied_repairs {
        out.push_str(&format!(
            "fixed\t{path}\t{}\t{}\n",
            action.span.start,
            flatten(&action.description)
        ));
    }
}

fn machine_path(path: &Path) -> String {
    flatten(&path.display().to_string())
}

fn position(diag: &Diagnostic) -> String {
    diag.span
        .map_or_else(|| "0:0".to_owned(), |span| span.start.to_string())
}

/// Tabs and line breaks would break the one-line-per-finding format.
fn flatten(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

/// Renders one report without colors.
pub fn format(report: &ValidationReport, style: ReportStyle) -> String {
    ReportFormatter::new().format(report, style)
}

/// Renders several reports, sorted by path, without colors.
pub fn format_batch(reports: &[ValidationReport], style: ReportStyle) -> String {
    ReportFormatter::new().format_batch(reports, style)
}

/// Diagnostic types and rule evaluation for the flowlint validation engine.
///
/// This module defines [`Diagnostic`], [`Severity`] and [`DiagnosticCode`],
/// the values every stage of the pipeline reports problems with, and the
/// [`evaluate`] entry point that checks a parsed tree against a list of
/// [`Rule`]s.
///
/// Expected, data-dependent problems are always diagnostics flowing through
/// the normal return path. Evaluation itself cannot fail: rule definitions
/// are validated when a [`crate::rules::RuleSet`] is built, and every check
/// is total over any tree shape.
mod checks;

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::document::Span;
use crate::node::Node;
use crate::path::NodePath;
use crate::rules::{Rule, RuleKind};


/// The severity of a finding.
///
/// Ordered so that `Error > Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth knowing; does not make the document invalid.
    Warning,
    /// The document does not satisfy its rules.
    Error,
}

impl Severity {
    /// Lowercase name used in machine-readable output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable classification of a finding.
///
/// [`DiagnosticCode::code`] returns the stable hyphenated form used in output
/// (e.g. `"duplicate-key"`). Findings produced by rules carry the rule's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DiagnosticCode {
    /// The input was not valid UTF-8 and was decoded lossily.
    InvalidUtf8,
    /// NUL bytes were removed from the input.
    NulBytes,
    /// Other control characters were removed from the input.
    ControlCharacters,
    /// The document could not be read at all.
    LoadFailed,
    /// The document has no content.
    EmptyDocument,
    /// The text is outside the supported grammar.
    Syntax,
    /// A mapping repeats a key.
    DuplicateKey,
    /// A rule violation; carries the rule id.
    Rule(String),
    /// A repair was skipped because it overlapped an earlier one.
    RepairConflict,
    /// Planned repairs were discarded because re-validation failed.
    RepairRejected,
}

impl DiagnosticCode {
    /// Returns the canonical code string.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidUtf8 => "invalid-utf8",
            Self::NulBytes => "nul-bytes",
            Self::ControlCharacters => "control-characters",
            Self::LoadFailed => "load-failed",
            Self::EmptyDocument => "empty-document",
            Self::Syntax => "syntax",
            Self::DuplicateKey => "duplicate-key",
            Self::Rule(id) => id,
            Self::RepairConflict => "repair-conflict",
            Self::RepairRejected => "repair-rejected",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A single finding.
///
/// Produced fresh by each run and never mutated afterwards. Instead of
/// holding the offending node, a diagnostic records where it is: the
/// concrete tree `location` and the source `span`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// What kind of finding this is.
    pub code: DiagnosticCode,
    /// How bad it is.
    pub severity: Severity,
    /// Human-readable explanation.
    pub message: String,
    /// Concrete tree path of the node concerned, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<NodePath>,
    /// Source range of the node concerned, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// The rule that produced the finding, for rule violations.
    #[serde(skip)]
    pub rule: Option<Rule>,
    /// Whether the repair planner can resolve the finding.
    pub auto_fixable: bool,
}

impl Diagnostic {
    /// Constructs a diagnostic with no location, span or rule.
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            span: None,
            rule: None,
            auto_fixable: false,
        }
    }

    /// Constructs an Error-severity violation of `rule`.
    pub fn violation(rule: &Rule, location: NodePath, message: impl Into<String>) -> Self {
        Self {
            code: DiagnosticCode::Rule(rule.id.clone()),
            severity: Severity::Error,
            message: message.into(),
            location: Some(location),
            span: None,
            rule: Some(rule.clone()),
            auto_fixable: false,
        }
    }

    /// Attaches a source span.
    #[must_use]
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attaches a tree location.
    #[must_use]
    pub fn with_location(mut self, location: NodePath) -> Self {
        self.location = Some(location);
        self
    }

    /// Marks whether the repair planner can resolve this finding.
    #[must_use]
    pub fn fixable(mut self, auto_fixable: bool) -> Self {
        self.auto_fixable = auto_fixable;
        self
    }

    /// Returns `true` for [`Severity::Error`].
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// One-based `(line, column)` of the span start, if any.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        self.span.map(|s| (s.start.line, s.start.column))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => 'E',
            Severity::Warning => 'W',
        };
        write!(f, "[{tag}] {}", self.code)?;
        if let Some(span) = &self.span {
            write!(f, " {}", span.start)?;
        }
        if let Some(location) = &self.location {
            write!(f, " {location}")?;
        }
        write!(f, ": {}", self.message)
    }
}

fn is_type_finding(diag: &Diagnostic) -> bool {
    diag.rule
        .as_ref()
        .is_some_and(|rule| matches!(rule.kind, RuleKind::TypeIs { .. }))
}

/// Removes findings already explained by a wrong node type.
///
/// Once a node is reported as the wrong type, nothing beneath it is
/// reported, and other rule kinds stay silent about the node itself.
fn drop_beneath_mistyped(diags: &mut Vec<Diagnostic>) {
    let mistyped: Vec<NodePath> = diags
        .iter()
        .filter(|d| is_type_finding(d))
        .filter_map(|d| d.location.clone())
        .collect();
    if mistyped.is_empty() {
        return;
    }
    diags.retain(|d| {
        let Some(location) = &d.location else {
            return true;
        };
        let type_finding = is_type_finding(d);
        !mistyped.iter().any(|m| {
            location.starts_with(m) && (location.len() > m.len() || !type_finding)
        })
    });
}

/// Checks `tree` against `rules` and returns every violation.
///
/// Rules run in declaration order and the returned diagnostics keep that
/// order; a wildcard rule reports its matches in document order. Findings
/// on or beneath a node reported by a `type_is` rule are folded into that
/// one finding. A `None`
/// tree (the document failed to parse) yields no diagnostics, since the parse
/// error already describes the problem.
pub fn evaluate(tree: Option<&Node>, rules: &[Rule]) -> Vec<Diagnostic> {
    let Some(root) = tree else {
        return Vec::new();
    };
    let mut diags = Vec::new();
    for rule in rules {
        checks::check(root, rule, &mut diags);
    }
    drop_beneath_mistyped(&mut diags);
    debug!(
        rules = rules.len(),
        diagnostics = diags.len(),
        "evaluated rules"
    );
    diags
}

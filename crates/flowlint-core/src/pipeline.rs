//! Runs one document through parse, evaluate and (optionally) repair.
//!
//! A repair is only kept after the repaired text has been parsed and
//! evaluated again: it must still produce a tree, introduce no new parse
//! errors, and none of the diagnostics it targeted may fire again. Anything
//! else is discarded with a `repair-rejected` warning and the original
//! findings stand.
use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info_span, warn};

use crate::document::SourceDocument;
use crate::parser::{ParseResult, parse};
use crate::repair::{self, RepairAction, RepairPlan};
use crate::report::ValidationReport;
use crate::rules::RuleSet;
use crate::validation::{Diagnostic, DiagnosticCode, Severity, evaluate};

/// The result of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Findings and applied repairs.
    pub report: ValidationReport,
    /// The repaired document, present only when repairs were applied.
    pub repaired: Option<SourceDocument>,
}

/// Validation (and optional repair) under one rule set.
#[derive(Debug, Clone)]
pub struct Pipeline {
    rules: RuleSet,
    fix: bool,
}

impl Pipeline {
    /// A validate-only pipeline.
    pub fn new(rules: RuleSet) -> Self {
        Self { rules, fix: false }
    }

    /// Enables or disables repair.
    #[must_use]
    pub fn with_fix(mut self, fix: bool) -> Self {
        self.fix = fix;
        self
    }

    /// The rules this pipeline evaluates.
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Validates `document`, repairing it first when fixing is enabled.
    ///
    /// Load warnings carried by the document are reported ahead of parse
    /// errors, which come ahead of rule findings.
    pub fn run(&self, document: &SourceDocument) -> PipelineOutcome {
        let span = info_span!("document", path = %document.path().display());
        let _guard = span.enter();

        let mut diagnostics = document.load_diagnostics().to_vec();
        let parsed = parse(document);
        let findings = evaluate(parsed.root.as_ref(), self.rules.rules());
        debug!(
            parse_errors = parsed.parse_errors.len(),
            findings = findings.len(),
            "evaluated"
        );

        let plan = if self.fix {
            repair::plan(document, parsed.root.as_ref(), &findings)
        } else {
            RepairPlan::default()
        };
        if plan.is_empty() {
            diagnostics.extend(parsed.parse_errors);
            diagnostics.extend(findings);
            diagnostics.extend(plan.skipped);
            return PipelineOutcome {
                report: ValidationReport::new(document.path(), diagnostics),
                repaired: None,
            };
        }

        match self.verify(document, &parsed, &plan.actions) {
            Ok((repaired, reparsed, remaining)) => {
                debug!(applied = plan.actions.len(), "repairs verified");
                diagnostics.extend(reparsed.parse_errors);
                diagnostics.extend(remaining);
                diagnostics.extend(plan.skipped);
                PipelineOutcome {
                    report: ValidationReport::new(document.path(), diagnostics)
                        .with_repairs(plan.actions),
                    repaired: Some(repaired),
                }
            }
            Err(reason) => {
                warn!(%reason, "discarding repairs");
                diagnostics.extend(parsed.parse_errors);
                diagnostics.extend(findings);
                diagnostics.extend(plan.skipped);
                diagnostics.push(Diagnostic::new(
                    DiagnosticCode::RepairRejected,
                    Severity::Warning,
                    format!("repairs were not applied: {reason}"),
                ));
                PipelineOutcome {
                    report: ValidationReport::new(document.path(), diagnostics),
                    repaired: None,
                }
            }
        }
    }

    fn verify(
        &self,
        document: &SourceDocument,
        parsed: &ParseResult,
        actions: &[RepairAction],
    ) -> Result<(SourceDocument, ParseResult, Vec<Diagnostic>), String> {
        let repaired = repair::apply(document, actions).map_err(|e| e.to_string())?;
        let reparsed = parse(&repaired);
        if reparsed.root.is_none() || reparsed.parse_errors.len() > parsed.parse_errors.len() {
            return Err("the repaired text does not parse cleanly".to_owned());
        }
        let remaining = evaluate(reparsed.root.as_ref(), self.rules.rules());
        let unresolved = actions.iter().find(|action| {
            remaining.iter().any(|d| {
                d.code.code() == action.rule_id && d.location.as_ref() == Some(&action.location)
            })
        });
        if let Some(action) = unresolved {
            return Err(format!(
                "{} still fails at {} after repair",
                action.rule_id, action.location
            ));
        }
        Ok((repaired, reparsed, remaining))
    }
}

/// A report for a document that could not be read at all.
pub fn failed_load(path: impl Into<PathBuf>, reason: &impl fmt::Display) -> ValidationReport {
    ValidationReport::new(
        path,
        vec![Diagnostic::new(
            DiagnosticCode::LoadFailed,
            Severity::Error,
            reason.to_string(),
        )],
    )
}

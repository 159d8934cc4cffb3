//! End-to-end scenarios: a missing trigger that gets repaired, a duplicated
//! top-level key, and an empty document.
#![allow(clippy::expect_used)]

use flowlint_core::{
    DiagnosticCode, Pipeline, RuleSet, Severity, apply, evaluate, load_bytes, parse, plan,
};

const MISSING_TRIGGER: &str = "name: X\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps: []\n";

/// A missing trigger is one fixable error; the repair lands right after
/// `name` and leaves nothing for the rule to report.
#[test]
fn missing_trigger_is_inserted_after_name() {
    let rules = RuleSet::minimal();
    let doc = load_bytes("ci.yml", MISSING_TRIGGER);
    let parsed = parse(&doc);
    assert!(parsed.is_clean());

    let diags = evaluate(parsed.root.as_ref(), rules.rules());
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].code.code(), "trigger-required");
    assert!(diags[0].auto_fixable);

    let repairs = plan(&doc, parsed.root.as_ref(), &diags);
    assert_eq!(repairs.actions.len(), 1);
    assert!(repairs.skipped.is_empty());
    let repaired = apply(&doc, &repairs.actions).expect("repairs apply");
    assert_eq!(
        repaired.text(),
        "name: X\non: {push: {branches: [main]}}\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps: []\n"
    );

    let reparsed = parse(&repaired);
    assert!(reparsed.is_clean());
    assert!(evaluate(reparsed.root.as_ref(), rules.rules()).is_empty());
}

/// Under the full profile the trigger is fixed and only the unfixable empty
/// step list remains.
#[test]
fn missing_trigger_under_the_workflow_profile() {
    let doc = load_bytes("ci.yml", MISSING_TRIGGER);
    let outcome = Pipeline::new(RuleSet::workflow()).with_fix(true).run(&doc);
    assert!(outcome.repaired.is_some());
    let codes: Vec<&str> = outcome
        .report
        .diagnostics
        .iter()
        .map(|d| d.code.code())
        .collect();
    assert_eq!(codes, vec!["job-steps-non-empty"]);
    assert_eq!(outcome.report.applied_repairs.len(), 1);
    assert_eq!(outcome.report.applied_repairs[0].rule_id, "trigger-required");
}

/// Two `on:` keys give exactly one duplicate-key error at the second one.
#[test]
fn duplicate_trigger_key() {
    let doc = load_bytes(
        "ci.yml",
        "name: CI\non: push\non: pull_request\njobs:\n  b:\n    runs-on: x\n    steps: [a]\n",
    );
    let outcome = Pipeline::new(RuleSet::workflow()).run(&doc);
    let dups: Vec<_> = outcome
        .report
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::DuplicateKey)
        .collect();
    assert_eq!(dups.len(), 1);
    assert_eq!(dups[0].severity, Severity::Error);
    assert_eq!(dups[0].line_col(), Some((3, 1)));
    assert!(!outcome.report.is_valid());
}

/// Duplicates are counted per repeated key, however large the mapping.
#[test]
fn one_error_per_duplicate() {
    let mut text = String::new();
    for i in 0..40 {
        text.push_str(&format!("k{i}: {i}\n"));
    }
    text.push_str("k3: again\nk17: again\nk3: third\n");
    let parsed = parse(&load_bytes("big.yml", text));
    let dups = parsed
        .parse_errors
        .iter()
        .filter(|d| d.code == DiagnosticCode::DuplicateKey)
        .count();
    assert_eq!(dups, 3);
    assert!(parsed.root.is_some());
}

/// An empty document is a single error and no tree.
#[test]
fn empty_document() {
    let doc = load_bytes("empty.yml", "");
    let parsed = parse(&doc);
    assert!(parsed.root.is_none());
    assert_eq!(parsed.parse_errors.len(), 1);
    assert_eq!(parsed.parse_errors[0].message, "document is empty");

    let outcome = Pipeline::new(RuleSet::workflow()).with_fix(true).run(&doc);
    assert!(!outcome.report.is_valid());
    assert!(outcome.repaired.is_none());
    assert_eq!(outcome.report.diagnostics.len(), 1);
    assert_eq!(outcome.report.diagnostics[0].code, DiagnosticCode::EmptyDocument);
}

//! Property-based tests for the repair planner and applier.
//!
//! Documents are assembled from a small vocabulary of workflow fragments in
//! which the trigger and any runner may be missing and `on`/steps values may
//! be empty, so every generated document is well-formed but usually has
//! something to fix.
#![allow(clippy::expect_used)]

use flowlint_core::{
    Diagnostic, DiagnosticCode, NodePath, RepairAction, Rule, RuleSet, Severity, SourceDocument,
    TextEdit, apply, evaluate, load_bytes, parse, plan,
};
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone)]
struct Job {
    name: String,
    runner: Option<String>,
    flow_steps: bool,
}

#[derive(Debug, Clone)]
struct Workflow {
    name: Option<String>,
    trigger: Option<&'static str>,
    jobs: Vec<Job>,
}

impl Workflow {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(name) = &self.name {
            out.push_str(&format!("name: {name}\n"));
        }
        if let Some(trigger) = self.trigger {
            out.push_str(&format!("on:{trigger}\n"));
        }
        out.push_str("jobs:\n");
        for job in &self.jobs {
            out.push_str(&format!("  {}:\n", job.name));
            if job.flow_steps {
                out.push_str("    steps: [{run: make}]\n");
            } else {
                out.push_str("    steps:\n      - run: make\n");
            }
            if let Some(runner) = &job.runner {
                out.push_str(&format!("    runs-on: {runner}\n"));
            }
        }
        out
    }
}

fn arb_job(name: String) -> impl Strategy<Value = Job> {
    (
        prop::option::of(prop::sample::select(vec!["ubuntu-latest", "macos-14", "windows-2022"])),
        any::<bool>(),
    )
        .prop_map(move |(runner, flow_steps)| Job {
            name: name.clone(),
            runner: runner.map(str::to_owned),
            flow_steps,
        })
}

/// Distinct job names; the prefix keeps them from resolving as `null` or a
/// boolean.
fn arb_jobs() -> impl Strategy<Value = Vec<Job>> {
    prop::collection::btree_set("job-[a-z]{1,6}", 1..5).prop_flat_map(|names| {
        names.into_iter().map(arb_job).collect::<Vec<_>>()
    })
}

fn arb_workflow() -> impl Strategy<Value = Workflow> {
    (
        prop::option::of("[A-Z][a-z]{0,6}"),
        prop::option::of(prop::sample::select(vec![
            " push",
            " [push, pull_request]",
            "",
            " {}",
            "\n  push:\n    branches: [main]",
        ])),
        arb_jobs(),
    )
        .prop_map(|(name, trigger, jobs)| Workflow {
            name,
            trigger,
            jobs,
        })
}

fn fix(doc: &SourceDocument, rules: &RuleSet) -> SourceDocument {
    let parsed = parse(doc);
    let diags = evaluate(parsed.root.as_ref(), rules.rules());
    let repairs = plan(doc, parsed.root.as_ref(), &diags);
    apply(doc, &repairs.actions).expect("planned repairs apply")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Fixing twice gives the same text as fixing once.
    #[test]
    fn fixing_is_idempotent(workflow in arb_workflow()) {
        let rules = RuleSet::workflow();
        let doc = load_bytes("gen.yml", workflow.render());
        let once = fix(&doc, &rules);
        let twice = fix(&once, &rules);
        prop_assert_eq!(once.text(), twice.text());
    }

    /// After fixing, no auto-fixable finding remains and the text still
    /// parses cleanly.
    #[test]
    fn fixing_reaches_a_fix_point(workflow in arb_workflow()) {
        let rules = RuleSet::workflow();
        let doc = load_bytes("gen.yml", workflow.render());
        let fixed = fix(&doc, &rules);
        let parsed = parse(&fixed);
        prop_assert!(parsed.is_clean(), "{}\n{:?}", fixed.text(), parsed.parse_errors);
        let remaining = evaluate(parsed.root.as_ref(), rules.rules());
        prop_assert!(
            remaining.iter().all(|d| !d.auto_fixable),
            "{}\n{:?}",
            fixed.text(),
            remaining
        );
    }

    /// Every node's span starts and ends on the position it reports.
    #[test]
    fn spans_are_consistent(workflow in arb_workflow()) {
        let doc = load_bytes("gen.yml", workflow.render());
        let root = parse(&doc).root.expect("generated documents parse");
        for node in root.iter() {
            prop_assert!(node.span.start.offset <= node.span.end.offset);
            prop_assert_eq!(doc.position(node.span.start.offset), node.span.start);
            prop_assert_eq!(doc.position(node.span.end.offset), node.span.end);
        }
    }

    /// Overlapping edits are refused and the input is left as it was.
    #[test]
    fn overlapping_edits_are_rejected(start in 0usize..20, len in 1usize..10, shift in 0usize..9) {
        let text = "abcdefghijklmnopqrstuvwxyz0123456789\n";
        let doc = load_bytes("x.yml", text);
        let shift = shift.min(len - 1);
        let action = |rule: &str, edit: TextEdit| RepairAction {
            diagnostic: Diagnostic::new(DiagnosticCode::Rule(rule.to_owned()), Severity::Error, ""),
            rule_id: rule.to_owned(),
            location: NodePath::keys(&[rule]),
            description: String::new(),
            span: doc.span(edit.start, edit.end),
            edit,
        };
        let first = action("first", TextEdit::replace(start, start + len, "X"));
        let second = action("second", TextEdit::replace(start + shift, start + len + 1, "Y"));
        prop_assert!(apply(&doc, &[first, second]).is_err());
        prop_assert_eq!(doc.text(), text);
    }
}

/// Two repairs for the same location never both survive, on every run.
#[test]
fn conflicting_rules_keep_the_first() {
    let rules = RuleSet::new(
        "pair",
        vec![
            Rule::non_empty("fill-a", NodePath::keys(&["a"])).with_repair(json!(1)),
            Rule::non_empty("fill-a-again", NodePath::keys(&["a"])).with_repair(json!(2)),
        ],
    )
    .expect("valid rules");
    for _ in 0..3 {
        let doc = load_bytes("x.yml", "a:\nb: 1\n");
        let parsed = parse(&doc);
        let diags = evaluate(parsed.root.as_ref(), rules.rules());
        let repairs = plan(&doc, parsed.root.as_ref(), &diags);
        assert_eq!(repairs.actions.len(), 1);
        assert_eq!(repairs.actions[0].rule_id, "fill-a");
        assert_eq!(repairs.skipped.len(), 1);
        let fixed = apply(&doc, &repairs.actions).expect("apply");
        assert_eq!(fixed.text(), "a: 1\nb: 1\n");
    }
}

//! Per-kind rule checks.
//!
//! Each check resolves its rule's path against the tree and pushes zero or
//! more diagnostics. Missing values are only ever reported by
//! `required_key`; the other kinds look at values that are present, and
//! `one_of` / `type_is` leave null values to `non_empty`.
use serde_json::Value;

use crate::node::{Node, NodeType};
use crate::path::{NodePath, PathSegment};
use crate::rules::{Rule, RuleKind};

use super::Diagnostic;

pub(super) fn check(root: &Node, rule: &Rule, diags: &mut Vec<Diagnostic>) {
    match &rule.kind {
        RuleKind::RequiredKey { default, .. } => required_key(root, rule, default.as_ref(), diags),
        RuleKind::NonEmpty { fallback } => non_empty(root, rule, fallback.is_some(), diags),
        RuleKind::OneOf { allowed } => one_of(root, rule, allowed, diags),
        RuleKind::TypeIs { expected } => type_is(root, rule, expected, diags),
    }
}

// ---------------------------------------------------------------------------
// required_key
// ---------------------------------------------------------------------------

/// Where a parent path led.
enum Parent<'a> {
    Found { path: NodePath, node: &'a Node },
    Missing { path: NodePath, node: &'a Node },
}

/// Resolves every parent selected by `pattern`.
///
/// A missing key is reported as [`Parent::Missing`] (carrying the deepest
/// node that does exist) unless a wildcard still lies ahead of it: absence
/// above a wildcard level belongs to the rule that requires that level.
fn parents<'a>(
    node: &'a Node,
    pattern: &[PathSegment],
    prefix: &mut NodePath,
    out: &mut Vec<Parent<'a>>,
) {
    let Some((head, rest)) = pattern.split_first() else {
        out.push(Parent::Found {
            path: prefix.clone(),
            node,
        });
        return;
    };
    let wildcard_ahead = pattern.iter().any(|s| matches!(s, PathSegment::Wildcard));
    match head {
        PathSegment::Key(key) => match node.get(key) {
            Some(child) => {
                prefix.push(head.clone());
                parents(child, rest, prefix, out);
                prefix.pop();
            }
            None if !wildcard_ahead => out.push(Parent::Missing {
                path: prefix.child(key.as_str()),
                node,
            }),
            None => {}
        },
        PathSegment::Index(index) => {
            match node.as_sequence().and_then(|items| items.get(*index)) {
                Some(child) => {
                    prefix.push(head.clone());
                    parents(child, rest, prefix, out);
                    prefix.pop();
                }
                None if !wildcard_ahead => out.push(Parent::Missing {
                    path: prefix.item(*index),
                    node,
                }),
                None => {}
            }
        }
        PathSegment::Wildcard => {
            for (path, child) in node.select(&[PathSegment::Wildcard]) {
                let mut child_prefix = NodePath::from(
                    prefix
                        .segments()
                        .iter()
                        .chain(path.segments())
                        .cloned()
                        .collect::<Vec<_>>(),
                );
                parents(child, rest, &mut child_prefix, out);
            }
        }
    }
}

fn required_key(root: &Node, rule: &Rule, default: Option<&Value>, diags: &mut Vec<Diagnostic>) {
    let Some((last, parent_pattern)) = rule.path.segments().split_last() else {
        return;
    };
    let Some(key) = last.as_key() else {
        return;
    };

    let through_wildcard = parent_pattern
        .iter()
        .any(|s| matches!(s, PathSegment::Wildcard));
    let mut found = Vec::new();
    parents(root, parent_pattern, &mut NodePath::root(), &mut found);

    for parent in found {
        match parent {
            Parent::Found { path, node } => match node.as_mapping() {
                Some(_) if node.get(key).is_some() => {}
                Some(_) => {
                    let message = if path.is_root() {
                        format!("missing required top-level key \"{key}\"")
                    } else {
                        format!("missing required key \"{key}\" in {path}")
                    };
                    diags.push(
                        Diagnostic::violation(rule, path.child(key), message)
                            .at(node.span)
                            .fixable(default.is_some()),
                    );
                }
                // A wildcard match of the wrong shape is a type_is finding.
                None if through_wildcard => {}
                None => {
                    let what = if path.is_root() {
                        "the document root".to_owned()
                    } else {
                        path.to_string()
                    };
                    diags.push(
                        Diagnostic::violation(
                            rule,
                            path.child(key),
                            format!(
                                "missing required key \"{key}\": {what} is a {}, not a mapping",
                                node.node_type()
                            ),
                        )
                        .at(node.span),
                    );
                }
            },
            Parent::Missing { path, node } => {
                diags.push(
                    Diagnostic::violation(
                        rule,
                        rule.path.clone(),
                        format!("missing required key \"{key}\": {path} does not exist"),
                    )
                    .at(node.span),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// non_empty / one_of / type_is
// ---------------------------------------------------------------------------

fn non_empty(root: &Node, rule: &Rule, has_fallback: bool, diags: &mut Vec<Diagnostic>) {
    for (path, node) in root.select(rule.path.segments()) {
        if node.is_empty_value() {
            let message = format!("{path} must not be empty");
            diags.push(
                Diagnostic::violation(rule, path, message)
                    .at(node.span)
                    .fixable(has_fallback),
            );
        }
    }
}

fn one_of(root: &Node, rule: &Rule, allowed: &[String], diags: &mut Vec<Diagnostic>) {
    for (path, node) in root.select(rule.path.segments()) {
        let Some(scalar) = node.as_scalar() else {
            continue;
        };
        if scalar.is_blank() {
            continue;
        }
        let text = scalar.as_text();
        if !allowed.iter().any(|a| *a == text) {
            let message = format!(
                "{path} is \"{text}\", expected one of: {}",
                allowed.join(", ")
            );
            diags.push(Diagnostic::violation(rule, path, message).at(node.span));
        }
    }
}

fn type_is(root: &Node, rule: &Rule, expected: &[NodeType], diags: &mut Vec<Diagnostic>) {
    for (path, node) in root.select(rule.path.segments()) {
        if node.as_scalar().is_some_and(|s| s.is_blank()) {
            continue;
        }
        let actual = node.node_type();
        if !expected.contains(&actual) {
            let names: Vec<String> = expected.iter().map(ToString::to_string).collect();
            let message = format!(
                "{path} is a {actual}, expected a {}",
                names.join(" or ")
            );
            diags.push(Diagnostic::violation(rule, path, message).at(node.span));
        }
    }
}

//! Repair planning and application.
//!
//! [`plan`] turns auto-fixable diagnostics into [`RepairAction`]s: text
//! edits computed from node spans, never from pattern matching on the text.
//! [`apply`] splices a list of actions into a new [`SourceDocument`]; it
//! performs no I/O and never mutates its input.
//!
//! Two edits conflict when their ranges overlap by at least one byte, when an
//! insertion falls strictly inside another edit's range, or when both target
//! the same tree location. The planner keeps the first of two conflicting
//! actions (diagnostic order, which is rule declaration order) and demotes
//! the second to a `repair-conflict` warning. [`apply`] rejects conflicting
//! ranges outright.
mod render;


use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{SourceDocument, Span};
use crate::node::{CollectionStyle, Entry, Node, NodeKind, ScalarStyle, ScalarValue};
use crate::path::NodePath;
use crate::rules::{Rule, RuleKind};
use crate::validation::{Diagnostic, DiagnosticCode, Severity};

/// Replaces `start..end` (byte offsets into the normalized text) with
/// `replacement`. An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    /// First byte replaced.
    pub start: usize,
    /// One past the last byte replaced.
    pub end: usize,
    /// Text written in place of the range.
    pub replacement: String,
}

impl TextEdit {
    /// Inserts `text` at `offset`.
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            start: offset,
            end: offset,
            replacement: text.into(),
        }
    }

    /// Replaces `start..end` with `text`.
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            replacement: text.into(),
        }
    }

    /// Returns `true` when the edit removes nothing.
    pub fn is_insertion(&self) -> bool {
        self.start == self.end
    }

    /// Returns `true` when the two ranges cannot both be applied.
    pub fn conflicts_with(&self, other: &TextEdit) -> bool {
        let overlap = self.start.max(other.start) < self.end.min(other.end);
        let inside = |ins: &TextEdit, range: &TextEdit| {
            ins.is_insertion() && range.start < ins.start && ins.start < range.end
        };
        overlap || inside(self, other) || inside(other, self)
    }
}

/// One planned fix for one diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairAction {
    /// The finding this resolves.
    pub diagnostic: Diagnostic,
    /// Id of the rule whose finding this resolves.
    pub rule_id: String,
    /// Tree location being repaired.
    pub location: NodePath,
    /// What the edit does, in words.
    pub description: String,
    /// Where the edit lands in the original document.
    pub span: Span,
    /// The edit itself.
    pub edit: TextEdit,
}

/// The outcome of [`plan`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairPlan {
    /// Non-conflicting actions in diagnostic order.
    pub actions: Vec<RepairAction>,
    /// One `repair-conflict` warning per demoted action.
    pub skipped: Vec<Diagnostic>,
}

impl RepairPlan {
    /// Returns `true` when nothing would change.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Why a list of actions cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// Two edits touch the same text.
    #[error("repairs \"{first}\" and \"{second}\" edit overlapping ranges")]
    OverlappingEdits {
        /// Rule id of the earlier action.
        first: String,
        /// Rule id of the later action.
        second: String,
    },
    /// An edit points outside the text or into the middle of a character.
    #[error("repair \"{rule_id}\" targets {start}..{end}, which is not a valid range of the {len}-byte document")]
    InvalidRange {
        /// Rule id of the action.
        rule_id: String,
        /// Start offset of the edit.
        start: usize,
        /// End offset of the edit.
        end: usize,
        /// Length of the document text.
        len: usize,
    },
}

/// Plans repairs for the auto-fixable entries of `diagnostics`.
///
/// Diagnostics without a rule, or whose target can no longer be located in
/// `tree`, are left alone. With no tree there is nothing to repair.
pub fn plan(document: &SourceDocument, tree: Option<&Node>, diagnostics: &[Diagnostic]) -> RepairPlan {
    let mut out = RepairPlan::default();
    let Some(root) = tree else {
        return out;
    };

    for diag in diagnostics.iter().filter(|d| d.auto_fixable) {
        let (Some(rule), Some(location)) = (&diag.rule, &diag.location) else {
            continue;
        };
        let Some(action) = plan_one(document, root, diag, rule, location) else {
            debug!(rule = %rule.id, %location, "no repair could be planned");
            continue;
        };

        let prior = out.actions.iter().find(|a| {
            a.location == action.location || a.edit.conflicts_with(&action.edit)
        });
        if let Some(prior) = prior {
            warn!(
                rule = %action.rule_id,
                %location,
                conflicts_with = %prior.rule_id,
                "skipping conflicting repair"
            );
            let message = format!(
                "skipped — conflicting repair: {} for {location} overlaps the repair from {}",
                action.rule_id, prior.rule_id
            );
            let mut skipped = Diagnostic::new(DiagnosticCode::RepairConflict, Severity::Warning, message)
                .with_location(location.clone());
            skipped.span = diag.span;
            out.skipped.push(skipped);
            continue;
        }
        out.actions.push(action);
    }

    debug!(
        path = %document.path().display(),
        actions = out.actions.len(),
        skipped = out.skipped.len(),
        "planned repairs"
    );
    out
}

fn plan_one(
    document: &SourceDocument,
    root: &Node,
    diagnostic: &Diagnostic,
    rule: &Rule,
    location: &NodePath,
) -> Option<RepairAction> {
    let edit_and_description = match &rule.kind {
        RuleKind::RequiredKey {
            default: Some(value),
            insert_after,
        } => insert_key(document, root, location, value, insert_after.as_deref()),
        RuleKind::NonEmpty {
            fallback: Some(value),
        } => fill_value(document, root, location, value),
        RuleKind::RequiredKey { default: None, .. }
        | RuleKind::NonEmpty { fallback: None }
        | RuleKind::OneOf { .. }
        | RuleKind::TypeIs { .. } => None,
    };
    let (edit, description) = edit_and_description?;
    Some(RepairAction {
        diagnostic: diagnostic.clone(),
        rule_id: rule.id.clone(),
        location: location.clone(),
        description,
        span: document.span(edit.start, edit.end),
        edit,
    })
}

/// Adds the missing last key of `location` to the mapping at its parent.
fn insert_key(
    document: &SourceDocument,
    root: &Node,
    location: &NodePath,
    value: &Value,
    insert_after: Option<&str>,
) -> Option<(TextEdit, String)> {
    let key = location.last()?.as_key()?;
    let parent = root.resolve(&location.parent()?)?;
    let entries = parent.as_mapping()?;
    if entries.iter().any(|e| e.key_text() == key) {
        return None;
    }
    let pair = format!("{}: {}", render::scalar(key), render::flow(value));
    let description = format!("added missing key {location} = {}", render::flow(value));
    let anchor = insert_after
        .and_then(|after| entries.iter().find(|e| e.key_text() == after))
        .or_else(|| entries.last());

    let edit = match parent.collection_style()? {
        CollectionStyle::Flow => match anchor {
            Some(entry) => TextEdit::insert(entry_end(entry), format!(", {pair}")),
            // Right after the opening brace.
            None => TextEdit::insert(parent.span.start.offset + 1, pair),
        },
        CollectionStyle::Block => {
            let entry = anchor?;
            let indent = " ".repeat(entry.key.span.start.column.saturating_sub(1));
            let text = document.text();
            let mut line_end = document.line_end(entry_end(entry));
            if ends_with_kept_blank_lines(&entry.value) {
                line_end = skip_blank_lines(document, line_end);
            }
            if line_end < text.len() {
                TextEdit::insert(line_end + 1, format!("{indent}{pair}\n"))
            } else {
                TextEdit::insert(text.len(), format!("\n{indent}{pair}"))
            }
        }
    };
    Some((edit, description))
}

/// Replaces the empty value at `location`.
fn fill_value(
    document: &SourceDocument,
    root: &Node,
    location: &NodePath,
    value: &Value,
) -> Option<(TextEdit, String)> {
    let node = root.resolve(location)?;
    if !node.is_empty_value() {
        return None;
    }
    let rendered = render::flow(value);
    let description = format!("filled empty {location} with {rendered}");
    let span = node.span;
    let edit = if span.is_empty() {
        // An implicit null: after `key:` or `-` it needs a separating space,
        // after a bare flow key it also needs the colon.
        let before = document.text()[..span.start.offset].chars().next_back();
        let prefix = if matches!(before, Some(':' | '-' | ' ' | '\t')) {
            " "
        } else {
            ": "
        };
        TextEdit::insert(span.start.offset, format!("{prefix}{rendered}"))
    } else {
        TextEdit::replace(span.start.offset, span.end.offset, rendered)
    };
    Some((edit, description))
}

fn entry_end(entry: &Entry) -> usize {
    entry.key.span.end.offset.max(entry.value.span.end.offset)
}

/// Whether the text of `node` ends in a `|+` / `>+` scalar whose trailing
/// blank lines belong to its value. Such lines lie outside the node's span.
fn ends_with_kept_blank_lines(node: &Node) -> bool {
    let mut last = node;
    loop {
        last = match &last.kind {
            NodeKind::Mapping { entries, .. } => match entries.last() {
                Some(entry) => &entry.value,
                None => return false,
            },
            NodeKind::Sequence { items, .. } => match items.last() {
                Some(item) => item,
                None => return false,
            },
            NodeKind::Scalar(scalar) => {
                return matches!(scalar.style, ScalarStyle::Literal | ScalarStyle::Folded)
                    && matches!(&scalar.value, ScalarValue::String(s) if s.ends_with("\n\n") || s == "\n");
            }
        };
    }
}

/// Advances `line_end` past any following whitespace-only lines.
fn skip_blank_lines(document: &SourceDocument, mut line_end: usize) -> usize {
    let text = document.text();
    while line_end < text.len() {
        let next_start = line_end + 1;
        let next_end = document.line_end(next_start);
        if next_start >= text.len() || !text[next_start..next_end].trim_matches([' ', '\t']).is_empty() {
            break;
        }
        line_end = next_end;
    }
    line_end
}

/// Applies `actions` to `document`, returning the repaired document.
///
/// Edits are applied from the highest start offset down so that earlier
/// offsets stay valid. Among edits starting at the same offset, longer ranges
/// go first. Insertions sharing an offset end up with the deepest location
/// first (a nested block ends where its parent does) and otherwise in
/// declaration order.
///
/// # Errors
///
/// Returns [`ApplyError`] before touching any text if an edit range is
/// invalid or two edits conflict.
pub fn apply(document: &SourceDocument, actions: &[RepairAction]) -> Result<SourceDocument, ApplyError> {
    let text = document.text();
    for action in actions {
        let edit = &action.edit;
        if edit.start > edit.end
            || edit.end > text.len()
            || !text.is_char_boundary(edit.start)
            || !text.is_char_boundary(edit.end)
        {
            return Err(ApplyError::InvalidRange {
                rule_id: action.rule_id.clone(),
                start: edit.start,
                end: edit.end,
                len: text.len(),
            });
        }
    }
    for (i, first) in actions.iter().enumerate() {
        if let Some(second) = actions[i + 1..]
            .iter()
            .find(|second| first.edit.conflicts_with(&second.edit))
        {
            return Err(ApplyError::OverlappingEdits {
                first: first.rule_id.clone(),
                second: second.rule_id.clone(),
            });
        }
    }

    let mut order: Vec<(usize, &RepairAction)> = actions.iter().enumerate().collect();
    order.sort_by(|(ia, a), (ib, b)| {
        b.edit
            .start
            .cmp(&a.edit.start)
            .then(b.edit.end.cmp(&a.edit.end))
            .then(a.location.len().cmp(&b.location.len()))
            .then(ib.cmp(ia))
    });

    let mut out = text.to_owned();
    for (_, action) in order {
        out.replace_range(action.edit.start..action.edit.end, &action.edit.replacement);
    }
    debug!(
        path = %document.path().display(),
        edits = actions.len(),
        "applied repairs"
    );
    Ok(SourceDocument::from_normalized(document.path().to_path_buf(), out))
}

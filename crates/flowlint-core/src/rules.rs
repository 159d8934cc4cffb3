//! Declarative structural rules and the named profiles that bundle them.
//!
//! A [`Rule`] names a place in the tree (a [`NodePath`], possibly wildcarded)
//! and an expectation about it ([`RuleKind`]). Rules are plain data: they are
//! loaded once, validated into a [`RuleSet`], and shared read-only by every
//! validation run. Which rules apply to a document is chosen by the caller by
//! profile name, never inferred from the document's path.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::node::NodeType;
use crate::path::{NodePath, PathSegment};

/// What a rule expects of the node(s) its path selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleKind {
    /// The last path segment must exist as a key of the mapping its parent
    /// path selects.
    RequiredKey {
        /// Value to insert when the key is missing. Makes the finding
        /// auto-fixable.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
        /// Sibling key after which an inserted key is placed. Falls back to
        /// the mapping's last entry when absent from the document.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_after: Option<String>,
    },
    /// A present value must not be null, blank, or an empty collection.
    NonEmpty {
        /// Replacement for an empty value. Makes the finding auto-fixable.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<Value>,
    },
    /// A present scalar must be one of the listed texts.
    OneOf {
        /// Accepted scalar texts.
        allowed: Vec<String>,
    },
    /// A present value must be one of the listed node types.
    TypeIs {
        /// Accepted node types.
        expected: Vec<NodeType>,
    },
}

impl RuleKind {
    /// The snake_case kind name used in rules files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequiredKey { .. } => "required_key",
            Self::NonEmpty { .. } => "non_empty",
            Self::OneOf { .. } => "one_of",
            Self::TypeIs { .. } => "type_is",
        }
    }
}

/// One structural expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Stable identifier, unique within a rule set. Used as the diagnostic
    /// code.
    pub id: String,
    /// Where to look. `"*"` segments expand over every child.
    pub path: NodePath,
    /// What to expect there.
    #[serde(flatten)]
    pub kind: RuleKind,
}

impl Rule {
    /// A `required_key` rule without a default.
    pub fn required_key(id: impl Into<String>, path: NodePath) -> Self {
        Self {
            id: id.into(),
            path,
            kind: RuleKind::RequiredKey {
                default: None,
                insert_after: None,
            },
        }
    }

    /// A `non_empty` rule without a fallback.
    pub fn non_empty(id: impl Into<String>, path: NodePath) -> Self {
        Self {
            id: id.into(),
            path,
            kind: RuleKind::NonEmpty { fallback: None },
        }
    }

    /// A `one_of` rule.
    pub fn one_of<S: Into<String>>(
        id: impl Into<String>,
        path: NodePath,
        allowed: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            id: id.into(),
            path,
            kind: RuleKind::OneOf {
                allowed: allowed.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// A `type_is` rule.
    pub fn type_is(id: impl Into<String>, path: NodePath, expected: &[NodeType]) -> Self {
        Self {
            id: id.into(),
            path,
            kind: RuleKind::TypeIs {
                expected: expected.to_vec(),
            },
        }
    }

    /// Sets the repair value: the default of a `required_key` rule or the
    /// fallback of a `non_empty` rule. Other kinds are returned unchanged.
    #[must_use]
    pub fn with_repair(mut self, value: Value) -> Self {
        match &mut self.kind {
            RuleKind::RequiredKey { default, .. } => *default = Some(value),
            RuleKind::NonEmpty { fallback } => *fallback = Some(value),
            RuleKind::OneOf { .. } | RuleKind::TypeIs { .. } => {}
        }
        self
    }

    /// Sets the sibling a `required_key` insertion is placed after.
    #[must_use]
    pub fn inserted_after(mut self, key: impl Into<String>) -> Self {
        if let RuleKind::RequiredKey { insert_after, .. } = &mut self.kind {
            *insert_after = Some(key.into());
        }
        self
    }

    /// The value a repair would write, if the rule carries one.
    pub fn repair_value(&self) -> Option<&Value> {
        match &self.kind {
            RuleKind::RequiredKey { default, .. } => default.as_ref(),
            RuleKind::NonEmpty { fallback } => fallback.as_ref(),
            RuleKind::OneOf { .. } | RuleKind::TypeIs { .. } => None,
        }
    }
}

/// A rule definition that cannot be evaluated meaningfully.
#[derive(Debug, Error)]
pub enum RuleSetError {
    /// The rules document is not valid JSON or does not match the schema.
    #[error("invalid rules document: {0}")]
    Json(#[from] serde_json::Error),
    /// A rule has an empty id.
    #[error("rule #{index} has an empty id")]
    EmptyId {
        /// Zero-based position of the rule.
        index: usize,
    },
    /// Two rules share an id.
    #[error("duplicate rule id \"{id}\"")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },
    /// A rule's path has no segments.
    #[error("rule \"{id}\": path must not be empty")]
    EmptyPath {
        /// The offending rule.
        id: String,
    },
    /// A `required_key` path does not end in a key name.
    #[error("rule \"{id}\": required_key path must end in a key name")]
    RequiredKeyTarget {
        /// The offending rule.
        id: String,
    },
    /// A `one_of` rule accepts nothing.
    #[error("rule \"{id}\": one_of needs at least one allowed value")]
    EmptyAllowed {
        /// The offending rule.
        id: String,
    },
    /// A `type_is` rule accepts nothing.
    #[error("rule \"{id}\": type_is needs at least one expected type")]
    EmptyExpected {
        /// The offending rule.
        id: String,
    },
}

/// A named, validated, ordered list of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    name: String,
    rules: Vec<Rule>,
}

/// Names accepted by [`RuleSet::profile`].
pub const PROFILES: &[&str] = &["workflow", "minimal"];

/// Event names accepted for a bare-scalar trigger (`on: push`).
const TRIGGER_EVENTS: &[&str] = &[
    "branch_protection_rule",
    "check_run",
    "check_suite",
    "create",
    "delete",
    "deployment",
    "deployment_status",
    "discussion",
    "discussion_comment",
    "fork",
    "gollum",
    "issue_comment",
    "issues",
    "label",
    "merge_group",
    "milestone",
    "page_build",
    "public",
    "pull_request",
    "pull_request_review",
    "pull_request_review_comment",
    "pull_request_target",
    "push",
    "registry_package",
    "release",
    "repository_dispatch",
    "status",
    "watch",
    "workflow_call",
    "workflow_dispatch",
    "workflow_run",
];

impl RuleSet {
    /// Validates `rules` and bundles them under `name`.
    ///
    /// # Errors
    ///
    /// Returns the first [`RuleSetError`] found, in declaration order.
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Result<Self, RuleSetError> {
        let mut ids = HashSet::new();
        for (index, rule) in rules.iter().enumerate() {
            check_rule(index, rule)?;
            if !ids.insert(rule.id.as_str()) {
                return Err(RuleSetError::DuplicateId {
                    id: rule.id.clone(),
                });
            }
        }
        Ok(Self {
            name: name.into(),
            rules,
        })
    }

    /// Parses and validates a JSON rules document:
    /// `{"name": "...", "rules": [...]}`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleSetError::Json`] for malformed JSON and the validation
    /// errors of [`RuleSet::new`] otherwise.
    pub fn from_json(text: &str) -> Result<Self, RuleSetError> {
        let raw: Self = serde_json::from_str(text)?;
        Self::new(raw.name, raw.rules)
    }

    /// Serializes the set as pretty-printed JSON, the format
    /// [`RuleSet::from_json`] reads.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if a rule value cannot be written.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up a built-in profile by name.
    pub fn profile(name: &str) -> Option<Self> {
        match name {
            "workflow" => Some(Self::workflow()),
            "minimal" => Some(Self::minimal()),
            _ => None,
        }
    }

    /// The default profile for CI workflow documents.
    ///
    /// Requires a non-empty trigger (`on`) and a non-empty `jobs` mapping in
    /// which every job names a runner and has a non-empty `steps` sequence.
    /// Missing triggers and runners are auto-fixable.
    pub fn workflow() -> Self {
        let trigger_default = default_trigger();
        Self {
            name: "workflow".to_owned(),
            rules: vec![
                Rule::required_key("trigger-required", NodePath::keys(&["on"]))
                    .with_repair(trigger_default.clone())
                    .inserted_after("name"),
                Rule::non_empty("trigger-non-empty", NodePath::keys(&["on"]))
                    .with_repair(trigger_default),
                Rule::one_of(
                    "trigger-event",
                    NodePath::keys(&["on"]),
                    TRIGGER_EVENTS.iter().copied(),
                ),
                Rule::required_key("jobs-required", NodePath::keys(&["jobs"])),
                Rule::non_empty("jobs-non-empty", NodePath::keys(&["jobs"])),
                Rule::type_is(
                    "jobs-mapping",
                    NodePath::keys(&["jobs"]),
                    &[NodeType::Mapping],
                ),
                Rule::type_is(
                    "job-mapping",
                    NodePath::keys(&["jobs", "*"]),
                    &[NodeType::Mapping],
                ),
                Rule::required_key(
                    "job-runner-required",
                    NodePath::keys(&["jobs", "*", "runs-on"]),
                )
                .with_repair(json!("ubuntu-latest")),
                Rule::required_key(
                    "job-steps-required",
                    NodePath::keys(&["jobs", "*", "steps"]),
                ),
                Rule::type_is(
                    "job-steps-sequence",
                    NodePath::keys(&["jobs", "*", "steps"]),
                    &[NodeType::Sequence],
                ),
                Rule::non_empty(
                    "job-steps-non-empty",
                    NodePath::keys(&["jobs", "*", "steps"]),
                ),
            ],
        }
    }

    /// Only the two top-level requirements: a trigger (auto-fixable) and
    /// `jobs`.
    pub fn minimal() -> Self {
        Self {
            name: "minimal".to_owned(),
            rules: vec![
                Rule::required_key("trigger-required", NodePath::keys(&["on"]))
                    .with_repair(default_trigger())
                    .inserted_after("name"),
                Rule::required_key("jobs-required", NodePath::keys(&["jobs"])),
            ],
        }
    }

    /// The set's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` for a set with no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::workflow()
    }
}

fn default_trigger() -> Value {
    json!({"push": {"branches": ["main"]}})
}

fn check_rule(index: usize, rule: &Rule) -> Result<(), RuleSetError> {
    let id = || rule.id.clone();
    if rule.id.trim().is_empty() {
        return Err(RuleSetError::EmptyId { index });
    }
    if rule.path.is_empty() {
        return Err(RuleSetError::EmptyPath { id: id() });
    }
    match &rule.kind {
        RuleKind::RequiredKey { .. } => {
            if !matches!(rule.path.last(), Some(PathSegment::Key(_))) {
                return Err(RuleSetError::RequiredKeyTarget { id: id() });
            }
        }
        RuleKind::OneOf { allowed } if allowed.is_empty() => {
            return Err(RuleSetError::EmptyAllowed { id: id() });
        }
        RuleKind::TypeIs { expected } if expected.is_empty() => {
            return Err(RuleSetError::EmptyExpected { id: id() });
        }
        RuleKind::NonEmpty { .. } | RuleKind::OneOf { .. } | RuleKind::TypeIs { .. } => {}
    }
    Ok(())
}

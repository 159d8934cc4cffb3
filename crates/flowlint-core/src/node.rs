//! The parsed structural tree: mappings, sequences and scalars with spans.
use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::Span;
use crate::path::{NodePath, PathSegment};

/// The runtime variant of a [`Node`], as named in `type_is` rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// A mapping of keys to values.
    Mapping,
    /// An ordered list of values.
    Sequence,
    /// A single value.
    Scalar,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mapping => f.write_str("mapping"),
            Self::Sequence => f.write_str("sequence"),
            Self::Scalar => f.write_str("scalar"),
        }
    }
}

/// How a collection was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStyle {
    /// Indentation-based (`key: value` lines, `- item` lines).
    Block,
    /// Bracketed (`{k: v}`, `[a, b]`).
    Flow,
}

/// How a scalar was written in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Unquoted; subject to type resolution.
    Plain,
    /// `'...'`
    SingleQuoted,
    /// `"..."`
    DoubleQuoted,
    /// `|` block scalar.
    Literal,
    /// `>` block scalar.
    Folded,
}

/// The resolved value of a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    /// `null`, `~`, or nothing at all.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// Decimal, hexadecimal or octal integer.
    Int(i64),
    /// Floating point, including `.inf` and `.nan`.
    Float(f64),
    /// Anything else, and every quoted or block scalar.
    String(String),
}

/// A scalar node's value together with its source style.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    /// The resolved value.
    pub value: ScalarValue,
    /// The style it was written in.
    pub style: ScalarStyle,
}

impl Scalar {
    /// Returns the value as text, the form `one_of` rules and key lookups
    /// compare against. Null renders as the empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match &self.value {
            ScalarValue::Null => Cow::Borrowed(""),
            ScalarValue::Bool(b) => Cow::Owned(b.to_string()),
            ScalarValue::Int(i) => Cow::Owned(i.to_string()),
            ScalarValue::Float(x) => Cow::Owned(x.to_string()),
            ScalarValue::String(s) => Cow::Borrowed(s),
        }
    }

    /// Returns `true` for null and for strings that are empty or all
    /// whitespace.
    pub fn is_blank(&self) -> bool {
        match &self.value {
            ScalarValue::Null => true,
            ScalarValue::String(s) => s.trim().is_empty(),
            ScalarValue::Bool(_) | ScalarValue::Int(_) | ScalarValue::Float(_) => false,
        }
    }
}

/// What makes two mapping keys the same key: resolved value and type.
///
/// `1` and `0x1` collide; `1` and `1.0` do not, nor do `true` and `"true"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum KeyIdentity {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
}

impl Scalar {
    pub(crate) fn key_identity(&self) -> KeyIdentity {
        match &self.value {
            ScalarValue::Null => KeyIdentity::Null,
            ScalarValue::Bool(b) => KeyIdentity::Bool(*b),
            ScalarValue::Int(i) => KeyIdentity::Int(*i),
            ScalarValue::Float(x) => KeyIdentity::Float(x.to_bits()),
            ScalarValue::String(s) => KeyIdentity::String(s.clone()),
        }
    }
}

/// One `key: value` pair of a mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The key node (always a scalar in the supported grammar).
    pub key: Node,
    /// The value node.
    pub value: Node,
}

impl Entry {
    /// Returns the key's text.
    pub fn key_text(&self) -> Cow<'_, str> {
        self.key.scalar_text().unwrap_or(Cow::Borrowed(""))
    }
}

/// The variant payload of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Ordered key/value pairs with unique keys.
    Mapping {
        /// Entries in source order.
        entries: Vec<Entry>,
        /// Block or flow.
        style: CollectionStyle,
    },
    /// Ordered items.
    Sequence {
        /// Items in source order.
        items: Vec<Node>,
        /// Block or flow.
        style: CollectionStyle,
    },
    /// A single value.
    Scalar(Scalar),
}

/// One element of the parsed tree, with its location in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What the node is.
    pub kind: NodeKind,
    /// Where the node's text lives in its document.
    pub span: Span,
}

impl Node {
    /// Returns the node's [`NodeType`].
    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::Mapping { .. } => NodeType::Mapping,
            NodeKind::Sequence { .. } => NodeType::Sequence,
            NodeKind::Scalar(_) => NodeType::Scalar,
        }
    }

    /// Returns the mapping entries, or `None` if this is not a mapping.
    pub fn as_mapping(&self) -> Option<&[Entry]> {
        match &self.kind {
            NodeKind::Mapping { entries, .. } => Some(entries),
            NodeKind::Sequence { .. } | NodeKind::Scalar(_) => None,
        }
    }

    /// Returns the sequence items, or `None` if this is not a sequence.
    pub fn as_sequence(&self) -> Option<&[Node]> {
        match &self.kind {
            NodeKind::Sequence { items, .. } => Some(items),
            NodeKind::Mapping { .. } | NodeKind::Scalar(_) => None,
        }
    }

    /// Returns the scalar payload, or `None` if this is a collection.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(s) => Some(s),
            NodeKind::Mapping { .. } | NodeKind::Sequence { .. } => None,
        }
    }

    /// Returns the scalar text, or `None` for collections.
    pub fn scalar_text(&self) -> Option<Cow<'_, str>> {
        self.as_scalar().map(Scalar::as_text)
    }

    /// Returns the collection style, or `None` for scalars.
    pub fn collection_style(&self) -> Option<CollectionStyle> {
        match &self.kind {
            NodeKind::Mapping { style, .. } | NodeKind::Sequence { style, .. } => Some(*style),
            NodeKind::Scalar(_) => None,
        }
    }

    /// Looks up the entry for `key` when this node is a mapping.
    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.as_mapping()?.iter().find(|e| e.key_text() == key)
    }

    /// Looks up the value for `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entry(key).map(|e| &e.value)
    }

    /// Returns `true` for an empty mapping, an empty sequence, null, or a
    /// blank string.
    pub fn is_empty_value(&self) -> bool {
        match &self.kind {
            NodeKind::Mapping { entries, .. } => entries.is_empty(),
            NodeKind::Sequence { items, .. } => items.is_empty(),
            NodeKind::Scalar(s) => s.is_blank(),
        }
    }

    /// Resolves a concrete path (keys and indices only) from this node.
    ///
    /// A wildcard segment never resolves; use [`Node::select`] for patterns.
    pub fn resolve(&self, path: &NodePath) -> Option<&Node> {
        let mut current = self;
        for segment in path.segments() {
            current = match segment {
                PathSegment::Key(k) => current.get(k)?,
                PathSegment::Index(i) => current.as_sequence()?.get(*i)?,
                PathSegment::Wildcard => return None,
            };
        }
        Some(current)
    }

    /// Expands a pattern against this node, returning every match with its
    /// concrete path, in document order.
    pub fn select(&self, pattern: &[PathSegment]) -> Vec<(NodePath, &Node)> {
        let mut out = Vec::new();
        let mut prefix = NodePath::root();
        select_into(self, pattern, &mut prefix, &mut out);
        out
    }

    /// Iterates over this node and all descendants (keys included) in
    /// pre-order.
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { stack: vec![self] }
    }
}

fn select_into<'a>(
    node: &'a Node,
    pattern: &[PathSegment],
    prefix: &mut NodePath,
    out: &mut Vec<(NodePath, &'a Node)>,
) {
    let Some((head, rest)) = pattern.split_first() else {
        out.push((prefix.clone(), node));
        return;
    };
    match head {
        PathSegment::Key(k) => {
            if let Some(child) = node.get(k) {
                prefix.push(head.clone());
                select_into(child, rest, prefix, out);
                prefix.pop();
            }
        }
        PathSegment::Index(i) => {
            if let Some(child) = node.as_sequence().and_then(|items| items.get(*i)) {
                prefix.push(head.clone());
                select_into(child, rest, prefix, out);
                prefix.pop();
            }
        }
        PathSegment::Wildcard => match &node.kind {
            NodeKind::Mapping { entries, .. } => {
                for entry in entries {
                    prefix.push(PathSegment::Key(entry.key_text().into_owned()));
                    select_into(&entry.value, rest, prefix, out);
                    prefix.pop();
                }
            }
            NodeKind::Sequence { items, .. } => {
                for (i, item) in items.iter().enumerate() {
                    prefix.push(PathSegment::Index(i));
                    select_into(item, rest, prefix, out);
                    prefix.pop();
                }
            }
            NodeKind::Scalar(_) => {}
        },
    }
}

/// Pre-order iterator returned by [`Node::iter`].
pub struct NodeIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        match &node.kind {
            NodeKind::Mapping { entries, .. } => {
                for entry in entries.iter().rev() {
                    self.stack.push(&entry.value);
                    self.stack.push(&entry.key);
                }
            }
            NodeKind::Sequence { items, .. } => {
                self.stack.extend(items.iter().rev());
            }
            NodeKind::Scalar(_) => {}
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::document::load_bytes;
    use crate::parser::parse;

    fn tree(text: &str) -> Node {
        let doc = load_bytes("test.yml", text);
        parse(&doc).root.expect("document should parse")
    }

    #[test]
    fn resolve_follows_keys_and_indices() {
        let root = tree("jobs:\n  build:\n    steps:\n      - run: make\n");
        let path = NodePath::keys(&["jobs", "build", "steps"])
            .item(0)
            .child("run");
        let node = root.resolve(&path).expect("path should resolve");
        assert_eq!(node.scalar_text().as_deref(), Some("make"));
    }

    #[test]
    fn resolve_rejects_wildcards() {
        let root = tree("jobs:\n  build: {}\n");
        assert!(root.resolve(&NodePath::keys(&["jobs", "*"])).is_none());
    }

    #[test]
    fn select_expands_wildcards_in_document_order() {
        let root = tree("jobs:\n  b:\n    runs-on: x\n  a:\n    runs-on: y\n");
        let matches = root.select(NodePath::keys(&["jobs", "*", "runs-on"]).segments());
        let paths: Vec<String> = matches.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["jobs.b.runs-on", "jobs.a.runs-on"]);
    }

    #[test]
    fn select_wildcard_over_sequence_yields_indices() {
        let root = tree("steps:\n  - a\n  - b\n");
        let matches = root.select(NodePath::keys(&["steps", "*"]).segments());
        let paths: Vec<String> = matches.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(paths, vec!["steps[0]", "steps[1]"]);
    }

    #[test]
    fn select_on_scalar_has_no_matches() {
        let root = tree("jobs: none\n");
        assert!(
            root.select(NodePath::keys(&["jobs", "*"]).segments())
                .is_empty()
        );
    }

    #[test]
    fn empty_values() {
        let root = tree("a: []\nb: {}\nc:\nd: ''\ne: 0\nf: [x]\n");
        for key in ["a", "b", "c", "d"] {
            assert!(
                root.get(key).expect("key").is_empty_value(),
                "{key} should be empty"
            );
        }
        for key in ["e", "f"] {
            assert!(
                !root.get(key).expect("key").is_empty_value(),
                "{key} should not be empty"
            );
        }
    }

    #[test]
    fn iter_visits_keys_and_values_in_preorder() {
        let root = tree("a: 1\nb: [2]\n");
        let kinds: Vec<NodeType> = root.iter().map(Node::node_type).collect();
        assert_eq!(
            kinds,
            vec![
                NodeType::Mapping,
                NodeType::Scalar,
                NodeType::Scalar,
                NodeType::Scalar,
                NodeType::Sequence,
                NodeType::Scalar,
            ]
        );
    }

    #[test]
    fn scalar_text_renders_resolved_values() {
        let root = tree("a: true\nb: 12\nc: ~\nd: 'x'\n");
        assert_eq!(root.get("a").and_then(Node::scalar_text).as_deref(), Some("true"));
        assert_eq!(root.get("b").and_then(Node::scalar_text).as_deref(), Some("12"));
        assert_eq!(root.get("c").and_then(Node::scalar_text).as_deref(), Some(""));
        assert_eq!(root.get("d").and_then(Node::scalar_text).as_deref(), Some("x"));
    }
}

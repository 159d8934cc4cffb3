//! Tree paths: concrete node locations and the wildcard patterns rules use.
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step in a [`NodePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A mapping key, compared against the key's scalar text.
    Key(String),
    /// A zero-based sequence index.
    Index(usize),
    /// Every value of a mapping or every item of a sequence.
    ///
    /// Only meaningful in rule patterns; concrete locations never contain it.
    Wildcard,
}

impl PathSegment {
    /// Returns the key name if this segment is a [`PathSegment::Key`].
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::Index(_) | Self::Wildcard => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) if needs_quoting(k) => write!(f, "{k:?}"),
            Self::Key(k) => f.write_str(k),
            Self::Index(i) => write!(f, "[{i}]"),
            Self::Wildcard => f.write_str("*"),
        }
    }
}

fn needs_quoting(key: &str) -> bool {
    key.is_empty()
        || key == "*"
        || key
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '.' | '[' | ']' | '"'))
}

// Rules files spell segments as JSON strings ("*" for the wildcard) or
// non-negative integers.
impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Key(k) => serializer.serialize_str(k),
            Self::Index(i) => serializer.serialize_u64(*i as u64),
            Self::Wildcard => serializer.serialize_str("*"),
        }
    }
}

impl<'de> Deserialize<'de> for PathSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(usize),
            Key(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Index(i) => Self::Index(i),
            Raw::Key(k) if k == "*" => Self::Wildcard,
            Raw::Key(k) => Self::Key(k),
        })
    }
}

/// A sequence of [`PathSegment`]s addressing a node from the document root.
///
/// Displayed in dotted form: `jobs.build.steps[0]`. The empty path is the
/// root and displays as `(root)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(Vec<PathSegment>);

impl NodePath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from key names, mapping `"*"` to [`PathSegment::Wildcard`].
    pub fn keys(keys: &[&str]) -> Self {
        keys.iter()
            .map(|k| {
                if *k == "*" {
                    PathSegment::Wildcard
                } else {
                    PathSegment::Key((*k).to_owned())
                }
            })
            .collect()
    }

    /// Returns the segments in root-to-leaf order.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when the path has no segments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the final segment, if any.
    pub fn last(&self) -> Option<&PathSegment> {
        self.0.last()
    }

    /// Returns the path without its final segment, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(Self(init.to_vec()))
    }

    /// Returns a new path extended by `segment`.
    pub fn join(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Returns a new path extended by a key segment.
    pub fn child(&self, key: impl Into<String>) -> Self {
        self.join(PathSegment::Key(key.into()))
    }

    /// Returns a new path extended by an index segment.
    pub fn item(&self, index: usize) -> Self {
        self.join(PathSegment::Index(index))
    }

    /// Returns `true` if `self` is `ancestor` or lies beneath it.
    pub fn starts_with(&self, ancestor: &NodePath) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Returns `true` if any segment is a wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(|s| matches!(s, PathSegment::Wildcard))
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl From<Vec<PathSegment>> for NodePath {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }
}

impl FromIterator<PathSegment> for NodePath {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !matches!(segment, PathSegment::Index(_)) {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

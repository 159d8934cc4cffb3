//! Document loading: byte decoding, anomaly stripping and line indexing.
//!
//! The loader degrades gracefully. Undecodable bytes, NUL bytes and stray
//! control characters are repaired in the normalized text and reported as
//! warnings on the resulting [`SourceDocument`]. Only the inability to open
//! or read a file is an error ([`LoadError`]).
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::validation::{Diagnostic, DiagnosticCode, Severity};

/// A location in a document's normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct Position {
    /// Byte offset into the normalized text.
    pub offset: usize,
    /// One-based line number.
    pub line: usize,
    /// One-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of the normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    /// First byte of the range.
    pub start: Position,
    /// One past the last byte of the range.
    pub end: Position,
}

impl Span {
    /// Builds a span from two positions.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Returns `true` for a zero-width span.
    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }
}

/// Failure to obtain a document's bytes at all.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The path does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },
    /// The process may not read the path.
    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        /// The unreadable path.
        path: PathBuf,
    },
    /// Any other I/O failure (a directory, a device error, ...).
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The path being read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl LoadError {
    /// Classifies an I/O error raised while reading `path`.
    pub fn from_io(path: &Path, source: std::io::Error) -> Self {
        let kind = source.kind();
        if kind == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.to_path_buf(),
            }
        } else if kind == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied {
                path: path.to_path_buf(),
            }
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    /// The path that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::PermissionDenied { path } | Self::Io { path, .. } => {
                path
            }
        }
    }
}

/// An immutable, normalized document.
///
/// Created once by the loader (or by the repair applier, which always builds
/// a new value). The normalized text uses LF line endings and contains no NUL
/// bytes or stray control characters.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    path: PathBuf,
    raw_bytes: Vec<u8>,
    normalized_text: String,
    line_offsets: Vec<usize>,
    load_diagnostics: Vec<Diagnostic>,
}

impl SourceDocument {
    /// Builds a document from text that is already normalized.
    pub(crate) fn from_normalized(path: PathBuf, text: String) -> Self {
        let line_offsets = line_offsets(&text);
        Self {
            path,
            raw_bytes: text.as_bytes().to_vec(),
            normalized_text: text,
            line_offsets,
            load_diagnostics: Vec::new(),
        }
    }

    /// The identifier the document was loaded under.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The bytes exactly as read.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// The normalized text all spans refer to.
    pub fn text(&self) -> &str {
        &self.normalized_text
    }

    /// Byte offset at which each line starts.
    pub fn line_offsets(&self) -> &[usize] {
        &self.line_offsets
    }

    /// Number of lines (a trailing newline does not open a new line).
    pub fn line_count(&self) -> usize {
        let n = self.line_offsets.len();
        if n > 1 && self.line_offsets[n - 1] == self.normalized_text.len() {
            n - 1
        } else {
            n
        }
    }

    /// Warnings recorded while decoding and normalizing.
    pub fn load_diagnostics(&self) -> &[Diagnostic] {
        &self.load_diagnostics
    }

    /// Converts a byte offset into a [`Position`]. Offsets past the end are
    /// clamped to the end of the text.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.normalized_text.len());
        let index = self
            .line_offsets
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_offsets.get(index).copied().unwrap_or(0);
        let column = self
            .normalized_text
            .get(line_start..offset)
            .map_or(0, |s| s.chars().count())
            + 1;
        Position {
            offset,
            line: index + 1,
            column,
        }
    }

    /// Builds a [`Span`] from two byte offsets.
    pub fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.position(start), self.position(end))
    }

    /// Returns the text covered by `span`, or `""` if it is out of range.
    pub fn slice(&self, span: &Span) -> &str {
        self.normalized_text
            .get(span.start.offset..span.end.offset)
            .unwrap_or("")
    }

    /// Returns the text of the one-based `line`, without its newline.
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_offsets.get(line.checked_sub(1)?)?;
        let end = self.line_end(start);
        self.normalized_text.get(start..end)
    }

    /// Returns the offset of the newline ending the line containing
    /// `offset`, or the text length on the last line.
    pub fn line_end(&self, offset: usize) -> usize {
        let text = &self.normalized_text;
        let offset = offset.min(text.len());
        text.get(offset..)
            .and_then(|rest| rest.find('\n'))
            .map_or(text.len(), |i| offset + i)
    }
}

fn line_offsets(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// Reads and normalizes the file at `path`.
///
/// # Errors
///
/// Returns [`LoadError`] only when the file cannot be opened or read.
pub fn load_path(path: impl AsRef<Path>) -> Result<SourceDocument, LoadError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| LoadError::from_io(path, e))?;
    Ok(load_bytes(path, bytes))
}

/// Decodes and normalizes an in-memory buffer.
///
/// Never fails: decoding problems and stripped characters become warnings on
/// the returned document.
pub fn load_bytes(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> SourceDocument {
    let path = path.into();
    let raw_bytes = bytes.into();
    let mut diagnostics = Vec::new();

    let decoded: Cow<'_, str> = match std::str::from_utf8(&raw_bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(e) => {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::InvalidUtf8,
                Severity::Warning,
                format!(
                    "invalid UTF-8 at byte offset {}; undecodable bytes were replaced with U+FFFD",
                    e.valid_up_to()
                ),
            ));
            String::from_utf8_lossy(&raw_bytes)
        }
    };
    let body = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);

    let (normalized_text, nul_count, control_count) = normalize(body);
    if nul_count > 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::NulBytes,
            Severity::Warning,
            format!("removed {nul_count} NUL {}", plural(nul_count, "byte", "bytes")),
        ));
    }
    if control_count > 0 {
        diagnostics.push(Diagnostic::new(
            DiagnosticCode::ControlCharacters,
            Severity::Warning,
            format!(
                "removed {control_count} stray control {}",
                plural(control_count, "character", "characters")
            ),
        ));
    }

    debug!(
        path = %path.display(),
        bytes = raw_bytes.len(),
        warnings = diagnostics.len(),
        "loaded document"
    );

    let line_offsets = line_offsets(&normalized_text);
    SourceDocument {
        path,
        raw_bytes,
        normalized_text,
        line_offsets,
        load_diagnostics: diagnostics,
    }
}

/// Converts line endings to LF and drops NUL and other control characters
/// (TAB and line breaks excepted). Returns the text and the two drop counts.
fn normalize(body: &str) -> (String, usize, usize) {
    let mut text = String::with_capacity(body.len());
    let mut nul_count = 0;
    let mut control_count = 0;
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\0' => nul_count += 1,
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                text.push('\n');
            }
            '\n' | '\t' => text.push(c),
            c if c.is_ascii_control() => control_count += 1,
            c => text.push(c),
        }
    }
    (text, nul_count, control_count)
}

fn plural<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

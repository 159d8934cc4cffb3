//! Structural parser for the YAML subset that workflow documents are written
//! in.
//!
//! [`parse`] turns a [`SourceDocument`] into a [`Node`] tree in which every
//! node carries the exact [`Span`](crate::document::Span) of its text. The
//! supported grammar covers block mappings and sequences (including compact
//! `- key: value` items), plain, quoted and block (`|`, `>`) scalars,
//! single-line flow collections, comments, and the `---` / `...` document
//! markers.
//!
//! Parsing is fail-fast: the first construct outside that subset produces a
//! single `syntax` diagnostic and no tree. Duplicate mapping keys are the one
//! recoverable problem; they are reported and parsing continues with the
//! first value kept.
mod flow;
mod scalar;


use std::collections::HashMap;

use tracing::debug;

use crate::document::SourceDocument;
use crate::node::{
    CollectionStyle, Entry, KeyIdentity, Node, NodeKind, Scalar, ScalarStyle, ScalarValue,
};
use crate::path::{NodePath, PathSegment};
use crate::validation::{Diagnostic, DiagnosticCode, Severity};

pub(crate) use scalar::resolve_plain;

/// Maximum nesting depth of collections before the parser gives up.
pub const MAX_DEPTH: usize = 128;

/// The outcome of parsing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    /// The root node, or `None` if the document is empty or unparsable.
    pub root: Option<Node>,
    /// Syntax, empty-document and duplicate-key diagnostics.
    pub parse_errors: Vec<Diagnostic>,
}

impl ParseResult {
    /// Returns `true` when a tree was produced and no parse error was raised.
    pub fn is_clean(&self) -> bool {
        self.root.is_some() && !self.parse_errors.iter().any(Diagnostic::is_error)
    }
}

/// Parses `document` into a tree.
///
/// Never fails: every problem is reported through
/// [`ParseResult::parse_errors`].
pub fn parse(document: &SourceDocument) -> ParseResult {
    let mut parser = Parser::new(document);
    let result = match parser.document() {
        Ok(Some(root)) => ParseResult {
            root: Some(root),
            parse_errors: std::mem::take(&mut parser.duplicates),
        },
        Ok(None) => ParseResult {
            root: None,
            parse_errors: vec![
                Diagnostic::new(
                    DiagnosticCode::EmptyDocument,
                    Severity::Error,
                    "document is empty",
                )
                .at(document.span(0, 0)),
            ],
        },
        Err(err) => ParseResult {
            root: None,
            parse_errors: vec![err.into_diagnostic(document)],
        },
    };
    debug!(
        path = %document.path().display(),
        parsed = result.root.is_some(),
        errors = result.parse_errors.len(),
        "parsed document"
    );
    result
}

/// The first unsupported construct found.
#[derive(Debug)]
struct SyntaxError {
    start: usize,
    end: usize,
    message: String,
    location: NodePath,
}

impl SyntaxError {
    fn into_diagnostic(self, document: &SourceDocument) -> Diagnostic {
        let diag = Diagnostic::new(DiagnosticCode::Syntax, Severity::Error, self.message)
            .at(document.span(self.start, self.end));
        if self.location.is_root() {
            diag
        } else {
            diag.with_location(self.location)
        }
    }
}

type PResult<T> = Result<T, SyntaxError>;

/// One physical line. `indent` counts leading spaces, except for the line of
/// a compact sequence item, whose indent is moved to the item's column.
#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    end: usize,
    indent: usize,
}

impl Line {
    fn content_start(self) -> usize {
        self.start + self.indent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Start,
    End,
}

#[derive(Debug, Clone, Copy)]
enum Chomp {
    Strip,
    Clip,
    Keep,
}

struct Parser<'a> {
    doc: &'a SourceDocument,
    text: &'a str,
    lines: Vec<Line>,
    pos: usize,
    depth: usize,
    path: NodePath,
    duplicates: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(doc: &'a SourceDocument) -> Self {
        let text = doc.text();
        let mut lines = Vec::new();
        let mut start = 0;
        for piece in text.split_inclusive('\n') {
            let end = start + piece.trim_end_matches('\n').len();
            lines.push(Line {
                start,
                end,
                indent: leading_spaces(&text[start..end]),
            });
            start += piece.len();
        }
        Self {
            doc,
            text,
            lines,
            pos: 0,
            depth: 0,
            path: NodePath::root(),
            duplicates: Vec::new(),
        }
    }

    // -- errors -------------------------------------------------------------

    fn error_at(&self, start: usize, end: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            start,
            end,
            message: message.into(),
            location: self.path.clone(),
        }
    }

    fn error(&self, line: Line, message: impl Into<String>) -> SyntaxError {
        self.error_at(line.content_start().min(line.end), line.end, message)
    }

    fn enter(&mut self, start: usize, end: usize) -> PResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error_at(
                start,
                end,
                format!("nesting exceeds the maximum depth of {MAX_DEPTH}"),
            ));
        }
        Ok(())
    }

    // -- line cursor --------------------------------------------------------

    fn raw(&self, line: Line) -> &'a str {
        &self.text[line.start..line.end]
    }

    fn content(&self, line: Line) -> &'a str {
        self.text.get(line.content_start()..line.end).unwrap_or("")
    }

    fn is_insignificant(&self, line: Line) -> bool {
        let rest = self.raw(line).trim_start_matches([' ', '\t']);
        rest.is_empty() || rest.starts_with('#')
    }

    fn skip_insignificant(&mut self) {
        while let Some(&line) = self.lines.get(self.pos) {
            if !self.is_insignificant(line) {
                break;
            }
            self.pos += 1;
        }
    }

    /// The next significant line, or `None` at the end of input or at a
    /// document marker.
    fn peek(&mut self) -> PResult<Option<Line>> {
        self.skip_insignificant();
        let Some(&line) = self.lines.get(self.pos) else {
            return Ok(None);
        };
        if marker(self.raw(line)).is_some() {
            return Ok(None);
        }
        if self.content(line).starts_with('\t') {
            return Err(self.error(line, "tab characters are not allowed in indentation"));
        }
        Ok(Some(line))
    }

    fn expect_bare_marker(&self, line: Line) -> PResult<()> {
        let rest = self.raw(line)[3..].trim_start_matches([' ', '\t']);
        if rest.is_empty() || rest.starts_with('#') {
            Ok(())
        } else {
            Err(self.error(line, "content on a document marker line is not supported"))
        }
    }

    // -- document -----------------------------------------------------------

    fn document(&mut self) -> PResult<Option<Node>> {
        self.skip_insignificant();
        if let Some(&line) = self.lines.get(self.pos) {
            let raw = self.raw(line);
            if raw.starts_with('%') {
                return Err(self.error(line, "directives are not supported"));
            }
            if marker(raw) == Some(Marker::Start) {
                self.expect_bare_marker(line)?;
                self.pos += 1;
            }
        }
        let root = match self.peek()? {
            Some(line) => Some(self.block_node(line)?),
            None => None,
        };
        self.finish()?;
        Ok(root)
    }

    fn finish(&mut self) -> PResult<()> {
        self.skip_insignificant();
        let Some(&line) = self.lines.get(self.pos) else {
            return Ok(());
        };
        match marker(self.raw(line)) {
            Some(Marker::Start) => Err(self.error(
                line,
                "multiple documents in one file are not supported",
            )),
            Some(Marker::End) => {
                self.expect_bare_marker(line)?;
                self.pos += 1;
                self.skip_insignificant();
                match self.lines.get(self.pos) {
                    Some(&extra) => Err(self.error(
                        extra,
                        "content after the document end marker is not supported",
                    )),
                    None => Ok(()),
                }
            }
            None => {
                // Tab indentation gets its own message.
                self.peek()?;
                Err(self.error(line, "unexpected content at this indentation"))
            }
        }
    }

    // -- block context ------------------------------------------------------

    /// Parses the block node starting on `line`.
    fn block_node(&mut self, line: Line) -> PResult<Node> {
        self.enter(line.content_start(), line.end)?;
        let content = self.content(line);
        let node = if is_sequence_item(content) {
            self.block_sequence(line.indent)
        } else if content == "?" || content.starts_with("? ") {
            Err(self.error(line, "complex mapping keys are not supported"))
        } else if find_key_colon(content).is_some() {
            self.block_mapping(line.indent)
        } else if content.starts_with(['|', '>']) {
            Err(self.error(
                line,
                "a block scalar indicator must follow a key or `- ` on the same line",
            ))
        } else {
            self.inline_value(line.content_start(), line.end, line.indent)
        };
        self.depth -= 1;
        node
    }

    fn block_mapping(&mut self, indent: usize) -> PResult<Node> {
        let mut entries = Vec::new();
        let mut seen: HashMap<KeyIdentity, usize> = HashMap::new();
        let mut start = None;
        let mut end = 0;

        while let Some(line) = self.peek()? {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line, "unexpected indentation"));
            }
            let content = self.content(line);
            if is_sequence_item(content) {
                return Err(self.error(line, "expected a mapping key, found a sequence item"));
            }
            let Some(colon) = find_key_colon(content) else {
                return Err(self.error(line, "expected a `key: value` pair"));
            };
            let key_start = line.content_start();
            let key = self.key_node(key_start, key_start + colon)?;
            let key_text = key.scalar_text().unwrap_or_default().into_owned();
            start.get_or_insert(key_start);

            let after_colon = key_start + colon + 1;
            let value_start = skip_blanks(self.text, after_colon, line.end);
            self.path.push(PathSegment::Key(key_text.clone()));
            let value = if value_start == line.end || self.text[value_start..].starts_with('#') {
                self.pos += 1;
                self.nested_value(indent, after_colon, true)?
            } else {
                self.inline_value(value_start, line.end, indent)?
            };
            self.path.pop();

            end = end.max(key.span.end.offset).max(value.span.end.offset);
            let identity = key
                .as_scalar()
                .map_or(KeyIdentity::Null, Scalar::key_identity);
            match seen.get(&identity) {
                Some(&first_line) => self.duplicate(&key, &key_text, first_line),
                None => {
                    seen.insert(identity, key.span.start.line);
                    entries.push(Entry { key, value });
                }
            }
        }

        let start = start.unwrap_or(end);
        Ok(Node {
            kind: NodeKind::Mapping {
                entries,
                style: CollectionStyle::Block,
            },
            span: self.doc.span(start, end),
        })
    }

    fn block_sequence(&mut self, indent: usize) -> PResult<Node> {
        let mut items = Vec::new();
        let mut start = None;
        let mut end = 0;

        while let Some(line) = self.peek()? {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(self.error(line, "unexpected indentation"));
            }
            if !is_sequence_item(self.content(line)) {
                break;
            }
            let dash = line.content_start();
            start.get_or_insert(dash);
            let after_dash = dash + 1;
            let item_start = skip_blanks(self.text, after_dash, line.end);
            let rest = &self.text[item_start..line.end];

            self.path.push(PathSegment::Index(items.len()));
            let item = if rest.is_empty() || rest.starts_with('#') {
                self.pos += 1;
                self.nested_value(indent, after_dash, false)?
            } else if is_sequence_item(rest)
                || rest == "?"
                || rest.starts_with("? ")
                || find_key_colon(rest).is_some()
            {
                if self.text[after_dash..item_start].contains('\t') {
                    return Err(self.error(line, "tab characters are not allowed in indentation"));
                }
                // Re-read the rest of the line as a node indented to its own
                // column.
                let compact = Line {
                    indent: item_start - line.start,
                    ..line
                };
                self.lines[self.pos] = compact;
                self.block_node(compact)?
            } else {
                self.inline_value(item_start, line.end, indent)?
            };
            self.path.pop();

            end = end.max(after_dash).max(item.span.end.offset);
            items.push(item);
        }

        let start = start.unwrap_or(end);
        Ok(Node {
            kind: NodeKind::Sequence {
                items,
                style: CollectionStyle::Block,
            },
            span: self.doc.span(start, end),
        })
    }

    /// The value of a key (or `-`) with nothing after it on its line: a more
    /// indented block, a same-indent sequence under a mapping key, or null.
    fn nested_value(&mut self, indent: usize, null_at: usize, compact_sequence: bool) -> PResult<Node> {
        match self.peek()? {
            Some(next) if next.indent > indent => self.block_node(next),
            Some(next)
                if compact_sequence
                    && next.indent == indent
                    && is_sequence_item(self.content(next)) =>
            {
                self.block_node(next)
            }
            Some(_) | None => Ok(self.null_node(null_at)),
        }
    }

    fn key_node(&self, start: usize, colon: usize) -> PResult<Node> {
        let raw = self.text[start..colon].trim_end_matches([' ', '\t']);
        let end = start + raw.len();
        if raw.is_empty() {
            return Err(self.error_at(start, colon + 1, "empty mapping key"));
        }
        if raw == "?" || raw.starts_with("? ") {
            return Err(self.error_at(start, end, "complex mapping keys are not supported"));
        }
        match raw.as_bytes()[0] {
            b'"' | b'\'' => {
                let mut cursor = start;
                let key = self.quoted(&mut cursor, end)?;
                if cursor != end {
                    return Err(self.error_at(cursor, end, "unexpected text after quoted key"));
                }
                Ok(key)
            }
            b'&' | b'*' | b'!' => Err(self.error_at(
                start,
                end,
                "anchors, aliases and tags are not supported",
            )),
            _ => Ok(self.plain_node(start, end)),
        }
    }

    /// Parses a value that starts on the current line at `start`.
    ///
    /// Consumes the line, plus the content lines of a block scalar.
    fn inline_value(&mut self, start: usize, end: usize, parent_indent: usize) -> PResult<Node> {
        let s = &self.text[start..end];
        let Some(first) = s.chars().next() else {
            self.pos += 1;
            return Ok(self.null_node(start));
        };
        match first {
            '|' | '>' => self.block_scalar(start, end, parent_indent),
            '"' | '\'' | '[' | '{' => {
                let mut cursor = start;
                let node = self.flow_node(&mut cursor, end)?;
                self.expect_line_end(cursor, end)?;
                self.pos += 1;
                Ok(node)
            }
            '&' | '*' | '!' => Err(self.error_at(
                start,
                end,
                "anchors, aliases and tags are not supported",
            )),
            '@' | '`' => Err(self.error_at(
                start,
                end,
                format!("`{first}` is reserved and cannot start a plain scalar"),
            )),
            _ => {
                let text = &s[..scalar::plain_block_len(s)];
                if is_sequence_item(text) || text == "?" || text.starts_with("? ") {
                    return Err(self.error_at(
                        start,
                        end,
                        "block collection indicators are not allowed here",
                    ));
                }
                if text.contains(": ") || text.contains(":\t") || text.ends_with(':') {
                    return Err(self.error_at(
                        start,
                        end,
                        "mapping values are not allowed here (quote values that contain \": \")",
                    ));
                }
                self.pos += 1;
                Ok(self.plain_node(start, start + text.len()))
            }
        }
    }

    /// Accepts only whitespace and a comment between `cursor` and `end`.
    fn expect_line_end(&self, cursor: usize, end: usize) -> PResult<()> {
        let rest = &self.text[cursor..end];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        if trimmed.is_empty() || (trimmed.starts_with('#') && trimmed.len() < rest.len()) {
            Ok(())
        } else {
            Err(self.error_at(cursor, end, "unexpected text after value"))
        }
    }

    fn block_scalar(&mut self, start: usize, end: usize, parent_indent: usize) -> PResult<Node> {
        let header = &self.text[start..end];
        let bytes = header.as_bytes();
        let style = if header.starts_with('|') {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };

        let mut chomp = None;
        let mut explicit = None;
        let mut i = 1;
        while let Some(&b) = bytes.get(i) {
            match b {
                b'-' | b'+' if chomp.is_none() => {
                    chomp = Some(if b == b'-' { Chomp::Strip } else { Chomp::Keep });
                }
                b'1'..=b'9' if explicit.is_none() => explicit = Some(usize::from(b - b'0')),
                _ => break,
            }
            i += 1;
        }
        let chomp = chomp.unwrap_or(Chomp::Clip);
        let indicator_end = start + i;
        let tail = &header[i..];
        let tail_trimmed = tail.trim_start_matches([' ', '\t']);
        if !tail.is_empty()
            && (tail_trimmed.len() == tail.len()
                || !(tail_trimmed.is_empty() || tail_trimmed.starts_with('#')))
        {
            return Err(self.error_at(
                start,
                end,
                "unexpected text after block scalar indicator",
            ));
        }

        self.pos += 1;
        let is_blank = |line: &Line| self.raw(*line).trim_matches([' ', '\t']).is_empty();
        let content_indent = match explicit {
            Some(d) => parent_indent + d,
            None => self.lines[self.pos..]
                .iter()
                .find(|line| !is_blank(*line))
                .map_or(0, |line| leading_spaces(self.raw(*line))),
        }
        .max(parent_indent + 1);

        let mut scan = self.pos;
        let mut last = self.pos;
        while let Some(line) = self.lines.get(scan) {
            if !is_blank(line) {
                if leading_spaces(self.raw(*line)) < content_indent {
                    break;
                }
                last = scan + 1;
            }
            scan += 1;
        }
        let trailing_blank = scan - last;
        let content: Vec<&str> = self.lines[self.pos..last]
            .iter()
            .map(|line| self.raw(*line).get(content_indent..).unwrap_or(""))
            .collect();

        let body = match style {
            ScalarStyle::Folded => fold(&content),
            ScalarStyle::Literal
            | ScalarStyle::Plain
            | ScalarStyle::SingleQuoted
            | ScalarStyle::DoubleQuoted => content.join("\n"),
        };
        let value = if content.is_empty() {
            match chomp {
                Chomp::Keep => "\n".repeat(trailing_blank),
                Chomp::Strip | Chomp::Clip => String::new(),
            }
        } else {
            match chomp {
                Chomp::Strip => body,
                Chomp::Clip => body + "\n",
                Chomp::Keep => body + &"\n".repeat(trailing_blank + 1),
            }
        };

        let span_end = if last > self.pos {
            self.lines[last - 1].end
        } else {
            indicator_end
        };
        self.pos = last;
        Ok(Node {
            kind: NodeKind::Scalar(Scalar {
                value: ScalarValue::String(value),
                style,
            }),
            span: self.doc.span(start, span_end),
        })
    }

    fn duplicate(&mut self, key: &Node, key_text: &str, first_line: usize) {
        let message = format!("duplicate key \"{key_text}\" (first defined on line {first_line})");
        self.duplicates.push(
            Diagnostic::new(DiagnosticCode::DuplicateKey, Severity::Error, message)
                .with_location(self.path.child(key_text))
                .at(key.span),
        );
    }

    // -- node builders ------------------------------------------------------

    fn null_node(&self, at: usize) -> Node {
        Node {
            kind: NodeKind::Scalar(Scalar {
                value: ScalarValue::Null,
                style: ScalarStyle::Plain,
            }),
            span: self.doc.span(at, at),
        }
    }

    fn plain_node(&self, start: usize, end: usize) -> Node {
        Node {
            kind: NodeKind::Scalar(Scalar {
                value: scalar::resolve_plain(&self.text[start..end]),
                style: ScalarStyle::Plain,
            }),
            span: self.doc.span(start, end),
        }
    }
}

fn leading_spaces(s: &str) -> usize {
    s.len() - s.trim_start_matches(' ').len()
}

fn skip_blanks(text: &str, from: usize, end: usize) -> usize {
    let rest = &text[from..end];
    end - rest.trim_start_matches([' ', '\t']).len()
}

fn is_sequence_item(content: &str) -> bool {
    content == "-" || content.starts_with("- ") || content.starts_with("-\t")
}

fn is_separator(b: Option<&u8>) -> bool {
    b.is_none_or(|b| matches!(b, b' ' | b'\t'))
}

fn marker(raw: &str) -> Option<Marker> {
    let (found, rest) = if let Some(rest) = raw.strip_prefix("---") {
        (Marker::Start, rest)
    } else if let Some(rest) = raw.strip_prefix("...") {
        (Marker::End, rest)
    } else {
        return None;
    };
    (rest.is_empty() || rest.starts_with([' ', '\t'])).then_some(found)
}

/// Returns the byte index of the `:` separating a block mapping key from its
/// value, if `content` starts with a key.
fn find_key_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    let key_len = match bytes.first()? {
        b'"' => scalar::scan_double_quoted(content).ok()?.1,
        b'\'' => scalar::scan_single_quoted(content).ok()?.1,
        b'[' | b'{' | b'#' | b'|' | b'>' | b'%' | b'@' | b'`' => return None,
        b'-' if is_separator(bytes.get(1)) => return None,
        _ => {
            for (i, &b) in bytes.iter().enumerate() {
                if b == b':' && is_separator(bytes.get(i + 1)) {
                    return Some(i);
                }
                if b == b'#' && i > 0 && matches!(bytes[i - 1], b' ' | b'\t') {
                    return None;
                }
            }
            return None;
        }
    };
    let colon = skip_blanks(content, key_len, content.len());
    (bytes.get(colon) == Some(&b':') && is_separator(bytes.get(colon + 1))).then_some(colon)
}

/// Folds the content lines of a `>` scalar: single line breaks between
/// ordinary lines become spaces, blank lines become newlines, and lines
/// indented beyond the content keep their breaks.
fn fold(lines: &[&str]) -> String {
    let mut out = String::new();
    let mut breaks = 0;
    let mut prev_more_indented = None;
    for line in lines {
        if line.is_empty() {
            breaks += 1;
            continue;
        }
        let more_indented = line.starts_with([' ', '\t']);
        match prev_more_indented {
            None => out.extend(std::iter::repeat_n('\n', breaks)),
            Some(prev) if prev || more_indented => {
                out.extend(std::iter::repeat_n('\n', breaks + 1));
            }
            Some(_) if breaks == 0 => out.push(' '),
            Some(_) => out.extend(std::iter::repeat_n('\n', breaks)),
        }
        out.push_str(line);
        breaks = 0;
        prev_more_indented = Some(more_indented);
    }
    out
}

//! Single-line flow collections (`[a, b]`, `{k: v}`) and quoted scalars.
//!
//! Flow parsing works on a byte cursor bounded by the end of the current
//! line: a collection that does not close on its own line is rejected.
use std::collections::HashMap;

use crate::node::{
    CollectionStyle, Entry, KeyIdentity, Node, NodeKind, Scalar, ScalarStyle, ScalarValue,
};
use crate::path::PathSegment;

use super::{PResult, Parser, scalar, skip_blanks};

const UNTERMINATED_SEQUENCE: &str =
    "flow sequence is not closed on the same line (multi-line flow collections are not supported)";
const UNTERMINATED_MAPPING: &str =
    "flow mapping is not closed on the same line (multi-line flow collections are not supported)";

impl Parser<'_> {
    fn peek_char(&self, cursor: usize, end: usize) -> Option<char> {
        self.text.get(cursor..end).and_then(|s| s.chars().next())
    }

    /// Parses one flow node at `cursor`, advancing it past the node.
    pub(super) fn flow_node(&mut self, cursor: &mut usize, end: usize) -> PResult<Node> {
        self.enter(*cursor, end)?;
        let node = self.flow_value(cursor, end);
        self.depth -= 1;
        node
    }

    fn flow_value(&mut self, cursor: &mut usize, end: usize) -> PResult<Node> {
        *cursor = skip_blanks(self.text, *cursor, end);
        let Some(first) = self.peek_char(*cursor, end) else {
            return Err(self.error_at(*cursor, end, "expected a value"));
        };
        match first {
            '[' => self.flow_sequence(cursor, end),
            '{' => self.flow_mapping(cursor, end),
            '"' | '\'' => self.quoted(cursor, end),
            '&' | '*' | '!' => Err(self.error_at(
                *cursor,
                end,
                "anchors, aliases and tags are not supported",
            )),
            '@' | '`' => Err(self.error_at(
                *cursor,
                end,
                format!("`{first}` is reserved and cannot start a plain scalar"),
            )),
            ']' | '}' | ',' | '#' => Err(self.error_at(*cursor, end, "expected a value")),
            _ => self.flow_plain(cursor, end),
        }
    }

    /// Parses a quoted scalar at `cursor`. Used in block context too.
    pub(super) fn quoted(&self, cursor: &mut usize, end: usize) -> PResult<Node> {
        let start = *cursor;
        let s = &self.text[start..end];
        let (scanned, style) = if s.starts_with('"') {
            (scalar::scan_double_quoted(s), ScalarStyle::DoubleQuoted)
        } else {
            (scalar::scan_single_quoted(s), ScalarStyle::SingleQuoted)
        };
        let (value, len) = scanned.map_err(|message| self.error_at(start, end, message))?;
        *cursor = start + len;
        Ok(Node {
            kind: NodeKind::Scalar(Scalar {
                value: ScalarValue::String(value),
                style,
            }),
            span: self.doc.span(start, *cursor),
        })
    }

    fn flow_plain(&self, cursor: &mut usize, end: usize) -> PResult<Node> {
        let start = *cursor;
        let bytes = &self.text.as_bytes()[start..end];
        let mut len = bytes.len();
        for (i, &b) in bytes.iter().enumerate() {
            let stop = match b {
                b',' | b'[' | b']' | b'{' | b'}' => true,
                b':' => matches!(
                    bytes.get(i + 1),
                    None | Some(b' ' | b'\t' | b',' | b']' | b'}')
                ),
                b'#' => i > 0 && matches!(bytes[i - 1], b' ' | b'\t'),
                _ => false,
            };
            if stop {
                len = i;
                break;
            }
        }
        let text = self.text[start..start + len].trim_end_matches([' ', '\t']);
        if text.is_empty() {
            return Err(self.error_at(start, end, "expected a value"));
        }
        *cursor = start + text.len();
        Ok(self.plain_node(start, *cursor))
    }

    fn flow_sequence(&mut self, cursor: &mut usize, end: usize) -> PResult<Node> {
        let open = *cursor;
        *cursor += 1;
        let mut items = Vec::new();
        loop {
            *cursor = skip_blanks(self.text, *cursor, end);
            match self.peek_char(*cursor, end) {
                None | Some('#') => return Err(self.error_at(open, end, UNTERMINATED_SEQUENCE)),
                Some(']') => {
                    *cursor += 1;
                    break;
                }
                Some(',') => {
                    return Err(self.error_at(*cursor, end, "empty entry in flow sequence"));
                }
                Some(_) => {}
            }

            self.path.push(PathSegment::Index(items.len()));
            let item = self.flow_node(cursor, end)?;
            self.path.pop();
            items.push(item);

            *cursor = skip_blanks(self.text, *cursor, end);
            match self.peek_char(*cursor, end) {
                Some(',') => *cursor += 1,
                Some(']') => {
                    *cursor += 1;
                    break;
                }
                Some(':') => {
                    return Err(self.error_at(
                        *cursor,
                        end,
                        "mappings inside flow sequences must use braces",
                    ));
                }
                None | Some('#') => return Err(self.error_at(open, end, UNTERMINATED_SEQUENCE)),
                Some(c) => {
                    return Err(self.error_at(*cursor, end, format!("expected `,` or `]`, found `{c}`")));
                }
            }
        }
        Ok(Node {
            kind: NodeKind::Sequence {
                items,
                style: CollectionStyle::Flow,
            },
            span: self.doc.span(open, *cursor),
        })
    }

    fn flow_mapping(&mut self, cursor: &mut usize, end: usize) -> PResult<Node> {
        let open = *cursor;
        *cursor += 1;
        let mut entries = Vec::new();
        let mut seen: HashMap<KeyIdentity, usize> = HashMap::new();
        loop {
            *cursor = skip_blanks(self.text, *cursor, end);
            match self.peek_char(*cursor, end) {
                None | Some('#') => return Err(self.error_at(open, end, UNTERMINATED_MAPPING)),
                Some('}') => {
                    *cursor += 1;
                    break;
                }
                Some(',') => {
                    return Err(self.error_at(*cursor, end, "empty entry in flow mapping"));
                }
                Some('[' | '{' | '?') => {
                    return Err(self.error_at(
                        *cursor,
                        end,
                        "complex mapping keys are not supported",
                    ));
                }
                Some(_) => {}
            }

            let key = self.flow_node(cursor, end)?;
            let key_text = key.scalar_text().unwrap_or_default().into_owned();
            *cursor = skip_blanks(self.text, *cursor, end);

            self.path.push(PathSegment::Key(key_text.clone()));
            let value = match self.peek_char(*cursor, end) {
                Some(':') => {
                    *cursor += 1;
                    let after_colon = *cursor;
                    *cursor = skip_blanks(self.text, *cursor, end);
                    match self.peek_char(*cursor, end) {
                        Some(',' | '}') => self.null_node(after_colon),
                        None | Some('#') => {
                            return Err(self.error_at(open, end, UNTERMINATED_MAPPING));
                        }
                        Some(_) => self.flow_node(cursor, end)?,
                    }
                }
                Some(',' | '}') => self.null_node(key.span.end.offset),
                None | Some('#') => return Err(self.error_at(open, end, UNTERMINATED_MAPPING)),
                Some(c) => {
                    return Err(self.error_at(*cursor, end, format!("expected `:`, found `{c}`")));
                }
            };
            self.path.pop();

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

            *cursor = skip_blanks(self.text, *cursor, end);
            match self.peek_char(*cursor, end) {
                Some(',') => *cursor += 1,
                Some('}') => {
                    *cursor += 1;
                    break;
                }
                None | Some('#') => return Err(self.error_at(open, end, UNTERMINATED_MAPPING)),
                Some(c) => {
                    return Err(self.error_at(*cursor, end, format!("expected `,` or `}}`, found `{c}`")));
                }
            }
        }
        Ok(Node {
            kind: NodeKind::Mapping {
                entries,
                style: CollectionStyle::Flow,
            },
            span: self.doc.span(open, *cursor),
        })
    }
}

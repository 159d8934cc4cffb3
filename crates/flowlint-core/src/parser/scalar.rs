//! Scalar resolution (YAML 1.2 core schema) and quoted-scalar decoding.
use std::sync::LazyLock;

use regex::Regex;

use crate::node::ScalarValue;

// All patterns are compile-time literals; construction cannot fail.
static INT_DEC: LazyLock<Regex> = LazyLock::new(|| compile(r"^[-+]?[0-9]+$"));
static INT_HEX: LazyLock<Regex> = LazyLock::new(|| compile(r"^0x[0-9a-fA-F]+$"));
static INT_OCT: LazyLock<Regex> = LazyLock::new(|| compile(r"^0o[0-7]+$"));
static FLOAT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$"));
static INF: LazyLock<Regex> = LazyLock::new(|| compile(r"^[-+]?\.(inf|Inf|INF)$"));
static NAN: LazyLock<Regex> = LazyLock::new(|| compile(r"^\.(nan|NaN|NAN)$"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| unreachable!("built-in pattern {pattern}: {e}"))
}

/// Resolves the text of a plain scalar to a typed value.
///
/// Anything that is not null, a boolean, an integer or a float is a string.
/// Integers that overflow `i64` stay strings rather than losing precision.
pub(crate) fn resolve_plain(text: &str) -> ScalarValue {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return ScalarValue::Null,
        "true" | "True" | "TRUE" => return ScalarValue::Bool(true),
        "false" | "False" | "FALSE" => return ScalarValue::Bool(false),
        _ => {}
    }
    if INT_DEC.is_match(text) {
        if let Ok(i) = text.parse::<i64>() {
            return ScalarValue::Int(i);
        }
        return ScalarValue::String(text.to_owned());
    }
    if INT_HEX.is_match(text) {
        if let Ok(i) = i64::from_str_radix(&text[2..], 16) {
            return ScalarValue::Int(i);
        }
        return ScalarValue::String(text.to_owned());
    }
    if INT_OCT.is_match(text) {
        if let Ok(i) = i64::from_str_radix(&text[2..], 8) {
            return ScalarValue::Int(i);
        }
        return ScalarValue::String(text.to_owned());
    }
    if FLOAT.is_match(text) {
        if let Ok(x) = text.parse::<f64>() {
            return ScalarValue::Float(x);
        }
    }
    if INF.is_match(text) {
        let x = if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
        return ScalarValue::Float(x);
    }
    if NAN.is_match(text) {
        return ScalarValue::Float(f64::NAN);
    }
    ScalarValue::String(text.to_owned())
}

/// Scans a double-quoted scalar starting at the opening quote of `s`.
///
/// Returns the decoded value and the byte length consumed (closing quote
/// included), or an error message.
pub(super) fn scan_double_quoted(s: &str) -> Result<(String, usize), String> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((out, i + 1)),
            '\\' => {
                let Some((_, esc)) = chars.next() else {
                    break;
                };
                match esc {
                    '0' => out.push('\0'),
                    'a' => out.push('\u{07}'),
                    'b' => out.push('\u{08}'),
                    't' | '\t' => out.push('\t'),
                    'n' => out.push('\n'),
                    'v' => out.push('\u{0b}'),
                    'f' => out.push('\u{0c}'),
                    'r' => out.push('\r'),
                    'e' => out.push('\u{1b}'),
                    ' ' => out.push(' '),
                    '"' => out.push('"'),
                    '/' => out.push('/'),
                    '\\' => out.push('\\'),
                    'N' => out.push('\u{85}'),
                    '_' => out.push('\u{a0}'),
                    'L' => out.push('\u{2028}'),
                    'P' => out.push('\u{2029}'),
                    'x' => out.push(hex_escape(&mut chars, 2)?),
                    'u' => out.push(hex_escape(&mut chars, 4)?),
                    'U' => out.push(hex_escape(&mut chars, 8)?),
                    other => return Err(format!("unknown escape sequence \"\\{other}\"")),
                }
            }
            c => out.push(c),
        }
    }
    Err("unterminated double-quoted scalar (quoted scalars must close on the same line)".to_owned())
}

fn hex_escape(chars: &mut impl Iterator<Item = (usize, char)>, digits: usize) -> Result<char, String> {
    let hex: String = chars.take(digits).map(|(_, c)| c).collect();
    if hex.len() != digits {
        return Err("truncated escape sequence".to_owned());
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence \"{hex}\""))
}

/// Scans a single-quoted scalar starting at the opening quote of `s`.
///
/// `''` is the only escape. Returns the decoded value and the byte length
/// consumed.
pub(super) fn scan_single_quoted(s: &str) -> Result<(String, usize), String> {
    let mut out = String::new();
    let mut chars = s.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if chars.peek().is_some_and(|&(_, n)| n == '\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            return Ok((out, i + 1));
        }
        out.push(c);
    }
    Err("unterminated single-quoted scalar (quoted scalars must close on the same line)".to_owned())
}

/// Returns the byte length of a plain scalar in block context: up to a
/// `" #"` comment, with trailing whitespace removed.
pub(super) fn plain_block_len(s: &str) -> usize {
    let mut end = s.len();
    let bytes = s.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'#' && (i == 0 || matches!(bytes[i - 1], b' ' | b'\t')) {
            end = i;
            break;
        }
    }
    s[..end].trim_end_matches([' ', '\t']).len()
}

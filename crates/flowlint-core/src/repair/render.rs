//! Renders repair values as single-line YAML flow text.
use serde_json::Value;

use crate::node::ScalarValue;
use crate::parser::resolve_plain;

/// Renders `value` in flow style, e.g. `{push: {branches: [main]}}`.
pub(crate) fn flow(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => scalar(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(flow).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", scalar(k), flow(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Renders a string scalar plain when that reads back as the same string,
/// double-quoted otherwise.
pub(crate) fn scalar(s: &str) -> String {
    if is_plain_safe(s) {
        s.to_owned()
    } else {
        double_quoted(s)
    }
}

fn is_plain_safe(s: &str) -> bool {
    const LEADING: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%',
        '@', '`',
    ];
    !s.is_empty()
        && s.trim() == s
        && !s.starts_with(LEADING)
        && !s.contains([',', '[', ']', '{', '}'])
        && !s.contains(": ")
        && !s.contains(" #")
        && !s.ends_with(':')
        && !s.contains(char::is_control)
        && matches!(resolve_plain(s), ScalarValue::String(_))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", u32::from(c))),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_trigger_renders_as_flow_mapping() {
        assert_eq!(
            flow(&json!({"push": {"branches": ["main"]}})),
            "{push: {branches: [main]}}"
        );
    }

    #[test]
    fn scalars_that_would_change_type_are_quoted() {
        assert_eq!(flow(&json!("ubuntu-latest")), "ubuntu-latest");
        assert_eq!(flow(&json!("true")), "\"true\"");
        assert_eq!(flow(&json!("12")), "\"12\"");
        assert_eq!(flow(&json!("")), "\"\"");
        assert_eq!(flow(&json!(true)), "true");
        assert_eq!(flow(&json!(12)), "12");
        assert_eq!(flow(&json!(null)), "null");
    }

    #[test]
    fn indicators_and_separators_are_quoted() {
        assert_eq!(scalar("a: b"), "\"a: b\"");
        assert_eq!(scalar("x, y"), "\"x, y\"");
        assert_eq!(scalar("- item"), "\"- item\"");
        assert_eq!(scalar("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
    }

    #[test]
    fn nested_sequences_of_mappings() {
        assert_eq!(
            flow(&json!([{"run": "make test"}, []])),
            "[{run: make test}, []]"
        );
    }
}

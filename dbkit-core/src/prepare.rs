//! Statement preparer: renders a template with every `@name` replaced by the
//! escaped literal of its binding.
//!
//! The output is for the debug log only. What runs on the server comes from
//! [`crate::compile`], and the two are allowed to disagree (quoted
//! placeholders, for one).

use regex::{NoExpand, Regex};
use serde_json::Value;

use crate::binder::Binding;

/// Substitute bindings into `template` in binding order.
///
/// Each binding replaces every `@<name>` followed by a word boundary. When two
/// bindings share a name the first one has already consumed every occurrence,
/// so the second finds nothing to replace.
pub fn prepare(template: &str, bindings: &[Binding]) -> String {
    let mut rendered = template.to_owned();
    for binding in bindings {
        let pattern = format!(r"@{}\b", regex::escape(&binding.name));
        let Ok(re) = Regex::new(&pattern) else {
            tracing::warn!(name = %binding.name, "skipping unrenderable binding name");
            continue;
        };
        let literal = escape_literal(&binding.value);
        rendered = re.replace_all(&rendered, NoExpand(&literal)).into_owned();
    }
    rendered
}

/// MySQL literal for a JSON value, modelled on the mysql client's `escape`.
///
/// Arrays become comma-separated lists (nested arrays are parenthesized);
/// an empty array renders as `NULL`. Objects are rendered as a quoted JSON
/// string, which is also how the driver path binds them.
pub fn escape_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        Value::Array(items) if items.is_empty() => "NULL".to_owned(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Array(inner) if !inner.is_empty() => format!("({})", escape_literal(item)),
                _ => escape_literal(item),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => quote_string(&value.to_string()),
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{1a}' => out.push_str("\\Z"),
            '"' | '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

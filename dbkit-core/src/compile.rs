//! Statement compiler: the execution path for `@name` placeholders.
//!
//! Placeholders become positional `?` markers and their values are collected
//! in order for the driver to bind. Quoted regions, comments and `@@system`
//! variables are copied through untouched; `@tokens` with no matching binding
//! are left alone as MySQL user variables.

use std::collections::HashSet;

use serde_json::Value;

use crate::binder::Binding;

/// SQL with `?` markers plus the values to bind, in marker order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

pub fn compile(template: &str, bindings: &[Binding]) -> CompiledStatement {
    let mut out = CompiledStatement {
        sql: String::with_capacity(template.len()),
        params: Vec::new(),
    };
    let chars: Vec<char> = template.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => i = copy_quoted(&chars, i, &mut out.sql),
            '#' => i = copy_until_newline(&chars, i, &mut out.sql),
            '-' if chars.get(i + 1) == Some(&'-') => i = copy_until_newline(&chars, i, &mut out.sql),
            '/' if chars.get(i + 1) == Some(&'*') => i = copy_block_comment(&chars, i, &mut out.sql),
            '@' if chars.get(i + 1) == Some(&'@') => {
                // system variable, e.g. @@session.sql_mode
                out.sql.push_str("@@");
                i += 2;
                while i < chars.len() && (is_ident_char(chars[i]) || chars[i] == '.') {
                    out.sql.push(chars[i]);
                    i += 1;
                }
            }
            '@' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                match lookup(bindings, &name) {
                    Some(value) if !name.is_empty() => push_param(value, &mut out),
                    _ => {
                        out.sql.push('@');
                        out.sql.push_str(&name);
                    }
                }
                i = end;
            }
            _ => {
                out.sql.push(c);
                i += 1;
            }
        }
    }
    out
}

/// Names that appear more than once in `bindings`, in first-seen order
pub fn duplicate_names(bindings: &[Binding]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for binding in bindings {
        let name = binding.name.as_str();
        if !seen.insert(name) && !dupes.contains(&name) {
            dupes.push(name);
        }
    }
    dupes
}

/// Binding names the compiler can never match: anything outside
/// `[A-Za-z0-9_]+`. The preparer would still substitute them, so the debug
/// render would not be what runs.
pub fn unmatchable_names(bindings: &[Binding]) -> Vec<&str> {
    bindings
        .iter()
        .map(|b| b.name.as_str())
        .filter(|name| name.is_empty() || !name.chars().all(is_ident_char))
        .collect()
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn lookup<'a>(bindings: &'a [Binding], name: &str) -> Option<&'a Value> {
    bindings.iter().find(|b| b.name == name).map(|b| &b.value)
}

fn push_param(value: &Value, out: &mut CompiledStatement) {
    match value {
        Value::Array(items) if items.is_empty() => out.sql.push_str("NULL"),
        Value::Array(items) => {
            let markers: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::Array(inner) if !inner.is_empty() => {
                        out.params.extend(inner.iter().cloned());
                        format!("({})", vec!["?"; inner.len()].join(", "))
                    }
                    _ => {
                        out.params.push(item.clone());
                        "?".to_owned()
                    }
                })
                .collect();
            out.sql.push_str(&markers.join(", "));
        }
        _ => {
            out.sql.push('?');
            out.params.push(value.clone());
        }
    }
}

fn copy_quoted(chars: &[char], start: usize, sql: &mut String) -> usize {
    let quote = chars[start];
    sql.push(quote);
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        sql.push(c);
        i += 1;
        if c == '\\' && quote != '`' {
            if let Some(&next) = chars.get(i) {
                sql.push(next);
                i += 1;
            }
        } else if c == quote {
            break;
        }
    }
    i
}

fn copy_until_newline(chars: &[char], start: usize, sql: &mut String) -> usize {
    let mut i = start;
    while i < chars.len() {
        sql.push(chars[i]);
        i += 1;
        if chars[i - 1] == '\n' {
            break;
        }
    }
    i
}

fn copy_block_comment(chars: &[char], start: usize, sql: &mut String) -> usize {
    sql.push_str("/*");
    let mut i = start + 2;
    while i < chars.len() {
        if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
            sql.push_str("*/");
            return i + 2;
        }
        sql.push(chars[i]);
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn replaces_placeholders_in_order_of_appearance() {
        let stmt = compile(
            "UPDATE t SET a = @DBAddValue0 WHERE id = @DBConditionValue0;",
            &[
                Binding::new("DBAddValue0", "x"),
                Binding::new("DBConditionValue0", 4),
            ],
        );
        assert_eq!(stmt.sql, "UPDATE t SET a = ? WHERE id = ?;");
        assert_eq!(stmt.params, vec![json!("x"), json!(4)]);
    }

    #[test]
    fn repeated_placeholder_binds_twice() {
        let stmt = compile("where a = @n or b = @n", &[Binding::new("n", 1)]);
        assert_eq!(stmt.sql, "where a = ? or b = ?");
        assert_eq!(stmt.params, vec![json!(1), json!(1)]);
    }

    #[test]
    fn quoted_tokens_are_not_placeholders() {
        let stmt = compile(
            r#"where a = '@n' and b = "x\"@n" and `@n` = @n"#,
            &[Binding::new("n", 1)],
        );
        assert_eq!(stmt.sql, r#"where a = '@n' and b = "x\"@n" and `@n` = ?"#);
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn comments_are_copied_verbatim() {
        let stmt = compile(
            "select @n -- it's @n\n/* @n */ # @n",
            &[Binding::new("n", 1)],
        );
        assert_eq!(stmt.sql, "select ? -- it's @n\n/* @n */ # @n");
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn unknown_and_system_variables_pass_through() {
        let stmt = compile("select @@session.sql_mode, @other, @n", &[Binding::new("n", 1)]);
        assert_eq!(stmt.sql, "select @@session.sql_mode, @other, ?");
    }

    #[test]
    fn longer_token_does_not_match_shorter_name() {
        let stmt = compile("select @id_x, @id", &[Binding::new("id", 1)]);
        assert_eq!(stmt.sql, "select @id_x, ?");
    }

    #[test]
    fn arrays_expand_to_marker_lists() {
        let stmt = compile(
            "where id in (@ids) and x in (@none) and (a, b) in (@pairs)",
            &[
                Binding::new("ids", json!([1, 2, 3])),
                Binding::new("none", json!([])),
                Binding::new("pairs", json!([[1, 2], [3, 4]])),
            ],
        );
        assert_eq!(
            stmt.sql,
            "where id in (?, ?, ?) and x in (NULL) and (a, b) in ((?, ?), (?, ?))"
        );
        assert_eq!(stmt.params.len(), 7);
    }

    #[test]
    fn first_duplicate_wins() {
        let stmt = compile(
            "where a = @n",
            &[Binding::new("n", "first"), Binding::new("n", "second")],
        );
        assert_eq!(stmt.params, vec![json!("first")]);
    }

    #[test]
    fn injection_payload_is_a_single_parameter() {
        let payload = "x' OR 1=1 -- ";
        let stmt = compile("where name = @name", &[Binding::new("name", payload)]);
        assert_eq!(stmt.sql, "where name = ?");
        assert_eq!(stmt.params, vec![json!(payload)]);
    }

    #[test]
    fn flags_names_outside_identifier_charset() {
        let bindings = [
            Binding::new("user_id", 1),
            Binding::new("user.id", 2),
            Binding::new("naïve", 3),
            Binding::new("", 4),
        ];
        assert_eq!(unmatchable_names(&bindings), vec!["user.id", "naïve", ""]);
    }

    #[test]
    fn reports_duplicate_names_once() {
        let bindings = [
            Binding::new("a", 1),
            Binding::new("b", 2),
            Binding::new("a", 3),
            Binding::new("a", 4),
        ];
        assert_eq!(duplicate_names(&bindings), vec!["a"]);
    }
}

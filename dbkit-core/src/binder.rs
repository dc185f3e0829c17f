//! Input binder: turns column maps and filter conditions into placeholder
//! SQL fragments plus the ordered bindings that back them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder prefix for column values (`@DBAddValue0`, `@DBAddValue1`, ...)
pub const COLUMN_PREFIX: &str = "DBAddValue";

/// Placeholder prefix for condition values (`@DBConditionValue0`, ...)
pub const CONDITION_PREFIX: &str = "DBConditionValue";

/// A named value standing in for an `@name` placeholder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

impl Binding {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One filter term: `<param> <operator> <value>`.
///
/// `param` is emitted verbatim, so it may be a column or an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub value: Value,
}

impl Condition {
    /// Equality condition (operator left unset, rendered as `=`)
    pub fn new(param: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            param: param.into(),
            operator: None,
            value: value.into(),
        }
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn operator(&self) -> &str {
        self.operator.as_deref().unwrap_or("=")
    }
}

/// Keyword joining WHERE terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Or => f.write_str("OR"),
        }
    }
}

/// A single identifier or a list of them (`a , b , c`).
///
/// Used for select lists and table lists. Entries are not validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlList(Vec<String>);

impl SqlList {
    pub fn render(&self) -> String {
        self.0.join(" , ")
    }
}

impl fmt::Display for SqlList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for SqlList {
    fn from(item: &str) -> Self {
        Self(vec![item.to_owned()])
    }
}

impl From<String> for SqlList {
    fn from(item: String) -> Self {
        Self(vec![item])
    }
}

impl From<&String> for SqlList {
    fn from(item: &String) -> Self {
        Self(vec![item.clone()])
    }
}

impl From<Vec<String>> for SqlList {
    fn from(items: Vec<String>) -> Self {
        Self(items)
    }
}

impl From<Vec<&str>> for SqlList {
    fn from(items: Vec<&str>) -> Self {
        Self(items.into_iter().map(str::to_owned).collect())
    }
}

impl From<&[&str]> for SqlList {
    fn from(items: &[&str]) -> Self {
        Self(items.iter().map(|s| (*s).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for SqlList {
    fn from(items: [&str; N]) -> Self {
        Self(items.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// Output of [`bind_columns`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnBindings {
    pub columns: Vec<String>,
    /// `@`-prefixed placeholder per column, same order as `columns`
    pub placeholders: Vec<String>,
    pub bindings: Vec<Binding>,
}

impl ColumnBindings {
    /// `column = @placeholder` pairs for an UPDATE's SET list
    pub fn assignments(&self) -> Vec<String> {
        self.columns
            .iter()
            .zip(&self.placeholders)
            .map(|(column, placeholder)| format!("{column} = {placeholder}"))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Output of [`bind_conditions`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionBindings {
    pub clauses: Vec<String>,
    pub bindings: Vec<Binding>,
}

impl ConditionBindings {
    pub fn joined(&self, conjunction: Conjunction) -> String {
        self.clauses.join(&format!(" {conjunction} "))
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

pub fn bind_columns<I, K, V>(pairs: I) -> ColumnBindings
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    bind_columns_with_prefix(pairs, COLUMN_PREFIX)
}

/// Bind a column map, naming placeholders `<prefix><index>` in iteration order
pub fn bind_columns_with_prefix<I, K, V>(pairs: I, prefix: &str) -> ColumnBindings
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    let mut out = ColumnBindings::default();
    for (index, (column, value)) in pairs.into_iter().enumerate() {
        let name = format!("{prefix}{index}");
        out.columns.push(column.into());
        out.placeholders.push(format!("@{name}"));
        out.bindings.push(Binding::new(name, value));
    }
    out
}

pub fn bind_conditions(conditions: &[Condition]) -> ConditionBindings {
    bind_conditions_with_prefix(conditions, CONDITION_PREFIX)
}

/// Render each condition as `<param> <operator> @<prefix><index>`
pub fn bind_conditions_with_prefix(conditions: &[Condition], prefix: &str) -> ConditionBindings {
    let mut out = ConditionBindings::default();
    for (index, condition) in conditions.iter().enumerate() {
        let name = format!("{prefix}{index}");
        out.clauses
            .push(format!("{} {} @{name}", condition.param, condition.operator()));
        out.bindings.push(Binding::new(name, condition.value.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn columns_get_indexed_placeholders() {
        let bound = bind_columns([("name", json!("X")), ("age", json!(3))]);
        assert_eq!(bound.columns, vec!["name", "age"]);
        assert_eq!(bound.placeholders, vec!["@DBAddValue0", "@DBAddValue1"]);
        assert_eq!(bound.bindings[1], Binding::new("DBAddValue1", 3));
        assert_eq!(
            bound.assignments(),
            vec!["name = @DBAddValue0", "age = @DBAddValue1"]
        );
    }

    #[test]
    fn conditions_default_to_equality() {
        let bound = bind_conditions(&[
            Condition::new("id", 5),
            Condition::new("age", 18).with_operator(">="),
        ]);
        assert_eq!(
            bound.clauses,
            vec!["id = @DBConditionValue0", "age >= @DBConditionValue1"]
        );
        assert_eq!(
            bound.joined(Conjunction::Or),
            "id = @DBConditionValue0 OR age >= @DBConditionValue1"
        );
    }

    #[test]
    fn custom_prefix() {
        let bound = bind_conditions_with_prefix(&[Condition::new("id", 1)], "w");
        assert_eq!(bound.clauses, vec!["id = @w0"]);
        assert_eq!(bound.bindings[0].name, "w0");
    }

    #[test]
    fn condition_deserializes_without_operator() {
        let cond: Condition = serde_json::from_value(json!({"param": "id", "value": 9})).unwrap();
        assert_eq!(cond.operator(), "=");
        assert_eq!(cond, Condition::new("id", 9));
    }

    #[test]
    fn sql_list_joins_with_spaced_commas() {
        assert_eq!(SqlList::from("*").render(), "*");
        assert_eq!(SqlList::from(["id", "name"]).render(), "id , name");
        assert_eq!(SqlList::from(vec!["a".to_string()]).to_string(), "a");
    }
}

//! Driver adaptation boundary.
//!
//! The facade talks to a [`Driver`]; [`MySqlDriver`] is the production one,
//! backed by a sqlx `MySqlPool`. Whether a statement yields rows or mutation
//! metadata is decided here, once, from its leading keyword.

use async_trait::async_trait;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row as _, TypeInfo};

use crate::compile::CompiledStatement;
use crate::config::ResolvedPoolConfig;
use crate::standardize::{MutationMeta, QueryOutcome, Row};

static LEADING_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+").expect("static keyword pattern"));

/// What a statement gives back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Rows,
    Mutation,
}

impl StatementKind {
    /// Classify by leading keyword, skipping whitespace, `(` and comments
    pub fn classify(sql: &str) -> Self {
        let keyword = LEADING_KEYWORD
            .find(skip_preamble(sql))
            .map(|m| m.as_str().to_ascii_uppercase());
        match keyword.as_deref() {
            Some(
                "SELECT" | "SHOW" | "DESCRIBE" | "DESC" | "EXPLAIN" | "WITH" | "VALUES" | "TABLE"
                | "CALL",
            ) => Self::Rows,
            _ => Self::Mutation,
        }
    }
}

fn skip_preamble(mut sql: &str) -> &str {
    loop {
        let trimmed = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
        if let Some(rest) = trimmed.strip_prefix("--").or_else(|| trimmed.strip_prefix('#')) {
            sql = rest.split_once('\n').map_or("", |(_, tail)| tail);
        } else if let Some(rest) = trimmed.strip_prefix("/*") {
            sql = rest.split_once("*/").map_or("", |(_, tail)| tail);
        } else {
            return trimmed;
        }
    }
}

/// Executes compiled statements against a database
#[async_trait]
pub trait Driver: Send + Sync {
    async fn run(
        &self,
        statement: &CompiledStatement,
        kind: StatementKind,
    ) -> Result<QueryOutcome, sqlx::Error>;

    /// Acquire a connection and release it straight away
    async fn ping(&self) -> Result<(), sqlx::Error>;
}

pub struct MySqlDriver {
    pool: MySqlPool,
}

impl MySqlDriver {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Build a pool without opening any connection yet.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect_lazy(config: &ResolvedPoolConfig) -> Self {
        let pool = config
            .pool_options()
            .connect_lazy_with(config.connect_options());
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    async fn run(
        &self,
        statement: &CompiledStatement,
        kind: StatementKind,
    ) -> Result<QueryOutcome, sqlx::Error> {
        if kind == StatementKind::Mutation && statement.params.is_empty() {
            // text protocol: USE, LOCK TABLES, CREATE PROCEDURE cannot be prepared
            let done = sqlx::raw_sql(&statement.sql).execute(&self.pool).await?;
            return Ok(QueryOutcome::Mutation(MutationMeta {
                affected_rows: done.rows_affected(),
                insert_id: done.last_insert_id(),
            }));
        }

        let query = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind_value);

        match kind {
            StatementKind::Rows => {
                let rows = query.fetch_all(&self.pool).await?;
                Ok(QueryOutcome::Rows(rows.iter().map(row_to_json).collect()))
            }
            StatementKind::Mutation => {
                let done = query.execute(&self.pool).await?;
                Ok(QueryOutcome::Mutation(MutationMeta {
                    affected_rows: done.rows_affected(),
                    insert_id: done.last_insert_id(),
                }))
            }
        }
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        let conn = self.pool.acquire().await?;
        drop(conn);
        Ok(())
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(u) = n.as_u64() {
                query.bind(u)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(value.to_string()),
    }
}

/// Convert a row to a JSON object, column by column
fn row_to_json(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|col| {
            let value = if col.type_info().name() == "JSON" {
                row.try_get::<Option<Value>, _>(col.ordinal())
                    .ok()
                    .flatten()
                    .unwrap_or(Value::Null)
            } else {
                extract_value(row, col.ordinal())
            };
            (col.name().to_owned(), value)
        })
        .collect()
}

fn extract_value(row: &MySqlRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
        return v
            .and_then(|f| Number::from_f64(f as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    // DECIMAL comes back as text so no precision is lost
    if let Ok(v) = row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        return v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|dt| Value::String(dt.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
        return v
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
        return v
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(idx) {
        return v
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v
            .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes)))
            .unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_are_classified_as_rows() {
        for sql in [
            "select * from t",
            "  SELECT 1",
            "(SELECT 1) UNION (SELECT 2)",
            "show tables",
            "describe t",
            "EXPLAIN select 1",
            "with x as (select 1) select * from x",
            "-- leading comment\nselect 1",
            "/* hint */ select 1",
            "# note\n  select 1",
            "CALL report_totals(?)",
        ] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Rows, "{sql}");
        }
    }

    #[test]
    fn writes_are_classified_as_mutations() {
        for sql in [
            "INSERT INTO t (a) VALUES (?);",
            "update t set a = 1",
            "DELETE FROM t WHERE id = ?;",
            "create table t (id int)",
            "USE sampledb",
            "LOCK TABLES t WRITE",
            "",
            "-- only a comment",
        ] {
            assert_eq!(StatementKind::classify(sql), StatementKind::Mutation, "{sql}");
        }
    }
}

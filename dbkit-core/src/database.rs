//! The database facade.
//!
//! [`Database`] owns the driver, the debug sink and the default debug
//! setting. Everything that varies per statement (bound inputs, one-shot
//! debug overrides) lives in a [`Call`], which is consumed by the operation
//! it runs. Concurrent callers sharing one `Database` therefore never see
//! each other's inputs.
//!
//! ```ignore
//! let db = Database::connect(&PoolConfig::from_env(), &SecretKey::default())?;
//! let reply = db
//!     .set_inputs(vec![Binding::new("name", "X")])
//!     .get("*", "test", "where name = @name", "")
//!     .await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::binder::{bind_columns, bind_conditions, Binding, Condition, Conjunction, SqlList};
use crate::compile::{compile, duplicate_names, unmatchable_names};
use crate::config::PoolConfig;
use crate::debug::{DebugGate, DebugSink, Tone, TracingSink};
use crate::driver::{Driver, MySqlDriver, StatementKind};
use crate::error::{ConfigError, DbError, Reply};
use crate::prepare::prepare;
use crate::secret::SecretKey;
use crate::standardize::standardize;

pub struct Database {
    driver: Option<Arc<dyn Driver>>,
    sink: Arc<dyn DebugSink>,
    silent_by_default: AtomicBool,
}

impl Database {
    /// Decrypt the configured password and set up a lazily connecting pool.
    ///
    /// A bad credential blob is fatal. Must be called from within a Tokio
    /// runtime.
    pub fn connect(config: &PoolConfig, key: &SecretKey) -> Result<Self, ConfigError> {
        let resolved = config.resolve(key)?;
        let driver = MySqlDriver::connect_lazy(&resolved);
        info!(
            host = %config.host,
            database = %config.database,
            connection_limit = config.connection_limit,
            "MySQL pool configured"
        );
        let db = Self::with_driver(Arc::new(driver));
        db.silent_by_default
            .store(config.silent_by_default(), Ordering::Relaxed);
        Ok(db)
    }

    pub fn with_driver(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver: Some(driver),
            sink: Arc::new(TracingSink),
            silent_by_default: AtomicBool::new(false),
        }
    }

    /// A facade with no pool; every query reports [`DbError::NoConnection`]
    pub fn detached() -> Self {
        Self {
            driver: None,
            sink: Arc::new(TracingSink),
            silent_by_default: AtomicBool::new(false),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn DebugSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.driver.is_some()
    }

    /// Permanently turn statement debugging on or off
    pub fn set_debug(&self, enabled: bool) -> &Self {
        self.silent_by_default.store(!enabled, Ordering::Relaxed);
        self
    }

    pub fn debug_enabled(&self) -> bool {
        !self.silent_by_default.load(Ordering::Relaxed)
    }

    /// Start a per-call context with no inputs and no override
    pub fn call(&self) -> Call<'_> {
        Call {
            db: self,
            inputs: Vec::new(),
            gate: self.gate(),
        }
    }

    pub fn set_inputs(&self, inputs: impl Into<Vec<Binding>>) -> Call<'_> {
        self.call().set_inputs(inputs)
    }

    /// Show the debug output of the next statement regardless of the default
    pub fn log(&self) -> Call<'_> {
        self.call().log()
    }

    /// Suppress the debug output of the next statement regardless of the default
    pub fn silence(&self) -> Call<'_> {
        self.call().silence()
    }

    pub async fn query(&self, sql: &str) -> Reply {
        self.call().query(sql).await
    }

    pub async fn get(
        &self,
        select: impl Into<SqlList>,
        table: impl Into<SqlList>,
        opt: &str,
        limit: &str,
    ) -> Reply {
        self.call().get(select, table, opt, limit).await
    }

    pub async fn get_first(
        &self,
        select: impl Into<SqlList>,
        table: impl Into<SqlList>,
        opt: &str,
        limit: &str,
    ) -> Reply {
        self.call().get_first(select, table, opt, limit).await
    }

    pub async fn insert<I, K, V>(&self, table: impl Into<SqlList>, values: I) -> Reply
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.call().insert(table, values).await
    }

    pub async fn update<I, K, V>(
        &self,
        table: impl Into<SqlList>,
        values: I,
        conditions: &[Condition],
        conjunction: Conjunction,
    ) -> Reply
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.call().update(table, values, conditions, conjunction).await
    }

    pub async fn delete(&self, table: impl Into<SqlList>, conditions: &[Condition]) -> Reply {
        self.call().delete(table, conditions).await
    }

    /// Check that a pooled connection can be acquired. Never fails; the
    /// outcome is logged through the debug gate.
    pub async fn validity(&self) -> bool {
        let mut gate = self.gate();
        let Some(driver) = &self.driver else {
            if gate.admit_error() {
                self.sink
                    .emit(Tone::Error, "Failed to connect! Error: There is no DB connection");
            }
            return false;
        };
        match driver.ping().await {
            Ok(()) => {
                if gate.admit() {
                    self.sink.emit(Tone::Success, "Connection successful");
                }
                true
            }
            Err(err) => {
                if gate.admit_error() {
                    self.sink
                        .emit(Tone::Error, &format!("Failed to connect! Error: {err}"));
                }
                false
            }
        }
    }

    fn gate(&self) -> DebugGate {
        DebugGate::new(self.silent_by_default.load(Ordering::Relaxed))
    }
}

/// Inputs and debug override for exactly one statement
pub struct Call<'a> {
    db: &'a Database,
    inputs: Vec<Binding>,
    gate: DebugGate,
}

impl<'a> Call<'a> {
    /// Replace the inputs for this call
    pub fn set_inputs(mut self, inputs: impl Into<Vec<Binding>>) -> Self {
        self.inputs = inputs.into();
        self
    }

    /// Append one input
    pub fn input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.push(Binding::new(name, value));
        self
    }

    pub fn get_inputs(&self) -> &[Binding] {
        &self.inputs
    }

    pub fn log(mut self) -> Self {
        self.gate.speak();
        self
    }

    pub fn silence(mut self) -> Self {
        self.gate.quiet();
        self
    }

    /// What `sql` looks like with this call's inputs substituted as literals
    pub fn prepared(&self, sql: &str) -> String {
        prepare(sql, &self.inputs)
    }

    /// Run `sql` with this call's inputs bound by the driver
    pub async fn query(mut self, sql: &str) -> Reply {
        let Some(driver) = self.db.driver.clone() else {
            self.report_error("There is no DB connection!");
            return Reply::failed(DbError::NoConnection);
        };

        let unmatchable: Vec<String> = unmatchable_names(&self.inputs)
            .into_iter()
            .map(|name| format!("{name:?}"))
            .collect();
        if !unmatchable.is_empty() {
            return self.reject(&format!(
                "input names must be [A-Za-z0-9_]+, got: {}",
                unmatchable.join(", ")
            ));
        }

        self.debug_statement(sql);
        for name in duplicate_names(&self.inputs) {
            warn!(name, "duplicate input name; the first value is used");
        }

        let statement = compile(sql, &self.inputs);
        match driver.run(&statement, StatementKind::classify(sql)).await {
            Ok(outcome) => Reply::ok(standardize(outcome)),
            Err(err) => {
                self.report_error(&format!("Query failed: {err}"));
                Reply::failed(DbError::Driver(err))
            }
        }
    }

    /// `SELECT <limit> <select> FROM <table> <opt>`.
    ///
    /// `opt` is appended verbatim. Only `@name` tokens inside it are
    /// protected, and only if this call carries matching inputs.
    pub async fn get(
        self,
        select: impl Into<SqlList>,
        table: impl Into<SqlList>,
        opt: &str,
        limit: &str,
    ) -> Reply {
        let select: SqlList = select.into();
        let table: SqlList = table.into();
        let sql = format!("SELECT {limit} {select} FROM {table} {opt}");
        self.query(&sql).await
    }

    /// Like [`Call::get`], keeping only the first row.
    ///
    /// Zero rows yields [`DbError::RecordNotFound`] next to a result with no
    /// data. A driver error from the underlying `get` is passed through.
    pub async fn get_first(
        self,
        select: impl Into<SqlList>,
        table: impl Into<SqlList>,
        opt: &str,
        limit: &str,
    ) -> Reply {
        let reply = self.get(select, table, opt, limit).await;
        match reply.into_parts() {
            (Some(err), result) => Reply { error: Some(err), result },
            (None, result) => {
                let mut result = result.unwrap_or_default();
                match result.data.take().and_then(|rows| rows.into_iter().next()) {
                    Some(first) => {
                        result.data = Some(vec![first]);
                        Reply::ok(result)
                    }
                    None => Reply::partial(DbError::RecordNotFound, result),
                }
            }
        }
    }

    /// `INSERT INTO <table> (<columns>) VALUES (<placeholders>);`
    pub async fn insert<I, K, V>(mut self, table: impl Into<SqlList>, values: I) -> Reply
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let table: SqlList = table.into();
        let columns = bind_columns(values);
        if columns.is_empty() {
            return self.reject("insert requires at least one column");
        }
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({});",
            columns.columns.join(" , "),
            columns.placeholders.join(" , ")
        );
        self.adopt_generated(columns.bindings);
        self.query(&sql).await
    }

    /// `UPDATE <table> SET <col = @p, ...> WHERE <cond> <conjunction> <cond> ...;`
    pub async fn update<I, K, V>(
        mut self,
        table: impl Into<SqlList>,
        values: I,
        conditions: &[Condition],
        conjunction: Conjunction,
    ) -> Reply
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let table: SqlList = table.into();
        let columns = bind_columns(values);
        if columns.is_empty() {
            return self.reject("update requires at least one column");
        }
        if conditions.is_empty() {
            return self.reject("update requires at least one condition");
        }
        let filters = bind_conditions(conditions);
        let sql = format!(
            "UPDATE {table} SET {} WHERE {};",
            columns.assignments().join(" , "),
            filters.joined(conjunction)
        );
        let mut generated = columns.bindings;
        generated.extend(filters.bindings);
        self.adopt_generated(generated);
        self.query(&sql).await
    }

    /// `DELETE FROM <table> WHERE <cond> AND <cond> ...;`
    pub async fn delete(mut self, table: impl Into<SqlList>, conditions: &[Condition]) -> Reply {
        let table: SqlList = table.into();
        if conditions.is_empty() {
            return self.reject("delete requires at least one condition");
        }
        let filters = bind_conditions(conditions);
        let sql = format!(
            "DELETE FROM {table} WHERE {};",
            filters.joined(Conjunction::And)
        );
        self.adopt_generated(filters.bindings);
        self.query(&sql).await
    }

    /// Generated bindings go first; caller inputs follow and lose any name clash
    fn adopt_generated(&mut self, generated: Vec<Binding>) {
        let extra = std::mem::replace(&mut self.inputs, generated);
        self.inputs.extend(extra);
    }

    fn reject(mut self, reason: &str) -> Reply {
        self.report_error(reason);
        Reply::failed(DbError::invalid_statement(reason))
    }

    fn debug_statement(&mut self, sql: &str) {
        if !self.gate.admit() {
            return;
        }
        let inputs = serde_json::to_string(&self.inputs).unwrap_or_else(|_| "[]".to_owned());
        let message = format!(
            "statement debug\n  inputs:   {inputs}\n  raw:      {sql}\n  prepared: {}",
            prepare(sql, &self.inputs)
        );
        self.db.sink.emit(Tone::Statement, &message);
    }

    fn report_error(&mut self, message: &str) {
        if self.gate.admit_error() {
            self.db.sink.emit(Tone::Error, message);
        }
    }
}

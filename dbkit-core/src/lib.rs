//! dbkit-core: a small, injection-safe data-access layer over a MySQL pool.
//!
//! Callers write SQL with `@name` placeholders and hand values over as
//! [`Binding`]s. Every statement travels two separate paths:
//!
//! - [`compile`] rewrites placeholders into positional `?` parameters that the
//!   driver binds. This is what actually runs.
//! - [`prepare`] substitutes escaped literals into the template. The result is
//!   only ever written to the debug log.
//!
//! The [`Database`] facade builds statements, runs them, and normalizes the
//! driver's answer into a [`StandardResult`].

pub mod binder;
pub mod compile;
pub mod config;
pub mod database;
pub mod debug;
pub mod driver;
pub mod error;
pub mod prepare;
pub mod secret;
pub mod standardize;

pub use binder::{
    bind_columns, bind_conditions, Binding, ColumnBindings, Condition, ConditionBindings,
    Conjunction, SqlList,
};
pub use compile::{compile, CompiledStatement};
pub use config::{load_dotenv, PoolConfig, ResolvedPoolConfig};
pub use database::{Call, Database};
pub use debug::{DebugGate, DebugSink, Override, Tone, TracingSink};
pub use driver::{Driver, MySqlDriver, StatementKind};
pub use error::{ConfigError, DbError, Reply, SecretError};
pub use prepare::{escape_literal, prepare};
pub use secret::{decrypt, encrypt, generate_iv, EncryptedSecret, SecretKey};
pub use standardize::{standardize, MutationMeta, QueryOutcome, Row, StandardResult};

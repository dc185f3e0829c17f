//! dbkit-server: HTTP surface over the shared [`dbkit_core::Database`].
//!
//! Only health reporting is exposed; queries stay in-process.

pub mod http;

pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};

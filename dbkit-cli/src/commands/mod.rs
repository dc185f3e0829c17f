//! Subcommand implementations

pub mod query;
pub mod secret;
pub mod serve;

use anyhow::{Context, Result};
use dbkit_core::{load_dotenv, Database, PoolConfig, SecretKey};

pub use query::run_query;
pub use secret::{run_decrypt, run_encrypt};
pub use serve::run_serve;

/// Build the facade from `.env` and the process environment
pub fn open_database(debug: bool) -> Result<Database> {
    load_dotenv();
    let config = PoolConfig::from_env();
    let db = Database::connect(&config, &SecretKey::default())
        .context("Failed to configure the MySQL pool")?;
    if debug {
        db.set_debug(true);
    }
    Ok(db)
}

pub async fn run_check(debug: bool) -> Result<bool> {
    let db = open_database(debug)?;
    let connected = db.validity().await;
    println!("{}", if connected { "connected" } else { "unreachable" });
    Ok(connected)
}

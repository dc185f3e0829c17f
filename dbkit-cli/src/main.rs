//! dbkit CLI - MySQL facade tooling
//!
//! - `serve`: run the health endpoint over a pooled facade
//! - `check`: report whether the database is reachable
//! - `query`: run a raw statement with bound `@name` inputs
//! - `encrypt` / `decrypt`: manage the stored credential blob

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod tracing_setup;

use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "dbkit",
    author,
    version,
    about = "Injection-safe MySQL facade with encrypted credentials",
    long_about = "Run parameterized MySQL statements through the dbkit facade, check \
                  connectivity, serve a health endpoint, and manage the encrypted password blob."
)]
struct Cli {
    /// Verbose logging and statement debug output
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (GET /health)
    Serve(commands::serve::ServeArgs),
    /// Check database connectivity (exit code 1 when unreachable)
    Check,
    /// Run a raw SQL statement and print the standardized result as JSON
    Query(commands::query::QueryArgs),
    /// Encrypt a password into a credential blob
    Encrypt(commands::secret::EncryptArgs),
    /// Decrypt a credential blob
    Decrypt(commands::secret::DecryptArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();

    match cli.command {
        Commands::Serve(args) => commands::run_serve(args, cli.debug).await?,
        Commands::Check => {
            if !commands::run_check(cli.debug).await? {
                std::process::exit(1);
            }
        }
        Commands::Query(args) => commands::run_query(args, cli.debug).await?,
        Commands::Encrypt(args) => commands::run_encrypt(args)?,
        Commands::Decrypt(args) => commands::run_decrypt(args)?,
    }
    Ok(())
}

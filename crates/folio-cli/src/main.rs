//! # folio CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_cli::admin::{run_create_admin, CreateAdminArgs};
use folio_cli::password::{run_hash_password, HashPasswordArgs};
use folio_cli::slug::{run_slugify, SlugifyArgs};

/// Folio operator CLI.
///
/// Maintenance tasks for a Folio install that run outside the API server.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an argon2id hash of a password read from FOLIO_PASSWORD or stdin.
    HashPassword(HashPasswordArgs),

    /// Create an admin user in the database.
    CreateAdmin(CreateAdminArgs),

    /// Print the slug a title would be given.
    Slugify(SlugifyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut out = std::io::stdout().lock();
    let result = match cli.command {
        Commands::HashPassword(args) => run_hash_password(&args, &mut out),
        Commands::CreateAdmin(args) => run_create_admin(&args, &mut out).await,
        Commands::Slugify(args) => run_slugify(&args, &mut out),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

//! Siphon CLI
//!
//! Command-line interface for siphon database transfers.
//!
//! # Commands
//!
//! - `push`  - Push a local database file to a remote peer
//! - `pull`  - Pull a remote peer's database into a local file
//! - `serve` - Run a transfer peer over HTTP

mod commands;
mod http_client;
mod jsondb;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Siphon command-line database transfer tools.
#[derive(Parser)]
#[command(name = "siphon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push a local database file to a remote peer
    Push {
        /// Path to the local database file (JSON)
        #[arg(short, long)]
        db: PathBuf,

        /// Remote peer URL
        #[arg(short, long)]
        remote: String,

        /// Starting chunk size in rows
        #[arg(long, default_value_t = 1_000)]
        chunk_size: u64,

        /// Shared-secret credentials
        #[arg(long)]
        credentials: Option<String>,
    },

    /// Pull a remote peer's database into a local file
    Pull {
        /// Path the pulled database file (JSON) is written to
        #[arg(short, long)]
        db: PathBuf,

        /// Remote peer URL
        #[arg(short, long)]
        remote: String,

        /// Starting chunk size in rows
        #[arg(long, default_value_t = 1_000)]
        chunk_size: u64,

        /// Shared-secret credentials
        #[arg(long)]
        credentials: Option<String>,
    },

    /// Run a transfer peer over HTTP
    Serve {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:7878")]
        addr: SocketAddr,

        /// Optional database file (JSON) to serve; empty otherwise
        #[arg(short, long)]
        db: Option<PathBuf>,

        /// Require clients to present these credentials
        #[arg(long)]
        credentials: Option<String>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Push {
            db,
            remote,
            chunk_size,
            credentials,
        } => commands::push::run(&db, &remote, chunk_size, credentials.as_deref())?,
        Commands::Pull {
            db,
            remote,
            chunk_size,
            credentials,
        } => commands::pull::run(&db, &remote, chunk_size, credentials.as_deref())?,
        Commands::Serve {
            addr,
            db,
            credentials,
        } => commands::serve::run(addr, db.as_deref(), credentials.as_deref())?,
        Commands::Version => {
            println!("siphon v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

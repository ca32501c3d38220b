//! `KasaDB` CLI tool for provisioning the store artifacts.

#![warn(clippy::pedantic, clippy::nursery)]

use anyhow::Context;
use clap::{Parser, Subcommand};
use kasadb::config::StoreConfig;
use kasadb::salt::SaltStore;

#[derive(Parser)]
#[command(name = "kasadb")]
#[command(about = "KasaDB store provisioning CLI", long_about = None)]
struct Cli {
    /// Directory holding the salt and database artifacts
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate and persist a fresh key-derivation salt
    Init {
        /// Overwrite an existing salt even when a database is present,
        /// destroying access to all existing encrypted data
        #[arg(long)]
        force: bool,
    },
    /// Report which artifacts are present
    Status,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = StoreConfig::new(&cli.data_dir);
    let salt_store = SaltStore::new(config.salt_path(), config.db_path());

    match cli.command {
        Commands::Init { force } => {
            salt_store.initialize(force).context("salt initialization failed")?;
            println!("Salt written to {}", config.salt_path().display());
            if force {
                println!("Existing encrypted data, if any, is no longer recoverable.");
            }
        }
        Commands::Status => {
            print_artifact("salt", config.salt_path());
            print_artifact("database", config.db_path());
        }
    }

    Ok(())
}

fn print_artifact(label: &str, path: &std::path::Path) {
    match std::fs::metadata(path) {
        Ok(meta) => println!("{label}: present ({} bytes) at {}", meta.len(), path.display()),
        Err(_) => println!("{label}: missing (expected at {})", path.display()),
    }
}

//! `rentease`: operator tool for the RentEase data store.
//!
//! Opens the backend selected by the environment (see
//! [`StoreConfig`](rentease_store::config::StoreConfig)) and runs one
//! maintenance command against it. Logs go to stderr, and also to a daily
//! rolling file when `RENTEASE_LOG_DIR` is set. Command output goes to
//! stdout.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rentease_store::config::{BackendKind, StoreConfig};
use rentease_store::models::Role;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "rentease", about = "Inspect and maintain the RentEase data store")]
struct Cli {
    /// Use this backend instead of the one `RENTEASE_ENV` selects.
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Data directory, overriding `RENTEASE_DATA_DIR`. The database file is
    /// looked up in this directory too.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store if it does not exist yet.
    Init,
    /// Print the number of records in each collection.
    Stats,
    /// Copy a JSON store file into the SQLite database.
    ///
    /// Does nothing if the database already holds records.
    ImportJson {
        /// JSON store to import. Defaults to `db.json` in the data directory.
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Report records that point at users, properties or stays that do not
    /// exist. Exits non-zero when problems are found.
    Check,
    /// List users, without password hashes.
    Users {
        #[arg(long)]
        role: Option<Role>,
    },
    /// List a landlord's current tenants.
    Tenants { landlord_id: String },
}

fn init_tracing() -> Option<WorkerGuard> {
    let (file_layer, guard) = match std::env::var("RENTEASE_LOG_DIR") {
        Ok(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "rentease");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
        Err(_) => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _guard = init_tracing();

    let cli = Cli::parse();
    let mut config = StoreConfig::from_env().context("invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config.database_path = dir.join(
            config
                .database_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("rentease.db")),
        );
        config.data_dir = dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    tracing::debug!(backend = config.backend.as_str(), data_dir = %config.data_dir.display(), "Loaded configuration");

    match cli.command {
        Commands::Init => {
            let store = commands::open_store(&config).await?;
            println!("{} store ready at {}", config.backend.as_str(), store.backend());
        }
        Commands::Stats => {
            let store = commands::open_store(&config).await?;
            for (collection, count) in commands::stats(&store).await? {
                println!("{collection:<22}{count}");
            }
        }
        Commands::ImportJson { from } => {
            let report = commands::import_json(&config, from).await?;
            if report.skipped {
                println!("database already holds records; nothing imported");
            } else {
                for (collection, count) in &report.counts {
                    println!("{collection:<22}{count}");
                }
                if report.duplicates > 0 {
                    println!("skipped {} records with duplicate ids", report.duplicates);
                }
                if report.unrecognized > 0 {
                    println!(
                        "left behind {} records that do not match their collection",
                        report.unrecognized
                    );
                }
            }
        }
        Commands::Check => {
            let store = commands::open_store(&config).await?;
            let report = commands::check(&store).await?;
            for problem in &report.problems {
                println!("{problem}");
            }
            if !report.is_clean() {
                anyhow::bail!("{} problem(s) found", report.problems.len());
            }
            println!("no problems found");
        }
        Commands::Users { role } => {
            let store = commands::open_store(&config).await?;
            for user in commands::users(&store, role).await? {
                println!("{}\t{}\t{}\t{}", user.id, user.role, user.name, user.email);
            }
        }
        Commands::Tenants { landlord_id } => {
            let store = commands::open_store(&config).await?;
            let tenants = commands::tenants(&store, &landlord_id).await?;
            println!("{}", serde_json::to_string_pretty(&tenants)?);
        }
    }

    Ok(())
}

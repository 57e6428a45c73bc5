//! Library Log Importer (crazylib-import) - Main entry point
//!
//! Imports a historical borrow/release log into the library database and
//! prints a one-line summary. Exits non-zero when the file is missing,
//! unparsable, or the database cannot be written.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crazylib_common::config::{DatabasePathResolver, TomlConfig};
use crazylib_common::db::init_database;
use crazylib_import::{import_file, ImportOptions};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for crazylib-import
#[derive(Parser, Debug)]
#[command(name = "crazylib-import")]
#[command(about = "Import library borrow/release logs")]
#[command(version)]
struct Args {
    /// JSON, JSON array or JSON Lines file
    file_path: PathBuf,

    /// Reconcile and validate without writing
    #[arg(long)]
    dry_run: bool,

    /// Process at most this many records
    #[arg(long)]
    limit: Option<usize>,

    /// Database file
    #[arg(short, long, env = "CRAZYLIB_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load_or_default();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_path = DatabasePathResolver::new(config.clone()).resolve(args.database.as_deref());
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path, &config.database)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let options = ImportOptions {
        dry_run: args.dry_run,
        limit: args.limit,
    };

    let summary = import_file(&pool, &args.file_path, &options)
        .await
        .with_context(|| format!("Import of {} failed", args.file_path.display()))?;

    pool.close().await;

    println!("{}", summary);
    Ok(())
}

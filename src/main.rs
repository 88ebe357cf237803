//! `parcel`: upload files through an authenticated dashboard and share them
//! by link.

mod error;
mod web;

use crate::error::{ErrorKind, Result};
use clap::{Parser, Subcommand};
use exn::ResultExt;
use parcel_config::Config;
use parcel_library::{Library, ReconcileReport};
use parcel_metadata::{Database, Repository};
use parcel_stats::StatsAggregator;
use parcel_storage::BackendHandle;
use parcel_storage::backend::LocalBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "parcel", version, about = "Single-operator file hosting")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, env = "PARCEL_CONFIG", global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Reconcile the stores, then serve the dashboard (default).
    Serve,
    /// Only reconcile the blob directory with the database, then exit.
    Reconcile {
        /// Report what would be removed without removing anything.
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    init_logging(&config.log.filter);

    if let Some(parent) = config.storage.database.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Metadata)?;
    }
    let database = Database::connect(&config.storage.database).await.or_raise(|| ErrorKind::Metadata)?;
    let backend: BackendHandle =
        Arc::new(LocalBackend::new("uploads", &config.storage.blob_dir).or_raise(|| ErrorKind::Storage)?);
    let library = Library::new(backend, Repository::from(&database));

    let outcome = match cli.command.unwrap_or(Command::Serve) {
        Command::Reconcile { dry_run } => library.reconcile(dry_run).await.map(|report| print_report(&report)),
        Command::Serve => match library.reconcile(false).await {
            Ok(_) => return serve(&config, library, database).await,
            Err(e) => Err(e),
        },
    };
    database.close().await;
    outcome.or_raise(|| ErrorKind::Reconcile)
}

async fn serve(config: &Config, library: Library, database: Database) -> Result<()> {
    let stats = StatsAggregator::new(&config.storage.blob_dir, database.clone());
    let templates = web::Templates::load()?;
    let state = web::AppState::new(library, stats, &config.auth, templates);
    let app = web::router(state, config.server.max_upload_size);

    let listener = tokio::net::TcpListener::bind(config.server.listen).await.or_raise(|| ErrorKind::Server)?;
    tracing::info!(address = %config.server.listen, blob_dir = %config.storage.blob_dir.display(), "Listening");
    let served = web::serve(listener, app).await;
    database.close().await;
    served
}

fn init_logging(filter: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn print_report(report: &ReconcileReport) {
    let verb = if report.dry_run { "Would remove" } else { "Removed" };
    println!("{verb} {} orphaned blob(s)", report.removed_blobs.len());
    for id in &report.removed_blobs {
        println!("  blob   {id}");
    }
    println!("{verb} {} orphaned record(s)", report.removed_records.len());
    for id in &report.removed_records {
        println!("  record {id}");
    }
    println!("{} file(s) consistent", report.consistent);
}

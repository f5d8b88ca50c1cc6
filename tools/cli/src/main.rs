//! Gasp CLI - keeps a local copy of the Gasp server's collections.
//!
//! This tool runs sync passes, targeted record updates and a periodic
//! watcher against the configured Gasp server.

mod app;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use gasp_common::{EntityId, EntityKind};
use gasp_sync::{BroadcastSink, SyncMode, SyncRequest, SyncScheduler};

use app::Gasp;
use config::GaspConfig;

#[derive(Parser)]
#[command(name = "gasp")]
#[command(about = "Gasp - restaurant review sync client")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the Gasp server URI.
    #[arg(short, long)]
    server: Option<String>,

    /// Override the SQLite database path.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Reviews,
    Users,
    Restaurants,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Reviews => EntityKind::Review,
            KindArg::Users => EntityKind::User,
            KindArg::Restaurants => EntityKind::Restaurant,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new records from the server.
    Sync {
        /// Collection to sync (default: all).
        kind: Option<KindArg>,
    },

    /// Fetch and store one record by id.
    Update {
        kind: KindArg,

        /// Id of the record.
        #[arg(short, long)]
        id: i64,
    },

    /// List locally stored records, newest first.
    List {
        kind: KindArg,

        /// Maximum number of records to show.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Sync every collection periodically until interrupted.
    Watch {
        /// Seconds between passes (default: from config).
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = GaspConfig::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server_uri = server;
    }
    if let Some(db) = cli.db {
        config.database_path = Some(db);
    }

    match cli.command {
        Commands::Config => cmd_config(&config),
        Commands::Sync { kind } => cmd_sync(config, kind.map(EntityKind::from)).await,
        Commands::Update { kind, id } => cmd_update(config, kind.into(), EntityId::new(id)).await,
        Commands::List { kind, limit } => cmd_list(config, kind.into(), limit),
        Commands::Watch { interval } => cmd_watch(config, interval).await,
    }
}

/// Show the configuration actually in effect.
fn cmd_config(config: &GaspConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    println!("Database: {}", config.database_path().display());
    for kind in EntityKind::ALL {
        match config.resource_uri(kind) {
            Ok(uri) => println!("{:<12} {}", kind, uri),
            Err(e) => println!("{:<12} <{}>", kind, e),
        }
    }
    Ok(())
}

/// Run one pass per requested collection.
async fn cmd_sync(config: GaspConfig, kind: Option<EntityKind>) -> Result<()> {
    let gasp = Gasp::new(config, Arc::new(BroadcastSink::new(16)))?;
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };

    let mut failed = 0;
    for kind in kinds {
        match gasp.handle(SyncRequest::Pass(kind)).await {
            Ok(event) => println!("{}", event),
            Err(e) => {
                error!("{} sync failed: {}", kind, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} sync pass(es) failed", failed);
    }
    Ok(())
}

/// Fetch a single record.
async fn cmd_update(config: GaspConfig, kind: EntityKind, id: EntityId) -> Result<()> {
    let gasp = Gasp::new(config, Arc::new(BroadcastSink::new(16)))?;
    let event = gasp
        .handle(SyncRequest::Update { kind, id })
        .await
        .with_context(|| format!("Failed to update {} {}", kind.label(), id))?;
    println!("{}", event);
    Ok(())
}

/// Print stored records.
fn cmd_list(config: GaspConfig, kind: EntityKind, limit: usize) -> Result<()> {
    let gasp = Gasp::new(config, Arc::new(BroadcastSink::new(1)))?;
    let records = gasp.list(kind, limit)?;

    if records.is_empty() {
        println!("No {} stored.", kind);
    } else {
        for record in records {
            println!("{}", record);
        }
    }
    Ok(())
}

/// Periodic sync until Ctrl-C.
async fn cmd_watch(config: GaspConfig, interval: Option<u64>) -> Result<()> {
    let period = interval
        .map(|secs| Duration::from_secs(secs.max(1)))
        .unwrap_or_else(|| config.sync_interval());

    let sink = Arc::new(BroadcastSink::new(64));
    let mut events = sink.subscribe();
    let gasp = Arc::new(Gasp::new(config, sink)?);

    info!(
        "Watching {} every {:?}",
        gasp.config().server_uri,
        period
    );

    let (scheduler, handle) =
        SyncScheduler::new(SyncMode::Periodic { interval: period }, EntityKind::ALL.to_vec());

    let runner = tokio::spawn(handle.run(move |request| {
        let gasp = gasp.clone();
        async move { gasp.handle(request).await }
    }));

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(missed)) => warn!("Missed {} status events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Stopping");
    scheduler.shutdown().await;
    runner.await.context("Scheduler task failed")?;
    printer.abort();

    Ok(())
}

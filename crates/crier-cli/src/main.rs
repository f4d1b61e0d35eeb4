use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use crier_core::CrierConfig;
use crier_daemon::{SchedulerEngine, SystemClock};
use crier_provider::{FileContentSource, HttpPublisher, NullPublisher, Publisher};
use crier_store::{ItemKind, ItemStatus, NewItem, QueueStore};

#[derive(Parser)]
#[command(
    name = "crier",
    version,
    about = "Schedule social-media posts and comments from the command line"
)]
struct Cli {
    /// Config file path (default: ~/.crier/crier.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Queue a post for later publication.
    Post(ScheduleArgs),
    /// Queue a comment on a previously scheduled post.
    Comment(CommentArgs),
    /// List queued items.
    Queue {
        /// Only show items with this status (pending, published, failed).
        #[arg(long)]
        status: Option<String>,
    },
    /// Run the scheduling daemon until interrupted.
    Daemon {
        /// Override the poll interval in seconds.
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Process due items once and exit.
    RunOnce,
}

#[derive(Args)]
struct ScheduleArgs {
    /// Path to the content file.
    #[arg(long)]
    file: String,

    /// Target platform.
    #[arg(long, default_value = "linkedin")]
    provider: String,

    /// Acting account identifier.
    #[arg(long)]
    author: String,

    /// Publication time, RFC 3339 (e.g. 2026-08-06T18:30:00Z).
    #[arg(long)]
    at: String,
}

#[derive(Args)]
struct CommentArgs {
    #[command(flatten)]
    base: ScheduleArgs,

    /// uuid of the parent post.
    #[arg(long)]
    parent_uuid: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // config: explicit flag > CRIER_CONFIG env > ~/.crier/crier.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("CRIER_CONFIG").ok());
    let config = CrierConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({e}), using defaults");
        CrierConfig::default()
    });

    // A corrupt store is fatal up front: better to refuse than to run
    // against a partial queue.
    let store = Arc::new(
        QueueStore::open(&config.database.path)
            .with_context(|| format!("opening queue store at {}", config.database.path))?,
    );

    match cli.command {
        Command::Post(args) => schedule_item(&store, ItemKind::Post, args, None),
        Command::Comment(args) => {
            schedule_item(&store, ItemKind::Comment, args.base, Some(args.parent_uuid))
        }
        Command::Queue { status } => list_queue(&store, status.as_deref()),
        Command::Daemon { interval } => run_daemon(store, &config, interval).await,
        Command::RunOnce => {
            build_engine(store, &config, None).run_once().await?;
            Ok(())
        }
    }
}

fn schedule_item(
    store: &QueueStore,
    kind: ItemKind,
    args: ScheduleArgs,
    parent_uuid: Option<String>,
) -> anyhow::Result<()> {
    let publish_at = parse_at(&args.at)?;
    let item = store.create(NewItem {
        kind,
        provider: args.provider,
        author: args.author,
        content_ref: args.file,
        publish_at,
        parent_uuid,
        uuid: None,
    })?;
    println!(
        "{} {} scheduled for {}",
        item.kind,
        item.uuid,
        item.publish_at.to_rfc3339()
    );
    Ok(())
}

fn parse_at(s: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid --at time {s:?}; use RFC 3339, e.g. 2026-08-06T18:30:00Z"))
}

fn list_queue(store: &QueueStore, status: Option<&str>) -> anyhow::Result<()> {
    let filter = status
        .map(|s| s.parse::<ItemStatus>().map_err(|e| anyhow::anyhow!(e)))
        .transpose()?;

    for item in store
        .list_all()?
        .iter()
        .filter(|i| filter.map_or(true, |f| i.status == f))
    {
        let note = match (&item.blocked_reason, &item.external_id) {
            (Some(reason), _) => format!("  [{reason}]"),
            (None, Some(id)) => format!("  -> {id}"),
            (None, None) => String::new(),
        };
        println!(
            "{}  {:<7}  {:<9}  {}  {}{}",
            item.uuid,
            item.kind,
            item.status,
            item.publish_at.to_rfc3339(),
            item.content_ref,
            note
        );
    }
    Ok(())
}

fn build_publisher(config: &CrierConfig) -> Arc<dyn Publisher> {
    match &config.publisher.endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "using HTTP publisher");
            Arc::new(HttpPublisher::new(
                endpoint.clone(),
                config.publisher.token.clone(),
            ))
        }
        None => {
            warn!("no publisher configured — due items will fail until publisher.endpoint is set");
            Arc::new(NullPublisher)
        }
    }
}

fn build_engine(
    store: Arc<QueueStore>,
    config: &CrierConfig,
    interval_override: Option<u64>,
) -> SchedulerEngine {
    let interval =
        Duration::from_secs(interval_override.unwrap_or(config.daemon.tick_interval_secs));
    SchedulerEngine::new(
        store,
        build_publisher(config),
        Arc::new(FileContentSource),
        Arc::new(SystemClock),
        interval,
    )
}

async fn run_daemon(
    store: Arc<QueueStore>,
    config: &CrierConfig,
    interval: Option<u64>,
) -> anyhow::Result<()> {
    let engine = build_engine(store, config, interval);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run(shutdown_rx).await;
    Ok(())
}

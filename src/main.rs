//! # GridWatch
//!
//! Watches worker nodes on distributed-computing platforms (GolemSP, Render
//! Network, AI-training providers) and reports status and job/payment
//! events over Telegram.
//!
//! Usage:
//!   gridwatch                      # Run bot + monitoring loop
//!   gridwatch status golem         # One-shot status check, no bot
//!   gridwatch config               # Print effective config (secrets masked)
//!   gridwatch -c ./gridwatch.toml  # Custom config file

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use gridwatch_channels::commands::Command;
use gridwatch_channels::{CommandRouter, TelegramChannel, format};
use gridwatch_core::{ChatTransport, GridWatchConfig, IncomingMessage, PlatformId};
use gridwatch_scheduler::{Dispatcher, EventHistory, Monitor, StatusCache, SubscriberRegistry, SubscriberStore};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gridwatch",
    version,
    about = "📡 GridWatch: worker-node monitor with Telegram notifications"
)]
struct Cli {
    /// Config file (default: ~/.gridwatch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the Telegram bot and the monitoring loop (default)
    Run,
    /// Fetch, parse and print one platform's status
    Status {
        /// golem, render or ai_training
        platform: PlatformId,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "gridwatch=debug,gridwatch_core=debug,gridwatch_platforms=debug,gridwatch_scheduler=debug,gridwatch_channels=debug"
    } else {
        "gridwatch=info,gridwatch_core=info,gridwatch_platforms=info,gridwatch_scheduler=info,gridwatch_channels=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Status { platform } => status_once(&config, platform).await,
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config.redacted())?);
            Ok(())
        }
    }
}

/// Defaults → TOML file → `.env` / environment.
fn load_config(path: Option<&PathBuf>) -> Result<GridWatchConfig> {
    if let Ok(env_file) = dotenvy::dotenv() {
        tracing::debug!("📄 Loaded {}", env_file.display());
    }

    let mut config = match path {
        Some(p) => GridWatchConfig::load_from(p)?,
        None => GridWatchConfig::load()?,
    };
    config.apply_env()?;
    Ok(config)
}

async fn status_once(config: &GridWatchConfig, platform: PlatformId) -> Result<()> {
    let adapters = gridwatch_platforms::create_adapters(config);
    let Some(adapter) = adapters.iter().find(|a| a.platform() == platform) else {
        bail!("{}", format::disabled(platform));
    };

    let raw = adapter
        .fetch()
        .await
        .with_context(|| format!("{platform} status unavailable"))?;
    let status = gridwatch_platforms::parse(platform, &raw)?;
    println!("{}", format::platform_status(&status));
    Ok(())
}

async fn run(config: GridWatchConfig) -> Result<()> {
    config.validate()?;

    let channel = Arc::new(TelegramChannel::new(config.telegram.clone()));
    match channel.get_me().await {
        Ok(me) => tracing::info!(
            "🤖 Telegram bot: @{} ({})",
            me.username.as_deref().unwrap_or("unknown"),
            me.first_name
        ),
        Err(e) => tracing::warn!("⚠️ Could not verify bot token: {e}"),
    }

    let registry = Arc::new(match config.monitoring.subscribers_file() {
        Some(path) => SubscriberRegistry::with_store(SubscriberStore::new(&path)),
        None => SubscriberRegistry::new(),
    });

    let adapters = gridwatch_platforms::create_adapters(&config);
    if adapters.is_empty() {
        tracing::warn!("⚠️ No platforms enabled; status commands will report them as disabled");
    }

    let transport: Arc<dyn ChatTransport> = channel.clone();
    let monitor = Arc::new(
        Monitor::new(
            adapters,
            Arc::new(StatusCache::new()),
            registry,
            Arc::new(EventHistory::new()),
        )
        .with_dispatcher(Dispatcher::new(transport)),
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = if config.monitoring.enabled {
        if !gridwatch_scheduler::seed_cache(&monitor, &mut ctrl_c).await {
            return Ok(());
        }
        Some(gridwatch_scheduler::spawn_scheduler(
            monitor.clone(),
            Duration::from_secs(config.monitoring.interval_secs),
            shutdown_rx,
        ))
    } else {
        tracing::info!("⏸️ Background monitoring disabled");
        None
    };

    let router = Arc::new(CommandRouter::new(monitor.clone(), config.telegram.allowed_chat_ids.clone()));
    let mut incoming = channel.clone().start_polling();

    println!("📡 GridWatch v{} running. Press Ctrl+C to stop.", env!("CARGO_PKG_VERSION"));

    loop {
        tokio::select! {
            msg = incoming.next() => {
                let Some(msg) = msg else {
                    tracing::warn!("⚠️ Telegram stream ended");
                    break;
                };
                let router = router.clone();
                let channel = channel.clone();
                tokio::spawn(async move { handle_message(&router, &channel, msg).await });
            }
            _ = &mut ctrl_c => {
                tracing::info!("🛑 Shutting down");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scheduler {
        handle.await.context("scheduler task panicked")?;
    }
    Ok(())
}

async fn handle_message(router: &CommandRouter, channel: &TelegramChannel, msg: IncomingMessage) {
    if router.is_allowed(msg.chat_id) && Command::parse(&msg.content).fetches_status() {
        let _ = channel.send_typing(msg.chat_id).await;
    }

    let Some(reply) = router.handle(&msg).await else {
        return;
    };
    if let Err(e) = channel
        .send_message(msg.chat_id, &reply.text, reply.keyboard.as_ref())
        .await
    {
        tracing::error!("❌ Reply to {} failed: {e}", msg.chat_id);
    }
}

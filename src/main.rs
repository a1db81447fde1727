use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use taskmirror::config::Config;
use taskmirror::logger;
use taskmirror::provider::google::GoogleTasksClient;
use taskmirror::scheduler::Scheduler;
use taskmirror::storage::LocalStorage;
use taskmirror::sync::{SyncService, SyncSettings};

#[derive(Parser)]
#[command(name = "taskmirror", version, about = "Keep local tasks in sync with Google Tasks")]
struct Cli {
    /// Path to a configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the recurring import and reconciliation jobs until interrupted
    Run,
    /// Import changes for one account right now
    SyncNow {
        /// Account UUID
        account: Uuid,
    },
    /// Write a default configuration file
    InitConfig {
        /// Destination path (defaults to the XDG config directory)
        path: Option<PathBuf>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig { path, force } = &cli.command {
        let path = match path {
            Some(path) => path.clone(),
            None => Config::get_default_config_path()?,
        };
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        return Config::generate_default_config(&path);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };
    logger::init(&config.logging)?;

    let storage = Arc::new(LocalStorage::new(&config.database_url()?).await?);
    let provider = GoogleTasksClient::from_config(&config.google, &config.sync)
        .context("Failed to set up the Google Tasks client")?;
    let service = Arc::new(SyncService::new(
        Arc::new(provider),
        storage,
        SyncSettings::from_config(&config),
    ));

    match cli.command {
        Command::Run => {
            let scheduler = Scheduler::from_config(&config.sync, service);
            scheduler.start();
            info!("🚀 taskmirror running with {} job(s), press Ctrl-C to stop", scheduler.runners().len());
            tokio::signal::ctrl_c().await?;
            scheduler.stop();
            info!("👋 Shutting down");
        }
        Command::SyncNow { account } => match service.sync_account_now(account).await {
            Ok(report) => println!("{}", report.summary()),
            Err(e) => {
                error!("❌ Sync for {account} failed: {e}");
                return Err(e.into());
            }
        },
        Command::InitConfig { .. } => {}
    }

    Ok(())
}

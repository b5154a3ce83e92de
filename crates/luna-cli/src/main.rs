//! Luna CLI - 陪伴助手记忆命令行工具

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use luna_core::ConfigStore;
use luna_memory::MemoryManager;

mod chat_cmd;
mod memory_cmd;

use memory_cmd::MemoryCommand;

#[derive(Parser)]
#[command(name = "luna")]
#[command(about = "Luna - memory toolkit for an AI companion", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, global = true, default_value = "config/default_config.json")]
    config: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Memory(MemoryCommand),
    /// Start an interactive session that records every turn as memory
    Chat {
        /// Number of earlier turns to replay before the prompt
        #[arg(long, default_value = "3")]
        history: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "luna=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = ConfigStore::load(cli.config.clone());
    if !config.validate() {
        info!("Configuration {} is incomplete, using defaults where missing", config.path().display());
    }

    let mut manager = MemoryManager::new(config.memory());
    manager.restore_from_index();

    match cli.command {
        Commands::Memory(command) => {
            command.execute(&mut manager)?;
        }
        Commands::Chat { history } => {
            chat_cmd::run(&mut manager, history).await?;
        }
    }

    Ok(())
}

mod db;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::db::DbCommands;

#[derive(Debug, Parser)]
#[command(name = "adsync-cli")]
#[command(about = "Operator tools for the ad campaign sync backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Pull an account's campaigns from Meta into the local store
    Sync {
        /// Email of the account to sync
        #[arg(long)]
        email: String,
        /// Only process the first N remote campaigns
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Check an account's stored Meta credentials
    Validate {
        /// Email of the account to check
        #[arg(long)]
        email: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("adsync-cli: run with --help to list commands");
        return Ok(());
    };

    let config = adsync_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool = adsync_db::connect_from_config(&config).await?;
    match command {
        Commands::Db { command } => db::run(&pool, command).await,
        Commands::Sync { email, limit } => sync::run_sync(&config, pool, &email, limit).await,
        Commands::Validate { email } => sync::run_validate(&config, pool, &email).await,
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    open_store, AuthCommand, ConfigCommand, DeleteCommand, FindCommand, InsertCommand,
    ListCommand, RefreshCommand, UpdateCommand,
};
use config::Config;

#[derive(Parser)]
#[command(name = "sheetdb")]
#[command(version)]
#[command(about = "Use a Google spreadsheet as a small document store", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in to or out of Google
    Auth(AuthCommand),

    /// List collections
    List(ListCommand),

    /// Find records
    Find(FindCommand),

    /// Insert records
    Insert(InsertCommand),

    /// Update a record
    Update(UpdateCommand),

    /// Delete records
    Delete(DeleteCommand),

    /// Reload collections from the spreadsheet
    Refresh(RefreshCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sheetdb=warn,sheetdb_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config)?;

    match cli.command {
        Some(Commands::Auth(cmd)) => {
            cmd.run(&config).await?;
        }
        Some(Commands::List(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(&store).await?;
        }
        Some(Commands::Find(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Insert(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Update(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Delete(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Refresh(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config)?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}

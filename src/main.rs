mod cli;
mod config;
mod error;
mod identity;
mod mapping;
mod model;
mod providers;
mod sync;
mod util;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Migrate ServiceNow tickets into Jira issues, once per ticket.
#[derive(Parser)]
#[command(name = "snow2jira", version)]
struct Cli {
    /// Config file (default: ~/.snow2jira/config.toml)
    #[arg(long, global = true, env = "SNOW2JIRA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the ServiceNow tables available for migration
    Tables,
    /// Show the records a migration would pick up
    Fetch {
        table: String,
        #[arg(long)]
        json: bool,
    },
    /// Fetch records from a table and create Jira issues for them
    Migrate {
        table: String,
        #[arg(long)]
        json: bool,
    },
    /// Print the ticket number to Jira issue table
    Mappings,
    /// Drop the stored mapping for one ticket so it migrates again
    Forget { collection: String, number: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays clean
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snow2jira=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Cli::parse();
    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Tables => cli::handle_tables(&config),
        Command::Fetch { table, json } => cli::handle_fetch(&config, &table, json).await?,
        Command::Migrate { table, json } => cli::handle_migrate(&config, &table, json).await?,
        Command::Mappings => cli::handle_mappings(&config).await?,
        Command::Forget { collection, number } => {
            cli::handle_forget(&config, &collection, &number).await?
        }
    }

    Ok(())
}

//! # argo-rag: operator commands
//!
//! Exports the observation tables, uploads them to the vector store, and asks
//! questions through either answer path without running the server.

mod ask;
mod ingest;

use anyhow::Result;
use argo_rag::config::{get_config, AppConfig};
use clap::{Parser, Subcommand};
use std::fs::File;
use tracing_subscriber::{fmt, EnvFilter};

// --- CLI Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a YAML config file. Defaults to `config.yml` when present.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Dump every table of a SQLite database to a JSON export
    Export(ingest::ExportArgs),
    /// Chunk, embed and upload an export to the vector store, resuming from the checkpoint
    Upload(ingest::UploadArgs),
    /// Answer from the vector store. Starts an interactive session without a question
    Ask(ask::AskArgs),
    /// Answer by generating and running a SQL query
    Sql(ask::SqlArgs),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Export(_) => "Export",
            Commands::Upload(_) => "Upload",
            Commands::Ask(_) => "Ask",
            Commands::Sql(_) => "Sql",
        }
    }
}

// --- Main Application Entry ---

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to a file so they do not interleave with answers on stdout.
    let log_file = File::create("argo-rag-cli.log")?;
    let subscriber = fmt::Subscriber::builder()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    if let Err(e) = dispatch(&cli).await {
        eprintln!("{} failed: {e:#}", cli.command.name());
        std::process::exit(1);
    }
    Ok(())
}

async fn dispatch(cli: &Cli) -> Result<()> {
    let config: AppConfig = get_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Export(args) => ingest::handle_export(args, &config).await,
        Commands::Upload(args) => ingest::handle_upload(args, &config).await,
        Commands::Ask(args) => ask::handle_ask(args, &config).await,
        Commands::Sql(args) => ask::handle_sql(args, &config).await,
    }
}

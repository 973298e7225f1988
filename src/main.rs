//! Command-line interface for teleport
//!
//! # Usage Examples
//!
//! ```bash
//! # Install DDL event triggers and row triggers for all configured targets
//! teleport --config teleport.yml install-triggers
//!
//! # Run the batcher until Ctrl+C
//! RUST_LOG=teleport=debug teleport --config teleport.yml batcher
//!
//! # Offline diff of two catalog snapshots
//! teleport diff --pre pre.json --post post.json --sql --target-expression 'public.*'
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use ddldiff::TargetExpression;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teleport::diff::{diff_files, render, Output};
use teleport::{setup_shutdown_handler, Batcher, Config};
use teleport_database::Database;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "teleport")]
#[command(about = "Replicates PostgreSQL schema changes to configured targets")]
#[command(long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, global = true, default_value = "teleport.yml", env = "TELEPORT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set up internal tables and batch waiting events until interrupted
    Batcher,

    /// Install DDL event triggers and row triggers on every table a target replicates
    InstallTriggers,

    /// Reconcile two catalog snapshot files
    Diff {
        /// Snapshot before the change (omit for pure creation)
        #[arg(long, value_name = "PATH")]
        pre: Option<PathBuf>,

        /// Snapshot after the change
        #[arg(long, value_name = "PATH")]
        post: PathBuf,

        /// Print rendered SQL instead of JSON actions
        #[arg(long)]
        sql: bool,

        /// Only keep actions matched by this expression (e.g. "public.*,audit.log")
        #[arg(long)]
        target_expression: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("teleport=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Batcher => run_batcher(&cli.config).await,
        Commands::InstallTriggers => run_install_triggers(&cli.config).await,
        Commands::Diff {
            pre,
            post,
            sql,
            target_expression,
        } => {
            let target = target_expression
                .as_deref()
                .map(TargetExpression::new)
                .transpose()
                .context("Invalid --target-expression")?;
            let actions = diff_files(pre.as_deref(), &post, target.as_ref())?;
            let output = if sql { Output::Sql } else { Output::Json };
            for line in render(&actions, output)? {
                println!("{line}");
            }
            Ok(())
        }
    }
}

async fn start_database(config: &Config) -> anyhow::Result<Database> {
    let db = &config.database;
    tracing::info!(
        "Connecting to {} ({}@{}:{}/{})",
        db.name,
        db.username,
        db.hostname,
        db.port,
        db.database
    );
    Database::start(db.name.as_str(), &db.connection_string())
        .await
        .with_context(|| format!("Failed to start database {}", db.name))
}

async fn run_batcher(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    let interval = config.batch_interval()?;
    let targets = config.target_expressions()?;

    let db = Arc::new(start_database(&config).await?);
    let batcher = Batcher::new(db, config.database.name.as_str(), targets);

    let shutdown = setup_shutdown_handler();
    batcher.watch(interval, shutdown).await;
    tracing::info!("Batcher stopped");
    Ok(())
}

async fn run_install_triggers(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(config_path)?;
    if config.targets.is_empty() {
        anyhow::bail!("No targets configured in {}", config_path.display());
    }

    let combined = config
        .targets
        .values()
        .map(|t| t.target_expression.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let expression = TargetExpression::new(&combined).context("Invalid target expressions")?;

    let db = start_database(&config).await?;
    let installed = db
        .install_triggers(&expression)
        .await
        .context("Failed to install triggers")?;
    tracing::info!("Installed row triggers on {installed} table(s)");
    Ok(())
}

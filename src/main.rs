// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use repo_insight::utils::logging::{format_error, format_info, format_success};
use repo_insight::{
    mcp::RepoInsightMcp, open_store, tools, Config, GithubClient, IngestionOrchestrator,
    ProgressTracker,
};
use rmcp::serve_server;
use rmcp::transport::io::stdio;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "repo_insight")]
#[command(version = "0.1.0")]
#[command(about = "GitHub repository intelligence with MCP query tools", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a GitHub user's public repositories into the local store
    Ingest {
        #[arg(long)]
        user: String,

        #[arg(long, value_name = "NUM")]
        max_commits: Option<usize>,
    },

    /// Start MCP (Model Context Protocol) server for agentic tool integration
    Mcp {
        #[arg(long, default_value = "stdio")]
        transport: String,
    },

    /// Show the state of the most recent ingestion run for a user
    Status {
        #[arg(long)]
        user: String,
    },

    /// Show aggregate engineering metrics across a user's repos
    Stats {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    repo_insight::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Loading configuration from: {}", cli.config.display());
    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Ingest { user, max_commits } => {
            cmd_ingest(&config, &user, max_commits).await?;
        }
        Commands::Mcp { transport } => {
            cmd_mcp(&config, &transport).await?;
        }
        Commands::Status { user } => {
            cmd_status(&config, &user).await?;
        }
        Commands::Stats { user } => {
            cmd_stats(&config, &user).await?;
        }
    }

    Ok(())
}

async fn cmd_ingest(config: &Config, user: &str, max_commits: Option<usize>) -> Result<()> {
    info!("Starting ingestion for {user}");

    let mut ingestion = config.ingestion.clone();
    if let Some(max) = max_commits {
        ingestion.max_commits_per_repo = max;
    }

    let store = open_store(&config.storage)
        .await
        .context("Failed to open store")?;
    let client = GithubClient::new(&config.github, &ingestion)
        .context("Failed to build GitHub client")?;

    let orchestrator = IngestionOrchestrator::new(Arc::new(client), store, ingestion);
    let progress = ProgressTracker::new(0);

    match orchestrator.run(user, &progress).await {
        Ok(stats) => {
            progress.finish();
            println!(
                "{}",
                format_success(&format!(
                    "Ingested {} repos ({} signal rows, {} commits) in {}s",
                    stats.repos_processed,
                    stats.signals_computed,
                    stats.commits_ingested,
                    stats.duration_secs
                ))
            );
            Ok(())
        }
        Err(e) => {
            println!("{}", format_error(&format!("Ingestion failed: {e}")));
            Err(e.into())
        }
    }
}

async fn cmd_mcp(config: &Config, transport: &str) -> Result<()> {
    info!("Starting MCP server (transport: {transport})");

    if transport != "stdio" {
        return Err(anyhow::anyhow!("Unsupported transport: {transport}"));
    }

    let store = open_store(&config.storage)
        .await
        .context("Failed to open store")?;
    let client = GithubClient::new(&config.github, &config.ingestion)
        .context("Failed to build GitHub client")?;

    let server = RepoInsightMcp::new(store, Arc::new(client), config.ingestion.clone());

    // Logging stays on stderr; stdout carries the JSON-RPC stream.
    info!("MCP server ready on stdio");
    let (stdin, stdout) = stdio();
    let running = serve_server(server, (stdin, stdout))
        .await
        .context("Failed to start MCP server")?;
    let _ = running.waiting().await?;

    Ok(())
}

async fn cmd_status(config: &Config, user: &str) -> Result<()> {
    let store = open_store(&config.storage)
        .await
        .context("Failed to open store")?;

    let status = tools::ingestion_status(store.as_ref(), user).await?;
    if let Some(error) = status.get("error").and_then(|e| e.as_str()) {
        println!("{}", format_info(error));
    } else {
        println!("{}", serde_json::to_string_pretty(&status)?);
    }

    Ok(())
}

async fn cmd_stats(config: &Config, user: &str) -> Result<()> {
    let store = open_store(&config.storage)
        .await
        .context("Failed to open store")?;

    let metrics = tools::aggregate_repo_metrics(store.as_ref(), user).await?;
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    Ok(())
}

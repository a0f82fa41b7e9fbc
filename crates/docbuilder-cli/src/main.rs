//! DocBuilder CLI
//!
//! The `docbuilder` command drives one-shot builds and reports on
//! persisted state from the command line.
//!
//! ## Commands
//!
//! - `build`: run the pipeline once and exit with the build's status code
//! - `status`: print the persisted daemon/repository/build summary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docbuilder_build::{
    load_config, BuildRequest, GitVcsProvider, HugoSiteGenerator, MarkdownTransformPipeline,
    Orchestrator, TriggerSource,
};
use docbuilder_state::StateStore;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Level;

#[derive(Parser)]
#[command(name = "docbuilder")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental multi-repo documentation site builder", long_about = None)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, env = "DOCBUILDER_CONFIG", default_value = "docbuilder.yaml", global = true)]
    config: PathBuf,

    /// Directory for persisted state, clones, and generated content
    #[arg(long, env = "DOCBUILDER_DATA_DIR", default_value = ".docbuilder", global = true)]
    data_dir: PathBuf,

    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the build pipeline once
    Build {
        /// Re-run every repository regardless of the delta analysis
        #[arg(long)]
        force: bool,
    },
    /// Print a summary of persisted repositories, builds, and statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    docbuilder_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Build { force } => cmd_build(&cli.config, &cli.data_dir, force).await,
        Commands::Status => cmd_status(&cli.data_dir).await,
    }
}

async fn cmd_build(config_path: &PathBuf, data_dir: &PathBuf, force: bool) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let state = StateStore::open(data_dir.join("daemon-state.json"), env!("CARGO_PKG_VERSION"))
        .context("failed to open state store")?;

    let orchestrator = Orchestrator {
        repositories: config.repositories,
        build_config: config.build.clone(),
        workspace_root: data_dir.join("workspaces"),
        content_dir: data_dir.join("content"),
        output_dir: data_dir.join("public"),
        state,
        vcs: Arc::new(GitVcsProvider::new()),
        transform: Arc::new(MarkdownTransformPipeline::new()),
        site: Arc::new(HugoSiteGenerator::new(config.build.site_generator_binary.clone())),
    };

    let request = if force {
        BuildRequest::forced(TriggerSource::Cli)
    } else {
        BuildRequest::new(TriggerSource::Cli)
    };
    let cancel = CancellationToken::new();

    let report = orchestrator.run(&request, &cancel).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    std::process::exit(report.exit_code());
}

async fn cmd_status(data_dir: &PathBuf) -> Result<()> {
    let state = StateStore::open(data_dir.join("daemon-state.json"), env!("CARGO_PKG_VERSION"))
        .context("failed to open state store")?;

    let daemon = state.daemon_info().get()?;
    let repositories = state.repositories().list()?;
    let builds = state.builds().list()?;
    let statistics = state.statistics().get()?;

    let summary = serde_json::json!({
        "daemon": daemon,
        "repositories": repositories,
        "recent_builds": builds,
        "statistics": statistics,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

//! Handbook CLI
//!
//! Keeps the company document index in sync and answers employee questions
//! from it.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, StatusCommand, SyncCommand};
use handbook_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Handbook - role-aware answers from company documents
#[derive(Parser, Debug)]
#[command(name = "handbook")]
#[command(about = "Role-aware answers from company documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "HANDBOOK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "HANDBOOK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Completion provider (openai, ollama)
    #[arg(short, long, global = true, env = "HANDBOOK_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "HANDBOOK_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index new and modified documents
    Sync(SyncCommand),

    /// Ask a question as an employee with a given role
    Ask(AskCommand),

    /// Show what is indexed and what is pending
    Status(StatusCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.workspace, cli.config)?.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("Handbook CLI starting");
    tracing::debug!(workspace = ?config.workspace, documents = ?config.documents_root(), "Resolved paths");

    config.validate()?;
    config.ensure_handbook_dir()?;

    let command_name = match &cli.command {
        Commands::Sync(_) => "sync",
        Commands::Ask(_) => "ask",
        Commands::Status(_) => "status",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Sync(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Status(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(error = %e, "Command failed"),
    }

    result
}

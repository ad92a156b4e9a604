//! Support Desk CLI
//!
//! Main entry point for the `support` command-line tool.
//! Answers customer-support questions from the customer directory and the
//! policy document index.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, CustomersCommand, DocsCommand};
use support_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Support Desk CLI - answers grounded in customer records and policy documents
#[derive(Parser, Debug)]
#[command(name = "support")]
#[command(about = "Customer-support answers grounded in your own data", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SUPPORT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SUPPORT_CONFIG")]
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

    /// Synthesis provider (gemini, ollama)
    #[arg(short, long, global = true, env = "SUPPORT_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SUPPORT_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a single question
    Ask(AskCommand),

    /// Answer questions read line by line from stdin
    Chat(ChatCommand),

    /// Manage the policy document index
    Docs(DocsCommand),

    /// Manage the customer directory
    Customers(CustomersCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load base configuration, then re-read YAML if the CLI moved it
    let mut config = AppConfig::load()?;
    if cli.workspace.is_some() || cli.config.is_some() {
        config = config.relocate(cli.workspace.clone(), cli.config.clone())?;
    }

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Support Desk CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Ensure .support directory exists
    config.ensure_support_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Chat(_) => "chat",
        Commands::Docs(_) => "docs",
        Commands::Customers(_) => "customers",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Docs(cmd) => cmd.execute(&config).await,
        Commands::Customers(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}

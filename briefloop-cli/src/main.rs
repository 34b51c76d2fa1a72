mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{brief::BriefCommands, brief_handlers, handlers, workflow::WorkflowCommands, workflow_handlers};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "briefloop")]
#[command(version)]
#[command(about = "Staged video-brief generation with human approval checkpoints")]
#[command(
    help_template = "{name} - {version}\n{about}\n\n{usage-heading}\n  {usage}\n\n{all-args}{options}\n"
)]
struct Cli {
    /// Path to configuration file (default: ~/.config/briefloop/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding workflow files, overriding the configured one
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Workflow(WorkflowCommands),

    /// Single-shot briefs, generated in one call without stages or approvals
    Brief {
        #[command(subcommand)]
        command: BriefCommands,
    },

    /// Start the HTTP API server
    ///
    /// Examples:
    ///   briefloop serve
    ///   briefloop serve --host 0.0.0.0 --port 9090
    Serve {
        /// Server bind address (default: from configuration)
        #[arg(long)]
        host: Option<String>,

        /// Server port number (default: from configuration)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show or initialize configuration
    Config {
        /// Start interactive configuration setup
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli::resolve_config_path(cli.config.clone())?;

    // config --init must work even when the existing file is broken
    if let Commands::Config { init: true } = cli.command {
        return handlers::handle_config_init(&config_path).await;
    }

    let config = cli::load_configuration(&config_path, cli.data_dir.clone())?;
    briefloop_core::services::logging::init_logging(config.log_level)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    tracing::debug!(
        config = %config_path.display(),
        data_dir = %config.data_dir.display(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Workflow(command) => {
            workflow_handlers::handle_workflow_command(command, &config, cli.json).await?;
        }
        Commands::Brief { command } => {
            brief_handlers::handle_brief_command(command, &config, cli.json).await?;
        }
        Commands::Serve { host, port } => {
            handlers::handle_serve(&config, host, port).await?;
        }
        Commands::Config { .. } => {
            handlers::handle_config_show(&config, &config_path, cli.json)?;
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use parley_core::config::ChatConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - terminal client for long-polled agent chat sessions", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log info-level lifecycle events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Config file (defaults to ~/.config/parley/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, global = true)]
    server: Option<String>,

    /// Existing session to attach to
    #[arg(long, global = true)]
    session: Option<String>,

    /// Agent to create a session with on the first message
    #[arg(long, global = true)]
    agent: Option<String>,

    /// Display name for the agent, skipping the backend lookup
    #[arg(long, global = true)]
    agent_name: Option<String>,

    /// Customer id attached to created sessions
    #[arg(long, global = true)]
    customer: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat
    Chat,
    /// Follow an existing session without sending
    Tail,
}

impl ConnectionArgs {
    /// File, then environment, then flags.
    fn load_config(&self) -> Result<ChatConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = ChatConfig::from_path(path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))?;
                config.apply_env();
                config
            }
            None => ChatConfig::load_default().context("Failed to load config")?,
        };

        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(session) = &self.session {
            config.session_id = Some(session.clone());
        }
        if let Some(agent) = &self.agent {
            config.agent_id = Some(agent.clone());
        }
        if let Some(agent_name) = &self.agent_name {
            config.agent_name = Some(agent_name.clone());
        }
        if let Some(customer) = &self.customer {
            config.customer_id = Some(customer.clone());
        }
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "warn,parley_core=info,parley_interaction=info,parley_application=info,parley_cli=info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.connection.load_config()?;

    match cli.command {
        Commands::Chat => commands::chat::run(config).await?,
        Commands::Tail => commands::tail::run(config).await?,
    }

    Ok(())
}

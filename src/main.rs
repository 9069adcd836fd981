//! Ozette - streaming chat client for Ollama
//!
//! Main entry point for the Ozette application.

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ozette::cli::{Cli, Commands, ModelCommand};
use ozette::commands;
use ozette::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        None | Some(Commands::Chat) => {
            tracing::info!("Starting interactive chat session");
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Some(Commands::Models { command }) => match command {
            ModelCommand::List => {
                commands::models::list_models(&config).await?;
                Ok(())
            }
        },
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ozette=debug" } else { "ozette=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

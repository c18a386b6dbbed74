//! chatshell - terminal chat client for hosted language models
//!
#![doc = "chatshell - terminal chat client for hosted language models"]
#![doc = "Main entry point for the chatshell application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatshell::cli::{Cli, Commands, ModelCommand};
use chatshell::commands;
use chatshell::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;
    config.report_missing_credentials();

    // Execute command
    match cli.command {
        Commands::Chat { model, temporary } => {
            tracing::info!("Starting interactive chat mode");
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            if temporary {
                tracing::debug!("Starting in temporary mode");
            }

            // Moves `config` into the handler (match arms are exclusive)
            commands::chat::run_chat(config, temporary).await?;
            Ok(())
        }
        Commands::Ask { prompt, model } => {
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            commands::ask::run_ask(config, prompt).await?;
            Ok(())
        }
        Commands::Models { command } => {
            tracing::info!("Starting model management command");
            match command {
                ModelCommand::List { json } => {
                    commands::models::list_models(&config, json).await?;
                    Ok(())
                }
            }
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `--verbose` selects debug output.
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "chatshell=debug"
    } else {
        "chatshell=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

//! Cisco CLI Expert
//!
#![doc = "Cisco CLI Expert - Cisco command documentation from hosted LLMs"]
#![doc = "Main entry point for the cliexpert binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cliexpert::cli::{Cli, Commands};
use cliexpert::commands;
use cliexpert::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat {
            provider,
            model,
            ephemeral,
        } => {
            if let Some(p) = &provider {
                tracing::debug!("Using provider override: {}", p);
            }
            if let Some(m) = &model {
                tracing::debug!("Using model override: {}", m);
            }
            commands::chat::run_chat(config, provider, model, ephemeral).await?;
            Ok(())
        }
        Commands::Ask {
            query,
            image,
            provider,
            model,
            force_search,
            json,
        } => {
            tracing::info!("Running one-shot lookup");
            let args = commands::ask::AskArgs {
                query,
                image,
                provider,
                model,
                force_search,
                json,
            };
            commands::ask::run_ask(config, args).await?;
            Ok(())
        }
        Commands::Serve {
            provider,
            host,
            port,
        } => {
            tracing::info!("Starting proxy server");
            commands::serve::run_serve(config, provider, host, port).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::info!("Starting history command");
            commands::history::handle_history(&config, command)?;
            Ok(())
        }
        Commands::Speak {
            text,
            provider,
            output,
        } => {
            tracing::info!("Synthesizing speech");
            commands::speak::run_speak(config, text, provider, output).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `cliexpert=info`, or
/// `cliexpert=debug` with `--verbose`.
fn init_tracing(verbose: bool, json_logs: bool) {
    let default_level = if verbose {
        "cliexpert=debug"
    } else {
        "cliexpert=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

use clap::Parser;
use config::ConfigError;
use lazy_onboard::adapters::{start_api_server, PostgresStore};
use lazy_onboard::cli::{self, Cli, Commands};
use lazy_onboard::config::AppConfig;
use lazy_onboard::error::{OnboardError, Result};
use std::net::SocketAddr;
use tracing::info;

mod main_runtime;

use main_runtime::{build_state, init_logging, init_logging_simple, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config)?;
    if let Err(errors) = config.validate() {
        for e in &errors {
            eprintln!("\x1b[31m✗ {}\x1b[0m", e);
        }
        return Err(OnboardError::Config(ConfigError::Message(errors.join("; "))));
    }

    match cli.command_or_default() {
        Commands::Serve { memory, port } => {
            init_logging(&config.logging);
            info!(config = ?config.telegram, "Starting lazy-onboard");

            let state = build_state(&config, memory).await?;
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", config.server.host, port)
                .parse()
                .map_err(|e| OnboardError::Internal(format!("invalid bind address: {}", e)))?;

            start_api_server(state, addr, shutdown_signal()).await?;
            info!("Shutdown complete");
        }
        Commands::Migrate => {
            init_logging_simple();
            let store =
                PostgresStore::new(&config.database.url, config.database.max_connections).await?;
            store.migrate().await?;
            println!("\x1b[32m✓ Migrations applied\x1b[0m");
        }
        Commands::Status { wallet } => {
            init_logging_simple();
            let state = build_state(&config, false).await?;
            let status = state.step_resolver.status_for(&wallet).await?;
            cli::print_status(&wallet, &status);
        }
        Commands::LinkCode { wallet } => {
            init_logging_simple();
            let state = build_state(&config, false).await?;
            let outcome = state.link_broker.generate_code_for(&wallet).await?;
            cli::print_link_code(&outcome);
        }
    }

    Ok(())
}

use brighttimes_client::cli::Cli;
use brighttimes_client::{ClientError, ClientState, Settings};
use clap::Parser;
use dotenv::dotenv;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenv().ok();

    let cli = Cli::parse();

    let mut config = match Settings::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(api_url) = cli.api_url.clone() {
        config.api.base_url = api_url;
    }

    // Initialize logging; stdout is reserved for command output
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Using backend at {}", config.api.base_url);

    let state = match ClientState::new(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.execute(&state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClientError::LoginRequired(reason)) => {
            eprintln!(
                "Your session has ended ({}). Log in again with `brighttimes login`.",
                reason
            );
            ExitCode::FAILURE
        }
        Err(e) if e.requires_login() => {
            eprintln!("Not authorized. Log in again with `brighttimes login`.");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

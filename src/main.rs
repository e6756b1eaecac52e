mod cli;
mod commands;

use archivist::config::Config;
use archivist::observability::init_tracing;
use clap::Parser;
use cli::Cli;
use std::process::ExitCode;

const INVALID_REQUEST_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from_path(path.clone()),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.telemetry.log_filter);

    match commands::run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.is_invalid_request() {
                ExitCode::from(INVALID_REQUEST_EXIT)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

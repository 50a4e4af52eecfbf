//! Engram CLI entry point.

use clap::Parser;

use engram::cli::{dispatch, handle_error, Cli};
use engram::infrastructure::config::ConfigLoader;
use engram::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = run(cli).await;
    if code != 0 {
        std::process::exit(code);
    }
}

/// Returns the exit code. The logger guard drops here so file logs flush
/// before the process exits.
async fn run(cli: Cli) -> i32 {
    let json = cli.json;

    let config = match ConfigLoader::load() {
        Ok(config) => config,
        Err(err) => return handle_error(&err, json),
    };

    let _logger = match LoggerImpl::init(&LogConfig::from(&config.logging)) {
        Ok(logger) => logger,
        Err(err) => return handle_error(&err, json),
    };

    match dispatch(cli, config).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            handle_error(&err, json)
        }
    }
}

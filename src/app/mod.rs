mod config;
mod error;
mod logging;
pub mod report;
pub mod runtime;

use std::time::Duration;

use crate::adapters::porta_http::PortaApiClient;
use crate::adapters::usage_dump_file::UsageDumpFile;

pub use error::AppError;

use report::ConsoleReporter;
use runtime::{ThreadSleepPacer, ValidationRunner};

pub fn run() -> Result<(), AppError> {
    let dotenv_path = dotenvy::dotenv().ok();

    let config = config::AppConfig::from_env()?;
    logging::init(config.log_path.as_deref())?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        scope = ?config.scope,
        request_delay_ms = config.request_delay_ms,
        http_timeout_ms = config.http_timeout_ms,
        example_cap = config.example_cap,
        dotenv = ?dotenv_path,
        "validation bootstrap initialized"
    );

    let client = PortaApiClient::new(&config.api_config())?;
    let runner = ValidationRunner::new(
        client,
        ThreadSleepPacer,
        config.example_cap,
        Duration::from_millis(config.request_delay_ms),
    );

    runner.run(&mut ConsoleReporter)?;
    Ok(())
}

pub fn run_replay() -> Result<(), AppError> {
    let dotenv_path = dotenvy::dotenv().ok();

    let config = config::ReplayConfig::from_env()?;
    logging::init(config.log_path.as_deref())?;

    tracing::info!(
        dump_path = %config.dump_path,
        example_cap = config.example_cap,
        dotenv = ?dotenv_path,
        "replay bootstrap initialized"
    );

    let dump = UsageDumpFile::from_file(&config.dump_path)?;
    let runner = ValidationRunner::new(dump, ThreadSleepPacer, config.example_cap, Duration::ZERO);

    runner.run(&mut ConsoleReporter)?;
    Ok(())
}

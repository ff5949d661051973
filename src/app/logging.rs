use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt};

use crate::app::AppError;

/// Logs go to stderr, or to `log_path` when set, truncating any previous run.
pub fn init(log_path: Option<&str>) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_path {
        Some(path) => {
            let file = File::create(path).map_err(AppError::logging_init)?;
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(AppError::logging_init)
        }
        None => fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(AppError::logging_init),
    }
}

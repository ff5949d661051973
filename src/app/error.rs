use thiserror::Error;

use crate::adapters::source::SourceError;
use crate::app::runtime::RunError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("charger source failed: {0}")]
    Source(#[from] SourceError),
    #[error("validation run failed: {0}")]
    Run(#[from] RunError),
}

impl AppError {
    pub fn logging_init<E: std::fmt::Display>(error: E) -> Self {
        Self::LoggingInit(error.to_string())
    }

    pub fn config<E: std::fmt::Display>(error: E) -> Self {
        Self::Config(error.to_string())
    }
}

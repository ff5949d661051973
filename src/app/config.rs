use std::time::Duration;

use crate::adapters::porta_http::PortaApiConfig;
use crate::app::AppError;
use crate::domain::aggregation::DEFAULT_EXAMPLE_CAP;
use crate::domain::models::ChargerScope;

const DEFAULT_BASE_URL: &str = "https://api-stg.portacharging.com/v1";
const DEFAULT_REGION: &str = "california";
const DEFAULT_NETWORK: &str = "electrifyAmerica";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: String,
    pub scope: ChargerScope,
    pub request_delay_ms: u64,
    pub http_timeout_ms: u64,
    pub example_cap: usize,
    pub log_path: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(&lookup, "PORTA_API_KEY")
            .ok_or_else(|| AppError::config("PORTA_API_KEY is required"))?;

        Ok(Self {
            api_base_url: non_empty(&lookup, "PORTA_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            scope: parse_scope(&lookup)?,
            request_delay_ms: parse_or_default(&lookup, "REQUEST_DELAY_MS", 1000_u64)?,
            http_timeout_ms: parse_or_default(&lookup, "HTTP_TIMEOUT_MS", 10_000_u64)?,
            example_cap: parse_or_default(&lookup, "EXAMPLE_TIMESTAMP_CAP", DEFAULT_EXAMPLE_CAP)?,
            log_path: non_empty(&lookup, "VALIDATION_LOG_PATH"),
        })
    }

    pub fn api_config(&self) -> PortaApiConfig {
        PortaApiConfig {
            base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            scope: self.scope.clone(),
            timeout: Duration::from_millis(self.http_timeout_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub dump_path: String,
    pub example_cap: usize,
    pub log_path: Option<String>,
}

impl ReplayConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dump_path = non_empty(&lookup, "USAGE_DUMP_PATH")
            .ok_or_else(|| AppError::config("USAGE_DUMP_PATH is required"))?;

        Ok(Self {
            dump_path,
            example_cap: parse_or_default(&lookup, "EXAMPLE_TIMESTAMP_CAP", DEFAULT_EXAMPLE_CAP)?,
            log_path: non_empty(&lookup, "VALIDATION_LOG_PATH"),
        })
    }
}

fn parse_scope<F>(lookup: &F) -> Result<ChargerScope, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let charger_id = non_empty(lookup, "CHARGER_ID");
    let scope = non_empty(lookup, "CHARGER_SCOPE").map(|value| value.to_ascii_lowercase());

    match (scope.as_deref(), charger_id) {
        (Some("single"), Some(id)) | (None, Some(id)) => Ok(ChargerScope::Single(id)),
        (Some("single"), None) => Err(AppError::config(
            "CHARGER_ID is required when CHARGER_SCOPE is single",
        )),
        (Some("all"), _) => Ok(ChargerScope::All),
        (Some("region"), _) | (None, None) => Ok(ChargerScope::Region {
            region: non_empty(lookup, "CHARGER_REGION")
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            network: non_empty(lookup, "CHARGER_NETWORK")
                .unwrap_or_else(|| DEFAULT_NETWORK.to_string()),
        }),
        (Some(other), _) => Err(AppError::config(format!(
            "CHARGER_SCOPE must be all, region or single (got {other})"
        ))),
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or_default<T, F>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::config(format!("{key} must be a valid number"))),
        None => Ok(default),
    }
}

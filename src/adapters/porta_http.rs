use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::adapters::source::{
    ChargerSource, SourceError, UsageSource, parse_charger_listing, parse_usage_response,
};
use crate::domain::models::{Charger, ChargerScope, UsageBatch};

const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone)]
pub struct PortaApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub scope: ChargerScope,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PortaApiClient {
    http: Client,
    base_url: String,
    api_key: String,
    scope: ChargerScope,
}

impl PortaApiClient {
    pub fn new(config: &PortaApiConfig) -> Result<Self, SourceError> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            scope: config.scope.clone(),
        })
    }

    fn usages_url(&self, charger_id: &str) -> String {
        format!("{}/chargers/{charger_id}/usages", self.base_url)
    }

    fn get_json(&self, url: &str) -> Result<Value, SourceError> {
        let response = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.json::<Value>().map_err(SourceError::from)
    }
}

impl ChargerSource for PortaApiClient {
    fn list_chargers(&self) -> Result<Vec<Charger>, SourceError> {
        let url = match &self.scope {
            ChargerScope::Single(charger_id) => return Ok(vec![Charger::new(charger_id.clone())]),
            ChargerScope::All => format!("{}/chargers", self.base_url),
            ChargerScope::Region { region, network } => {
                format!("{}/chargers/{region}/{network}", self.base_url)
            }
        };

        let payload = self.get_json(&url)?;
        let chargers = parse_charger_listing(&payload)?;

        tracing::info!(url = %url, chargers = chargers.len(), "charger listing fetched");
        Ok(chargers)
    }
}

impl UsageSource for PortaApiClient {
    fn fetch_usages(&self, charger: &Charger) -> Result<UsageBatch, SourceError> {
        let url = self.usages_url(&charger.charger_id);
        let payload = self.get_json(&url)?;
        parse_usage_response(&payload)
    }
}

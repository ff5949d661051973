use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::models::{Charger, UsageBatch};
use crate::domain::usage_record::parse_charger_details;

pub trait ChargerSource {
    fn list_chargers(&self) -> Result<Vec<Charger>, SourceError>;
}

/// Records must come back in chronological order; the first one seen sets
/// the charger's stall baseline.
pub trait UsageSource {
    fn fetch_usages(&self, charger: &Charger) -> Result<UsageBatch, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read usage dump: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected payload: {0}")]
    InvalidPayload(String),
    #[error("unknown charger: {0}")]
    UnknownCharger(String),
    #[error("usage data unavailable: {0}")]
    Unavailable(String),
}

/// Accepts `{"chargerIds": [...]}` or `{"chargers": [{...}]}`.
pub fn parse_charger_listing(payload: &Value) -> Result<Vec<Charger>, SourceError> {
    let object = payload
        .as_object()
        .ok_or_else(|| SourceError::InvalidPayload("charger listing must be an object".into()))?;

    if let Some(ids) = object.get("chargerIds") {
        let ids = ids
            .as_array()
            .ok_or_else(|| SourceError::InvalidPayload("chargerIds must be an array".into()))?;
        return Ok(ids.iter().filter_map(charger_from_listing_entry).collect());
    }

    if let Some(chargers) = object.get("chargers") {
        let chargers = chargers
            .as_array()
            .ok_or_else(|| SourceError::InvalidPayload("chargers must be an array".into()))?;
        return Ok(chargers.iter().filter_map(charger_from_listing_entry).collect());
    }

    Err(SourceError::InvalidPayload(
        "charger listing has neither chargerIds nor chargers".into(),
    ))
}

/// Accepts `{"charger": {...}, "usageData": [...]}`; absent usage data is an
/// empty batch.
pub fn parse_usage_response(payload: &Value) -> Result<UsageBatch, SourceError> {
    let object = payload
        .as_object()
        .ok_or_else(|| SourceError::InvalidPayload("usage response must be an object".into()))?;

    let records = match object.get("usageData") {
        Some(Value::Array(records)) => records.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => {
            return Err(SourceError::InvalidPayload(
                "usageData must be an array".into(),
            ));
        }
    };

    Ok(UsageBatch {
        charger_details: object
            .get("charger")
            .and_then(parse_charger_details)
            .unwrap_or_default(),
        records,
    })
}

fn charger_from_listing_entry(entry: &Value) -> Option<Charger> {
    match entry {
        Value::String(id) => Some(Charger::new(id.trim())).filter(|c| !c.charger_id.is_empty()),
        Value::Number(id) => Some(Charger::new(id.to_string())),
        Value::Object(object) => charger_from_object(object),
        _ => None,
    }
}

fn charger_from_object(object: &Map<String, Value>) -> Option<Charger> {
    let charger_id = ["chargerId", "id"]
        .iter()
        .find_map(|key| match object.get(*key)? {
            Value::String(id) => Some(id.trim().to_string()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
        .filter(|id| !id.is_empty())?;

    let mut charger = Charger::new(charger_id);
    if let Some(details) = parse_charger_details(&Value::Object(object.clone())) {
        charger.merge_details(&details);
    }
    charger.expected_total_stalls = object.get("totalStalls").and_then(Value::as_i64);

    Some(charger)
}

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::models::ChargerDetails;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordTimestamp {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl RecordTimestamp {
    pub fn has_offset(&self) -> bool {
        matches!(self, Self::Zoned(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StallObservation {
    pub connector_statuses: Vec<i64>,
}

/// Connector status reported when the upstream network could not be queried.
pub const CONNECTOR_STATUS_UNKNOWN: i64 = -2;
pub const CONNECTOR_STATUS_AVAILABLE: i64 = 0;

impl StallObservation {
    /// Status of the first connector that carries real data, if any.
    pub fn known_status(&self) -> Option<i64> {
        self.connector_statuses
            .iter()
            .copied()
            .find(|status| *status != CONNECTOR_STATUS_UNKNOWN)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub timestamp: String,
    pub parsed_timestamp: RecordTimestamp,
    pub total_stalls: Option<i64>,
    pub total_stalls_inferred: bool,
    pub stalls_available: Option<i64>,
    pub timezone: Option<String>,
    pub stall_usage: Option<Vec<StallObservation>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordContext {
    pub expected_total_stalls: Option<i64>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("usage record must be a JSON object")]
    NotAnObject,
    #[error("usage record has no timestamp")]
    MissingTimestamp,
    #[error("usage record timestamp is not a valid ISO-8601 date-time: {0}")]
    InvalidTimestamp(String),
}

const TIMESTAMP_KEYS: &[&str] = &["timestamp", "time", "recordedAt"];
const TOTAL_STALLS_KEYS: &[&str] = &["totalStalls", "total_stalls"];
const STALLS_AVAILABLE_KEYS: &[&str] = &["stallsAvailable", "stalls_available"];
const TIMEZONE_KEYS: &[&str] = &["timezone", "timeZone", "tz"];
const STALL_USAGE_KEYS: &[&str] = &["stallUsage", "stall_usage"];
const CONNECTORS_KEYS: &[&str] = &["connectors"];
const STATUS_KEYS: &[&str] = &["status"];

const NAME_KEYS: &[&str] = &["name", "chargerName", "title"];
const LOCATION_KEYS: &[&str] = &["location", "address", "city"];
const PRICING_KEYS: &[&str] = &["pricing"];

// Zoned and naive lists cover the same precisions.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%d %H:%M%z",
];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn normalize_usage_record(
    payload: &Value,
    context: &RecordContext,
) -> Result<NormalizedRecord, MalformedRecordError> {
    let object = payload
        .as_object()
        .ok_or(MalformedRecordError::NotAnObject)?;

    let raw_timestamp =
        find_value(object, TIMESTAMP_KEYS).ok_or(MalformedRecordError::MissingTimestamp)?;
    let timestamp = match raw_timestamp {
        Value::String(text) => text.trim().to_string(),
        Value::Null => return Err(MalformedRecordError::MissingTimestamp),
        other => return Err(MalformedRecordError::InvalidTimestamp(other.to_string())),
    };
    let parsed_timestamp = parse_timestamp(&timestamp)
        .ok_or_else(|| MalformedRecordError::InvalidTimestamp(timestamp.clone()))?;

    let reported_total = find_integer(object, TOTAL_STALLS_KEYS);
    let (total_stalls, total_stalls_inferred) = match reported_total {
        Some(value) => (Some(value), false),
        None => (
            context.expected_total_stalls,
            context.expected_total_stalls.is_some(),
        ),
    };

    let timezone = find_value(object, TIMEZONE_KEYS)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string);

    Ok(NormalizedRecord {
        timestamp,
        parsed_timestamp,
        total_stalls,
        total_stalls_inferred,
        stalls_available: find_integer(object, STALLS_AVAILABLE_KEYS),
        timezone,
        stall_usage: find_value(object, STALL_USAGE_KEYS)
            .and_then(Value::as_array)
            .map(|stalls| stalls.iter().map(parse_stall).collect()),
    })
}

/// Reads the `charger` object that accompanies a usage response.
pub fn parse_charger_details(payload: &Value) -> Option<ChargerDetails> {
    let object = payload.as_object()?;

    Some(ChargerDetails {
        name: find_text(object, NAME_KEYS),
        location: find_location(object),
        has_pricing: find_value(object, PRICING_KEYS).is_some(),
    })
}

pub fn parse_timestamp(text: &str) -> Option<RecordTimestamp> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(RecordTimestamp::Zoned(zoned));
    }

    let utc_spelled_out = text
        .strip_suffix(['Z', 'z'])
        .map(|rest| format!("{rest}+00:00"));
    let zoned_text = utc_spelled_out.as_deref().unwrap_or(text);

    for format in OFFSET_FORMATS {
        if let Ok(zoned) = DateTime::parse_from_str(zoned_text, format) {
            return Some(RecordTimestamp::Zoned(zoned));
        }
    }

    NAIVE_FORMATS.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(RecordTimestamp::Naive)
    })
}

fn parse_stall(stall: &Value) -> StallObservation {
    let connector_statuses = stall
        .as_object()
        .and_then(|object| find_value(object, CONNECTORS_KEYS))
        .and_then(Value::as_array)
        .map(|connectors| {
            connectors
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|connector| find_integer(connector, STATUS_KEYS))
                .collect()
        })
        .unwrap_or_default();

    StallObservation { connector_statuses }
}

fn find_location(object: &Map<String, Value>) -> Option<String> {
    match find_value(object, LOCATION_KEYS)? {
        Value::String(text) => Some(text.trim().to_string()).filter(|text| !text.is_empty()),
        Value::Object(nested) => {
            let parts: Vec<String> = ["address", "city", "state"]
                .iter()
                .filter_map(|key| find_text(nested, &[*key]))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn find_text(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    find_value(object, aliases)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn find_integer(object: &Map<String, Value>, aliases: &[&str]) -> Option<i64> {
    find_value(object, aliases).and_then(parse_i64)
}

fn find_value<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    for alias in aliases {
        if let Some(value) = object.get(*alias) {
            return Some(value);
        }
    }

    let normalized_aliases: Vec<String> =
        aliases.iter().map(|alias| normalize_key(alias)).collect();

    object.iter().find_map(|(key, value)| {
        let normalized_key = normalize_key(key);
        if normalized_aliases
            .iter()
            .any(|alias| alias == &normalized_key)
        {
            Some(value)
        } else {
            None
        }
    })
}

fn normalize_key(value: &str) -> String {
    value
        .chars()
        .filter(|char| char.is_ascii_alphanumeric())
        .flat_map(|char| char.to_lowercase())
        .collect()
}

fn parse_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|value| {
                    value.fract() == 0.0 && *value >= i64::MIN as f64 && *value < i64::MAX as f64
                })
                .map(|value| value as i64)
        }),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

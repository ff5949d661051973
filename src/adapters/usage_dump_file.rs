use std::fs;
use std::io;

use serde::Deserialize;
use serde_json::Value;

use crate::adapters::source::{ChargerSource, SourceError, UsageSource};
use crate::domain::models::{Charger, UsageBatch};
use crate::domain::usage_record::parse_charger_details;

#[derive(Debug, Clone, Deserialize)]
struct DumpFile {
    chargers: Vec<DumpCharger>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DumpCharger {
    charger_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    expected_total_stalls: Option<i64>,
    #[serde(default)]
    charger: Option<Value>,
    #[serde(default)]
    usage_data: Vec<Value>,
    /// Simulates a failed usage fetch for this charger.
    #[serde(default)]
    error: Option<String>,
}

/// Replays a captured API run from disk, one entry per charger in file order.
#[derive(Debug)]
pub struct UsageDumpFile {
    dump: DumpFile,
}

impl UsageDumpFile {
    pub fn from_file(path: &str) -> Result<Self, SourceError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SourceError> {
        let dump: DumpFile = serde_json::from_str(content)?;

        if dump.chargers.is_empty() {
            return Err(SourceError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "usage dump must contain at least one charger",
            )));
        }

        Ok(Self { dump })
    }

    fn find(&self, charger_id: &str) -> Option<&DumpCharger> {
        self.dump
            .chargers
            .iter()
            .find(|entry| entry.charger_id == charger_id)
    }
}

impl ChargerSource for UsageDumpFile {
    fn list_chargers(&self) -> Result<Vec<Charger>, SourceError> {
        Ok(self
            .dump
            .chargers
            .iter()
            .map(|entry| Charger {
                charger_id: entry.charger_id.clone(),
                name: entry.name.clone(),
                location: entry.location.clone(),
                expected_total_stalls: entry.expected_total_stalls,
            })
            .collect())
    }
}

impl UsageSource for UsageDumpFile {
    fn fetch_usages(&self, charger: &Charger) -> Result<UsageBatch, SourceError> {
        let entry = self
            .find(&charger.charger_id)
            .ok_or_else(|| SourceError::UnknownCharger(charger.charger_id.clone()))?;

        if let Some(error) = &entry.error {
            return Err(SourceError::Unavailable(error.clone()));
        }

        Ok(UsageBatch {
            charger_details: entry
                .charger
                .as_ref()
                .and_then(parse_charger_details)
                .unwrap_or_default(),
            records: entry.usage_data.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charger {
    pub charger_id: String,
    pub name: String,
    pub location: String,
    pub expected_total_stalls: Option<i64>,
}

impl Charger {
    pub fn new(charger_id: impl Into<String>) -> Self {
        Self {
            charger_id: charger_id.into(),
            name: String::new(),
            location: String::new(),
            expected_total_stalls: None,
        }
    }

    /// Fills empty identity fields from the details returned alongside usages.
    pub fn merge_details(&mut self, details: &ChargerDetails) {
        if self.name.is_empty()
            && let Some(name) = &details.name
        {
            self.name = name.clone();
        }
        if self.location.is_empty()
            && let Some(location) = &details.location
        {
            self.location = location.clone();
        }
    }
}

/// Which chargers a run covers. Filtering happens at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargerScope {
    All,
    Region { region: String, network: String },
    Single(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargerDetails {
    pub name: Option<String>,
    pub location: Option<String>,
    pub has_pricing: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UsageBatch {
    /// Defaults to no pricing when the response carries no `charger` object.
    pub charger_details: ChargerDetails,
    pub records: Vec<serde_json::Value>,
}

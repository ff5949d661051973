use std::fmt;

use chrono_tz::Tz;

use crate::domain::usage_record::{CONNECTOR_STATUS_AVAILABLE, NormalizedRecord};

/// Placeholder timestamp for findings that belong to the charger, not a record.
pub const CHARGER_LEVEL_TIMESTAMP: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleName {
    TimezoneMissing,
    InvalidTimezone,
    StallsAvailableMismatch,
    TotalStallsMismatch,
    ConnectorAvailabilityMismatch,
    StallCountMismatch,
    PricingMissing,
}

impl RuleName {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::TimezoneMissing => "Timezone Missing",
            Self::InvalidTimezone => "Invalid Timezone",
            Self::StallsAvailableMismatch => "Stalls Available Mismatch",
            Self::TotalStallsMismatch => "Total Stalls Mismatch",
            Self::ConnectorAvailabilityMismatch => "Connector Availability Mismatch",
            Self::StallCountMismatch => "Stall Count Mismatch",
            Self::PricingMissing => "Pricing Missing",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule: RuleName,
    pub timestamp: String,
    pub charger_id: String,
    pub detail: String,
}

impl Finding {
    fn for_record(
        rule: RuleName,
        record: &NormalizedRecord,
        charger_id: &str,
        detail: String,
    ) -> Self {
        Self {
            rule,
            timestamp: record.timestamp.clone(),
            charger_id: charger_id.to_string(),
            detail,
        }
    }

    pub fn pricing_missing(charger_id: &str) -> Self {
        Self {
            rule: RuleName::PricingMissing,
            timestamp: CHARGER_LEVEL_TIMESTAMP.to_string(),
            charger_id: charger_id.to_string(),
            detail: "charger has no pricing object".to_string(),
        }
    }
}

/// Expectations accumulated across one charger's time series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChargerState {
    baseline_total_stalls: Option<i64>,
}

impl ChargerState {
    pub fn with_expected_total_stalls(expected: Option<i64>) -> Self {
        Self {
            baseline_total_stalls: expected.filter(|value| *value >= 0),
        }
    }

    pub fn baseline_total_stalls(&self) -> Option<i64> {
        self.baseline_total_stalls
    }

    /// The first valid reported `totalStalls` becomes the baseline; later
    /// records never move it.
    pub fn observe(&mut self, record: &NormalizedRecord) {
        if self.baseline_total_stalls.is_some() || record.total_stalls_inferred {
            return;
        }
        self.baseline_total_stalls = record.total_stalls.filter(|value| *value >= 0);
    }
}

pub trait ValidationRule: Send + Sync {
    fn name(&self) -> RuleName;

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding>;
}

pub struct TimezoneMissingRule;

impl ValidationRule for TimezoneMissingRule {
    fn name(&self) -> RuleName {
        RuleName::TimezoneMissing
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        _state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        if record.parsed_timestamp.has_offset() {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!("timestamp {} has no UTC offset", record.timestamp),
        )]
    }
}

pub struct InvalidTimezoneRule;

impl ValidationRule for InvalidTimezoneRule {
    fn name(&self) -> RuleName {
        RuleName::InvalidTimezone
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        _state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        let Some(timezone) = record.timezone.as_deref() else {
            return Vec::new();
        };

        if timezone.parse::<Tz>().is_ok() {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!("'{timezone}' is not an IANA timezone"),
        )]
    }
}

pub struct StallsAvailableRule;

impl ValidationRule for StallsAvailableRule {
    fn name(&self) -> RuleName {
        RuleName::StallsAvailableMismatch
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        _state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        let (Some(available), Some(total)) = (record.stalls_available, record.total_stalls) else {
            return Vec::new();
        };

        if (0..=total).contains(&available) {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!("reported {available} available, outside [0, {total}]"),
        )]
    }
}

pub struct TotalStallsBaselineRule;

impl ValidationRule for TotalStallsBaselineRule {
    fn name(&self) -> RuleName {
        RuleName::TotalStallsMismatch
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        if record.total_stalls_inferred {
            return Vec::new();
        }

        let (Some(reported), Some(baseline)) =
            (record.total_stalls, state.baseline_total_stalls())
        else {
            return Vec::new();
        };

        if reported == baseline {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!("reported {reported}, baseline {baseline}"),
        )]
    }
}

/// Stall availability recomputed from connector statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ConnectorTally {
    known_stalls: i64,
    available_stalls: i64,
}

fn tally_connectors(record: &NormalizedRecord) -> Option<ConnectorTally> {
    let stalls = record.stall_usage.as_ref()?;

    let mut tally = ConnectorTally {
        known_stalls: 0,
        available_stalls: 0,
    };
    for status in stalls.iter().filter_map(|stall| stall.known_status()) {
        tally.known_stalls += 1;
        if status == CONNECTOR_STATUS_AVAILABLE {
            tally.available_stalls += 1;
        }
    }

    // every connector unknown: upstream data unavailable
    (tally.known_stalls > 0).then_some(tally)
}

pub struct ConnectorAvailabilityRule;

impl ValidationRule for ConnectorAvailabilityRule {
    fn name(&self) -> RuleName {
        RuleName::ConnectorAvailabilityMismatch
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        _state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        let Some(tally) = tally_connectors(record) else {
            return Vec::new();
        };
        let Some(reported) = record.stalls_available else {
            return Vec::new();
        };

        if reported == tally.available_stalls {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!(
                "reported {reported} available, connectors show {}",
                tally.available_stalls
            ),
        )]
    }
}

pub struct StallCountRule;

impl ValidationRule for StallCountRule {
    fn name(&self) -> RuleName {
        RuleName::StallCountMismatch
    }

    fn evaluate(
        &self,
        record: &NormalizedRecord,
        _state: &ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        if record.total_stalls_inferred {
            return Vec::new();
        }
        let Some(tally) = tally_connectors(record) else {
            return Vec::new();
        };
        let Some(reported) = record.total_stalls else {
            return Vec::new();
        };

        if reported == tally.known_stalls {
            return Vec::new();
        }

        vec![Finding::for_record(
            self.name(),
            record,
            charger_id,
            format!(
                "reported {reported} stalls, connectors show {}",
                tally.known_stalls
            ),
        )]
    }
}

pub struct RuleEngine {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleEngine {
    pub fn new(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    /// Fixed rule order; it decides which example timestamps are kept first.
    pub fn standard() -> Self {
        Self::new(vec![
            Box::new(TimezoneMissingRule),
            Box::new(InvalidTimezoneRule),
            Box::new(StallsAvailableRule),
            Box::new(TotalStallsBaselineRule),
            Box::new(ConnectorAvailabilityRule),
            Box::new(StallCountRule),
        ])
    }

    pub fn rule_names(&self) -> Vec<RuleName> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Runs every rule against the record, then folds the record into the
    /// charger state.
    pub fn evaluate(
        &self,
        record: &NormalizedRecord,
        state: &mut ChargerState,
        charger_id: &str,
    ) -> Vec<Finding> {
        let findings = self
            .rules
            .iter()
            .flat_map(|rule| rule.evaluate(record, state, charger_id))
            .collect();

        state.observe(record);

        findings
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::standard()
    }
}

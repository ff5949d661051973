use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::models::{Charger, ChargerDetails};
use crate::domain::rules::{ChargerState, Finding, RuleEngine, RuleName};
use crate::domain::usage_record::{MalformedRecordError, RecordContext, normalize_usage_record};

pub const DEFAULT_EXAMPLE_CAP: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTally {
    pub occurrences: usize,
    pub example_timestamps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargerReport {
    pub charger_id: String,
    pub name: String,
    pub location: String,
    pub docs_processed: usize,
    pub records_skipped: usize,
    pub total_errors: usize,
    pub errors_by_rule: BTreeMap<RuleName, RuleTally>,
    pub fetch_error: Option<String>,
}

impl ChargerReport {
    pub fn occurrences(&self, rule: RuleName) -> usize {
        self.errors_by_rule
            .get(&rule)
            .map_or(0, |tally| tally.occurrences)
    }

    pub fn examples(&self, rule: RuleName) -> &[String] {
        self.errors_by_rule
            .get(&rule)
            .map(|tally| tally.example_timestamps.as_slice())
            .unwrap_or_default()
    }
}

/// Running tallies for one charger. Only `finalize` produces a readable report.
#[derive(Debug, Clone)]
pub struct ChargerAccumulator {
    charger: Charger,
    example_cap: usize,
    docs_processed: usize,
    records_skipped: usize,
    errors_by_rule: BTreeMap<RuleName, RuleTally>,
    fetch_error: Option<String>,
}

impl ChargerAccumulator {
    pub fn new(charger: Charger, example_cap: usize) -> Self {
        Self {
            charger,
            example_cap,
            docs_processed: 0,
            records_skipped: 0,
            errors_by_rule: BTreeMap::new(),
            fetch_error: None,
        }
    }

    pub fn record_processed(&mut self, findings: &[Finding]) {
        self.docs_processed += 1;
        for finding in findings {
            self.add_finding(finding);
        }
    }

    pub fn record_skipped(&mut self) {
        self.records_skipped += 1;
    }

    /// Findings about the charger itself; they do not count as documents.
    pub fn record_charger_finding(&mut self, finding: &Finding) {
        self.add_finding(finding);
    }

    pub fn mark_fetch_failed(&mut self, reason: impl Into<String>) {
        self.fetch_error = Some(reason.into());
    }

    pub fn merge_details(&mut self, details: &ChargerDetails) {
        self.charger.merge_details(details);
    }

    pub fn finalize(self) -> ChargerReport {
        let total_errors = self
            .errors_by_rule
            .values()
            .map(|tally| tally.occurrences)
            .sum();

        ChargerReport {
            charger_id: self.charger.charger_id,
            name: self.charger.name,
            location: self.charger.location,
            docs_processed: self.docs_processed,
            records_skipped: self.records_skipped,
            total_errors,
            errors_by_rule: self.errors_by_rule,
            fetch_error: self.fetch_error,
        }
    }

    fn add_finding(&mut self, finding: &Finding) {
        let tally = self.errors_by_rule.entry(finding.rule).or_default();
        tally.occurrences += 1;
        if tally.example_timestamps.len() < self.example_cap {
            tally.example_timestamps.push(finding.timestamp.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Validated { findings: Vec<Finding> },
    Skipped { reason: MalformedRecordError },
}

/// One charger's processing pass: normalizer, rule engine and accumulator.
pub struct ChargerValidation<'a> {
    engine: &'a RuleEngine,
    context: RecordContext,
    state: ChargerState,
    accumulator: ChargerAccumulator,
}

impl<'a> ChargerValidation<'a> {
    pub fn new(engine: &'a RuleEngine, charger: Charger, example_cap: usize) -> Self {
        let expected_total_stalls = charger.expected_total_stalls;

        Self {
            engine,
            context: RecordContext {
                expected_total_stalls,
            },
            state: ChargerState::with_expected_total_stalls(expected_total_stalls),
            accumulator: ChargerAccumulator::new(charger, example_cap),
        }
    }

    pub fn charger_id(&self) -> &str {
        &self.accumulator.charger.charger_id
    }

    pub fn process(&mut self, raw: &Value) -> RecordOutcome {
        let record = match normalize_usage_record(raw, &self.context) {
            Ok(record) => record,
            Err(reason) => {
                self.accumulator.record_skipped();
                return RecordOutcome::Skipped { reason };
            }
        };

        let findings = self.engine.evaluate(
            &record,
            &mut self.state,
            &self.accumulator.charger.charger_id,
        );
        self.accumulator.record_processed(&findings);

        RecordOutcome::Validated { findings }
    }

    /// Batches must be fed in chronological order and must not overlap.
    pub fn process_batch<'r>(
        &mut self,
        records: impl IntoIterator<Item = &'r Value>,
    ) -> Vec<RecordOutcome> {
        records
            .into_iter()
            .map(|record| self.process(record))
            .collect()
    }

    pub fn apply_details(&mut self, details: &ChargerDetails) -> Option<Finding> {
        self.accumulator.merge_details(details);
        if details.has_pricing {
            return None;
        }

        let finding = Finding::pricing_missing(self.charger_id());
        self.accumulator.record_charger_finding(&finding);
        Some(finding)
    }

    pub fn mark_fetch_failed(&mut self, reason: impl Into<String>) {
        self.accumulator.mark_fetch_failed(reason);
    }

    pub fn finalize(self) -> ChargerReport {
        self.accumulator.finalize()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    reports: Vec<ChargerReport>,
}

impl ValidationSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: ChargerReport) {
        self.reports.push(report);
    }

    pub fn reports(&self) -> &[ChargerReport] {
        &self.reports
    }

    pub fn total_docs_processed(&self) -> usize {
        self.reports.iter().map(|report| report.docs_processed).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.reports.iter().map(|report| report.total_errors).sum()
    }

    pub fn chargers_with_errors(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.total_errors > 0 || report.fetch_error.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{ChargerAccumulator, ChargerValidation, RecordOutcome, ValidationSummary};
    use crate::domain::models::{Charger, ChargerDetails};
    use crate::domain::rules::{Finding, RuleEngine, RuleName};
    use crate::domain::usage_record::MalformedRecordError;

    fn usage(timestamp: &str, total: i64, available: i64) -> Value {
        json!({
            "timestamp": timestamp,
            "totalStalls": total,
            "stallsAvailable": available
        })
    }

    fn run(records: &[Value], cap: usize) -> super::ChargerReport {
        let engine = RuleEngine::standard();
        let mut validation = ChargerValidation::new(&engine, Charger::new("ea-1"), cap);
        validation.process_batch(records);
        validation.finalize()
    }

    fn assert_report_invariants(report: &super::ChargerReport, cap: usize) {
        let sum: usize = report
            .errors_by_rule
            .values()
            .map(|tally| tally.occurrences)
            .sum();
        assert_eq!(report.total_errors, sum);
        for tally in report.errors_by_rule.values() {
            assert!(tally.example_timestamps.len() <= cap);
            assert!(tally.example_timestamps.len() <= tally.occurrences);
        }
    }

    #[test]
    fn single_missing_offset_among_three_records() {
        let records = vec![
            usage("2024-05-01T10:00:00", 4, 2),
            usage("2024-05-01T10:05:00Z", 4, 3),
            usage("2024-05-01T10:10:00Z", 4, 1),
        ];

        let report = run(&records, 5);

        assert_eq!(report.docs_processed, 3);
        assert_eq!(report.total_errors, 1);
        assert_eq!(report.occurrences(RuleName::TimezoneMissing), 1);
        assert_eq!(
            report.examples(RuleName::TimezoneMissing),
            ["2024-05-01T10:00:00"]
        );
        assert_report_invariants(&report, 5);
    }

    #[test]
    fn total_stalls_drift_reports_second_record_timestamp() {
        let records = vec![
            usage("2024-05-01T10:00:00Z", 10, 4),
            usage("2024-05-01T10:05:00Z", 8, 4),
        ];

        let report = run(&records, 5);

        assert_eq!(report.occurrences(RuleName::TotalStallsMismatch), 1);
        assert_eq!(
            report.examples(RuleName::TotalStallsMismatch),
            ["2024-05-01T10:05:00Z"]
        );
        assert_eq!(report.total_errors, 1);
    }

    #[test]
    fn example_timestamps_keep_first_n_in_order() {
        let records: Vec<Value> = (0..5)
            .map(|minute| usage(&format!("2024-05-01T10:0{minute}:00"), 4, 1))
            .collect();

        let report = run(&records, 2);

        assert_eq!(report.occurrences(RuleName::TimezoneMissing), 5);
        assert_eq!(
            report.examples(RuleName::TimezoneMissing),
            ["2024-05-01T10:00:00", "2024-05-01T10:01:00"]
        );
        assert_report_invariants(&report, 2);
    }

    #[test]
    fn reordering_changes_which_record_is_flagged() {
        let forward = vec![
            usage("2024-05-01T10:00:00Z", 10, 1),
            usage("2024-05-01T10:05:00Z", 8, 1),
        ];
        let reversed: Vec<Value> = forward.iter().rev().cloned().collect();

        let forward_report = run(&forward, 5);
        let reversed_report = run(&reversed, 5);

        assert_eq!(
            forward_report.examples(RuleName::TotalStallsMismatch),
            ["2024-05-01T10:05:00Z"]
        );
        assert_eq!(
            reversed_report.examples(RuleName::TotalStallsMismatch),
            ["2024-05-01T10:00:00Z"]
        );
    }

    #[test]
    fn identical_inputs_give_identical_reports() {
        let records = vec![
            usage("2024-05-01T10:00:00", 10, 11),
            usage("2024-05-01T10:05:00Z", 8, -1),
            json!({"totalStalls": 4}),
        ];

        assert_eq!(run(&records, 3), run(&records, 3));
    }

    #[test]
    fn malformed_records_are_skipped_not_counted() {
        let engine = RuleEngine::standard();
        let mut validation = ChargerValidation::new(&engine, Charger::new("ea-1"), 5);

        let outcome = validation.process(&json!({"totalStalls": 4}));
        validation.process(&usage("2024-05-01T10:00:00Z", 4, 4));
        let report = validation.finalize();

        assert_eq!(
            outcome,
            RecordOutcome::Skipped {
                reason: MalformedRecordError::MissingTimestamp
            }
        );
        assert_eq!(report.docs_processed, 1);
        assert_eq!(report.records_skipped, 1);
        assert_eq!(report.total_errors, 0);
    }

    #[test]
    fn batches_continue_the_same_baseline() {
        let engine = RuleEngine::standard();
        let mut validation = ChargerValidation::new(&engine, Charger::new("ea-1"), 5);

        validation.process_batch(&[usage("2024-05-01T10:00:00Z", 10, 1)]);
        validation.process_batch(&[usage("2024-05-01T10:05:00Z", 9, 1)]);
        let report = validation.finalize();

        assert_eq!(report.docs_processed, 2);
        assert_eq!(report.occurrences(RuleName::TotalStallsMismatch), 1);
    }

    #[test]
    fn missing_pricing_is_a_charger_level_finding() {
        let engine = RuleEngine::standard();
        let mut validation = ChargerValidation::new(&engine, Charger::new("ea-1"), 5);

        let finding = validation.apply_details(&ChargerDetails {
            name: Some("Fresno".to_string()),
            location: None,
            has_pricing: false,
        });
        let report = validation.finalize();

        assert_eq!(finding.map(|finding| finding.rule), Some(RuleName::PricingMissing));
        assert_eq!(report.name, "Fresno");
        assert_eq!(report.docs_processed, 0);
        assert_eq!(report.total_errors, 1);
        assert_eq!(report.examples(RuleName::PricingMissing), ["N/A"]);
    }

    #[test]
    fn accumulator_with_zero_cap_keeps_no_examples() {
        let mut accumulator = ChargerAccumulator::new(Charger::new("ea-1"), 0);
        accumulator.record_charger_finding(&Finding::pricing_missing("ea-1"));

        let report = accumulator.finalize();

        assert_eq!(report.occurrences(RuleName::PricingMissing), 1);
        assert!(report.examples(RuleName::PricingMissing).is_empty());
    }

    #[test]
    fn summary_totals_follow_reports() {
        let mut summary = ValidationSummary::new();
        summary.push(run(&[usage("2024-05-01T10:00:00", 4, 5)], 5));
        summary.push(run(&[usage("2024-05-01T10:00:00Z", 4, 2)], 5));

        assert_eq!(summary.reports().len(), 2);
        assert_eq!(summary.total_docs_processed(), 2);
        assert_eq!(summary.total_errors(), 2);
        assert_eq!(summary.chargers_with_errors(), 1);
    }
}

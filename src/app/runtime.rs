use std::time::Duration;

use thiserror::Error;

use crate::adapters::source::{ChargerSource, SourceError, UsageSource};
use crate::app::report::ReportSink;
use crate::domain::aggregation::{
    ChargerReport, ChargerValidation, RecordOutcome, ValidationSummary,
};
use crate::domain::models::Charger;
use crate::domain::rules::RuleEngine;

pub trait Pacer {
    fn pause(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct ThreadSleepPacer;

impl Pacer for ThreadSleepPacer {
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to list chargers: {0}")]
    ListChargers(#[source] SourceError),
    #[error("no chargers found for the configured scope")]
    NoChargers,
}

pub struct ValidationRunner<S, P> {
    source: S,
    pacer: P,
    engine: RuleEngine,
    example_cap: usize,
    request_delay: Duration,
}

impl<S, P> ValidationRunner<S, P>
where
    S: ChargerSource + UsageSource,
    P: Pacer,
{
    pub fn new(source: S, pacer: P, example_cap: usize, request_delay: Duration) -> Self {
        Self {
            source,
            pacer,
            engine: RuleEngine::standard(),
            example_cap,
            request_delay,
        }
    }

    /// Validates every charger in listing order, handing each report to the
    /// sink as soon as it is final.
    pub fn run<R: ReportSink>(&self, sink: &mut R) -> Result<ValidationSummary, RunError> {
        let chargers = self
            .source
            .list_chargers()
            .map_err(RunError::ListChargers)?;
        if chargers.is_empty() {
            return Err(RunError::NoChargers);
        }

        tracing::info!(chargers = chargers.len(), "validation run started");

        let mut summary = ValidationSummary::new();
        for (index, charger) in chargers.into_iter().enumerate() {
            if index > 0 && !self.request_delay.is_zero() {
                self.pacer.pause(self.request_delay);
            }

            let report = self.validate_charger(charger);
            sink.charger_finished(&report);
            summary.push(report);
        }

        tracing::info!(
            chargers = summary.reports().len(),
            docs_processed = summary.total_docs_processed(),
            total_errors = summary.total_errors(),
            chargers_with_errors = summary.chargers_with_errors(),
            "validation run finished"
        );
        sink.run_finished(&summary);

        Ok(summary)
    }

    pub fn validate_charger(&self, charger: Charger) -> ChargerReport {
        let batch = self.source.fetch_usages(&charger);
        let mut validation = ChargerValidation::new(&self.engine, charger, self.example_cap);

        let batch = match batch {
            Ok(batch) => batch,
            Err(error) => {
                tracing::warn!(
                    charger_id = validation.charger_id(),
                    error = %error,
                    "failed to fetch usages"
                );
                validation.mark_fetch_failed(error.to_string());
                return validation.finalize();
            }
        };

        if let Some(finding) = validation.apply_details(&batch.charger_details) {
            tracing::warn!(
                charger_id = %finding.charger_id,
                rule = %finding.rule,
                "{}",
                finding.detail
            );
        }

        if batch.records.is_empty() {
            tracing::warn!(
                charger_id = validation.charger_id(),
                "no usage data found"
            );
        }

        for outcome in validation.process_batch(&batch.records) {
            match outcome {
                RecordOutcome::Validated { findings } => {
                    for finding in findings {
                        tracing::error!(
                            charger_id = %finding.charger_id,
                            timestamp = %finding.timestamp,
                            rule = %finding.rule,
                            "{}",
                            finding.detail
                        );
                    }
                }
                RecordOutcome::Skipped { reason } => {
                    tracing::warn!(
                        charger_id = validation.charger_id(),
                        reason = %reason,
                        "usage record skipped"
                    );
                }
            }
        }

        validation.finalize()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use crate::adapters::source::{ChargerSource, SourceError, UsageSource};
    use crate::adapters::usage_dump_file::UsageDumpFile;
    use crate::app::report::ReportSink;
    use crate::domain::aggregation::{ChargerReport, ValidationSummary};
    use crate::domain::models::{Charger, UsageBatch};
    use crate::domain::rules::RuleName;
    use crate::test_support::{fixture, write_dump};

    use super::{Pacer, RunError, ValidationRunner};

    #[derive(Default)]
    struct RecordingPacer {
        pauses: RefCell<Vec<Duration>>,
    }

    impl Pacer for RecordingPacer {
        fn pause(&self, delay: Duration) {
            self.pauses.borrow_mut().push(delay);
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        finished: Vec<String>,
        summaries: usize,
    }

    impl ReportSink for CollectingSink {
        fn charger_finished(&mut self, report: &ChargerReport) {
            self.finished.push(report.charger_id.clone());
        }

        fn run_finished(&mut self, _summary: &ValidationSummary) {
            self.summaries += 1;
        }
    }

    struct EmptySource;

    impl ChargerSource for EmptySource {
        fn list_chargers(&self) -> Result<Vec<Charger>, SourceError> {
            Ok(Vec::new())
        }
    }

    impl UsageSource for EmptySource {
        fn fetch_usages(&self, _charger: &Charger) -> Result<UsageBatch, SourceError> {
            Ok(UsageBatch::default())
        }
    }

    fn dump_runner(pacer: RecordingPacer) -> ValidationRunner<UsageDumpFile, RecordingPacer> {
        let dump = UsageDumpFile::from_file(&fixture("mixed_run.json")).expect("dump should load");
        ValidationRunner::new(dump, pacer, 5, Duration::from_millis(250))
    }

    #[test]
    fn validates_every_charger_in_order() {
        let runner = dump_runner(RecordingPacer::default());
        let mut sink = CollectingSink::default();

        let summary = runner.run(&mut sink).expect("run should succeed");

        assert_eq!(
            sink.finished,
            vec!["ea-fresno-01", "ea-bakersfield-02", "ea-offline-03"]
        );
        assert_eq!(sink.summaries, 1);
        assert_eq!(summary.reports().len(), 3);

        let fresno = &summary.reports()[0];
        assert_eq!(fresno.docs_processed, 3);
        assert_eq!(fresno.total_errors, 1);
        assert_eq!(fresno.examples(RuleName::TimezoneMissing), ["2024-05-01T10:00:00"]);
    }

    #[test]
    fn applies_every_rule_family_to_a_charger() {
        let runner = dump_runner(RecordingPacer::default());

        let summary = runner
            .run(&mut CollectingSink::default())
            .expect("run should succeed");
        let bakersfield = &summary.reports()[1];

        assert_eq!(bakersfield.name, "Bakersfield Target");
        assert_eq!(bakersfield.location, "2701 Ming Ave, Bakersfield, CA");
        assert_eq!(bakersfield.docs_processed, 4);
        assert_eq!(bakersfield.records_skipped, 1);
        assert_eq!(bakersfield.occurrences(RuleName::StallsAvailableMismatch), 1);
        assert_eq!(bakersfield.occurrences(RuleName::TotalStallsMismatch), 1);
        assert_eq!(bakersfield.occurrences(RuleName::InvalidTimezone), 1);
        assert_eq!(
            bakersfield.occurrences(RuleName::ConnectorAvailabilityMismatch),
            1
        );
        assert_eq!(bakersfield.occurrences(RuleName::PricingMissing), 1);
        assert_eq!(bakersfield.total_errors, 5);
    }

    #[test]
    fn fetch_failure_is_scoped_to_its_charger() {
        let runner = dump_runner(RecordingPacer::default());

        let summary = runner
            .run(&mut CollectingSink::default())
            .expect("run should succeed");
        let offline = &summary.reports()[2];

        assert_eq!(offline.docs_processed, 0);
        assert_eq!(offline.total_errors, 0);
        assert_eq!(
            offline.fetch_error.as_deref(),
            Some("usage data unavailable: upstream timeout")
        );
        assert_eq!(summary.chargers_with_errors(), 3);
    }

    #[test]
    fn pauses_between_chargers_only() {
        let runner = dump_runner(RecordingPacer::default());

        runner
            .run(&mut CollectingSink::default())
            .expect("run should succeed");

        assert_eq!(
            *runner.pacer.pauses.borrow(),
            vec![Duration::from_millis(250); 2]
        );
    }

    #[test]
    fn repeated_runs_produce_identical_summaries() {
        let first = dump_runner(RecordingPacer::default())
            .run(&mut CollectingSink::default())
            .expect("first run should succeed");
        let second = dump_runner(RecordingPacer::default())
            .run(&mut CollectingSink::default())
            .expect("second run should succeed");

        assert_eq!(first, second);
    }

    #[test]
    fn usages_without_charger_object_report_missing_pricing() {
        let file = write_dump(
            r#"{"chargers": [{"chargerId": "ea-bare", "usageData": [{"timestamp": "2024-05-01T10:00:00Z", "totalStalls": 2, "stallsAvailable": 1}]}]}"#,
        );
        let dump = UsageDumpFile::from_file(&file.path().to_string_lossy())
            .expect("dump should load");
        let runner = ValidationRunner::new(dump, RecordingPacer::default(), 5, Duration::ZERO);

        let report = runner.validate_charger(Charger::new("ea-bare"));

        assert_eq!(report.docs_processed, 1);
        assert_eq!(report.occurrences(RuleName::PricingMissing), 1);
        assert_eq!(report.examples(RuleName::PricingMissing), ["N/A"]);
        assert_eq!(report.total_errors, 1);
    }

    #[test]
    fn empty_listing_aborts_the_run() {
        let runner = ValidationRunner::new(
            EmptySource,
            RecordingPacer::default(),
            5,
            Duration::ZERO,
        );
        let mut sink = CollectingSink::default();

        let result = runner.run(&mut sink);

        assert!(matches!(result, Err(RunError::NoChargers)));
        assert_eq!(sink.summaries, 0);
    }
}

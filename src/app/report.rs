use std::fmt::Write as _;

use unicode_width::UnicodeWidthStr;

use crate::domain::aggregation::{ChargerReport, ValidationSummary};

const TABLE_HEADERS: [&str; 5] = [
    "Charger ID",
    "Name",
    "Location",
    "Docs Processed",
    "Total Errors",
];

/// Consumer of finalized reports; owns all human-facing rendering.
pub trait ReportSink {
    fn charger_finished(&mut self, report: &ChargerReport);
    fn run_finished(&mut self, summary: &ValidationSummary);
}

#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl ReportSink for ConsoleReporter {
    fn charger_finished(&mut self, report: &ChargerReport) {
        println!("{}", format_charger_summary(report));
    }

    fn run_finished(&mut self, summary: &ValidationSummary) {
        println!("{}", render_summary_table(summary));
    }
}

pub fn format_charger_summary(report: &ChargerReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Charger {}", report.charger_id);
    if !report.name.is_empty() {
        let _ = writeln!(out, "  Name: {}", report.name);
    }
    if !report.location.is_empty() {
        let _ = writeln!(out, "  Location: {}", report.location);
    }
    if let Some(error) = &report.fetch_error {
        let _ = writeln!(out, "  Fetch failed: {error}");
    }
    let _ = writeln!(out, "  Docs processed: {}", report.docs_processed);
    if report.records_skipped > 0 {
        let _ = writeln!(out, "  Records skipped: {}", report.records_skipped);
    }
    let _ = writeln!(out, "  Total errors: {}", report.total_errors);

    for (rule, tally) in &report.errors_by_rule {
        if tally.occurrences == 0 {
            continue;
        }
        let _ = writeln!(
            out,
            "  - {}: {} occurrence(s); examples: {}",
            rule.display_name(),
            tally.occurrences,
            tally.example_timestamps.join(", ")
        );
    }

    out.trim_end().to_string()
}

pub fn render_summary_table(summary: &ValidationSummary) -> String {
    let rows: Vec<[String; 5]> = summary
        .reports()
        .iter()
        .map(|report| {
            [
                report.charger_id.clone(),
                report.name.clone(),
                report.location.clone(),
                report.docs_processed.to_string(),
                report.total_errors.to_string(),
            ]
        })
        .collect();
    let footer = [
        "Total".to_string(),
        String::new(),
        format!("{} charger(s)", summary.reports().len()),
        summary.total_docs_processed().to_string(),
        summary.total_errors().to_string(),
    ];

    let mut widths = TABLE_HEADERS.map(|header| header.width());
    for row in rows.iter().chain(std::iter::once(&footer)) {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let separator = widths
        .iter()
        .map(|width| "-".repeat(width + 2))
        .collect::<Vec<_>>()
        .join("+");
    let separator = format!("+{separator}+");

    let mut lines = vec![
        separator.clone(),
        render_row(&TABLE_HEADERS, &widths),
        separator.clone(),
    ];
    lines.extend(rows.iter().map(|row| render_row(row, &widths)));
    lines.push(separator.clone());
    lines.push(render_row(&footer, &widths));
    lines.push(separator);

    lines.join("\n")
}

/// Text columns are left-aligned, the two count columns right-aligned.
fn render_row<S: AsRef<str>>(cells: &[S], widths: &[usize; 5]) -> String {
    let rendered: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (cell, width))| {
            let cell = cell.as_ref();
            let padding = " ".repeat(width.saturating_sub(cell.width()));
            if index >= 3 {
                format!(" {padding}{cell} ")
            } else {
                format!(" {cell}{padding} ")
            }
        })
        .collect();

    format!("|{}|", rendered.join("|"))
}

//! QA summary of one run.
//!
//! Counts what the pipeline produced and what it had to repair, plus one
//! line per record. Rendered as a text table by the CLI and returned as
//! JSON by the upload endpoint.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write as _;

use crate::models::Record;
use crate::parser::amount::format_amount;
use crate::transform::aggregator::AggregateStats;
use crate::transform::normalizer::NormalizeStats;

/// Shown as the grand total when record totals exceed the decimal range.
pub const GRAND_TOTAL_OVERFLOW: &str = "OVERFLOW";

/// Per-record line of the QA summary.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub record_id: u32,
    pub invoice_label: String,
    /// Member rows, balancing row excluded.
    pub rows: usize,
    pub total: String,
}

/// Counts for one run.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QaSummary {
    pub input_rows: usize,
    /// Rows in the main output, balancing rows included.
    pub main_rows: usize,
    pub parts_rows: usize,
    pub records: usize,
    pub balancing_rows: usize,
    pub filled_invoice_numbers: usize,
    pub unparseable_dates: usize,
    pub unparseable_amounts: usize,
    pub unassigned_locations: usize,
    /// Sum of all record totals.
    pub grand_total: String,
    pub record_lines: Vec<RecordSummary>,
}

impl QaSummary {
    pub fn build(
        input_rows: usize,
        parts_rows: usize,
        records: &[Record],
        normalize: &NormalizeStats,
        aggregate: &AggregateStats,
    ) -> Self {
        let record_lines: Vec<RecordSummary> = records
            .iter()
            .map(|r| RecordSummary {
                record_id: r.id,
                invoice_label: r.label.clone(),
                rows: r.rows.len(),
                total: format_amount(r.total),
            })
            .collect();

        let grand_total = records
            .iter()
            .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.total))
            .map(format_amount)
            .unwrap_or_else(|| GRAND_TOTAL_OVERFLOW.to_string());

        Self {
            input_rows,
            main_rows: records.iter().map(|r| r.output_rows().count()).sum(),
            parts_rows,
            records: records.len(),
            balancing_rows: aggregate.balancing_rows,
            filled_invoice_numbers: normalize.filled_invoice_numbers,
            unparseable_dates: normalize.unparseable_dates,
            unparseable_amounts: aggregate.unparseable_amounts,
            unassigned_locations: normalize.unassigned_locations,
            grand_total,
            record_lines,
        }
    }

    /// Whether anything was repaired or left unassigned.
    pub fn has_warnings(&self) -> bool {
        self.unparseable_dates > 0 || self.unparseable_amounts > 0 || self.unassigned_locations > 0
    }

    /// Text table: counts first, then one line per record (at most `max_lines`).
    pub fn to_table(&self, max_lines: usize) -> String {
        let mut out = String::new();
        let rule = "=".repeat(60);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "📊 QA SUMMARY");
        let _ = writeln!(out, "{}", rule);
        let counts = [
            ("Input rows", self.input_rows),
            ("Main rows", self.main_rows),
            ("Parts rows", self.parts_rows),
            ("Records", self.records),
            ("Balancing rows", self.balancing_rows),
            ("Filled invoice #", self.filled_invoice_numbers),
            ("Unreadable dates", self.unparseable_dates),
            ("Unreadable amounts", self.unparseable_amounts),
            ("Unknown locations", self.unassigned_locations),
        ];
        for (label, value) in counts {
            let _ = writeln!(out, "   {:<20}{:>10}", label, value);
        }
        let _ = writeln!(out, "   {:<20}{:>10}", "Grand total", self.grand_total);

        if !self.record_lines.is_empty() {
            let _ = writeln!(out, "{}", "-".repeat(60));
            let _ = writeln!(out, "   {:>6}  {:<28}{:>6}{:>14}", "ID", "Invoice", "Rows", "Total");
            for line in self.record_lines.iter().take(max_lines) {
                let _ = writeln!(
                    out,
                    "   {:>6}  {:<28}{:>6}{:>14}",
                    line.record_id, line.invoice_label, line.rows, line.total
                );
            }
            if self.record_lines.len() > max_lines {
                let _ = writeln!(out, "   ... +{} more records", self.record_lines.len() - max_lines);
            }
        }
        let _ = write!(out, "{}", rule);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Row;
    use std::str::FromStr;

    fn record(id: u32, label: &str, total: &str, rows: usize, balancing: bool) -> Record {
        Record {
            id,
            invoice_number: label.into(),
            bank_account: None,
            label: label.into(),
            rows: (0..rows).map(Row::new).collect(),
            total: Decimal::from_str(total).unwrap(),
            balancing_row: balancing.then(Row::synthesized),
        }
    }

    #[test]
    fn test_build_counts() {
        let records = vec![record(1, "A W", "100", 2, true), record(2, "B", "-25.5", 1, true)];
        let normalize = NormalizeStats {
            filled_invoice_numbers: 1,
            unparseable_dates: 0,
            unassigned_locations: 1,
        };
        let aggregate = AggregateStats {
            unparseable_amounts: 0,
            balancing_rows: 2,
        };

        let summary = QaSummary::build(4, 1, &records, &normalize, &aggregate);

        assert_eq!(summary.main_rows, 5);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.grand_total, "74.50");
        assert_eq!(summary.record_lines[1].total, "-25.50");
        assert_eq!(summary.record_lines[0].rows, 2);
        assert!(summary.has_warnings());
    }

    #[test]
    fn test_grand_total_overflow_does_not_panic() {
        let huge = "50000000000000000000000000000";
        let records = vec![record(1, "A", huge, 1, false), record(2, "B", huge, 1, false)];

        let summary = QaSummary::build(2, 0, &records, &NormalizeStats::default(), &AggregateStats::default());

        assert_eq!(summary.grand_total, GRAND_TOTAL_OVERFLOW);
        assert_eq!(summary.records, 2);
    }

    #[test]
    fn test_table_truncates_record_lines() {
        let records: Vec<Record> = (1..=5).map(|i| record(i, "INV", "1", 1, false)).collect();
        let summary = QaSummary::build(5, 0, &records, &NormalizeStats::default(), &AggregateStats::default());

        let table = summary.to_table(3);
        assert!(table.contains("QA SUMMARY"));
        assert!(table.contains("+2 more records"));
        assert!(table.contains("5.00"));
        assert!(!summary.has_warnings());
    }

    #[test]
    fn test_serializes_camel_case() {
        let summary = QaSummary::build(0, 0, &[], &NormalizeStats::default(), &AggregateStats::default());
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["grandTotal"], "0.00");
        assert!(json["recordLines"].as_array().unwrap().is_empty());
    }
}

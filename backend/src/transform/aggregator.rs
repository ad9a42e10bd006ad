//! Per-record totals and balancing rows.
//!
//! Every member row's `GL Amt` is rewritten as its parsed amount rounded to
//! cents (unreadable amounts count as zero). `Invoice Total` is the sum of
//! those rounded amounts and is written on every member row of the record.
//!
//! With `synthesize_balancing_rows`, each record also gets one payment entry
//! placed ahead of its rows: `Vendor#` = `BANK`, `Invoice #` = `RAMP PAYMENT`,
//! `GL Amt` = the negated total, `Company`, `Division` and `Purchase Date`
//! from the record's first row. Summing `GL Amt` over the record's output
//! rows then gives exactly `0.00`.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::{BalancingBankCostCtr, PipelineOptions};
use crate::models::{Column, Record, Row};
use crate::parser::amount::{format_amount, parse_amount, round_cents};

/// `Vendor#` of balancing rows.
pub const BALANCING_VENDOR: &str = "BANK";

/// `Invoice #` of balancing rows.
pub const BALANCING_INVOICE: &str = "RAMP PAYMENT";

/// What aggregation had to absorb or add.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Non-empty `GL Amt` values that could not be read (counted as zero).
    pub unparseable_amounts: usize,
    /// Balancing rows inserted.
    pub balancing_rows: usize,
}

/// Compute totals for every record and add balancing rows when enabled.
pub fn aggregate(records: &mut [Record], options: &PipelineOptions) -> AggregateStats {
    let mut stats = AggregateStats::default();

    for record in records.iter_mut() {
        stats.unparseable_amounts += total_record(record);

        if options.synthesize_balancing_rows {
            record.balancing_row = Some(balancing_row(record, options.balancing_bank_cost_ctr));
            stats.balancing_rows += 1;
        }
    }

    stats
}

/// Rewrite member amounts, fill `Invoice Total` and `record.total`.
///
/// An amount that would overflow the running total is treated as
/// unreadable. Returns how many amounts were unreadable.
fn total_record(record: &mut Record) -> usize {
    let mut unparseable = 0;
    let mut total = Decimal::ZERO;

    for row in &mut record.rows {
        let raw = row.get(Column::GlAmt);
        let blank = raw.trim().is_empty();
        let amount = parse_amount(raw)
            .map(round_cents)
            .and_then(|value| total.checked_add(value).map(|sum| (value, sum)));

        match amount {
            Some((value, sum)) => {
                row.set(Column::GlAmt, format_amount(value));
                total = sum;
            }
            None => {
                if !blank {
                    unparseable += 1;
                }
                row.set(Column::GlAmt, format_amount(Decimal::ZERO));
            }
        }
    }

    let total_text = format_amount(total);
    for row in &mut record.rows {
        row.set(Column::InvoiceTotal, total_text.as_str());
    }
    record.total = total;

    unparseable
}

fn balancing_row(record: &Record, bank_cost_ctr: BalancingBankCostCtr) -> Row {
    let mut row = Row::synthesized();
    row.record_id = Some(record.id);
    row.set(Column::GlAmt, format_amount(-record.total));
    row.set(Column::VendorNumber, BALANCING_VENDOR);
    row.set(Column::InvoiceNumber, BALANCING_INVOICE);

    if let Some(first) = record.rows.first() {
        for column in [Column::Company, Column::Division, Column::PurchaseDate] {
            row.set(column, first.get(column));
        }
        if bank_cost_ctr == BalancingBankCostCtr::FromRecord {
            row.set(Column::BankCostCtr, first.get(Column::BankCostCtr));
        }
    }

    row
}

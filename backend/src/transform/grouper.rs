//! Group normalized invoice lines into IntelliDealer records.
//!
//! # Architecture
//!
//! ```text
//! Normalized rows (upload order)              →  Records (id order)
//! ┌──────────────────────────────────────┐      ┌───────────────────────────┐
//! │ #0 Invoice: A, Bank: 10130, Loc: 01  │      │ 1  "A W"   rows #0, #1    │
//! │ #1 Invoice: A, Bank: 10130, Loc: 01  │  →   ├───────────────────────────┤
//! │ #2 Invoice: B, Bank: 10130, Loc: 03  │      │ 2  "A F"   row  #3        │
//! │ #3 Invoice: A, Bank: 10138, Loc: 02  │      ├───────────────────────────┤
//! └──────────────────────────────────────┘      │ 3  "B M"   row  #2        │
//!                                               └───────────────────────────┘
//! ```
//!
//! In [`GroupingMode::BankAccount`] invoices are taken in first-seen order.
//! An invoice whose rows carry one bank account (or none) is one record; an
//! invoice spanning several bank accounts becomes one record per account, in
//! first-seen order. An empty bank account is a value like any other.
//!
//! In [`GroupingMode::InvoiceChange`] a new record starts whenever the
//! invoice number differs from the previous row's.
//!
//! Record ids are dense from 1 in the order records are produced. Every row
//! gets its record id, and its `Invoice #` is replaced by the record label:
//! the invoice number followed by a space and the sorted suffix letters of
//! the record's locations, or the bare invoice number when no location has a
//! letter.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::BTreeSet;

use crate::config::{GroupingMode, LocationTable};
use crate::models::{Column, Record, Row};
use crate::transform::normalizer::normalize_location;

/// Partition rows into records and label them.
pub fn group_records(mut rows: Vec<Row>, mode: GroupingMode, locations: &LocationTable) -> Vec<Record> {
    rows.sort_by_key(|r| r.position);

    let groups = match mode {
        GroupingMode::BankAccount => partition_by_bank_account(rows),
        GroupingMode::InvoiceChange => partition_by_invoice_change(rows),
    };

    groups
        .into_iter()
        .zip(1u32..)
        .map(|(group, id)| build_record(id, group, locations))
        .collect()
}

/// Rows of one record before ids and labels are assigned.
struct Group {
    invoice_number: String,
    bank_account: Option<String>,
    rows: Vec<Row>,
}

fn invoice_key(row: &Row) -> String {
    row.get(Column::InvoiceNumber).trim().to_string()
}

fn bank_key(row: &Row) -> String {
    row.get(Column::BankAcct).trim().to_string()
}

fn partition_by_bank_account(rows: Vec<Row>) -> Vec<Group> {
    let mut invoices: IndexMap<String, IndexMap<String, Vec<Row>>> = IndexMap::new();

    for row in rows {
        invoices
            .entry(invoice_key(&row))
            .or_default()
            .entry(bank_key(&row))
            .or_default()
            .push(row);
    }

    let mut groups = Vec::new();
    for (invoice_number, banks) in invoices {
        if banks.len() <= 1 {
            groups.push(Group {
                invoice_number,
                bank_account: None,
                rows: banks.into_values().flatten().collect(),
            });
            continue;
        }

        for (bank, rows) in banks {
            groups.push(Group {
                invoice_number: invoice_number.clone(),
                bank_account: Some(bank),
                rows,
            });
        }
    }
    groups
}

fn partition_by_invoice_change(rows: Vec<Row>) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let key = invoice_key(&row);
        match groups.last_mut() {
            Some(current) if current.invoice_number == key => current.rows.push(row),
            _ => groups.push(Group {
                invoice_number: key,
                bank_account: None,
                rows: vec![row],
            }),
        }
    }
    groups
}

/// Sorted suffix letters of the locations present in `rows`.
pub fn location_suffix<'a>(rows: impl IntoIterator<Item = &'a Row>, locations: &LocationTable) -> String {
    let letters: BTreeSet<char> = rows
        .into_iter()
        .filter_map(|row| locations.suffix(&normalize_location(row.get(Column::Location))))
        .collect();
    letters.into_iter().collect()
}

/// Invoice number plus `" " + suffix` when both are non-empty.
pub fn compose_label(invoice_number: &str, suffix: &str) -> String {
    let invoice_number = invoice_number.trim();
    match (invoice_number.is_empty(), suffix.is_empty()) {
        (_, true) => invoice_number.to_string(),
        (true, false) => suffix.to_string(),
        (false, false) => format!("{} {}", invoice_number, suffix),
    }
}

fn build_record(id: u32, group: Group, locations: &LocationTable) -> Record {
    let suffix = location_suffix(&group.rows, locations);
    let label = compose_label(&group.invoice_number, &suffix);

    let rows = group
        .rows
        .into_iter()
        .map(|mut row| {
            row.record_id = Some(id);
            row.set(Column::InvoiceNumber, label.as_str());
            row
        })
        .collect();

    Record {
        id,
        invoice_number: group.invoice_number,
        bank_account: group.bank_account,
        label,
        rows,
        total: Decimal::ZERO,
        balancing_row: None,
    }
}

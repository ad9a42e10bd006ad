//! Domain models for the IntelliDealer upload pipeline.
//!
//! - [`Column`] - Columns the pipeline reads or writes, by exact header name
//! - [`Row`] - One invoice line: an open mapping of column name to text
//! - [`Table`] - Ordered headers plus rows, as read from the upload
//! - [`Record`] - Rows grouped under one record id and invoice label
//!
//! Rows keep every input column, known or not. A known column that is
//! absent from the input reads as empty text; [`Table::ensure_column`]
//! materializes it in the header list so it is emitted on output.

use rust_decimal::Decimal;
use std::collections::HashMap;

// =============================================================================
// Columns
// =============================================================================

/// Columns with a meaning in the IntelliDealer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    RecordId,
    Company,
    Division,
    Vendor,
    VendorNumber,
    InvoiceNumber,
    PurchaseDate,
    InvoiceTotal,
    DiscountAmt,
    DiscountCostCtr,
    DiscountAcct,
    BankCostCtr,
    BankAcct,
    PayablesCostCtr,
    PayablesAcct,
    GlCostCtr,
    GlAcct,
    GlAmt,
    Department,
    Location,
}

impl Column {
    /// Header name as it appears in the CSV.
    pub fn name(self) -> &'static str {
        match self {
            Column::RecordId => "Record ID",
            Column::Company => "Company",
            Column::Division => "Division",
            Column::Vendor => "Vendor",
            Column::VendorNumber => "Vendor#",
            Column::InvoiceNumber => "Invoice #",
            Column::PurchaseDate => "Purchase Date",
            Column::InvoiceTotal => "Invoice Total",
            Column::DiscountAmt => "Discount Amt",
            Column::DiscountCostCtr => "Discount Cost Ctr",
            Column::DiscountAcct => "Discount Acct",
            Column::BankCostCtr => "Bank Cost Ctr",
            Column::BankAcct => "Bank Acct #",
            Column::PayablesCostCtr => "Payables Cost Ctr",
            Column::PayablesAcct => "Payables Acct",
            Column::GlCostCtr => "GL Cost Ctr",
            Column::GlAcct => "GL Acct",
            Column::GlAmt => "GL Amt",
            Column::Department => "Department",
            Column::Location => "Location",
        }
    }

    /// Column order of the IntelliDealer upload file.
    ///
    /// `Record ID` leads; passthrough columns follow `GL Amt`.
    pub const UPLOAD_LAYOUT: [Column; 17] = [
        Column::RecordId,
        Column::Company,
        Column::Division,
        Column::VendorNumber,
        Column::InvoiceNumber,
        Column::PurchaseDate,
        Column::InvoiceTotal,
        Column::DiscountAmt,
        Column::DiscountCostCtr,
        Column::DiscountAcct,
        Column::BankCostCtr,
        Column::BankAcct,
        Column::PayablesCostCtr,
        Column::PayablesAcct,
        Column::GlCostCtr,
        Column::GlAcct,
        Column::GlAmt,
    ];

    /// Helper columns consumed by the normalizer and never exported.
    pub const DROPPED: [Column; 2] = [Column::Department, Column::Location];
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Rows
// =============================================================================

/// A single CSV line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    /// Zero-based position in the upload. `None` for synthesized rows.
    pub position: Option<usize>,
    /// Record the row was grouped into.
    pub record_id: Option<u32>,
    fields: HashMap<String, String>,
}

impl Row {
    /// Create an ingested row at `position`.
    pub fn new(position: usize) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Create a row with no input counterpart.
    pub fn synthesized() -> Self {
        Self::default()
    }

    /// Value of a known column, empty when absent.
    pub fn get(&self, column: Column) -> &str {
        self.get_raw(column.name())
    }

    /// Value of any column by header name, empty when absent.
    pub fn get_raw(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    /// Whether the row carries the column at all.
    pub fn has(&self, column: Column) -> bool {
        self.fields.contains_key(column.name())
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        self.set_raw(column.name(), value);
    }

    pub fn set_raw(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_string(), value.into());
    }

    /// Reset a column to empty text.
    pub fn clear(&mut self, column: Column) {
        self.set(column, "");
    }

    /// Apply `f` to every value of the row.
    pub fn map_values(&mut self, f: impl Fn(&str) -> String) {
        for value in self.fields.values_mut() {
            *value = f(value);
        }
    }

    /// Values in `headers` order, empty for absent columns.
    pub fn values_for<'a>(&'a self, headers: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        headers.iter().map(move |h| self.get_raw(h))
    }

    /// Field map, for JSON previews.
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

// =============================================================================
// Table
// =============================================================================

/// Headers plus rows, in upload order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Whether the header list names the column.
    pub fn has_column(&self, column: Column) -> bool {
        self.headers.iter().any(|h| h == column.name())
    }

    /// Append the column to the headers if missing and give every row an
    /// empty value for it.
    pub fn ensure_column(&mut self, column: Column) {
        if !self.has_column(column) {
            self.headers.push(column.name().to_string());
        }
        for row in &mut self.rows {
            if !row.has(column) {
                row.clear(column);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Move the rows matching `predicate` into a new table with the same
    /// headers. Both tables keep upload order.
    pub fn split_off_where(&mut self, predicate: impl Fn(&Row) -> bool) -> Table {
        let (taken, kept): (Vec<Row>, Vec<Row>) =
            std::mem::take(&mut self.rows).into_iter().partition(|r| predicate(r));
        self.rows = kept;
        Table::new(self.headers.clone(), taken)
    }
}

// =============================================================================
// Records
// =============================================================================

/// Rows sharing one invoice (and bank account, when it splits the invoice).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Dense 1-based identifier in first-seen order.
    pub id: u32,
    /// Trimmed invoice number the record was grouped under.
    pub invoice_number: String,
    /// Bank account the record was split on, if the invoice was split.
    pub bank_account: Option<String>,
    /// Invoice number plus sorted location suffix letters.
    pub label: String,
    /// Member rows in upload order.
    pub rows: Vec<Row>,
    /// Sum of member rows' GL amounts, filled by the aggregator.
    pub total: Decimal,
    /// Synthesized payment entry, placed before the member rows on output.
    pub balancing_row: Option<Row>,
}

impl Record {
    /// Member rows, balancing row first when present.
    pub fn output_rows(&self) -> impl Iterator<Item = &Row> {
        self.balancing_row.iter().chain(self.rows.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_column_reads_empty() {
        let row = Row::new(0);
        assert_eq!(row.get(Column::GlAmt), "");
        assert!(!row.has(Column::GlAmt));
    }

    #[test]
    fn test_ensure_column_appends_once() {
        let mut row = Row::new(0);
        row.set(Column::Company, "01");
        let mut table = Table::new(vec!["Company".into()], vec![row]);

        table.ensure_column(Column::GlAmt);
        table.ensure_column(Column::GlAmt);
        table.ensure_column(Column::Company);

        assert_eq!(table.headers, vec!["Company", "GL Amt"]);
        assert!(table.rows[0].has(Column::GlAmt));
        assert_eq!(table.rows[0].get(Column::Company), "01");
    }

    #[test]
    fn test_split_off_keeps_order() {
        let rows = (0..5)
            .map(|i| {
                let mut r = Row::new(i);
                r.set(Column::GlAcct, if i % 2 == 0 { "99999" } else { "4000" });
                r
            })
            .collect();
        let mut table = Table::new(vec!["GL Acct".into()], rows);

        let parts = table.split_off_where(|r| r.get(Column::GlAcct) == "99999");

        let kept: Vec<_> = table.rows.iter().filter_map(|r| r.position).collect();
        let taken: Vec<_> = parts.rows.iter().filter_map(|r| r.position).collect();
        assert_eq!(kept, vec![1, 3]);
        assert_eq!(taken, vec![0, 2, 4]);
        assert_eq!(parts.headers, table.headers);
    }

    #[test]
    fn test_values_for_follows_headers() {
        let mut row = Row::new(0);
        row.set_raw("b", "2");
        row.set_raw("a", "1");
        let headers = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        let values: Vec<_> = row.values_for(&headers).collect();
        assert_eq!(values, vec!["1", "", "2"]);
    }

    #[test]
    fn test_output_rows_balancing_first() {
        let mut member = Row::new(3);
        member.set(Column::GlAmt, "10.00");
        let mut balancing = Row::synthesized();
        balancing.set(Column::GlAmt, "-10.00");
        let record = Record {
            id: 1,
            invoice_number: "A".into(),
            bank_account: None,
            label: "A".into(),
            rows: vec![member],
            total: Decimal::ZERO,
            balancing_row: Some(balancing),
        };

        let amounts: Vec<_> = record.output_rows().map(|r| r.get(Column::GlAmt)).collect();
        assert_eq!(amounts, vec!["-10.00", "10.00"]);
    }
}

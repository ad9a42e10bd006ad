//! Per-row normalization ahead of grouping.
//!
//! Every step reads and writes single rows; nothing here looks at other rows.
//! Steps run in this order:
//!
//! 1. `Purchase Date` to `YYYYMMDD` (empty when unreadable)
//! 2. empty `Invoice #` filled with `{vendor}_{purchase date}`
//! 3. `Location` trimmed and zero-padded to two characters
//! 4. bank and payables accounts looked up from the location table
//! 5. `GL Cost Ctr` = department + location
//! 6. discount fields cleared
//!
//! Steps 1 and 2 only run with `fill_invoice_and_date`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::config::{LocationTable, PipelineOptions};
use crate::models::{Column, Row, Table};

/// Date formats accepted for `Purchase Date`, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y%m%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
];

/// Date-time formats, for exports that carry a time of day.
const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Two-digit-year formats, tried last.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

/// Columns every normalized row carries, present in the input or not.
const REQUIRED_COLUMNS: [Column; 18] = [
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
    Column::Department,
    Column::Location,
];

/// What normalization had to repair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeStats {
    /// Invoice numbers built from vendor and date.
    pub filled_invoice_numbers: usize,
    /// Non-empty purchase dates that could not be read.
    pub unparseable_dates: usize,
    /// Rows whose location has no entry in the location table.
    pub unassigned_locations: usize,
}

/// Parse a purchase date in any accepted format.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let full_year = |d: &NaiveDate| d.year() >= 1000;

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok().filter(full_year))
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
                .filter(full_year)
        })
        .or_else(|| {
            SHORT_YEAR_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        })
}

/// Compact `YYYYMMDD` text, `None` when unreadable.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y%m%d").to_string())
}

/// Trim and zero-pad a location code to two characters.
///
/// Codes exported as floats (`1.0`) lose their decimal part first.
pub fn normalize_location(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let code = match trimmed.split_once('.') {
        Some((whole, frac)) if !whole.is_empty() && frac.chars().all(|c| c == '0') => whole,
        _ => trimmed,
    };

    format!("{:0>2}", code)
}

/// Normalize every row of `table` in place.
pub fn normalize(table: &mut Table, locations: &LocationTable, options: &PipelineOptions) -> NormalizeStats {
    for column in REQUIRED_COLUMNS {
        table.ensure_column(column);
    }

    let mut stats = NormalizeStats::default();
    for row in &mut table.rows {
        normalize_row(row, locations, options, &mut stats);
    }
    stats
}

fn normalize_row(row: &mut Row, locations: &LocationTable, options: &PipelineOptions, stats: &mut NormalizeStats) {
    if options.fill_invoice_and_date {
        let raw_date = row.get(Column::PurchaseDate).to_string();
        let date = normalize_date(&raw_date).unwrap_or_else(|| {
            if !raw_date.trim().is_empty() {
                stats.unparseable_dates += 1;
            }
            String::new()
        });
        row.set(Column::PurchaseDate, date);

        if row.get(Column::InvoiceNumber).trim().is_empty() {
            let vendor = vendor_name(row).to_string();
            let fallback = format!("{}_{}", vendor, row.get(Column::PurchaseDate));
            row.set(Column::InvoiceNumber, fallback);
            stats.filled_invoice_numbers += 1;
        }
    }

    let location = normalize_location(row.get(Column::Location));

    match locations.get(&location) {
        Some(entry) => {
            row.set(Column::BankCostCtr, entry.bank_cost_ctr.as_str());
            row.set(Column::BankAcct, entry.bank_acct.as_str());
            row.set(Column::PayablesCostCtr, entry.payables_cost_ctr.as_str());
            row.set(Column::PayablesAcct, entry.payables_acct.as_str());
        }
        None => {
            for column in [
                Column::BankCostCtr,
                Column::BankAcct,
                Column::PayablesCostCtr,
                Column::PayablesAcct,
            ] {
                row.clear(column);
            }
            stats.unassigned_locations += 1;
        }
    }

    let gl_cost_ctr = format!("{}{}", row.get(Column::Department).trim(), location);
    row.set(Column::GlCostCtr, gl_cost_ctr);
    row.set(Column::Location, location);

    row.clear(Column::DiscountAmt);
    row.clear(Column::DiscountCostCtr);
    row.clear(Column::DiscountAcct);
}

/// First non-empty of `Vendor`, `Vendor#`.
fn vendor_name(row: &Row) -> &str {
    [Column::Vendor, Column::VendorNumber]
        .into_iter()
        .map(|c| row.get(c).trim())
        .find(|v| !v.is_empty())
        .unwrap_or("")
}

//! Final presentation of both output files.
//!
//! The main file follows the IntelliDealer column order
//! ([`Column::UPLOAD_LAYOUT`]), then any other input column in upload order.
//! `Department` and `Location` are consumed by normalization and not
//! exported. `Record ID` is only emitted with `assign_record_id`.
//!
//! The parts file keeps the upload's own headers and values; only casing
//! changes.

use std::path::Path;

use crate::config::PipelineOptions;
use crate::error::CsvResult;
use crate::models::{Column, Record, Row, Table};
use crate::parser::write_csv;

/// Prefix of the main output file name.
pub const UPLOAD_PREFIX: &str = "IntelliDealer_Upload_";

/// Suffix replacing the extension of the parts output file name.
pub const PARTS_SUFFIX: &str = "_PARTS.csv";

/// Headers of the main output.
pub fn output_headers(input_headers: &[String], assign_record_id: bool) -> Vec<String> {
    let layout = Column::UPLOAD_LAYOUT
        .iter()
        .filter(|c| assign_record_id || **c != Column::RecordId)
        .map(|c| c.name().to_string());

    let reserved: Vec<&str> = Column::UPLOAD_LAYOUT
        .iter()
        .chain(Column::DROPPED.iter())
        .map(|c| c.name())
        .collect();

    let passthrough = input_headers
        .iter()
        .filter(|h| !h.is_empty() && !reserved.contains(&h.as_str()))
        .cloned();

    let mut headers: Vec<String> = Vec::new();
    for header in layout.chain(passthrough) {
        if !headers.contains(&header) {
            headers.push(header);
        }
    }
    headers
}

fn uppercase_row(row: &mut Row) {
    row.map_values(|v| v.to_uppercase());
}

/// Write `Record ID` text and apply casing to every output row.
pub fn finalize_records(records: &mut [Record], options: &PipelineOptions) {
    for record in records.iter_mut() {
        let id_text = record.id.to_string();
        for row in record.balancing_row.iter_mut().chain(record.rows.iter_mut()) {
            if options.assign_record_id {
                row.set(Column::RecordId, id_text.as_str());
            }
            if options.uppercase_output {
                uppercase_row(row);
            }
        }
    }
}

/// Apply casing to the parts rows.
pub fn finalize_parts(parts: &mut Table, options: &PipelineOptions) {
    if options.uppercase_output {
        parts.rows.iter_mut().for_each(uppercase_row);
    }
}

/// Main output CSV: records in id order, balancing row ahead of members.
pub fn render_main(records: &[Record], headers: &[String]) -> CsvResult<String> {
    write_csv(headers, records.iter().flat_map(|r| r.output_rows()))
}

/// Parts output CSV, `None` when there are no parts rows.
pub fn render_parts(parts: &Table) -> CsvResult<Option<String>> {
    if parts.is_empty() {
        return Ok(None);
    }
    write_csv(&parts.headers, &parts.rows).map(Some)
}

/// `IntelliDealer_Upload_{file name}`.
pub fn upload_file_name(original: &str) -> String {
    format!("{}{}", UPLOAD_PREFIX, base_name(original))
}

/// `{file stem}_PARTS.csv`.
pub fn parts_file_name(original: &str) -> String {
    let stem = Path::new(base_name(original))
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    format!("{}{}", stem, PARTS_SUFFIX)
}

fn base_name(original: &str) -> &str {
    Path::new(original)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(original)
}

//! High-level pipeline API: one upload in, two CSV payloads out.
//!
//! ```text
//! CSV bytes → parse → split parts (GL Acct 99999) → normalize → group → aggregate → format
//!                              └──────────────────────────────────────────────→ parts CSV
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use intellidealer::{process_file, LocationTable, PipelineOptions};
//!
//! let output = process_file("march.csv", &PipelineOptions::default(), &LocationTable::default())?;
//! println!("{} records", output.summary.records);
//! std::fs::write(&output.main.name, &output.main.content)?;
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_info, log_success, log_warning};
use crate::config::{LocationTable, PipelineOptions};
use crate::error::PipelineResult;
use crate::models::{Column, Row, Table};
use crate::parser::{parse_bytes_auto, parse_csv_file_auto, ParseResult};

use super::aggregator::aggregate;
use super::formatter::{
    finalize_parts, finalize_records, output_headers, parts_file_name, render_main, render_parts,
    upload_file_name,
};
use super::grouper::group_records;
use super::normalizer::normalize;
use super::summary::QaSummary;

/// `GL Acct` of rows routed to the parts file.
pub const PARTS_GL_ACCOUNT: &str = "99999";

/// A named CSV payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    pub name: String,
    pub content: String,
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

/// Result of one pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    /// `IntelliDealer_Upload_{file name}`
    pub main: OutputFile,
    /// `{stem}_PARTS.csv`, only when parts rows exist
    pub parts: Option<OutputFile>,
    pub summary: QaSummary,
    pub csv_info: CsvInfo,
}

impl PipelineOutput {
    /// Output files in emission order.
    pub fn files(&self) -> impl Iterator<Item = &OutputFile> {
        std::iter::once(&self.main).chain(self.parts.iter())
    }
}

/// Whether the row belongs to the parts file.
pub fn is_parts_row(row: &Row) -> bool {
    row.get(Column::GlAcct).trim() == PARTS_GL_ACCOUNT
}

/// Process a CSV file from disk.
pub fn process_file(
    path: impl AsRef<Path>,
    options: &PipelineOptions,
    locations: &LocationTable,
) -> PipelineResult<PipelineOutput> {
    let path = path.as_ref();
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("upload.csv")
        .to_string();

    log_info(format!("📖 Reading {}", path.display()));
    let parsed = parse_csv_file_auto(path)?;
    process_parsed(parsed, &file_name, options, locations)
}

/// Process uploaded CSV bytes.
pub fn process_bytes(
    bytes: &[u8],
    file_name: &str,
    options: &PipelineOptions,
    locations: &LocationTable,
) -> PipelineResult<PipelineOutput> {
    log_info(format!("📖 Reading {} ({} bytes)", file_name, bytes.len()));
    let parsed = parse_bytes_auto(bytes)?;
    process_parsed(parsed, file_name, options, locations)
}

fn process_parsed(
    parsed: ParseResult,
    file_name: &str,
    options: &PipelineOptions,
    locations: &LocationTable,
) -> PipelineResult<PipelineOutput> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!("Read {} rows", parsed.table.len()));

    let csv_info = CsvInfo {
        encoding: parsed.encoding,
        delimiter: parsed.delimiter,
        headers: parsed.table.headers.clone(),
        row_count: parsed.table.len(),
    };

    let (main, parts, summary) = process_table(parsed.table, file_name, options, locations)?;

    Ok(PipelineOutput {
        main,
        parts,
        summary,
        csv_info,
    })
}

/// Run every stage on an already-parsed table.
///
/// Returns the main file, the parts file when non-empty, and the QA summary.
pub fn process_table(
    mut table: Table,
    file_name: &str,
    options: &PipelineOptions,
    locations: &LocationTable,
) -> PipelineResult<(OutputFile, Option<OutputFile>, QaSummary)> {
    let input_rows = table.len();
    if input_rows == 0 {
        log_warning("CSV has a header but no rows");
    }

    log_info(format!("⚙️  Options: {}", describe_options(options)));

    let mut parts = table.split_off_where(is_parts_row);
    if !parts.is_empty() {
        log_info(format!("🔩 {} parts rows (GL Acct {}) set aside", parts.len(), PARTS_GL_ACCOUNT));
    }

    log_info("🧹 Normalizing rows...");
    let normalize_stats = normalize(&mut table, locations, options);
    if normalize_stats.filled_invoice_numbers > 0 {
        log_info(format!("Filled {} empty invoice numbers", normalize_stats.filled_invoice_numbers));
    }
    if normalize_stats.unparseable_dates > 0 {
        log_warning(format!("{} purchase dates unreadable, left empty", normalize_stats.unparseable_dates));
    }
    if normalize_stats.unassigned_locations > 0 {
        log_warning(format!(
            "{} rows with no known location, bank and payables accounts left empty",
            normalize_stats.unassigned_locations
        ));
    }

    log_info(format!("📦 Grouping records ({})...", options.grouping_mode));
    let headers = output_headers(&table.headers, options.assign_record_id);
    let mut records = group_records(std::mem::take(&mut table.rows), options.grouping_mode, locations);
    log_success(format!("{} records", records.len()));

    let aggregate_stats = aggregate(&mut records, options);
    if aggregate_stats.unparseable_amounts > 0 {
        log_warning(format!("{} GL amounts unreadable, counted as 0.00", aggregate_stats.unparseable_amounts));
    }
    if aggregate_stats.balancing_rows > 0 {
        log_info(format!("Added {} balancing rows", aggregate_stats.balancing_rows));
    }

    finalize_records(&mut records, options);
    finalize_parts(&mut parts, options);

    let main = OutputFile {
        name: upload_file_name(file_name),
        content: render_main(&records, &headers)?,
    };
    let parts_file = render_parts(&parts)?.map(|content| OutputFile {
        name: parts_file_name(file_name),
        content,
    });

    let summary = QaSummary::build(input_rows, parts.len(), &records, &normalize_stats, &aggregate_stats);
    log_success(format!("{} → {} rows", main.name, summary.main_rows));
    if let Some(ref p) = parts_file {
        log_success(format!("{} → {} rows", p.name, summary.parts_rows));
    }

    Ok((main, parts_file, summary))
}

/// Write every output file into `dir`, returning the written paths.
pub fn write_outputs(output: &PipelineOutput, dir: impl AsRef<Path>) -> PipelineResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for file in output.files() {
        let path = dir.join(&file.name);
        std::fs::write(&path, file.content.as_bytes())?;
        written.push(path);
    }
    Ok(written)
}

fn describe_options(options: &PipelineOptions) -> String {
    let flag = |on: bool| if on { "on" } else { "off" };
    format!(
        "fill={}, record-id={}, uppercase={}, balancing={}",
        flag(options.fill_invoice_and_date),
        flag(options.assign_record_id),
        flag(options.uppercase_output),
        flag(options.synthesize_balancing_rows),
    )
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Invoice #,Vendor,Purchase Date,Location,Department,GL Acct,GL Amt,Bank Acct #
INV-1,Acme,1/2/2024,1,40,6000,$100.00,
INV-1,Acme,1/2/2024,2,40,6000,(25.00),
INV-2,Globex,1/3/2024,3,10,99999,$7.00,
INV-2,Globex,1/3/2024,3,10,6100,$8.00,
";

    fn run(options: &PipelineOptions) -> (OutputFile, Option<OutputFile>, QaSummary) {
        let table = parse_str(SAMPLE, ',').unwrap();
        process_table(table, "march.csv", options, &LocationTable::default()).unwrap()
    }

    #[test]
    fn test_parts_rows_routed_to_side_file() {
        let (main, parts, summary) = run(&PipelineOptions::default());

        let parts = parts.expect("parts file");
        assert_eq!(parts.name, "march_PARTS.csv");
        assert!(parts.content.starts_with("Invoice #,Vendor,Purchase Date"));
        assert!(parts.content.contains("INV-2,GLOBEX,1/3/2024,3,10,99999,$7.00,"));
        assert!(!main.content.contains("99999"));
        assert_eq!(summary.parts_rows, 1);
        assert_eq!(summary.input_rows, 4);
    }

    #[test]
    fn test_main_output_layout() {
        let (main, _, summary) = run(&PipelineOptions::default());

        assert_eq!(main.name, "IntelliDealer_Upload_march.csv");
        let lines: Vec<&str> = main.content.lines().collect();
        assert_eq!(
            lines[0],
            "Record ID,Company,Division,Vendor#,Invoice #,Purchase Date,Invoice Total,\
Discount Amt,Discount Cost Ctr,Discount Acct,Bank Cost Ctr,Bank Acct #,Payables Cost Ctr,\
Payables Acct,GL Cost Ctr,GL Acct,GL Amt,Vendor"
        );
        // INV-1 spans two bank accounts (10130 via 01, 10138 via 02)
        assert_eq!(summary.records, 3);
        assert_eq!(lines[1], "1,,,,INV-1 W,20240102,100.00,,,,001,10130,000,20010,4001,6000,100.00,ACME");
        assert_eq!(lines[2], "2,,,,INV-1 F,20240102,-25.00,,,,000,10138,000,20011,4002,6000,-25.00,ACME");
        assert_eq!(lines[3], "3,,,,INV-2 M,20240103,8.00,,,,001,10130,000,20010,1003,6100,8.00,GLOBEX");
    }

    #[test]
    fn test_no_parts_file_when_none() {
        let table = parse_str("Invoice #,GL Amt\nA,1", ',').unwrap();
        let (_, parts, _) =
            process_table(table, "x.csv", &PipelineOptions::default(), &LocationTable::default()).unwrap();
        assert!(parts.is_none());
    }

    #[test]
    fn test_header_only_input() {
        let table = parse_str("Invoice #,GL Amt\n", ',').unwrap();
        let (main, parts, summary) =
            process_table(table, "x.csv", &PipelineOptions::default(), &LocationTable::default()).unwrap();
        assert_eq!(main.content.lines().count(), 1);
        assert!(parts.is_none());
        assert_eq!(summary.records, 0);
    }

    #[test]
    fn test_process_bytes_and_write_outputs() {
        let output = process_bytes(
            SAMPLE.as_bytes(),
            "march.csv",
            &PipelineOptions::default(),
            &LocationTable::default(),
        )
        .unwrap();
        assert_eq!(output.csv_info.row_count, 4);
        assert_eq!(output.csv_info.delimiter, ',');

        let dir = tempdir().unwrap();
        let written = write_outputs(&output, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("IntelliDealer_Upload_march.csv").exists());
        assert!(dir.path().join("march_PARTS.csv").exists());
    }

    #[test]
    fn test_is_parts_row_trims() {
        let mut row = Row::new(0);
        row.set(Column::GlAcct, " 99999 ");
        assert!(is_parts_row(&row));
        row.set(Column::GlAcct, "999990");
        assert!(!is_parts_row(&row));
    }
}

//! # IntelliDealer - invoice CSV to IntelliDealer upload
//!
//! Turns a vendor invoice export into the column layout the IntelliDealer
//! accounts-payable import expects, plus a side file for parts lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Normalizer  │────▶│   Grouper   │────▶│ Aggregator +     │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (dates, locs)│     │  (records)  │     │ Formatter (CSVs) │
//! └─────────────┘     └──────┬──────┘     └──────────────┘     └─────────────┘     └──────────────────┘
//!                            └── GL Acct 99999 ──▶ parts CSV
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use intellidealer::{process_file, write_outputs, LocationTable, PipelineOptions};
//!
//! let output = process_file("march.csv", &PipelineOptions::default(), &LocationTable::default())?;
//! write_outputs(&output, "out/")?;
//! println!("{}", output.summary.to_table(20));
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Rows, tables, records and known columns
//! - [`config`] - Pipeline options, location table, environment settings
//! - [`parser`] - CSV parsing with auto-detection, amount parsing
//! - [`transform`] - Normalize, group, aggregate, format, pipeline
//! - [`api`] - HTTP API server and log streaming

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Models and configuration
// =============================================================================

pub use config::{BalancingBankCostCtr, GroupingMode, LocationEntry, LocationTable, PipelineOptions, Settings};
pub use models::{Column, Record, Row, Table};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_amount, parse_bytes_auto, parse_csv_file_auto,
    parse_str, table_to_json, write_csv, ParseResult,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    process_bytes, process_file, process_table, write_outputs, CsvInfo, OutputFile, PipelineOutput,
};
pub use transform::summary::{QaSummary, RecordSummary};

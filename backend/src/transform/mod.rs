//! Transformation module.
//!
//! This module turns parsed invoice lines into the IntelliDealer upload:
//! - Normalizer: Per-row dates, invoice fallback, location accounts
//! - Grouper: Rows to records with ids and labels
//! - Aggregator: Record totals and balancing rows
//! - Formatter: Column layout, casing, output file names
//! - Summary: QA counts for one run
//! - Pipeline: Main transformation pipeline

pub mod aggregator;
pub mod formatter;
pub mod grouper;
pub mod normalizer;
pub mod pipeline;
pub mod summary;

pub use aggregator::{aggregate, AggregateStats};
pub use grouper::group_records;
pub use normalizer::{normalize, NormalizeStats};
pub use pipeline::*;
pub use summary::{QaSummary, RecordSummary};

//! Error types for the IntelliDealer upload pipeline.
//!
//! - [`CsvError`] - CSV ingestion and serialization errors
//! - [`ConfigError`] - Location table and environment settings errors
//! - [`PipelineError`] - Top-level orchestration errors
//! - [`ServerError`] - HTTP upload errors
//!
//! Per-cell problems (bad dates, bad amounts, missing columns) are never
//! errors: they are absorbed into fallback values by the normalizer and
//! counted in the QA summary. Only a malformed file fails a run.

use thiserror::Error;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing CSV payloads.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid CSV format at a given line.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Writing the output CSV failed.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),
}

impl CsvError {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        CsvError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        match err.into_kind() {
            csv::ErrorKind::Io(io) => CsvError::IoError(io),
            csv::ErrorKind::UnequalLengths { expected_len, len, .. } => CsvError::parse(
                line,
                format!("expected {} fields, found {}", expected_len, len),
            ),
            other => CsvError::parse(line, format!("{:?}", other)),
        }
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors while loading settings or the location table.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Location table file could not be read.
    #[error("Cannot read location table '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Location table JSON is malformed.
    #[error("Invalid location table: {0}")]
    InvalidTable(#[from] serde_json::Error),

    /// A location entry is unusable (duplicate code, bad suffix...).
    #[error("Invalid location entry '{code}': {message}")]
    InvalidEntry { code: String, message: String },

    /// An environment variable holds an unusable value.
    #[error("Invalid value for {name}: {value}")]
    InvalidEnv { name: String, value: String },
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::process_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV ingestion or serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error while writing outputs.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // CsvError -> PipelineError
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        // ConfigError -> PipelineError
        let config_err = ConfigError::InvalidEntry {
            code: "05".into(),
            message: "duplicate code".into(),
        };
        let pipeline_err: PipelineError = config_err.into();
        assert!(pipeline_err.to_string().contains("05"));
    }

    #[test]
    fn test_parse_error_format() {
        let err = CsvError::parse(7, "expected 3 fields, found 5");
        let msg = err.to_string();
        assert!(msg.contains("Line 7"));
        assert!(msg.contains("expected 3 fields"));
    }

    #[test]
    fn test_unequal_lengths_conversion() {
        let data = "a,b\n1,2,3\n";
        let mut reader = csv::ReaderBuilder::new().from_reader(data.as_bytes());
        let err = reader
            .records()
            .find_map(|r| r.err())
            .expect("row with extra field should fail");
        let converted: CsvError = err.into();
        assert!(converted.to_string().contains("expected 2 fields, found 3"));
    }
}

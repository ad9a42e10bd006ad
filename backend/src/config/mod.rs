//! Pipeline configuration.
//!
//! - [`PipelineOptions`] - which optional pipeline steps run for one upload
//! - [`LocationTable`] - location code to suffix letter and bank/payables accounts
//! - [`Settings`] - process-level settings read from the environment (`.env` supported)
//!
//! The location table is configuration data. The built-in table covers the
//! four dealership locations; a JSON file with the same shape replaces it:
//!
//! ```json
//! {
//!   "locations": [
//!     { "code": "01", "suffix": "W", "bankCostCtr": "001", "bankAcct": "10130",
//!       "payablesCostCtr": "000", "payablesAcct": "20010" }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ConfigError, ConfigResult};

/// Default HTTP port for `serve`.
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Pipeline options
// =============================================================================

/// How rows are partitioned into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GroupingMode {
    /// One record per invoice, split per bank account when an invoice spans
    /// several bank accounts.
    #[default]
    BankAccount,
    /// A new record every time the invoice number changes from the previous
    /// row. Bank accounts are ignored.
    InvoiceChange,
}

impl FromStr for GroupingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bank-account" | "bank" => Ok(GroupingMode::BankAccount),
            "invoice-change" | "invoice" => Ok(GroupingMode::InvoiceChange),
            other => Err(format!(
                "unknown grouping mode '{}' (expected bank-account or invoice-change)",
                other
            )),
        }
    }
}

impl fmt::Display for GroupingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupingMode::BankAccount => f.write_str("bank-account"),
            GroupingMode::InvoiceChange => f.write_str("invoice-change"),
        }
    }
}

/// What the balancing row carries in `Bank Cost Ctr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalancingBankCostCtr {
    /// Left empty like every other non-copied field.
    #[default]
    Empty,
    /// Copied from the record's first row (derived from its location).
    FromRecord,
}

impl FromStr for BalancingBankCostCtr {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "empty" | "unset" => Ok(BalancingBankCostCtr::Empty),
            "from-record" | "location" => Ok(BalancingBankCostCtr::FromRecord),
            other => Err(format!(
                "unknown bank cost center policy '{}' (expected empty or from-record)",
                other
            )),
        }
    }
}

/// Optional steps of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineOptions {
    /// Reformat purchase dates and fill empty invoice numbers.
    pub fill_invoice_and_date: bool,
    /// Emit the `Record ID` column.
    pub assign_record_id: bool,
    /// Uppercase every value of both outputs.
    pub uppercase_output: bool,
    /// Insert one balancing row ahead of every record.
    pub synthesize_balancing_rows: bool,
    /// Record partitioning.
    pub grouping_mode: GroupingMode,
    /// `Bank Cost Ctr` on balancing rows.
    pub balancing_bank_cost_ctr: BalancingBankCostCtr,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            fill_invoice_and_date: true,
            assign_record_id: true,
            uppercase_output: true,
            synthesize_balancing_rows: false,
            grouping_mode: GroupingMode::BankAccount,
            balancing_bank_cost_ctr: BalancingBankCostCtr::Empty,
        }
    }
}

// =============================================================================
// Location table
// =============================================================================

/// One dealership location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationEntry {
    /// Two-character location code (`01`).
    pub code: String,
    /// Letter appended to invoice labels, if any.
    #[serde(default)]
    pub suffix: Option<char>,
    pub bank_cost_ctr: String,
    pub bank_acct: String,
    pub payables_cost_ctr: String,
    pub payables_acct: String,
}

impl LocationEntry {
    fn new(code: &str, suffix: char, bank_cost_ctr: &str, bank_acct: &str, payables_acct: &str) -> Self {
        Self {
            code: code.to_string(),
            suffix: Some(suffix),
            bank_cost_ctr: bank_cost_ctr.to_string(),
            bank_acct: bank_acct.to_string(),
            payables_cost_ctr: "000".to_string(),
            payables_acct: payables_acct.to_string(),
        }
    }
}

/// Lookup from normalized location code to its entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationTable {
    locations: Vec<LocationEntry>,
}

impl Default for LocationTable {
    fn default() -> Self {
        Self {
            locations: vec![
                LocationEntry::new("01", 'W', "001", "10130", "20010"),
                LocationEntry::new("02", 'F', "000", "10138", "20011"),
                LocationEntry::new("03", 'M', "001", "10130", "20010"),
                LocationEntry::new("04", 'G', "000", "10138", "20011"),
            ],
        }
    }
}

impl LocationTable {
    /// Build a table, normalizing codes and rejecting duplicates.
    pub fn new(locations: Vec<LocationEntry>) -> ConfigResult<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(locations.len());

        for mut entry in locations {
            entry.code = crate::transform::normalizer::normalize_location(&entry.code);
            if entry.code.is_empty() {
                return Err(ConfigError::InvalidEntry {
                    code: entry.code,
                    message: "empty location code".into(),
                });
            }
            if let Some(letter) = entry.suffix {
                if !letter.is_ascii_alphabetic() {
                    return Err(ConfigError::InvalidEntry {
                        code: entry.code,
                        message: format!("suffix '{}' is not a letter", letter),
                    });
                }
            }
            if !seen.insert(entry.code.clone()) {
                return Err(ConfigError::InvalidEntry {
                    code: entry.code,
                    message: "duplicate location code".into(),
                });
            }
            normalized.push(entry);
        }

        Ok(Self { locations: normalized })
    }

    /// Parse a table from JSON.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let raw: LocationTable = serde_json::from_str(json)?;
        Self::new(raw.locations)
    }

    /// Load a table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Entry for a normalized location code.
    pub fn get(&self, code: &str) -> Option<&LocationEntry> {
        self.locations.iter().find(|e| e.code == code)
    }

    /// Suffix letter for a normalized location code.
    pub fn suffix(&self, code: &str) -> Option<char> {
        self.get(code).and_then(|e| e.suffix)
    }

    pub fn entries(&self) -> &[LocationEntry] {
        &self.locations
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Process settings from the environment.
///
/// | Variable                    | Meaning                           |
/// |-----------------------------|-----------------------------------|
/// | `INTELLIDEALER_PORT`        | HTTP port for `serve`             |
/// | `INTELLIDEALER_LOCATIONS`   | JSON location table file          |
/// | `INTELLIDEALER_OUTPUT_DIR`  | Default directory for output CSVs |
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub port: u16,
    pub locations_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            locations_path: None,
            output_dir: None,
        }
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, so tests need not touch the environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut settings = Settings::default();

        if let Some(port) = lookup("INTELLIDEALER_PORT").filter(|v| !v.trim().is_empty()) {
            settings.port = port.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "INTELLIDEALER_PORT".into(),
                value: port.clone(),
            })?;
        }
        settings.locations_path = lookup("INTELLIDEALER_LOCATIONS")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        settings.output_dir = lookup("INTELLIDEALER_OUTPUT_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(settings)
    }

    /// Location table from `locations_path`, or the built-in one.
    pub fn location_table(&self) -> ConfigResult<LocationTable> {
        match &self.locations_path {
            Some(path) => LocationTable::load(path),
            None => Ok(LocationTable::default()),
        }
    }
}

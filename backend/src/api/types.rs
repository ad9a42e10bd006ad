//! REST API types.
//!
//! The upload response carries both output files inline so a client can
//! offer them as downloads without a second round trip.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::transform::pipeline::{CsvInfo, OutputFile, PipelineOutput};
use crate::transform::summary::QaSummary;

/// Response sent after a CSV upload is processed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Unique job identifier
    pub job_id: String,

    /// "ready" or "warning" (something was repaired or left unassigned)
    pub status: String,

    /// Main upload file first, then the parts file when present
    pub files: Vec<OutputFile>,

    pub summary: QaSummary,

    pub csv_info: CsvInfo,
}

impl From<PipelineOutput> for UploadResponse {
    fn from(output: PipelineOutput) -> Self {
        let status = if output.summary.has_warnings() { "warning" } else { "ready" };
        let files = std::iter::once(output.main).chain(output.parts).collect();

        UploadResponse {
            job_id: Uuid::new_v4().to_string(),
            status: status.to_string(),
            files,
            summary: output.summary,
            csv_info: output.csv_info,
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "jobId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "files": [],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocationTable, PipelineOptions};
    use crate::transform::pipeline::process_bytes;

    fn upload(csv: &str) -> UploadResponse {
        process_bytes(csv.as_bytes(), "june.csv", &PipelineOptions::default(), &LocationTable::default())
            .unwrap()
            .into()
    }

    #[test]
    fn test_response_lists_files_in_order() {
        let response = upload("Invoice #,Location,GL Acct,GL Amt\nA,1,6000,5\nA,1,99999,2\n");

        let names: Vec<_> = response.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["IntelliDealer_Upload_june.csv", "june_PARTS.csv"]);
        assert_eq!(response.status, "ready");
        assert!(Uuid::parse_str(&response.job_id).is_ok());
    }

    #[test]
    fn test_warning_status_on_unknown_location() {
        let response = upload("Invoice #,Location,GL Amt\nA,77,5\n");
        assert_eq!(response.status, "warning");
        assert_eq!(response.files.len(), 1);
    }

    #[test]
    fn test_camel_case_json() {
        let json = serde_json::to_value(upload("Invoice #,Location,GL Amt\nA,1,5\n")).unwrap();
        assert!(json["jobId"].is_string());
        assert_eq!(json["csvInfo"]["rowCount"], 1);
        assert_eq!(json["summary"]["records"], 1);
    }

    #[test]
    fn test_error_response_shape() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}

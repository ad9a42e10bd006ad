//! HTTP Server for the IntelliDealer upload converter.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/upload`     | Upload CSV, get both output files    |
//! | GET    | `/api/locations`  | Location table in use                |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! `/api/upload` takes a multipart form: a `file` part with the CSV, an
//! optional `options` part holding [`PipelineOptions`] as JSON, and optional
//! single-option parts named like the JSON keys (`synthesizeBalancingRows`,
//! `groupingMode`...). Single-option parts win over `options`. Missing
//! options take their defaults.

use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, UploadResponse};
use crate::config::{LocationTable, PipelineOptions};
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::transform::pipeline::process_bytes;

/// Shared state of the server.
pub struct AppState {
    pub locations: LocationTable,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::BadRequest(_) | ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(error_response(&self.to_string()))).into_response()
    }
}

/// Build the router; split out of [`start_server`] for tests.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/locations", get(locations))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, locations: LocationTable) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(AppState { locations }));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 IntelliDealer converter running on http://localhost:{}", port);
    println!("   POST /api/upload    - Upload CSV file");
    println!("   GET  /api/locations - Location table");
    println!("   GET  /api/logs      - SSE log stream");
    println!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "intellidealer",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "locations": "GET /api/locations",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn locations(State(state): State<Arc<AppState>>) -> Json<LocationTable> {
    Json(state.locations.clone())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    // Lagged receivers skip what they missed
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart parts that set a single pipeline option.
const OPTION_FIELDS: [&str; 6] = [
    "fillInvoiceAndDate",
    "assignRecordId",
    "uppercaseOutput",
    "synthesizeBalancingRows",
    "groupingMode",
    "balancingBankCostCtr",
];

fn parse_flag(name: &str, value: &str) -> ServerResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(ServerError::BadRequest(format!("Invalid value for {}: {}", name, other))),
    }
}

/// Set one option from its multipart part.
fn apply_option_field(options: &mut PipelineOptions, name: &str, value: &str) -> ServerResult<()> {
    match name {
        "fillInvoiceAndDate" => options.fill_invoice_and_date = parse_flag(name, value)?,
        "assignRecordId" => options.assign_record_id = parse_flag(name, value)?,
        "uppercaseOutput" => options.uppercase_output = parse_flag(name, value)?,
        "synthesizeBalancingRows" => options.synthesize_balancing_rows = parse_flag(name, value)?,
        "groupingMode" => options.grouping_mode = value.parse().map_err(ServerError::BadRequest)?,
        "balancingBankCostCtr" => {
            options.balancing_bank_cost_ctr = value.parse().map_err(ServerError::BadRequest)?
        }
        _ => {}
    }
    Ok(())
}

/// Upload CSV endpoint
async fn upload_csv(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> ServerResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = PipelineOptions::default();
    let mut overrides: Vec<(String, String)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(bytes.to_vec());
            }
            "options" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                options = serde_json::from_str(&text)
                    .map_err(|e| ServerError::BadRequest(format!("Invalid options: {}", e)))?;
            }
            option if OPTION_FIELDS.contains(&option) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                overrides.push((option.to_string(), text));
            }
            _ => {}
        }
    }

    for (name, value) in &overrides {
        apply_option_field(&mut options, name, value)?;
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".into()))?;
    let file_name = file_name.unwrap_or_else(|| "upload.csv".to_string());

    log_info(format!("📄 New upload: {} ({} bytes)", file_name, bytes.len()));

    let output = tokio::task::spawn_blocking(move || process_bytes(&bytes, &file_name, &options, &state.locations))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(|e| {
            log_error(format!("Processing failed: {}", e));
            ServerError::from(e)
        })?;

    Ok(Json(UploadResponse::from(output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;

    #[test]
    fn test_error_status_codes() {
        let bad = ServerError::BadRequest("no file".into()).into_response();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let malformed = ServerError::Pipeline(PipelineError::Csv(CsvError::EmptyFile)).into_response();
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

        let internal = ServerError::Internal("join".into()).into_response();
        assert_eq!(internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_option_fields_override_defaults() {
        let mut options = PipelineOptions::default();

        apply_option_field(&mut options, "synthesizeBalancingRows", "true").unwrap();
        apply_option_field(&mut options, "uppercaseOutput", "off").unwrap();
        apply_option_field(&mut options, "groupingMode", "invoice-change").unwrap();

        assert!(options.synthesize_balancing_rows);
        assert!(!options.uppercase_output);
        assert_eq!(options.grouping_mode, crate::config::GroupingMode::InvoiceChange);
        assert!(options.fill_invoice_and_date);
    }

    #[test]
    fn test_option_field_rejects_bad_value() {
        let mut options = PipelineOptions::default();
        let err = apply_option_field(&mut options, "assignRecordId", "maybe").unwrap_err();
        assert!(matches!(err, ServerError::BadRequest(_)));
        assert!(apply_option_field(&mut options, "groupingMode", "weekly").is_err());
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let Json(body) = health().await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "intellidealer");
    }

    #[tokio::test]
    async fn test_locations_endpoint_returns_table() {
        let state = Arc::new(AppState {
            locations: LocationTable::default(),
        });
        let Json(table) = locations(State(state)).await;
        assert_eq!(table.entries().len(), 4);
    }
}

//! HTTP server mode for REST API access to the store

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::ingest::{parse_data_date, IngestEngine};
use crate::query::QueryEngine;

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    config: Arc<StoreConfig>,
    /// One shared append engine so the per-partition-group locks actually
    /// serialize concurrent ingestion requests
    ingest: Arc<IngestEngine>,
}

/// Request body for record ingestion
#[derive(Debug, Deserialize)]
struct IngestRequest {
    /// A JSON object or array of objects
    records: Value,
    /// Logical date (YYYY-MM-DD or RFC 3339); defaults to now
    #[serde(default)]
    data_date: Option<String>,
    /// Data type tag; defaults to "default"
    #[serde(default)]
    data_type: Option<String>,
}

/// Request body for raw SQL
#[derive(Debug, Deserialize)]
struct SqlRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

/// Request body for date-range queries
#[derive(Debug, Deserialize)]
struct DateRangeRequest {
    start_date: String,
    end_date: String,
    #[serde(default)]
    limit: Option<usize>,
}

/// Request body for free-text search
#[derive(Debug, Deserialize)]
struct SearchRequest {
    search_term: String,
    #[serde(default)]
    column: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Query parameters for the recent-records endpoint
#[derive(Debug, Deserialize)]
struct RecentParams {
    #[serde(default)]
    hours: Option<u32>,
    #[serde(default)]
    limit: Option<usize>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Map an error to an HTTP response: input problems are the caller's fault,
/// everything else is a server-side failure
fn error_response(e: &Error) -> axum::response::Response {
    let status = if e.is_input_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
}

/// Start the HTTP server
pub async fn serve(config: Arc<StoreConfig>, port: u16) -> Result<()> {
    let ingest = Arc::new(IngestEngine::new(Arc::clone(&config))?);
    let state = AppState { config, ingest };

    // Allow all origins for development
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/statistics", get(statistics))
        .route("/ingest", post(ingest_records))
        .route("/ingest/file", post(ingest_file))
        .route("/query/sql", post(query_sql))
        .route("/query/id/:record_id", get(query_by_id))
        .route("/query/date-range", post(query_date_range))
        .route("/query/recent", get(query_recent))
        .route("/query/search", post(search_records))
        .route("/files", get(list_files))
        .route("/schema", get(get_schema))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::config(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::config(format!("Server error: {e}")))?;

    Ok(())
}

/// Service info endpoint
async fn root() -> impl IntoResponse {
    Json(json!({
        "name": crate::NAME,
        "version": crate::VERSION,
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "statistics": "/statistics",
            "ingest": "/ingest",
            "query": "/query/sql"
        }
    }))
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "healthy", "database": "connected" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Dataset and file statistics
async fn statistics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let query_engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    let statistics = match query_engine.statistics() {
        Ok(stats) => stats,
        Err(e) => return error_response(&e),
    };

    let files = match state.ingest.file_stats() {
        Ok(files) => files,
        Err(e) => return error_response(&e),
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(json!({
            "query_statistics": statistics,
            "file_statistics": files,
        }))),
    )
        .into_response()
}

/// Ingest JSON records
///
/// Supports single records or batches. Data is partitioned by logical date
/// and type, e.g. a batch dated 2025-10-15 of type `log` lands under
/// `2025/10/` in a `log_*` partition file.
async fn ingest_records(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> impl IntoResponse {
    let data_date = match req.data_date.as_deref().map(parse_data_date).transpose() {
        Ok(date) => date,
        Err(e) => return error_response(&e),
    };

    match state
        .ingest
        .append(&req.records, data_date, req.data_type.as_deref())
    {
        Ok(receipt) => (StatusCode::OK, Json(ApiResponse::success(receipt))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Ingest a JSON-array or JSONL payload sent as the request body
async fn ingest_file(State(state): State<Arc<AppState>>, body: String) -> impl IntoResponse {
    match state.ingest.ingest_content(&body, 10_000, None, None) {
        Ok(report) => (StatusCode::OK, Json(ApiResponse::success(report))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Execute raw SQL against the `all_records` view
async fn query_sql(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SqlRequest>,
) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.execute_sql(&req.query, req.limit) {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Query a record by ID
async fn query_by_id(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.query_by_id(&record_id) {
        Ok(outcome) => {
            if outcome.row_count == 0 {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ApiResponse::<()>::error("Record not found")),
                )
                    .into_response();
            }
            (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Query records within a logical-date range
async fn query_date_range(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DateRangeRequest>,
) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.query_by_date_range(&req.start_date, &req.end_date, req.limit) {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Query records from the last N hours (default: 24)
async fn query_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RecentParams>,
) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.query_recent(params.hours.unwrap_or(24), params.limit) {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// Free-text search across records
async fn search_records(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.search(&req.search_term, req.column.as_deref(), req.limit) {
        Ok(outcome) => (StatusCode::OK, Json(ApiResponse::success(outcome))).into_response(),
        Err(e) => error_response(&e),
    }
}

/// List partition files with metadata
async fn list_files(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.ingest.file_stats() {
        Ok(files) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "files": files,
                "total_files": files.len(),
            }))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// Current unified schema of the dataset view
async fn get_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let engine = match QueryEngine::new(Arc::clone(&state.config)) {
        Ok(engine) => engine,
        Err(e) => return error_response(&e),
    };

    match engine.execute_sql("DESCRIBE all_records", None) {
        Ok(outcome) if outcome.no_data => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({
                "status": "no_data",
                "message": "No data ingested yet",
            }))),
        )
            .into_response(),
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(json!({ "schema": outcome.rows }))),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

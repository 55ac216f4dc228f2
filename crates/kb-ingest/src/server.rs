//! JSON HTTP API over the knowledge base.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/api/health` | Health check (status, version, timestamp) |
//! | `GET`    | `/api/conversations` | List with `q`, `platform`, `category`, `source`, `type` filters |
//! | `POST`   | `/api/conversations` | Insert a JSON array of conversations |
//! | `DELETE` | `/api/conversations` | Delete every conversation |
//! | `POST`   | `/api/ingest` | Run raw files (base64) through the ingest pipeline |
//!
//! Filter values of `all` or empty are ignored. Errors are returned as
//! `{ "error": "message" }` with a 4xx/5xx status.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so the browser
//! dashboard can call the API from another port.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use kb_ingest_core::dedup::dedup_against;
use kb_ingest_core::extract::TextExtractor;
use kb_ingest_core::store::{ConversationFilter, ConversationStore};
use kb_ingest_core::{Conversation, IngestPipeline, InputFile};

use crate::config::Config;
use crate::extract::build_extractor;
use crate::ingest::report_json;
use crate::sqlite_store;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ConversationStore>,
    pub extractor: Option<Arc<dyn TextExtractor>>,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(sqlite_store::open(config).await?);
    let state = AppState {
        store,
        extractor: build_extractor(&config.extractor)?,
    };

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "server listening");
    println!("kb server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Builds the API router. Exposed so tests and embedding hosts can serve
/// it with their own listener and store.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handle_health))
        .route(
            "/api/conversations",
            get(handle_list)
                .post(handle_insert)
                .delete(handle_delete_all),
        )
        .route("/api/ingest", post(handle_ingest))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn internal(context: &str, err: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %err, "{}", context);
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: context.to_string(),
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

// ============ /api/conversations ============

async fn handle_list(
    State(state): State<AppState>,
    Query(filter): Query<ConversationFilter>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    let convs = state
        .store
        .fetch_all(&filter)
        .await
        .map_err(|e| internal("Failed to fetch conversations", e))?;
    Ok(Json(convs))
}

/// Inserts a client-normalized batch. Ids already stored (or repeated in
/// the payload) are skipped rather than failing the request.
async fn handle_insert(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let invalid = "Invalid payload. Expected an array of conversations.";
    match &body {
        Value::Array(items) if !items.is_empty() => {}
        _ => return Err(bad_request(invalid)),
    }
    let batch: Vec<Conversation> =
        serde_json::from_value(body).map_err(|e| bad_request(format!("{} {}", invalid, e)))?;

    let existing = state
        .store
        .existing_ids()
        .await
        .map_err(|e| internal("Failed to insert conversations", e))?;
    let deduped = dedup_against(&batch, &existing);
    let inserted = if deduped.fresh.is_empty() {
        0
    } else {
        state
            .store
            .insert_many(&deduped.fresh)
            .await
            .map_err(|e| internal("Failed to insert conversations", e))?
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "insertedCount": inserted })),
    ))
}

async fn handle_delete_all(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let deleted = state
        .store
        .delete_all()
        .await
        .map_err(|e| internal("Failed to delete conversations", e))?;
    Ok(Json(json!({ "success": true, "deletedCount": deleted })))
}

// ============ POST /api/ingest ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestRequest {
    files: Vec<UploadedFile>,
    #[serde(default)]
    dry_run: bool,
}

#[derive(Deserialize)]
struct UploadedFile {
    name: String,
    /// Base64 file content.
    data: String,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<Value>, AppError> {
    if req.files.is_empty() {
        return Err(bad_request("files must not be empty"));
    }
    let mut files = Vec::with_capacity(req.files.len());
    for f in req.files {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(f.data.as_bytes())
            .map_err(|e| bad_request(format!("{}: invalid base64: {}", f.name, e)))?;
        files.push(InputFile::new(f.name, bytes));
    }

    let mut pipeline = IngestPipeline::new(state.store.clone()).dry_run(req.dry_run);
    if let Some(extractor) = &state.extractor {
        pipeline = pipeline.with_extractor(extractor.clone());
    }

    let report = pipeline
        .ingest(files)
        .await
        .map_err(|e| internal("Failed to persist conversations", e))?;
    Ok(Json(report_json(&report)))
}

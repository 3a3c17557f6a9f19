//! JSON-over-HTTP tool server.
//!
//! Serves the same [`ToolRegistry`] as the MCP bridge, for clients that
//! prefer plain HTTP.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name; body is the JSON parameters |
//! | `GET`  | `/health` | Health check (version and document count) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "search_documents: invalid query: query must not be empty" } }
//! ```
//!
//! | Code | Status | Cause |
//! |------|--------|-------|
//! | `bad_request` | 400 | parameter validation, empty query, invalid regex |
//! | `not_found` | 404 | unknown tool or document |
//! | `scan_error` | 422 | unusable scan directory |
//! | `tool_error` | 500 | anything else |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::IndexError;
use crate::index::DocumentIndex;
use crate::tools::{validate_params, ToolContext, ToolInfo, ToolRegistry};

/// Shared state for every handler.
#[derive(Clone)]
struct AppState {
    index: Arc<DocumentIndex>,
    tools: Arc<ToolRegistry>,
}

/// Builds the router without binding; used by [`run_server`] and tests.
pub fn router(index: Arc<DocumentIndex>, tools: Arc<ToolRegistry>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { index, tools })
}

/// Binds `bind` and serves until the process is terminated.
pub async fn run_server(
    bind: &str,
    index: Arc<DocumentIndex>,
    tools: Arc<ToolRegistry>,
) -> anyhow::Result<()> {
    for t in tools.tools() {
        tracing::debug!(tool = t.name(), "registered POST /tools/{}", t.name());
    }
    let app = router(index, tools);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind = %bind, "HTTP tool server listening");
    println!("docsift listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn scan_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "scan_error",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

/// Maps a tool failure to a response by the [`IndexError`] behind it.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let message = format!("{}: {}", tool_name, err);
    match err.downcast_ref::<IndexError>() {
        Some(IndexError::InvalidQuery(_) | IndexError::InvalidPattern { .. }) => {
            bad_request(message)
        }
        Some(IndexError::NotFound(_)) => not_found(message),
        Some(IndexError::Scan { .. }) => scan_error(message),
        _ => {
            tracing::warn!(tool = tool_name, error = %err, "tool failed");
            tool_error(message)
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        documents: state.index.cache().len(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    let tools = state
        .tools
        .tools()
        .iter()
        .map(|t| ToolInfo::of(t.as_ref()))
        .collect();
    Json(ToolListResponse { tools })
}

// ============ POST /tools/{name} ============

/// Returns `{ "result": ... }` on success.
async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    let params = validate_params(&tool.parameters_schema(), &params)
        .map_err(|e| bad_request(format!("{}: {}", name, e)))?;

    let ctx = ToolContext::new(Arc::clone(&state.index));
    let result = tool
        .execute(params, &ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}

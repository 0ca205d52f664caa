//! Jaeger query API endpoints
//!
//! Same paths and envelope as the Jaeger query service, so the stock Jaeger
//! UI works unchanged against this server.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::domain::jaeger::query::keys;
use crate::domain::jaeger::{
    EngineError, JaegerService, Params, StructuredResponse, TraceLookup,
};

/// Raw, possibly repeated query-string pairs
type QueryPairs = Query<Vec<(String, String)>>;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct JaegerApiState {
    pub jaeger: Arc<JaegerService>,
}

pub fn routes(jaeger: Arc<JaegerService>) -> Router<()> {
    let state = JaegerApiState { jaeger };
    Router::new()
        .route("/services", get(list_services))
        .route("/services/{service}/operations", get(list_service_operations))
        .route("/operations", get(list_operations))
        .route("/traces", get(find_traces))
        .route("/traces/{trace_id}", get(get_trace))
        .with_state(state)
}

impl IntoResponse for StructuredResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

fn log_failure(route: &'static str, error: &EngineError) {
    match error {
        EngineError::NotFound { .. } => {
            tracing::debug!(route, error = %error, "No matching data");
        }
        EngineError::Validation(_) => {
            tracing::debug!(route, error = %error, "Rejected request");
        }
        EngineError::Backend(_) => {
            tracing::warn!(route, code = error.code(), error = %error, "Backend query failed");
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// List services
#[utoipa::path(
    get,
    path = "/api/services",
    tag = "jaeger",
    params(("version" = Option<String>, Query, description = "`report` selects background search")),
    responses((status = 200, description = "Service names"))
)]
pub async fn list_services(
    State(state): State<JaegerApiState>,
    Query(pairs): QueryPairs,
) -> StructuredResponse {
    let mode = Params::new(&pairs).report_mode();
    match state.jaeger.get_services(mode).await {
        Ok(services) => StructuredResponse::values(services),
        Err(e) => {
            log_failure("services", &e);
            StructuredResponse::from_listing_error(&e)
        }
    }
}

/// List operations for a service
#[utoipa::path(
    get,
    path = "/api/services/{service}/operations",
    tag = "jaeger",
    params(
        ("service" = String, Path, description = "Service name"),
        ("version" = Option<String>, Query, description = "`report` selects background search")
    ),
    responses((status = 200, description = "Operation names"))
)]
pub async fn list_service_operations(
    State(state): State<JaegerApiState>,
    Path(service): Path<String>,
    Query(pairs): QueryPairs,
) -> StructuredResponse {
    operations(&state, &service, &pairs).await
}

/// List operations, service given as a query parameter
#[utoipa::path(
    get,
    path = "/api/operations",
    tag = "jaeger",
    params(("service" = String, Query, description = "Service name")),
    responses(
        (status = 200, description = "Operation names"),
        (status = 400, description = "Missing service")
    )
)]
pub async fn list_operations(
    State(state): State<JaegerApiState>,
    Query(pairs): QueryPairs,
) -> StructuredResponse {
    let service = Params::new(&pairs).first(keys::SERVICE).unwrap_or_default();
    operations(&state, service, &pairs).await
}

async fn operations(
    state: &JaegerApiState,
    service: &str,
    pairs: &[(String, String)],
) -> StructuredResponse {
    let mode = Params::new(pairs).report_mode();
    match state.jaeger.get_operations(service, mode).await {
        Ok(ops) => StructuredResponse::values(ops),
        Err(e) => {
            log_failure("operations", &e);
            StructuredResponse::from_listing_error(&e)
        }
    }
}

/// Search traces
#[utoipa::path(
    get,
    path = "/api/traces",
    tag = "jaeger",
    params(
        ("service" = Option<String>, Query, description = "Service name, repeatable"),
        ("operation" = Option<String>, Query, description = "Operation name, repeatable"),
        ("tag" = Option<String>, Query, description = "`key:value` predicate, repeatable"),
        ("tags" = Option<String>, Query, description = "JSON object of tag predicates"),
        ("start" = Option<i64>, Query, description = "Window start, microseconds"),
        ("end" = Option<i64>, Query, description = "Window end, microseconds"),
        ("minDuration" = Option<String>, Query, description = "e.g. `10ms`"),
        ("maxDuration" = Option<String>, Query, description = "e.g. `2s`"),
        ("limit" = Option<i64>, Query, description = "Maximum traces"),
        ("traceID" = Option<String>, Query, description = "Explicit trace id, repeatable")
    ),
    responses(
        (status = 200, description = "Matching traces"),
        (status = 400, description = "Invalid query")
    )
)]
pub async fn find_traces(
    State(state): State<JaegerApiState>,
    Query(pairs): QueryPairs,
) -> StructuredResponse {
    let result = match state.jaeger.parser().parse(&pairs) {
        Ok(query) => state.jaeger.find_traces(&query).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(traces) => StructuredResponse::traces(traces),
        Err(e) => {
            log_failure("traces", &e);
            StructuredResponse::from_trace_error(&e)
        }
    }
}

/// Fetch one trace
#[utoipa::path(
    get,
    path = "/api/traces/{trace_id}",
    tag = "jaeger",
    params(
        ("trace_id" = String, Path, description = "Trace id"),
        ("start" = Option<i64>, Query, description = "Window start, seconds or microseconds"),
        ("end" = Option<i64>, Query, description = "Window end, seconds or microseconds")
    ),
    responses(
        (status = 200, description = "The trace"),
        (status = 404, description = "Trace not found")
    )
)]
pub async fn get_trace(
    State(state): State<JaegerApiState>,
    Path(trace_id): Path<String>,
    Query(pairs): QueryPairs,
) -> StructuredResponse {
    let result = match TraceLookup::parse(&trace_id, &pairs) {
        Ok(lookup) => state.jaeger.get_trace(&lookup).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(traces) => StructuredResponse::traces(traces),
        Err(e) => {
            log_failure("trace", &e);
            StructuredResponse::from_trace_error(&e)
        }
    }
}

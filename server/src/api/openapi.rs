//! OpenAPI specification

use axum::http::header;
use axum::response::{IntoResponse, Json};
use utoipa::OpenApi;

use crate::api::routes::{health, jaeger};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "TraceBridge API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Jaeger query API served from OpenObserve"
    ),
    tags(
        (name = "health", description = "Health check endpoint"),
        (name = "jaeger", description = "Jaeger-compatible trace queries")
    ),
    paths(
        health::health,
        jaeger::list_services,
        jaeger::list_service_operations,
        jaeger::list_operations,
        jaeger::find_traces,
        jaeger::get_trace,
    ),
    components(schemas(health::HealthResponse))
)]
pub struct ApiDoc;

/// Serve OpenAPI JSON specification
pub async fn openapi_json() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/json")],
        Json(ApiDoc::openapi()),
    )
}

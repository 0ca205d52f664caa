//! API server initialization

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::openapi::openapi_json;
use super::routes::{health, jaeger};
use crate::core::CoreApp;
use crate::core::constants::SHUTDOWN_TIMEOUT_SECS;
use crate::domain::JaegerService;

/// Full HTTP router: Jaeger query API, health, OpenAPI document
pub fn router(service: Arc<JaegerService>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .nest("/api", jaeger::routes(service))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors())
        .layer(TraceLayer::new_for_http())
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered, then drain in-flight requests
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(
            app.config
                .server
                .host
                .parse()
                .with_context(|| format!("Invalid server.host: {}", app.config.server.host))?,
            app.config.server.port,
        );

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(%addr, "Jaeger query API listening");

        let server = axum::serve(listener, router(app.jaeger.clone()))
            .with_graceful_shutdown(shutdown.wait())
            .into_future();

        let drain_deadline = async {
            shutdown.wait().await;
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_TIMEOUT_SECS)).await;
        };

        tokio::select! {
            result = server => result?,
            _ = drain_deadline => {
                tracing::warn!(
                    timeout_secs = SHUTDOWN_TIMEOUT_SECS,
                    "Timeout waiting for in-flight requests"
                );
            }
        }

        Ok(app)
    }
}

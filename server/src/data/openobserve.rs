//! OpenObserve search client
//!
//! Sends SQL searches to `POST {url}/api/{org}/_search`. The SQL text travels
//! base64-encoded; the dataset and scheduling hint travel as query params.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::core::config::OpenObserveConfig;
use crate::data::error::BackendError;
use crate::data::traits::{QueryBackend, Row, SearchRequest, SearchResponse};
use crate::utils::retry::{DEFAULT_BASE_DELAY_MS, retry_with_backoff_async};

/// Size sent when a request has no row cap
const UNBOUNDED_SIZE: i64 = -1;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: SearchBodyQuery,
    aggs: Map<String, Value>,
    encoding: &'static str,
    search_type: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchBodyQuery {
    sql: String,
    sql_mode: &'static str,
    start_time: i64,
    end_time: i64,
    from: i64,
    size: i64,
    skip_wal: bool,
}

impl<'a> SearchBody<'a> {
    fn from_request(request: &'a SearchRequest) -> Self {
        let size = request
            .size
            .and_then(|s| i64::try_from(s).ok())
            .unwrap_or(UNBOUNDED_SIZE);
        Self {
            query: SearchBodyQuery {
                sql: BASE64.encode(request.sql.as_bytes()),
                sql_mode: "full",
                start_time: request.window.start_micros,
                end_time: request.window.end_micros,
                from: 0,
                size,
                skip_wal: request.skip_cache,
            },
            aggs: Map::new(),
            encoding: "base64",
            search_type: request.mode.as_str(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TookDetail {
    #[serde(default)]
    total: u64,
    #[serde(default)]
    wait_queue: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    hits: Vec<Row>,
    #[serde(default)]
    total: i64,
    #[serde(default)]
    took: u64,
    #[serde(default)]
    took_detail: Option<TookDetail>,
    #[serde(default)]
    trace_id: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug)]
pub struct OpenObserveClient {
    client: reqwest::Client,
    base_url: String,
    organization: String,
    max_attempts: u32,
    slow_query_ms: u64,
}

impl OpenObserveClient {
    pub fn new(config: &OpenObserveConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(auth) = config.auth.as_deref().filter(|a| !a.is_empty()) {
            let value = HeaderValue::from_str(&format!("Basic {}", auth))
                .map_err(|e| BackendError::Config(format!("invalid auth credential: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| BackendError::Config(format!("failed to build HTTP client: {}", e)))?;

        tracing::debug!(
            url = %config.url,
            organization = %config.organization,
            timeout_secs = config.timeout_secs,
            "OpenObserve client initialized"
        );
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
            max_attempts: config.max_attempts,
            slow_query_ms: config.slow_query_ms,
        })
    }

    fn search_url(&self, request: &SearchRequest) -> String {
        format!(
            "{}/api/{}/_search?type={}&search_type={}",
            self.base_url,
            self.organization,
            request.source.as_str(),
            request.mode.as_str()
        )
    }

    async fn send(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let url = self.search_url(request);
        let body = SearchBody::from_request(request);
        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::status(status.as_u16(), text));
        }

        let bytes = resp.bytes().await?;
        let result: SearchResult =
            serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))?;

        let detail = result.took_detail.unwrap_or_default();
        tracing::debug!(
            source = request.source.as_str(),
            mode = request.mode.as_str(),
            took_ms = result.took,
            total_ms = detail.total,
            wait_queue_ms = detail.wait_queue,
            hits = result.hits.len(),
            "Search completed"
        );
        if result.took > self.slow_query_ms {
            tracing::warn!(
                took_ms = result.took,
                sql = %request.sql,
                backend_trace_id = result.trace_id.as_deref().unwrap_or(""),
                "Slow backend query"
            );
        }

        Ok(SearchResponse {
            total: result.total.max(0) as u64,
            hits: result.hits,
        })
    }
}

#[async_trait]
impl QueryBackend for OpenObserveClient {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        retry_with_backoff_async(
            self.max_attempts,
            DEFAULT_BASE_DELAY_MS,
            BackendError::is_transient,
            || self.send(request),
        )
        .await
        .map_err(|(e, attempts)| {
            tracing::warn!(error = %e, attempts, sql = %request.sql, "Backend search failed");
            e
        })
    }
}

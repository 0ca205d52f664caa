//! Jaeger query service
//!
//! Entry point for the four Jaeger query operations. Owns the backend handle
//! and every engine component; holds no mutable state, so one instance is
//! shared across all requests.

use serde_json::Value;
use std::sync::Arc;

use crate::core::config::{OpenObserveConfig, QueryConfig};
use crate::data::fields;
use crate::data::traits::{DataSource, QueryBackend, Row, SearchMode, SearchRequest, SearchWindow};
use crate::domain::jaeger::adjust::adjust;
use crate::domain::jaeger::assemble::{SpanAssembler, group_by_trace_id};
use crate::domain::jaeger::envelope::UiTrace;
use crate::domain::jaeger::error::{EngineError, ValidationError};
use crate::domain::jaeger::query::{QueryParser, TraceLookup, TraceQuery};
use crate::domain::jaeger::retriever::{RetrieverSettings, TraceRetriever};
use crate::domain::jaeger::sql::{Streams, operations_sql, services_sql};
use crate::utils::time::now_micros;

const MICROS_PER_MINUTE: i64 = 60 * 1_000_000;
const MICROS_PER_HOUR: i64 = 60 * MICROS_PER_MINUTE;

/// Windows and limits for listings and fetch-by-id
#[derive(Debug, Clone)]
struct ListingSettings {
    metadata_range_micros: i64,
    trace_detail_range_micros: i64,
    services_limit: u64,
    operations_limit: u64,
}

pub struct JaegerService {
    backend: Arc<dyn QueryBackend>,
    parser: QueryParser,
    retriever: TraceRetriever,
    assembler: SpanAssembler,
    streams: Streams,
    settings: ListingSettings,
    clock: fn() -> i64,
}

impl JaegerService {
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        openobserve: &OpenObserveConfig,
        query: &QueryConfig,
    ) -> Self {
        let streams = Streams {
            span_stream: openobserve.span_stream.clone(),
            trace_index_stream: openobserve
                .use_trace_index
                .then(|| openobserve.trace_index_stream.clone()),
            distinct_values_stream: openobserve.distinct_values_stream.clone(),
        };
        let retriever = TraceRetriever::new(
            backend.clone(),
            RetrieverSettings {
                streams: streams.clone(),
                span_fetch_padding_micros: scaled_micros(
                    query.span_fetch_padding_minutes,
                    MICROS_PER_MINUTE,
                ),
                max_spans: query.max_spans,
            },
        );

        Self {
            backend,
            parser: QueryParser::new(query),
            retriever,
            assembler: SpanAssembler::new(query.process_tag_prefixes.clone()),
            streams,
            settings: ListingSettings {
                metadata_range_micros: scaled_micros(query.metadata_range_hours, MICROS_PER_HOUR),
                trace_detail_range_micros: scaled_micros(
                    query.trace_detail_range_hours,
                    MICROS_PER_HOUR,
                ),
                services_limit: query.services_limit,
                operations_limit: query.operations_limit,
            },
            clock: now_micros,
        }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self.parser = self.parser.with_clock(clock);
        self
    }

    /// Parser for find-traces parameters
    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Service names seen in the metadata range
    pub async fn get_services(&self, mode: SearchMode) -> Result<Vec<String>, EngineError> {
        let sql = services_sql(&self.streams);
        tracing::debug!(sql = %sql, "Listing services");
        self.list_values(sql, self.settings.services_limit, mode, fields::SERVICE_NAME)
            .await
    }

    /// Operation names recorded for `service`
    pub async fn get_operations(
        &self,
        service: &str,
        mode: SearchMode,
    ) -> Result<Vec<String>, EngineError> {
        if service.is_empty() {
            return Err(ValidationError::ServiceRequired.into());
        }
        let sql = operations_sql(&self.streams, service);
        tracing::debug!(sql = %sql, service, "Listing operations");
        self.list_values(sql, self.settings.operations_limit, mode, fields::OPERATION_NAME)
            .await
    }

    async fn list_values(
        &self,
        sql: String,
        limit: u64,
        mode: SearchMode,
        column: &str,
    ) -> Result<Vec<String>, EngineError> {
        let now = (self.clock)();
        let window = SearchWindow::new(now - self.settings.metadata_range_micros, now);
        let request = SearchRequest::new(DataSource::Metadata, sql, window)
            .with_size(Some(limit))
            .with_mode(mode, false);
        let response = self.backend.search(&request).await?;

        Ok(response
            .hits
            .iter()
            .filter_map(|row| match row.get(column) {
                Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
                _ => None,
            })
            .collect())
    }

    /// Run both retrieval phases and assemble the matching traces
    ///
    /// Explicit trace ids skip id resolution. Span fetch always runs in
    /// interactive mode.
    pub async fn find_traces(&self, query: &TraceQuery) -> Result<Vec<UiTrace>, EngineError> {
        let trace_ids = if query.trace_ids.is_empty() {
            self.retriever.find_trace_ids(query).await?
        } else {
            tracing::debug!(traces = query.trace_ids.len(), "Using explicit trace ids");
            query.trace_ids.clone()
        };

        let rows = self
            .retriever
            .fetch_spans(&trace_ids, query.window, SearchMode::Interactive)
            .await?;
        Ok(self.build_traces(&trace_ids, rows))
    }

    /// Fetch one trace by id
    pub async fn get_trace(&self, lookup: &TraceLookup) -> Result<Vec<UiTrace>, EngineError> {
        let end = lookup.end_micros.unwrap_or_else(self.clock);
        let start = lookup
            .start_micros
            .unwrap_or(end - self.settings.trace_detail_range_micros);
        let ids = [lookup.trace_id.clone()];

        let rows = self
            .retriever
            .fetch_spans(&ids, SearchWindow::new(start, end), lookup.mode)
            .await?;
        Ok(self.build_traces(&ids, rows))
    }

    /// Group, assemble and adjust span rows, in `trace_ids` order
    fn build_traces(&self, trace_ids: &[String], rows: Vec<Row>) -> Vec<UiTrace> {
        let mut groups = group_by_trace_id(rows);
        groups.sort_by_key(|(id, _)| {
            trace_ids
                .iter()
                .position(|candidate| candidate == id)
                .unwrap_or(usize::MAX)
        });

        groups
            .into_iter()
            .map(|(trace_id, rows)| {
                let trace = self.assembler.assemble_trace(&trace_id, rows);
                let (mut trace, warnings) = adjust(trace);
                for warning in warnings {
                    tracing::warn!(trace_id = %trace.trace_id, warning = %warning, "Trace adjusted");
                    trace.warnings.push(warning.to_string());
                }
                UiTrace::from(trace)
            })
            .collect()
    }
}

fn scaled_micros(value: u64, unit_micros: i64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX).saturating_mul(unit_micros)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::BackendError;
    use crate::data::fake::ScriptedBackend;
    use crate::domain::jaeger::envelope::StructuredResponse;
    use crate::domain::jaeger::error::Phase;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000_000;
    const HOUR: i64 = 3_600_000_000;

    fn service(backend: &Arc<ScriptedBackend>) -> JaegerService {
        let openobserve = OpenObserveConfig {
            url: "http://localhost:5080".to_string(),
            ..OpenObserveConfig::default()
        };
        JaegerService::new(backend.clone(), &openobserve, &QueryConfig::default())
            .with_clock(|| NOW)
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn span_row(trace_id: &str, span_id: &str, start: i64) -> Value {
        json!({
            "trace_id": trace_id,
            "span_id": span_id,
            "start_time": start,
            "duration": 1500,
            "operation_name": "GET /cart",
            "service_name": "checkout",
            "flags": 1
        })
    }

    #[tokio::test]
    async fn test_empty_id_phase_is_empty_success() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![]);
        let svc = service(&backend);

        let start = (NOW - HOUR).to_string();
        let end = NOW.to_string();
        let query = svc
            .parser()
            .parse(&pairs(&[("service", "checkout"), ("start", &start), ("end", &end)]))
            .unwrap();
        let err = svc.find_traces(&query).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                phase: Phase::TraceIds,
                ..
            }
        ));

        let resp = StructuredResponse::from_trace_error(&err);
        assert_eq!(resp.status_code(), 200);
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"data": [], "total": 0, "limit": 0, "offset": 0, "errors": []})
        );
        // Span fetch never issued
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_get_trace_missing_is_404() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![]);
        let svc = service(&backend);

        let lookup = TraceLookup::parse("abc123", &[]).unwrap();
        let err = svc.get_trace(&lookup).await.unwrap_err();
        let resp = StructuredResponse::from_trace_error(&err);
        assert_eq!(resp.status_code(), 404);
        assert_eq!(resp.errors[0].trace_id.as_deref(), Some("abc123"));

        let request = &backend.requests()[0];
        assert_eq!(request.source, DataSource::Spans);
        assert!(request.sql.contains("trace_id IN ('abc123')"));
        // 24h default range plus 30m padding on each side
        assert_eq!(request.window.end_micros, NOW + 30 * 60 * 1_000_000);
        assert_eq!(
            request.window.start_micros,
            NOW - 24 * HOUR - 30 * 60 * 1_000_000
        );
    }

    #[tokio::test]
    async fn test_find_traces_two_phases_in_id_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            json!({"trace_id": "t2", "_timestamp": 20}),
            json!({"trace_id": "t1", "_timestamp": 10}),
        ]);
        backend.push_rows(vec![
            span_row("t1", "a1", 10_000),
            span_row("t2", "b1", 20_000),
            span_row("t1", "a2", 11_000),
        ]);
        let svc = service(&backend);

        let query = svc
            .parser()
            .parse(&pairs(&[("service", "checkout"), ("version", "v3")]))
            .unwrap();
        let traces = svc.find_traces(&query).await.unwrap();
        let ids: Vec<&str> = traces.iter().map(|t| t.trace_id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
        assert_eq!(traces[1].spans.len(), 2);

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].source, DataSource::Metadata);
        assert_eq!(requests[0].mode, SearchMode::Background);
        assert!(requests[0].skip_cache);
        assert_eq!(requests[1].mode, SearchMode::Interactive);
        assert!(requests[1].sql.contains("IN ('t2','t1')"));
        assert_eq!(requests[1].size, Some(10_000));
    }

    #[tokio::test]
    async fn test_find_traces_explicit_ids_skip_resolution() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![span_row("t9", "s1", 1_000)]);
        let svc = service(&backend);

        let query = svc
            .parser()
            .parse(&pairs(&[("traceID", "t9"), ("traceID", "t9")]))
            .unwrap();
        let traces = svc.find_traces(&query).await.unwrap();
        assert_eq!(traces.len(), 1);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].sql.contains("IN ('t9')"));
    }

    #[tokio::test]
    async fn test_bad_span_becomes_trace_warning() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            span_row("t1", "good", 1_000),
            json!({"trace_id": "t1", "span_id": "bad"}),
        ]);
        let svc = service(&backend);

        let lookup = TraceLookup::parse("t1", &[]).unwrap();
        let traces = svc.get_trace(&lookup).await.unwrap();
        assert_eq!(traces[0].spans.len(), 1);
        assert_eq!(traces[0].warnings.len(), 1);
        assert!(traces[0].warnings[0].contains("bad"));
    }

    #[tokio::test]
    async fn test_duplicate_span_ids_reported() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            span_row("t1", "00000000000000a1", 1_000),
            span_row("t1", "00000000000000a1", 2_000),
        ]);
        let svc = service(&backend);

        let lookup = TraceLookup::parse("t1", &[]).unwrap();
        let traces = svc.get_trace(&lookup).await.unwrap();
        assert_eq!(traces[0].spans[1].span_id, "00000000000000a2");
        assert_eq!(traces[0].warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_services_listing() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            json!({"service_name": "checkout"}),
            json!({"service_name": ""}),
            json!({"service_name": "cart"}),
        ]);
        let svc = service(&backend);

        let services = svc.get_services(SearchMode::Background).await.unwrap();
        assert_eq!(services, vec!["checkout", "cart"]);

        let request = &backend.requests()[0];
        assert_eq!(request.source, DataSource::Metadata);
        assert_eq!(request.mode, SearchMode::Background);
        assert_eq!(request.size, Some(1000));
        assert_eq!(request.window.start_micros, NOW - 168 * HOUR);
        assert_eq!(
            request.sql,
            "SELECT service_name FROM distinct_values_traces_default GROUP BY service_name"
        );
    }

    #[tokio::test]
    async fn test_operations_listing() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![json!({"operation_name": "GET /cart"})]);
        let svc = service(&backend);

        let ops = svc
            .get_operations("check'out", SearchMode::Interactive)
            .await
            .unwrap();
        assert_eq!(ops, vec!["GET /cart"]);
        assert!(backend.requests()[0]
            .sql
            .contains("WHERE service_name = 'check''out'"));
    }

    #[tokio::test]
    async fn test_operations_require_service() {
        let backend = Arc::new(ScriptedBackend::new());
        let svc = service(&backend);
        let err = svc
            .get_operations("", SearchMode::Interactive)
            .await
            .unwrap_err();
        assert_eq!(err.code(), 400);
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_error(BackendError::status(503, "busy"));
        let svc = service(&backend);

        let err = svc.get_services(SearchMode::Interactive).await.unwrap_err();
        assert_eq!(err.code(), 503);
    }

    #[test]
    fn test_trace_index_disabled() {
        let backend = Arc::new(ScriptedBackend::new());
        let openobserve = OpenObserveConfig {
            use_trace_index: false,
            ..OpenObserveConfig::default()
        };
        let svc = JaegerService::new(backend, &openobserve, &QueryConfig::default());
        assert!(svc.streams.trace_index_stream.is_none());
    }
}

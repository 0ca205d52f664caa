//! Two-phase trace retrieval
//!
//! Phase one resolves an ordered list of trace ids, phase two fetches every
//! span for those ids in a single batched search. The phases run strictly in
//! sequence; a failed or cancelled first phase never issues the second.

use serde_json::Value;
use std::sync::Arc;

use crate::data::fields;
use crate::data::traits::{
    DataSource, QueryBackend, Row, SearchMode, SearchRequest, SearchWindow,
};
use crate::domain::jaeger::error::{EngineError, Phase};
use crate::domain::jaeger::query::TraceQuery;
use crate::domain::jaeger::sql::{Streams, spans_by_trace_ids_sql, trace_ids_sql};

/// Knobs for the span-fetch phase
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub streams: Streams,
    /// Added to both ends of the phase-one window for the span fetch
    pub span_fetch_padding_micros: i64,
    /// Row cap for the span fetch
    pub max_spans: u64,
}

pub struct TraceRetriever {
    backend: Arc<dyn QueryBackend>,
    settings: RetrieverSettings,
}

impl TraceRetriever {
    pub fn new(backend: Arc<dyn QueryBackend>, settings: RetrieverSettings) -> Self {
        Self { backend, settings }
    }

    /// Phase one: ordered, deduplicated trace ids matching the query
    pub async fn find_trace_ids(&self, query: &TraceQuery) -> Result<Vec<String>, EngineError> {
        let targeted = trace_ids_sql(query, &self.settings.streams);
        let (mode, skip_cache) = query.search_mode();
        tracing::debug!(
            sql = %targeted.sql,
            source = targeted.source.as_str(),
            mode = mode.as_str(),
            "Resolving trace ids"
        );

        let request = SearchRequest::new(targeted.source, targeted.sql, query.window)
            .with_mode(mode, skip_cache);
        let response = self.backend.search(&request).await?;
        if response.hits.is_empty() {
            return Err(EngineError::not_found(Phase::TraceIds, None));
        }

        let ids = extract_trace_ids(&response.hits);
        if ids.is_empty() {
            return Err(EngineError::not_found(Phase::TraceIds, None));
        }
        Ok(ids)
    }

    /// Phase two: every span row for `trace_ids`, one batched call
    pub async fn fetch_spans(
        &self,
        trace_ids: &[String],
        window: SearchWindow,
        mode: SearchMode,
    ) -> Result<Vec<Row>, EngineError> {
        let single_id = || match trace_ids {
            [only] => Some(only.clone()),
            _ => None,
        };
        if trace_ids.is_empty() {
            return Err(EngineError::not_found(Phase::Spans, None));
        }

        let sql = spans_by_trace_ids_sql(&self.settings.streams.span_stream, trace_ids);
        let window = window.padded(self.settings.span_fetch_padding_micros);
        tracing::debug!(sql = %sql, traces = trace_ids.len(), "Fetching spans");

        let request = SearchRequest::new(DataSource::Spans, sql, window)
            .with_size(Some(self.settings.max_spans))
            .with_mode(mode, false);
        let response = self.backend.search(&request).await?;
        if response.hits.is_empty() {
            return Err(EngineError::not_found(Phase::Spans, single_id()));
        }
        if response.hits.len() as u64 >= self.settings.max_spans {
            tracing::warn!(
                max_spans = self.settings.max_spans,
                traces = trace_ids.len(),
                "Span fetch hit the row cap, traces may be incomplete"
            );
        }
        Ok(response.hits)
    }
}

/// Trace ids in backend order, first occurrence wins
pub fn extract_trace_ids(rows: &[Row]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(rows.len());
    for row in rows {
        let id = match row.get(fields::TRACE_ID) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => continue,
        };
        if !id.is_empty() && !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::error::BackendError;
    use crate::data::fake::ScriptedBackend;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn settings() -> RetrieverSettings {
        RetrieverSettings {
            streams: Streams {
                span_stream: "default".to_string(),
                trace_index_stream: Some("trace_list_index".to_string()),
                distinct_values_stream: "distinct_values_traces_default".to_string(),
            },
            span_fetch_padding_micros: 100,
            max_spans: 500,
        }
    }

    fn query() -> TraceQuery {
        TraceQuery {
            service_names: vec!["checkout".to_string()],
            operation_names: Vec::new(),
            tags: BTreeMap::new(),
            window: SearchWindow::new(1_000, 2_000),
            min_duration: None,
            max_duration: None,
            limit: 20,
            version: Some("v3".to_string()),
            trace_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_find_trace_ids_dedup_in_order() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            json!({"trace_id": "b", "_timestamp": 3}),
            json!({"trace_id": "a", "_timestamp": 2}),
            json!({"trace_id": "b", "_timestamp": 1}),
            json!({"trace_id": ""}),
        ]);
        let retriever = TraceRetriever::new(backend.clone(), settings());

        let ids = retriever.find_trace_ids(&query()).await.unwrap();
        assert_eq!(ids, vec!["b", "a"]);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source, DataSource::Metadata);
        assert_eq!(requests[0].window, SearchWindow::new(1_000, 2_000));
        assert_eq!(requests[0].mode, SearchMode::Background);
        assert!(requests[0].skip_cache);
    }

    #[tokio::test]
    async fn test_find_trace_ids_empty_is_not_found() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(Vec::new());
        let retriever = TraceRetriever::new(backend, settings());

        let err = retriever.find_trace_ids(&query()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound {
                phase: Phase::TraceIds,
                trace_id: None
            }
        ));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_error(BackendError::status(503, "busy"));
        let retriever = TraceRetriever::new(backend, settings());

        let err = retriever.find_trace_ids(&query()).await.unwrap_err();
        assert_eq!(err.code(), 503);
    }

    #[tokio::test]
    async fn test_fetch_spans_single_batched_call() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(vec![
            json!({"trace_id": "a", "span_id": "1"}),
            json!({"trace_id": "b", "span_id": "2"}),
        ]);
        let retriever = TraceRetriever::new(backend.clone(), settings());

        let ids = vec!["a".to_string(), "b".to_string()];
        let rows = retriever
            .fetch_spans(&ids, SearchWindow::new(1_000, 2_000), SearchMode::Interactive)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let requests = backend.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].sql,
            "SELECT * FROM default WHERE trace_id IN ('a','b') ORDER BY start_time ASC"
        );
        assert_eq!(requests[0].window, SearchWindow::new(900, 2_100));
        assert_eq!(requests[0].size, Some(500));
        assert_eq!(requests[0].source, DataSource::Spans);
    }

    #[tokio::test]
    async fn test_fetch_spans_empty_carries_trace_id() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_rows(Vec::new());
        let retriever = TraceRetriever::new(backend, settings());

        let err = retriever
            .fetch_spans(
                &["abc123".to_string()],
                SearchWindow::new(0, 1),
                SearchMode::Interactive,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), 404);
        assert_eq!(err.trace_id(), Some("abc123"));
    }
}

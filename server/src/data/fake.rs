//! Scripted in-memory backend for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;

use crate::data::error::BackendError;
use crate::data::traits::{QueryBackend, Row, SearchRequest, SearchResponse};

/// Replays queued responses in order and records every request
#[derive(Default)]
pub struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<SearchResponse, BackendError>>>,
    requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response built from JSON objects
    pub fn push_rows(&self, rows: Vec<Value>) -> &Self {
        let hits: Vec<Row> = rows
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        let total = hits.len() as u64;
        self.responses
            .lock()
            .push_back(Ok(SearchResponse { hits, total }));
        self
    }

    pub fn push_error(&self, error: BackendError) -> &Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<SearchRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl QueryBackend for ScriptedBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        self.requests.lock().push(request.clone());
        // Unscripted calls see an empty result set
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::default()))
    }
}

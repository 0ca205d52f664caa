//! Query backend trait
//!
//! The engine never talks HTTP directly. Every query goes through
//! [`QueryBackend`], which the OpenObserve client implements in production
//! and a scripted fake implements in tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::data::error::BackendError;

/// One row returned by the backend, keyed by column name
pub type Row = Map<String, Value>;

// ============================================================================
// Request Types
// ============================================================================

/// Which backend dataset a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Full span store
    Spans,
    /// Metadata streams (trace index, distinct values)
    Metadata,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spans => "traces",
            Self::Metadata => "metadata",
        }
    }
}

/// Scheduling hint forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Interactive,
    /// Long-running report query, queued behind interactive work
    Background,
}

impl SearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "ui",
            Self::Background => "reports",
        }
    }
}

/// Closed time range in microseconds since Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchWindow {
    pub start_micros: i64,
    pub end_micros: i64,
}

impl SearchWindow {
    pub fn new(start_micros: i64, end_micros: i64) -> Self {
        Self {
            start_micros,
            end_micros,
        }
    }

    /// Widen both ends by the same amount
    pub fn padded(&self, pad_micros: i64) -> Self {
        Self {
            start_micros: self.start_micros.saturating_sub(pad_micros),
            end_micros: self.end_micros.saturating_add(pad_micros),
        }
    }
}

/// A single SQL search against the backend
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub source: DataSource,
    pub sql: String,
    pub window: SearchWindow,
    /// Maximum rows to return, `None` for no cap
    pub size: Option<u64>,
    pub mode: SearchMode,
    /// Bypass the backend's write-ahead/cache layer
    pub skip_cache: bool,
}

impl SearchRequest {
    pub fn new(source: DataSource, sql: impl Into<String>, window: SearchWindow) -> Self {
        Self {
            source,
            sql: sql.into(),
            window,
            size: None,
            mode: SearchMode::Interactive,
            skip_cache: false,
        }
    }

    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode, skip_cache: bool) -> Self {
        self.mode = mode;
        self.skip_cache = skip_cache;
        self
    }
}

/// Rows returned for a search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub hits: Vec<Row>,
    pub total: u64,
}

// ============================================================================
// Backend Trait
// ============================================================================

#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Run one SQL search and return the raw rows
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_mode_tokens() {
        assert_eq!(SearchMode::Interactive.as_str(), "ui");
        assert_eq!(SearchMode::Background.as_str(), "reports");
        assert_eq!(SearchMode::default(), SearchMode::Interactive);
    }

    #[test]
    fn test_window_padded() {
        let window = SearchWindow::new(1_000, 2_000).padded(500);
        assert_eq!(window, SearchWindow::new(500, 2_500));
    }

    #[test]
    fn test_request_builder() {
        let req = SearchRequest::new(DataSource::Spans, "SELECT 1", SearchWindow::new(0, 1))
            .with_size(Some(10))
            .with_mode(SearchMode::Background, true);
        assert_eq!(req.size, Some(10));
        assert_eq!(req.mode, SearchMode::Background);
        assert!(req.skip_cache);
        assert_eq!(req.source.as_str(), "traces");
    }
}

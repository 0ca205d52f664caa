//! Engine error taxonomy

use thiserror::Error;

use crate::data::error::BackendError;

/// Rejected request parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("parameter 'service' is required")]
    ServiceRequired,

    #[error("cannot query for operation without service")]
    OperationWithoutService,

    #[error("start time must be before end time")]
    StartNotBeforeEnd,

    #[error("time range may not exceed {max_minutes} minutes")]
    WindowTooWide { max_minutes: i64 },

    #[error("'maxDuration' should be greater than 'minDuration'")]
    MaxDurationBelowMin,

    #[error("unable to parse param '{param}': {reason}")]
    InvalidParam { param: String, reason: String },

    #[error("malformed 'tag' parameter, expecting key:value, received: {0}")]
    MalformedTag(String),

    #[error("malformed 'tags' parameter, cannot unmarshal JSON: {0}")]
    MalformedTags(String),

    #[error("trace id '{0}' is invalid")]
    InvalidTraceId(String),
}

impl ValidationError {
    pub fn invalid_param(param: &str, reason: impl ToString) -> Self {
        Self::InvalidParam {
            param: param.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Query phase a lookup failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Resolving candidate trace ids
    TraceIds,
    /// Fetching spans for known ids
    Spans,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("trace not found")]
    NotFound {
        phase: Phase,
        trace_id: Option<String>,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl EngineError {
    pub fn not_found(phase: Phase, trace_id: Option<String>) -> Self {
        Self::NotFound { phase, trace_id }
    }

    /// HTTP status carried in the response envelope
    pub fn code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Backend(e) => e.http_status(),
        }
    }

    pub fn trace_id(&self) -> Option<&str> {
        match self {
            Self::NotFound { trace_id, .. } => trace_id.as_deref(),
            _ => None,
        }
    }
}

/// Non-fatal problem found while assembling a trace
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssemblyWarning {
    #[error("span {span_id} skipped: {reason}")]
    SpanSkipped { span_id: String, reason: String },

    #[error("span {span_id} has malformed events: {reason}")]
    MalformedEvents { span_id: String, reason: String },

    #[error("{adjuster}: {message}")]
    Adjusted {
        adjuster: &'static str,
        message: String,
    },
}

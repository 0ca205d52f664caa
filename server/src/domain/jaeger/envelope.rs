//! Response envelope
//!
//! The Jaeger UI expects `{data, total, limit, offset, errors}` on every
//! route. Traces go out with their processes interned into a per-trace
//! `processes` map keyed `p1`, `p2`, ...

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::jaeger::error::{EngineError, Phase};
use crate::domain::jaeger::model::{KeyValue, Log, Process, Reference, Span, Trace};

// ============================================================================
// Wire Traces
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiSpan {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
    pub operation_name: String,
    pub references: Vec<Reference>,
    pub flags: u32,
    pub start_time: u64,
    pub duration: u64,
    pub tags: Vec<KeyValue>,
    pub logs: Vec<Log>,
    #[serde(rename = "processID")]
    pub process_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiTrace {
    #[serde(rename = "traceID")]
    pub trace_id: String,
    pub spans: Vec<UiSpan>,
    pub processes: BTreeMap<String, Process>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl From<Trace> for UiTrace {
    fn from(trace: Trace) -> Self {
        let mut interned: Vec<Process> = Vec::new();
        let spans = trace
            .spans
            .into_iter()
            .map(|span| {
                let Span {
                    trace_id,
                    span_id,
                    operation_name,
                    references,
                    flags,
                    start_time,
                    duration,
                    tags,
                    logs,
                    process,
                    warnings,
                } = span;
                let index = match interned.iter().position(|p| *p == process) {
                    Some(i) => i,
                    None => {
                        interned.push(process);
                        interned.len() - 1
                    }
                };
                UiSpan {
                    trace_id,
                    span_id,
                    operation_name,
                    references,
                    flags,
                    start_time,
                    duration,
                    tags,
                    logs,
                    process_id: process_key(index),
                    warnings,
                }
            })
            .collect();

        Self {
            trace_id: trace.trace_id,
            spans,
            processes: interned
                .into_iter()
                .enumerate()
                .map(|(i, p)| (process_key(i), p))
                .collect(),
            warnings: trace.warnings,
        }
    }
}

fn process_key(index: usize) -> String {
    format!("p{}", index + 1)
}

// ============================================================================
// Envelope
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    Traces(Vec<UiTrace>),
    Values(Vec<String>),
}

impl ResponseData {
    fn len(&self) -> usize {
        match self {
            Self::Traces(t) => t.len(),
            Self::Values(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredError {
    pub code: u16,
    pub msg: String,
    #[serde(rename = "traceID", skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredResponse {
    pub data: ResponseData,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub errors: Vec<StructuredError>,
}

impl StructuredResponse {
    fn success(data: ResponseData) -> Self {
        Self {
            total: data.len(),
            data,
            limit: 0,
            offset: 0,
            errors: Vec::new(),
        }
    }

    pub fn traces(traces: Vec<UiTrace>) -> Self {
        Self::success(ResponseData::Traces(traces))
    }

    pub fn values(values: Vec<String>) -> Self {
        Self::success(ResponseData::Values(values))
    }

    /// Map an engine failure for a trace-returning route
    ///
    /// Zero matches while resolving ids is an empty success. Zero spans for
    /// ids the caller asked about is a 404.
    pub fn from_trace_error(error: &EngineError) -> Self {
        if let EngineError::NotFound {
            phase: Phase::TraceIds,
            ..
        } = error
        {
            return Self::traces(Vec::new());
        }
        Self::failure(ResponseData::Traces(Vec::new()), error)
    }

    /// Map an engine failure for a listing route
    pub fn from_listing_error(error: &EngineError) -> Self {
        if matches!(error, EngineError::NotFound { .. }) {
            return Self::values(Vec::new());
        }
        Self::failure(ResponseData::Values(Vec::new()), error)
    }

    fn failure(data: ResponseData, error: &EngineError) -> Self {
        Self {
            data,
            total: 0,
            limit: 0,
            offset: 0,
            errors: vec![StructuredError {
                code: error.code(),
                msg: error.to_string(),
                trace_id: error.trace_id().map(str::to_string),
            }],
        }
    }

    /// HTTP status: first error's code, else 200
    pub fn status_code(&self) -> u16 {
        self.errors.first().map(|e| e.code).unwrap_or(200)
    }
}

//! Span assembly
//!
//! Groups flat span rows by trace id and converts each decoded
//! [`FlatSpanRecord`] into a structured [`Span`]. Bad rows never fail a
//! trace: they are skipped and reported as warnings.

use serde_json::{Map, Value};

use crate::data::fields;
use crate::data::record::{FlatSpanRecord, coerce_i64};
use crate::data::traits::Row;
use crate::domain::jaeger::error::AssemblyWarning;
use crate::domain::jaeger::model::{
    KeyValue, Log, Process, RefType, Reference, Span, TagValue, Trace,
};
use crate::utils::time::nanos_to_micros;

pub const SPAN_KIND_TAG: &str = "span.kind";
pub const STATUS_CODE_TAG: &str = "otel.status_code";

/// Fallback id used in warnings when a row has no usable span id
const UNKNOWN_SPAN_ID: &str = "<unknown>";

/// Partition rows by trace id, keeping first-seen group order
///
/// Rows without a trace id are dropped.
pub fn group_by_trace_id(rows: Vec<Row>) -> Vec<(String, Vec<Row>)> {
    let mut groups: Vec<(String, Vec<Row>)> = Vec::new();
    for row in rows {
        let trace_id = match row.get(fields::TRACE_ID) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => continue,
        };
        match groups.iter_mut().find(|(id, _)| *id == trace_id) {
            Some((_, group)) => group.push(row),
            None => groups.push((trace_id, vec![row])),
        }
    }
    groups
}

/// OpenTelemetry span kind number to its lowercase name
pub fn span_kind_name(kind: i64) -> &'static str {
    match kind {
        1 => "internal",
        2 => "server",
        3 => "client",
        4 => "producer",
        5 => "consumer",
        _ => "unspecified",
    }
}

/// Typed tag value for a column, `None` for nulls
pub fn tag_value(value: Value) -> Option<TagValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(TagValue::Bool(b)),
        Value::String(s) => Some(TagValue::String(s)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => TagValue::Int64(i),
            None => TagValue::Float64(n.as_f64().unwrap_or_default()),
        }),
        other => Some(TagValue::String(other.to_string())),
    }
}

/// Rebuild span logs from the serialized events column
fn parse_events(raw: &str) -> Result<Vec<Log>, String> {
    let events: Vec<Map<String, Value>> =
        serde_json::from_str(raw).map_err(|e| e.to_string())?;
    Ok(events
        .into_iter()
        .map(|event| {
            let mut timestamp = 0;
            let mut log_fields = Vec::with_capacity(event.len());
            for (key, value) in event {
                if key == fields::TIMESTAMP {
                    timestamp = coerce_i64(&value).map(nanos_to_micros).unwrap_or(0);
                    continue;
                }
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                log_fields.push(KeyValue::string(key, text));
            }
            Log {
                timestamp,
                fields: log_fields,
            }
        })
        .collect())
}

#[derive(Debug, Clone)]
pub struct SpanAssembler {
    process_tag_prefixes: Vec<String>,
}

impl SpanAssembler {
    pub fn new(process_tag_prefixes: Vec<String>) -> Self {
        Self {
            process_tag_prefixes,
        }
    }

    /// Columns that describe the emitting process rather than the span
    pub fn is_process_tag(&self, column: &str) -> bool {
        self.process_tag_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && column.starts_with(prefix.as_str()))
    }

    /// Convert one decoded record into a span
    pub fn convert(&self, record: FlatSpanRecord) -> Span {
        let mut tags = Vec::new();
        let mut process_tags = Vec::new();
        let mut warnings = Vec::new();

        if let Some(kind) = record.span_kind {
            tags.push(KeyValue::string(SPAN_KIND_TAG, span_kind_name(kind)));
        }
        if let Some(status) = record.span_status {
            let is_error = status == fields::STATUS_ERROR;
            tags.push(KeyValue::string(STATUS_CODE_TAG, status));
            if is_error {
                tags.push(KeyValue::bool(fields::ERROR_TAG, true));
            }
        }

        for (column, value) in record.attributes {
            let Some(value) = tag_value(value) else {
                continue;
            };
            if self.is_process_tag(&column) {
                process_tags.push(KeyValue::new(column, value));
            } else {
                tags.push(KeyValue::new(column, value));
            }
        }

        let logs = match record.events.as_deref().map(parse_events) {
            None => Vec::new(),
            Some(Ok(logs)) => logs,
            Some(Err(reason)) => {
                let warning = AssemblyWarning::MalformedEvents {
                    span_id: record.span_id.clone(),
                    reason,
                };
                tracing::warn!(
                    trace_id = %record.trace_id,
                    span_id = %record.span_id,
                    warning = %warning,
                    "Dropping malformed span events"
                );
                warnings.push(warning.to_string());
                Vec::new()
            }
        };

        let references = match record.parent_span_id {
            Some(parent_span_id) => vec![Reference {
                ref_type: RefType::from_column(record.ref_type.as_deref()),
                trace_id: record.parent_trace_id.unwrap_or_default(),
                span_id: parent_span_id,
            }],
            None => Vec::new(),
        };

        Span {
            trace_id: record.trace_id,
            span_id: record.span_id,
            operation_name: record.operation_name,
            references,
            flags: record.flags,
            start_time: nanos_to_micros(record.start_time_nanos),
            duration: record.duration_micros,
            tags,
            logs,
            process: Process {
                service_name: record.service_name,
                tags: process_tags,
            },
            warnings,
        }
    }

    /// Assemble every row of one trace, skipping rows that fail to decode
    pub fn assemble_trace(&self, trace_id: &str, rows: Vec<Row>) -> Trace {
        let mut spans = Vec::with_capacity(rows.len());
        let mut warnings = Vec::new();

        for row in rows {
            let span_id = match row.get(fields::SPAN_ID) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                _ => UNKNOWN_SPAN_ID.to_string(),
            };
            match FlatSpanRecord::decode(row) {
                Ok(record) => spans.push(self.convert(record)),
                Err(e) => {
                    let warning = AssemblyWarning::SpanSkipped {
                        span_id,
                        reason: e.to_string(),
                    };
                    tracing::warn!(trace_id, warning = %warning, "Skipping undecodable span");
                    warnings.push(warning.to_string());
                }
            }
        }

        Trace {
            trace_id: trace_id.to_string(),
            spans,
            warnings,
        }
    }
}

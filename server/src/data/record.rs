//! Typed decoding of flattened span rows
//!
//! The backend returns each span as a flat JSON object. [`FlatSpanRecord`]
//! pulls the fixed columns out into typed fields and keeps every remaining
//! column, in backend order, as an attribute.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::data::fields;
use crate::data::traits::Row;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("missing required column '{0}'")]
    MissingField(&'static str),

    #[error("column '{field}' has invalid value {value}")]
    InvalidField { field: &'static str, value: String },
}

/// A span row with its fixed columns decoded
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub operation_name: String,
    pub service_name: String,
    pub start_time_nanos: i64,
    pub duration_micros: u64,
    pub flags: u32,
    pub span_kind: Option<i64>,
    pub span_status: Option<String>,
    pub parent_span_id: Option<String>,
    pub parent_trace_id: Option<String>,
    pub ref_type: Option<String>,
    /// Serialized JSON array of span events
    pub events: Option<String>,
    /// Non-fixed columns in backend order
    pub attributes: Map<String, Value>,
}

impl FlatSpanRecord {
    pub fn decode(mut row: Row) -> Result<Self, DecodeError> {
        let trace_id = take_string(&mut row, fields::TRACE_ID)
            .filter(|s| !s.is_empty())
            .ok_or(DecodeError::MissingField(fields::TRACE_ID))?;
        let span_id = take_string(&mut row, fields::SPAN_ID)
            .filter(|s| !s.is_empty())
            .ok_or(DecodeError::MissingField(fields::SPAN_ID))?;
        let start_time_nanos = take_i64(&mut row, fields::START_TIME)?
            .ok_or(DecodeError::MissingField(fields::START_TIME))?;

        let duration_micros = match take_i64(&mut row, fields::DURATION)? {
            Some(d) if d < 0 => {
                return Err(DecodeError::InvalidField {
                    field: fields::DURATION,
                    value: d.to_string(),
                });
            }
            Some(d) => d as u64,
            None => 0,
        };
        let flags = match take_i64(&mut row, fields::FLAGS)? {
            Some(f) => u32::try_from(f).map_err(|_| DecodeError::InvalidField {
                field: fields::FLAGS,
                value: f.to_string(),
            })?,
            None => 0,
        };

        // Unparseable kinds degrade to unspecified rather than dropping the span
        let span_kind = row
            .shift_remove(fields::SPAN_KIND)
            .filter(|v| !v.is_null())
            .map(|v| coerce_i64(&v).unwrap_or(0));

        Ok(Self {
            trace_id,
            span_id,
            operation_name: take_string(&mut row, fields::OPERATION_NAME).unwrap_or_default(),
            service_name: take_string(&mut row, fields::SERVICE_NAME).unwrap_or_default(),
            start_time_nanos,
            duration_micros,
            flags,
            span_kind,
            span_status: take_string(&mut row, fields::SPAN_STATUS).filter(|s| !s.is_empty()),
            parent_span_id: take_string(&mut row, fields::PARENT_SPAN_ID)
                .filter(|s| !s.is_empty()),
            parent_trace_id: take_string(&mut row, fields::PARENT_TRACE_ID)
                .filter(|s| !s.is_empty()),
            ref_type: take_string(&mut row, fields::REF_TYPE).filter(|s| !s.is_empty()),
            events: take_events(&mut row),
            attributes: row
                .into_iter()
                .filter(|(k, v)| !fields::is_fixed_key(k) && !v.is_null())
                .collect(),
        })
    }
}

/// Read a column as a string, accepting numbers and booleans
fn take_string(row: &mut Row, key: &str) -> Option<String> {
    match row.shift_remove(key)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a column as an integer, accepting numeric strings
fn take_i64(row: &mut Row, key: &'static str) -> Result<Option<i64>, DecodeError> {
    match row.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => coerce_i64(&value)
            .map(Some)
            .ok_or_else(|| DecodeError::InvalidField {
                field: key,
                value: value.to_string(),
            }),
    }
}

fn take_events(row: &mut Row) -> Option<String> {
    match row.shift_remove(fields::EVENTS)? {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Integer view of a JSON number or numeric string
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().and_then(|u| i64::try_from(u).ok()))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

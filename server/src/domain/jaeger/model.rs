//! Structured trace model
//!
//! Tags, logs, references and processes serialize directly into the Jaeger
//! UI JSON shape. [`Span`] and [`Trace`] carry their process inline; the
//! `ui` module interns processes into the `processes` map on the way out.

use serde::Serialize;

// ============================================================================
// Tags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Bool,
    Int64,
    Float64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    String(String),
    Bool(bool),
    Int64(i64),
    Float64(f64),
}

impl TagValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Bool(_) => ValueType::Bool,
            Self::Int64(_) => ValueType::Int64,
            Self::Float64(_) => ValueType::Float64,
        }
    }
}

/// Typed key/value pair used for tags and log fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyValue {
    pub key: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub value: TagValue,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: TagValue) -> Self {
        Self {
            key: key.into(),
            value_type: value.value_type(),
            value,
        }
    }

    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, TagValue::String(value.into()))
    }

    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        Self::new(key, TagValue::Bool(value))
    }
}

// ============================================================================
// Span Parts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Log {
    /// Microseconds since Unix epoch
    pub timestamp: u64,
    pub fields: Vec<KeyValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RefType {
    #[serde(rename = "CHILD_OF")]
    ChildOf,
    #[serde(rename = "FOLLOWS_FROM")]
    FollowsFrom,
}

impl RefType {
    /// Normalize a stored reference type, defaulting to child-of
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()) {
            Some(s) if s == "FOLLOWS_FROM" => Self::FollowsFrom,
            _ => Self::ChildOf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub ref_type: RefType,
    #[serde(rename = "traceID")]
    pub trace_id: String,
    #[serde(rename = "spanID")]
    pub span_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub service_name: String,
    pub tags: Vec<KeyValue>,
}

// ============================================================================
// Span / Trace
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub trace_id: String,
    pub span_id: String,
    pub operation_name: String,
    pub references: Vec<Reference>,
    pub flags: u32,
    /// Microseconds since Unix epoch
    pub start_time: u64,
    /// Microseconds
    pub duration: u64,
    pub tags: Vec<KeyValue>,
    pub logs: Vec<Log>,
    pub process: Process,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub trace_id: String,
    pub spans: Vec<Span>,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_value_serialization() {
        let kv = KeyValue::string("http.method", "GET");
        assert_eq!(
            serde_json::to_value(&kv).unwrap(),
            json!({"key": "http.method", "type": "string", "value": "GET"})
        );
        let kv = KeyValue::bool("error", true);
        assert_eq!(
            serde_json::to_value(&kv).unwrap(),
            json!({"key": "error", "type": "bool", "value": true})
        );
        let kv = KeyValue::new("retries", TagValue::Int64(3));
        assert_eq!(serde_json::to_value(&kv).unwrap()["type"], "int64");
    }

    #[test]
    fn test_ref_type_from_column() {
        assert_eq!(RefType::from_column(Some("CHILDOF")), RefType::ChildOf);
        assert_eq!(RefType::from_column(Some("CHILD_OF")), RefType::ChildOf);
        assert_eq!(
            RefType::from_column(Some("FOLLOWS_FROM")),
            RefType::FollowsFrom
        );
        assert_eq!(RefType::from_column(None), RefType::ChildOf);
        assert_eq!(RefType::from_column(Some("bogus")), RefType::ChildOf);
    }

    #[test]
    fn test_reference_serialization() {
        let r = Reference {
            ref_type: RefType::FollowsFrom,
            trace_id: "t".to_string(),
            span_id: "s".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"refType": "FOLLOWS_FROM", "traceID": "t", "spanID": "s"})
        );
    }
}

//! Field dictionary
//!
//! Column names of the backend's flattened span records. Fixed keys map to
//! core span fields; every other column is an application attribute.

pub const SERVICE_NAME: &str = "service_name";
pub const START_TIME: &str = "start_time";
pub const END_TIME: &str = "end_time";
pub const TIMESTAMP: &str = "_timestamp";
pub const TRACE_ID: &str = "trace_id";
pub const SPAN_ID: &str = "span_id";
pub const DURATION: &str = "duration";
pub const FLAGS: &str = "flags";
pub const OPERATION_NAME: &str = "operation_name";
pub const SPAN_KIND: &str = "span_kind";
pub const SPAN_STATUS: &str = "span_status";
pub const PARENT_SPAN_ID: &str = "reference_parent_span_id";
pub const PARENT_TRACE_ID: &str = "reference_parent_trace_id";
pub const REF_TYPE: &str = "reference_ref_type";
pub const EVENTS: &str = "events";

/// Reserved tag name that filters on span status instead of a column
pub const ERROR_TAG: &str = "error";

/// Value of the status column for failed spans
pub const STATUS_ERROR: &str = "ERROR";

/// Columns consumed by core span fields, never emitted as tags
pub const FIXED_KEYS: &[&str] = &[
    SERVICE_NAME,
    START_TIME,
    END_TIME,
    TIMESTAMP,
    TRACE_ID,
    SPAN_ID,
    DURATION,
    FLAGS,
    OPERATION_NAME,
    SPAN_KIND,
    SPAN_STATUS,
    PARENT_SPAN_ID,
    PARENT_TRACE_ID,
    REF_TYPE,
    EVENTS,
];

pub fn is_fixed_key(column: &str) -> bool {
    FIXED_KEYS.contains(&column)
}

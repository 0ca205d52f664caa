//! SQL construction for trace searches
//!
//! Pure text builders. Every user-supplied value goes through
//! [`quote_literal`]; tag keys are mapped to column names with
//! [`column_name`].

use crate::data::fields;
use crate::data::traits::DataSource;
use crate::domain::jaeger::query::TraceQuery;
use crate::utils::sql::{column_name, quote_literal, quote_list};

/// Projection for id resolution against the full span store
pub const SPAN_STORE_PROJECTION: &str = "trace_id, MIN(start_time) AS _timestamp";

/// Projection for id resolution against the trace index
pub const TRACE_INDEX_PROJECTION: &str = "trace_id, MIN(_timestamp) AS _timestamp";

/// Column both projections alias for ordering
const ORDER_COLUMN: &str = "_timestamp";

/// Stream names queried by the builders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Streams {
    pub span_stream: String,
    /// Pre-aggregated trace index, `None` disables the cheap path
    pub trace_index_stream: Option<String>,
    pub distinct_values_stream: String,
}

/// SQL text plus the dataset it must run against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetedSql {
    pub sql: String,
    pub source: DataSource,
}

/// Build the id-resolution query for a trace search
///
/// Queries that filter on span data go to the full span store; plain service
/// and time queries use the trace index when one is configured.
pub fn trace_ids_sql(query: &TraceQuery, streams: &Streams) -> TargetedSql {
    let (projection, stream, source) = match &streams.trace_index_stream {
        Some(index) if !query.has_span_predicates() => {
            (TRACE_INDEX_PROJECTION, index.as_str(), DataSource::Metadata)
        }
        _ => (
            SPAN_STORE_PROJECTION,
            streams.span_stream.as_str(),
            DataSource::Spans,
        ),
    };
    TargetedSql {
        sql: trace_ids_sql_with(query, projection, stream),
        source,
    }
}

/// Build an id-resolution query with an explicit projection and stream
pub fn trace_ids_sql_with(query: &TraceQuery, projection: &str, stream: &str) -> String {
    let mut sql = format!("SELECT {} FROM {}", projection, stream);
    let conditions = where_conditions(query);
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(
        " GROUP BY {} ORDER BY {} DESC",
        fields::TRACE_ID,
        ORDER_COLUMN
    ));
    if query.limit > 0 {
        sql.push_str(&format!(" LIMIT {}", query.limit));
    }
    sql
}

/// Predicate fragments, to be ANDed together
pub fn where_conditions(query: &TraceQuery) -> Vec<String> {
    let mut conditions = Vec::new();

    match query.service_names.as_slice() {
        [] => {}
        [single] => conditions.push(format!(
            "{} = {}",
            fields::SERVICE_NAME,
            quote_literal(single)
        )),
        many => conditions.push(format!(
            "{} IN ({})",
            fields::SERVICE_NAME,
            quote_list(many)
        )),
    }

    if !query.operation_names.is_empty() {
        conditions.push(format!(
            "{} IN ({})",
            fields::OPERATION_NAME,
            quote_list(&query.operation_names)
        ));
    }

    if let Some(min) = query.min_duration {
        conditions.push(format!("{} >= {}", fields::DURATION, min.as_micros()));
    }
    if let Some(max) = query.max_duration {
        conditions.push(format!("{} <= {}", fields::DURATION, max.as_micros()));
    }

    let tag_conditions: Vec<String> = query
        .tags
        .iter()
        .filter_map(|(key, value)| tag_condition(key, value))
        .collect();
    if !tag_conditions.is_empty() {
        conditions.push(format!("({})", tag_conditions.join(" AND ")));
    }

    conditions
}

/// The reserved `error` tag filters on span status; only `error=true` is
/// meaningful, other values are ignored
fn tag_condition(key: &str, value: &str) -> Option<String> {
    if key == fields::ERROR_TAG {
        return value.eq_ignore_ascii_case("true").then(|| {
            format!(
                "{} = {}",
                fields::SPAN_STATUS,
                quote_literal(fields::STATUS_ERROR)
            )
        });
    }
    Some(format!("{} = {}", column_name(key), quote_literal(value)))
}

/// Fetch every span of the given traces, oldest first
pub fn spans_by_trace_ids_sql(span_stream: &str, trace_ids: &[String]) -> String {
    format!(
        "SELECT * FROM {} WHERE {} IN ({}) ORDER BY {} ASC",
        span_stream,
        fields::TRACE_ID,
        quote_list(trace_ids),
        fields::START_TIME
    )
}

pub fn services_sql(streams: &Streams) -> String {
    format!(
        "SELECT {col} FROM {} GROUP BY {col}",
        streams.distinct_values_stream,
        col = fields::SERVICE_NAME
    )
}

pub fn operations_sql(streams: &Streams, service: &str) -> String {
    format!(
        "SELECT {op} FROM {} WHERE {} = {} GROUP BY {op}",
        streams.distinct_values_stream,
        fields::SERVICE_NAME,
        quote_literal(service),
        op = fields::OPERATION_NAME
    )
}

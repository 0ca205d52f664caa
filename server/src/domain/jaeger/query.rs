//! Query parameter parsing and validation
//!
//! Turns the raw, possibly repeated query-string pairs of the Jaeger UI into a
//! validated [`TraceQuery`]. Parsing is pure: the clock is injected so tests
//! can pin "now".

use std::collections::BTreeMap;
use std::time::Duration;

use crate::core::config::QueryConfig;
use crate::data::traits::{SearchMode, SearchWindow};
use crate::domain::jaeger::error::ValidationError;
use crate::utils::time::{epoch_to_micros, now_micros};

pub(crate) mod keys {
    pub const SERVICE: &str = "service";
    pub const OPERATION: &str = "operation";
    pub const TAG: &str = "tag";
    pub const TAGS: &str = "tags";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const MIN_DURATION: &str = "minDuration";
    pub const MAX_DURATION: &str = "maxDuration";
    pub const LIMIT: &str = "limit";
    pub const VERSION: &str = "version";
    pub const TRACE_ID: &str = "traceID";
}

/// Longest trace id accepted on the fetch-by-id route
pub const MAX_TRACE_ID_LEN: usize = 32;

const MICROS_PER_MINUTE: i64 = 60_000_000;

// ============================================================================
// Raw Parameters
// ============================================================================

/// Read-only view over repeated query-string pairs
#[derive(Debug, Clone, Copy)]
pub struct Params<'a>(&'a [(String, String)]);

impl<'a> Params<'a> {
    pub fn new(pairs: &'a [(String, String)]) -> Self {
        Self(pairs)
    }

    /// Every non-empty value for a key, in request order
    pub fn all(&self, key: &str) -> Vec<&'a str> {
        self.0
            .iter()
            .filter(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// First non-empty value for a key
    pub fn first(&self, key: &str) -> Option<&'a str> {
        self.0
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    /// Search mode for the listing and fetch-by-id routes
    pub fn report_mode(&self) -> SearchMode {
        match self.first(keys::VERSION) {
            Some("report") => SearchMode::Background,
            _ => SearchMode::Interactive,
        }
    }
}

// ============================================================================
// Trace Query
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TraceQuery {
    pub service_names: Vec<String>,
    pub operation_names: Vec<String>,
    /// Tag equality predicates, merged across `tag` and `tags`
    pub tags: BTreeMap<String, String>,
    pub window: SearchWindow,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    /// Result cap, no LIMIT clause when not positive
    pub limit: i64,
    pub version: Option<String>,
    /// Explicit ids; when present the id-resolution phase is skipped
    pub trace_ids: Vec<String>,
}

impl TraceQuery {
    /// Scheduling hint and cache bypass for the id-resolution phase
    pub fn search_mode(&self) -> (SearchMode, bool) {
        match self.version.as_deref() {
            Some("v3") => (SearchMode::Background, true),
            Some("v4") => (SearchMode::Background, false),
            _ => (SearchMode::Interactive, false),
        }
    }

    /// True when a predicate needs full span data to evaluate
    pub fn has_span_predicates(&self) -> bool {
        !self.tags.is_empty()
            || !self.operation_names.is_empty()
            || self.min_duration.is_some()
            || self.max_duration.is_some()
    }
}

/// Parser for find-traces requests
#[derive(Debug, Clone)]
pub struct QueryParser {
    lookback_micros: i64,
    max_window_micros: i64,
    max_window_minutes: i64,
    default_limit: i64,
    clock: fn() -> i64,
}

impl QueryParser {
    pub fn new(config: &QueryConfig) -> Self {
        let max_window_minutes = config.max_window_minutes as i64;
        Self {
            lookback_micros: (config.lookback_minutes as i64).saturating_mul(MICROS_PER_MINUTE),
            max_window_micros: max_window_minutes.saturating_mul(MICROS_PER_MINUTE),
            max_window_minutes,
            default_limit: config.default_limit as i64,
            clock: now_micros,
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn parse(&self, pairs: &[(String, String)]) -> Result<TraceQuery, ValidationError> {
        let params = Params::new(pairs);
        let now = (self.clock)();

        let start = parse_time(params.first(keys::START), keys::START)?
            .unwrap_or(now - self.lookback_micros);
        let end = parse_time(params.first(keys::END), keys::END)?.unwrap_or(now);

        let tags = parse_tags(&params.all(keys::TAG), &params.all(keys::TAGS))?;

        let limit = match params.first(keys::LIMIT) {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map_err(|e| ValidationError::invalid_param(keys::LIMIT, e))?,
            None => self.default_limit,
        };

        let mut trace_ids: Vec<String> = Vec::new();
        for id in params.all(keys::TRACE_ID) {
            if !trace_ids.iter().any(|existing| existing == id) {
                trace_ids.push(id.to_string());
            }
        }

        let query = TraceQuery {
            service_names: owned(params.all(keys::SERVICE)),
            operation_names: owned(params.all(keys::OPERATION)),
            tags,
            window: SearchWindow::new(start, end),
            min_duration: parse_duration(params.first(keys::MIN_DURATION), keys::MIN_DURATION)?,
            max_duration: parse_duration(params.first(keys::MAX_DURATION), keys::MAX_DURATION)?,
            limit,
            version: params.first(keys::VERSION).map(str::to_string),
            trace_ids,
        };
        self.validate(&query)?;
        Ok(query)
    }

    fn validate(&self, query: &TraceQuery) -> Result<(), ValidationError> {
        if query.trace_ids.is_empty() && query.service_names.is_empty() {
            if query.operation_names.is_empty() {
                return Err(ValidationError::ServiceRequired);
            }
            return Err(ValidationError::OperationWithoutService);
        }
        if let (Some(min), Some(max)) = (query.min_duration, query.max_duration)
            && max < min
        {
            return Err(ValidationError::MaxDurationBelowMin);
        }
        let width = query.window.end_micros - query.window.start_micros;
        if width <= 0 {
            return Err(ValidationError::StartNotBeforeEnd);
        }
        if width > self.max_window_micros {
            return Err(ValidationError::WindowTooWide {
                max_minutes: self.max_window_minutes,
            });
        }
        Ok(())
    }
}

fn owned(values: Vec<&str>) -> Vec<String> {
    values.into_iter().map(str::to_string).collect()
}

/// Microseconds since epoch; negative values are rejected
fn parse_time(raw: Option<&str>, param: &str) -> Result<Option<i64>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ValidationError::invalid_param(param, e))?;
    if value < 0 {
        return Err(ValidationError::invalid_param(param, "negative time value"));
    }
    Ok(Some(value))
}

/// Zero durations count as unset
fn parse_duration(raw: Option<&str>, param: &str) -> Result<Option<Duration>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let duration =
        humantime::parse_duration(raw.trim()).map_err(|e| ValidationError::invalid_param(param, e))?;
    Ok(Some(duration).filter(|d| !d.is_zero()))
}

/// Merge `key:value` tags and JSON-object tags, later values winning
pub fn parse_tags(
    simple: &[&str],
    json: &[&str],
) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut tags = BTreeMap::new();
    for tag in simple {
        let Some((key, value)) = tag.split_once(':') else {
            return Err(ValidationError::MalformedTag(tag.to_string()));
        };
        tags.insert(key.to_string(), value.to_string());
    }
    for raw in json {
        let parsed: BTreeMap<String, String> = serde_json::from_str(raw)
            .map_err(|e| ValidationError::MalformedTags(e.to_string()))?;
        tags.extend(parsed);
    }
    Ok(tags)
}

// ============================================================================
// Fetch-by-id Lookup
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct TraceLookup {
    pub trace_id: String,
    pub start_micros: Option<i64>,
    pub end_micros: Option<i64>,
    pub mode: SearchMode,
}

impl TraceLookup {
    /// Optional `start`/`end` bounds use [`epoch_to_micros`] unit detection
    pub fn parse(trace_id: &str, pairs: &[(String, String)]) -> Result<Self, ValidationError> {
        if trace_id.is_empty() || trace_id.len() > MAX_TRACE_ID_LEN {
            return Err(ValidationError::InvalidTraceId(trace_id.to_string()));
        }
        let params = Params::new(pairs);
        Ok(Self {
            trace_id: trace_id.to_string(),
            start_micros: parse_epoch(params.first(keys::START), keys::START)?,
            end_micros: parse_epoch(params.first(keys::END), keys::END)?,
            mode: params.report_mode(),
        })
    }
}

fn parse_epoch(raw: Option<&str>, param: &str) -> Result<Option<i64>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ValidationError::invalid_param(param, e))?;
    Ok(Some(value).filter(|v| *v > 0).map(epoch_to_micros))
}

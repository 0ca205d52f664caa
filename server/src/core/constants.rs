// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "TraceBridge";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "tracebridge";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tracebridge";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tracebridge.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACEBRIDGE_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TRACEBRIDGE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TRACEBRIDGE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACEBRIDGE_LOG";

// =============================================================================
// Environment Variables - OpenObserve
// =============================================================================

/// OpenObserve base URL
pub const ENV_OPENOBSERVE_URL: &str = "TRACEBRIDGE_OPENOBSERVE_URL";

/// Base64 `user:password` credential for OpenObserve
pub const ENV_OPENOBSERVE_AUTH: &str = "TRACEBRIDGE_OPENOBSERVE_AUTH";

/// OpenObserve organization
pub const ENV_OPENOBSERVE_ORG: &str = "TRACEBRIDGE_OPENOBSERVE_ORG";

/// Backend request timeout in seconds
pub const ENV_OPENOBSERVE_TIMEOUT_SECS: &str = "TRACEBRIDGE_OPENOBSERVE_TIMEOUT_SECS";

/// Attempts per backend search, including the first
pub const ENV_OPENOBSERVE_MAX_ATTEMPTS: &str = "TRACEBRIDGE_OPENOBSERVE_MAX_ATTEMPTS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port (Jaeger query port)
pub const DEFAULT_PORT: u16 = 16686;

/// Graceful shutdown timeout in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// OpenObserve Defaults
// =============================================================================

pub const DEFAULT_OPENOBSERVE_ORG: &str = "default";

pub const DEFAULT_OPENOBSERVE_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_OPENOBSERVE_MAX_ATTEMPTS: u32 = 1;

/// Backend-reported latency above which a query is logged as slow
pub const DEFAULT_SLOW_QUERY_MS: u64 = 4000;

/// Full span store stream
pub const DEFAULT_SPAN_STREAM: &str = "default";

/// Pre-aggregated trace id index stream
pub const DEFAULT_TRACE_INDEX_STREAM: &str = "trace_list_index";

/// Distinct service/operation values stream
pub const DEFAULT_DISTINCT_VALUES_STREAM: &str = "distinct_values_traces_default";

// =============================================================================
// Query Defaults
// =============================================================================

/// Search window when `start` is omitted
pub const DEFAULT_LOOKBACK_MINUTES: u64 = 60;

/// Widest search window accepted
pub const DEFAULT_MAX_WINDOW_MINUTES: u64 = 65;

/// Traces returned when `limit` is omitted
pub const DEFAULT_QUERY_LIMIT: u64 = 20;

/// Padding on each side of the search window for the span fetch
pub const DEFAULT_SPAN_FETCH_PADDING_MINUTES: u64 = 30;

/// Look-back for fetch-by-id when no window is given
pub const DEFAULT_TRACE_DETAIL_RANGE_HOURS: u64 = 24;

/// Row cap for one span fetch
pub const DEFAULT_MAX_SPANS: u64 = 10_000;

/// Look-back for service and operation listings
pub const DEFAULT_METADATA_RANGE_HOURS: u64 = 168;

pub const DEFAULT_SERVICES_LIMIT: u64 = 1000;

pub const DEFAULT_OPERATIONS_LIMIT: u64 = 1000;

/// Column prefix marking process-level tags
pub const DEFAULT_PROCESS_TAG_PREFIX: &str = "service_";

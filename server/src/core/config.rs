use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_DISTINCT_VALUES_STREAM, DEFAULT_HOST,
    DEFAULT_LOOKBACK_MINUTES, DEFAULT_MAX_SPANS, DEFAULT_MAX_WINDOW_MINUTES,
    DEFAULT_METADATA_RANGE_HOURS, DEFAULT_OPENOBSERVE_MAX_ATTEMPTS, DEFAULT_OPENOBSERVE_ORG,
    DEFAULT_OPENOBSERVE_TIMEOUT_SECS, DEFAULT_OPERATIONS_LIMIT, DEFAULT_PORT,
    DEFAULT_PROCESS_TAG_PREFIX, DEFAULT_QUERY_LIMIT, DEFAULT_SERVICES_LIMIT,
    DEFAULT_SLOW_QUERY_MS, DEFAULT_SPAN_FETCH_PADDING_MINUTES, DEFAULT_SPAN_STREAM,
    DEFAULT_TRACE_DETAIL_RANGE_HOURS, DEFAULT_TRACE_INDEX_STREAM,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// OpenObserve backend section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OpenObserveFileConfig {
    pub url: Option<String>,
    pub auth: Option<String>,
    pub organization: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub slow_query_ms: Option<u64>,
    pub span_stream: Option<String>,
    pub trace_index_stream: Option<String>,
    pub distinct_values_stream: Option<String>,
    pub use_trace_index: Option<bool>,
}

/// Query engine section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QueryFileConfig {
    pub lookback_minutes: Option<u64>,
    pub max_window_minutes: Option<u64>,
    pub default_limit: Option<u64>,
    pub span_fetch_padding_minutes: Option<u64>,
    pub trace_detail_range_hours: Option<u64>,
    pub max_spans: Option<u64>,
    pub metadata_range_hours: Option<u64>,
    pub services_limit: Option<u64>,
    pub operations_limit: Option<u64>,
    pub process_tag_prefixes: Option<Vec<String>>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub openobserve: Option<OpenObserveFileConfig>,
    pub query: Option<QueryFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `$target.$field` when `$source.$field` is set
macro_rules! merge_fields {
    ($section:literal, $target:expr, $source:expr, [$($field:ident),* $(,)?]) => {
        $(
            if $source.$field.is_some() {
                tracing::trace!(
                    value = ?$source.$field,
                    "Merging {}.{}",
                    $section,
                    stringify!($field)
                );
                $target.$field = $source.$field;
            }
        )*
    };
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_fields!("server", current, server, [host, port]);
        }

        if let Some(openobserve) = other.openobserve {
            let current = self
                .openobserve
                .get_or_insert_with(OpenObserveFileConfig::default);
            merge_fields!(
                "openobserve",
                current,
                openobserve,
                [
                    url,
                    auth,
                    organization,
                    timeout_secs,
                    max_attempts,
                    slow_query_ms,
                    span_stream,
                    trace_index_stream,
                    distinct_values_stream,
                    use_trace_index,
                ]
            );
        }

        if let Some(query) = other.query {
            let current = self.query.get_or_insert_with(QueryFileConfig::default);
            merge_fields!(
                "query",
                current,
                query,
                [
                    lookback_minutes,
                    max_window_minutes,
                    default_limit,
                    span_fetch_padding_minutes,
                    trace_detail_range_hours,
                    max_spans,
                    metadata_range_hours,
                    services_limit,
                    operations_limit,
                    process_tag_prefixes,
                ]
            );
        }
    }
}

// =============================================================================
// Final Config Structs
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// OpenObserve connection and stream layout
#[derive(Debug, Clone)]
pub struct OpenObserveConfig {
    pub url: String,
    /// Base64 `user:password`, sent as HTTP basic auth
    pub auth: Option<String>,
    pub organization: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub slow_query_ms: u64,
    pub span_stream: String,
    pub trace_index_stream: String,
    pub distinct_values_stream: String,
    /// Resolve trace ids from the index stream when no span predicate is set
    pub use_trace_index: bool,
}

impl Default for OpenObserveConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            auth: None,
            organization: DEFAULT_OPENOBSERVE_ORG.to_string(),
            timeout_secs: DEFAULT_OPENOBSERVE_TIMEOUT_SECS,
            max_attempts: DEFAULT_OPENOBSERVE_MAX_ATTEMPTS,
            slow_query_ms: DEFAULT_SLOW_QUERY_MS,
            span_stream: DEFAULT_SPAN_STREAM.to_string(),
            trace_index_stream: DEFAULT_TRACE_INDEX_STREAM.to_string(),
            distinct_values_stream: DEFAULT_DISTINCT_VALUES_STREAM.to_string(),
            use_trace_index: true,
        }
    }
}

/// Query engine windows and limits
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub lookback_minutes: u64,
    pub max_window_minutes: u64,
    pub default_limit: u64,
    pub span_fetch_padding_minutes: u64,
    pub trace_detail_range_hours: u64,
    pub max_spans: u64,
    pub metadata_range_hours: u64,
    pub services_limit: u64,
    pub operations_limit: u64,
    /// Attribute columns with one of these prefixes become process tags
    pub process_tag_prefixes: Vec<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            lookback_minutes: DEFAULT_LOOKBACK_MINUTES,
            max_window_minutes: DEFAULT_MAX_WINDOW_MINUTES,
            default_limit: DEFAULT_QUERY_LIMIT,
            span_fetch_padding_minutes: DEFAULT_SPAN_FETCH_PADDING_MINUTES,
            trace_detail_range_hours: DEFAULT_TRACE_DETAIL_RANGE_HOURS,
            max_spans: DEFAULT_MAX_SPANS,
            metadata_range_hours: DEFAULT_METADATA_RANGE_HOURS,
            services_limit: DEFAULT_SERVICES_LIMIT,
            operations_limit: DEFAULT_OPERATIONS_LIMIT,
            process_tag_prefixes: vec![DEFAULT_PROCESS_TAG_PREFIX.to_string()],
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openobserve: OpenObserveConfig,
    pub query: QueryConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tracebridge/tracebridge.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            openobserve_url = %config.openobserve.url,
            organization = %config.openobserve.organization,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Layer defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_oo = file_config.openobserve.unwrap_or_default();
        let file_query = file_config.query.unwrap_or_default();

        let oo_defaults = OpenObserveConfig::default();
        let query_defaults = QueryConfig::default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let openobserve = OpenObserveConfig {
            url: cli
                .openobserve_url
                .clone()
                .or(file_oo.url)
                .unwrap_or(oo_defaults.url),
            auth: cli.openobserve_auth.clone().or(file_oo.auth),
            organization: cli
                .openobserve_org
                .clone()
                .or(file_oo.organization)
                .unwrap_or(oo_defaults.organization),
            timeout_secs: cli
                .openobserve_timeout_secs
                .or(file_oo.timeout_secs)
                .unwrap_or(oo_defaults.timeout_secs),
            max_attempts: cli
                .openobserve_max_attempts
                .or(file_oo.max_attempts)
                .unwrap_or(oo_defaults.max_attempts),
            slow_query_ms: file_oo.slow_query_ms.unwrap_or(oo_defaults.slow_query_ms),
            span_stream: file_oo.span_stream.unwrap_or(oo_defaults.span_stream),
            trace_index_stream: file_oo
                .trace_index_stream
                .unwrap_or(oo_defaults.trace_index_stream),
            distinct_values_stream: file_oo
                .distinct_values_stream
                .unwrap_or(oo_defaults.distinct_values_stream),
            use_trace_index: file_oo
                .use_trace_index
                .unwrap_or(oo_defaults.use_trace_index),
        };

        let query = QueryConfig {
            lookback_minutes: file_query
                .lookback_minutes
                .unwrap_or(query_defaults.lookback_minutes),
            max_window_minutes: file_query
                .max_window_minutes
                .unwrap_or(query_defaults.max_window_minutes),
            default_limit: file_query
                .default_limit
                .unwrap_or(query_defaults.default_limit),
            span_fetch_padding_minutes: file_query
                .span_fetch_padding_minutes
                .unwrap_or(query_defaults.span_fetch_padding_minutes),
            trace_detail_range_hours: file_query
                .trace_detail_range_hours
                .unwrap_or(query_defaults.trace_detail_range_hours),
            max_spans: file_query.max_spans.unwrap_or(query_defaults.max_spans),
            metadata_range_hours: file_query
                .metadata_range_hours
                .unwrap_or(query_defaults.metadata_range_hours),
            services_limit: file_query
                .services_limit
                .unwrap_or(query_defaults.services_limit),
            operations_limit: file_query
                .operations_limit
                .unwrap_or(query_defaults.operations_limit),
            process_tag_prefixes: file_query
                .process_tag_prefixes
                .unwrap_or(query_defaults.process_tag_prefixes),
        };

        Self {
            server,
            openobserve,
            query,
        }
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        let url = &self.openobserve.url;
        if url.is_empty() {
            anyhow::bail!(
                "Configuration error: openobserve.url is required (--openobserve-url or TRACEBRIDGE_OPENOBSERVE_URL)"
            );
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!(
                "Configuration error: openobserve.url must start with http:// or https:// (got '{}')",
                url
            );
        }
        if self.openobserve.organization.is_empty() {
            anyhow::bail!("Configuration error: openobserve.organization must not be empty");
        }
        if self.openobserve.timeout_secs == 0 {
            anyhow::bail!("Configuration error: openobserve.timeout_secs must be greater than 0");
        }
        if self.openobserve.max_attempts == 0 {
            anyhow::bail!("Configuration error: openobserve.max_attempts must be greater than 0");
        }
        if self.openobserve.span_stream.is_empty()
            || self.openobserve.distinct_values_stream.is_empty()
            || (self.openobserve.use_trace_index && self.openobserve.trace_index_stream.is_empty())
        {
            anyhow::bail!("Configuration error: openobserve stream names must not be empty");
        }

        let q = &self.query;
        for (name, value) in [
            ("query.lookback_minutes", q.lookback_minutes),
            ("query.max_window_minutes", q.max_window_minutes),
            ("query.default_limit", q.default_limit),
            ("query.trace_detail_range_hours", q.trace_detail_range_hours),
            ("query.max_spans", q.max_spans),
            ("query.metadata_range_hours", q.metadata_range_hours),
            ("query.services_limit", q.services_limit),
            ("query.operations_limit", q.operations_limit),
        ] {
            if value == 0 {
                anyhow::bail!("Configuration error: {} must be greater than 0", name);
            }
        }
        if q.max_window_minutes < q.lookback_minutes {
            anyhow::bail!(
                "Configuration error: query.max_window_minutes ({}) must be >= query.lookback_minutes ({})",
                q.max_window_minutes,
                q.lookback_minutes
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.tracebridge/tracebridge.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}

/// Expand a leading `~` to the home directory
fn expand_path(path: &str) -> PathBuf {
    let path = path.trim();
    if path == "~" {
        return dirs::home_dir().unwrap_or_else(|| PathBuf::from(path));
    }
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_url() -> CliConfig {
        CliConfig {
            openobserve_url: Some("http://localhost:5080".to_string()),
            ..CliConfig::default()
        }
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "openobserve": { "url": "http://oo:5080", "organization": "acme", "use_trace_index": false },
            "query": { "max_spans": 500, "process_tag_prefixes": ["service_", "host_"] }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));
        let oo = config.openobserve.as_ref().unwrap();
        assert_eq!(oo.organization.as_deref(), Some("acme"));
        assert_eq!(oo.use_trace_index, Some(false));
        let query = config.query.as_ref().unwrap();
        assert_eq!(query.max_spans, Some(500));
        assert_eq!(query.process_tag_prefixes.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.openobserve.is_none());
        assert!(config.query.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "host": "localhost" }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "server": { "host": "localhost", "port": 3000 }, "query": { "max_spans": 100 } }"#,
        )
        .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "server": { "port": 9000 }, "openobserve": { "url": "http://x" } }"#)
                .unwrap();
        base.merge(overlay);

        let server = base.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("localhost"));
        assert_eq!(server.port, Some(9000));
        assert_eq!(base.query.as_ref().unwrap().max_spans, Some(100));
        assert_eq!(
            base.openobserve.as_ref().unwrap().url.as_deref(),
            Some("http://x")
        );
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&cli_with_url(), FileConfig::default());
        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.openobserve.organization, "default");
        assert_eq!(config.openobserve.span_stream, "default");
        assert!(config.openobserve.use_trace_index);
        assert_eq!(config.query.lookback_minutes, 60);
        assert_eq!(config.query.max_window_minutes, 65);
        assert_eq!(config.query.default_limit, 20);
        assert_eq!(config.query.process_tag_prefixes, vec!["service_".to_string()]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cli_overrides_file() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "server": { "port": 9000 }, "openobserve": { "url": "http://file:5080", "organization": "file-org" } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            port: Some(7000),
            openobserve_org: Some("cli-org".to_string()),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, file);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.openobserve.url, "http://file:5080");
        assert_eq!(config.openobserve.organization, "cli-org");
    }

    #[test]
    fn test_validate_requires_url() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default());
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("openobserve.url is required"));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let cli = CliConfig {
            openobserve_url: Some("ftp://oo".to_string()),
            ..CliConfig::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_window_ordering() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "query": { "lookback_minutes": 120, "max_window_minutes": 60 } }"#,
        )
        .unwrap();
        let config = AppConfig::resolve(&cli_with_url(), file);
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_window_minutes"));
    }

    #[test]
    fn test_validate_zero_limit() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "query": { "default_limit": 0 } }"#).unwrap();
        let config = AppConfig::resolve(&cli_with_url(), file);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_cli_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "openobserve": {{ "url": "https://oo.example.com", "max_attempts": 3 }} }}"#
        )
        .unwrap();
        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..CliConfig::default()
        };
        let config = AppConfig::load(&cli).unwrap();
        assert_eq!(config.openobserve.url, "https://oo.example.com");
        assert_eq!(config.openobserve.max_attempts, 3);
    }

    #[test]
    fn test_load_missing_cli_path() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/nonexistent/tracebridge.json")),
            ..cli_with_url()
        };
        let err = AppConfig::load(&cli).unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn test_is_all_interfaces() {
        assert!(is_all_interfaces("0.0.0.0"));
        assert!(is_all_interfaces("::"));
        assert!(!is_all_interfaces("127.0.0.1"));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(expand_path("/etc/x.json"), PathBuf::from("/etc/x.json"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/a.json"), home.join("a.json"));
        }
    }
}

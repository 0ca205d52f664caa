//! Jaeger query API on top of OpenObserve
//!
//! - `core` - CLI, configuration, shutdown, application bootstrap
//! - `api` - HTTP server and Jaeger-compatible routes
//! - `domain` - Jaeger query translation engine
//! - `data` - OpenObserve client and span row decoding
//! - `utils` - SQL quoting, time conversion, retry

pub mod api;
mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;

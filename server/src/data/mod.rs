//! Data access layer
//!
//! - `traits` - Backend-neutral search request/response and the `QueryBackend` trait
//! - `openobserve` - HTTP client for the OpenObserve search API
//! - `record` - Typed decoding of flattened span rows
//! - `fields` - Column names of the flattened span schema
//! - `error` - Backend error type

pub mod error;
pub mod fields;
pub mod openobserve;
pub mod record;
pub mod traits;

#[cfg(test)]
pub mod fake;

pub use error::BackendError;
pub use openobserve::OpenObserveClient;
pub use record::{DecodeError, FlatSpanRecord};
pub use traits::{DataSource, QueryBackend, Row, SearchMode, SearchRequest, SearchResponse, SearchWindow};

//! Jaeger query translation engine
//!
//! Turns Jaeger query API requests into OpenObserve SQL, runs them through a
//! [`QueryBackend`](crate::data::QueryBackend), and rebuilds Jaeger traces
//! from the flattened span rows.
//!
//! - `query` - Request parameter parsing and validation
//! - `sql` - SQL text builders
//! - `retriever` - Two-phase id resolution and span fetch
//! - `assemble` - Flat span rows to Jaeger spans
//! - `adjust` - Post-assembly trace adjusters
//! - `envelope` - UI wire format and error mapping
//! - `service` - The `JaegerService` facade

pub mod adjust;
pub mod assemble;
pub mod envelope;
pub mod error;
pub mod model;
pub mod query;
pub mod retriever;
pub mod service;
pub mod sql;

pub use envelope::{StructuredResponse, UiTrace};
pub use error::{AssemblyWarning, EngineError, Phase, ValidationError};
pub use query::{Params, QueryParser, TraceLookup, TraceQuery};
pub use service::JaegerService;

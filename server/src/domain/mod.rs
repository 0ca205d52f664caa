//! Domain logic
//!
//! - `jaeger` - Jaeger query API translation over OpenObserve

pub mod jaeger;

pub use jaeger::JaegerService;

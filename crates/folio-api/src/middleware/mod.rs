//! # Middleware Modules
//!
//! Tower middleware layers for the Folio API.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;

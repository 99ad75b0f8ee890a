//! Observability initialization for valet.

pub mod tracing_setup;

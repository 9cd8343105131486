//! Observability for Flowmill: tracing subscriber setup and span
//! attribute conventions.

pub mod flow_attrs;
pub mod tracing_setup;

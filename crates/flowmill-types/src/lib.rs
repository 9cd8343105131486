//! Shared domain types for Flowmill.
//!
//! This crate holds the canonical data model consumed by all other crates:
//! workflow definitions (nodes, edges, config), execution tracking records,
//! agent definitions, and the request/response types of the outbound
//! collaborators (LLM providers, mail). It depends only on serde-family
//! crates -- never on tokio or any IO crate.

pub mod agent;
pub mod error;
pub mod llm;
pub mod mail;
pub mod record;
pub mod workflow;

//! Flowmill core: the workflow execution engine.
//!
//! Contains the definition loader and validator, the template and
//! expression engines, the node executor suite, and the orchestrator that
//! walks a workflow graph and persists execution records through the
//! repository traits. Transport and storage backends live in
//! `flowmill-infra`; this crate only defines the seams.

pub mod engine;
pub mod executor;
pub mod llm;
pub mod outbound;
pub mod repository;

//! Workflow engine: validation, context, expression machinery, and the
//! orchestrator.

pub mod condition;
pub mod context;
pub mod definition;
pub mod expression;
pub mod graph;
pub mod orchestrator;
pub mod recorder;
pub mod template;

pub use context::{ExecutionContext, RunOptions};
pub use orchestrator::WorkflowEngine;

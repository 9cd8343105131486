//! LLM provider seam, routing, and cost estimation.

pub mod pricing;
pub mod provider;
pub mod router;

pub use provider::{BoxLlmProvider, LlmProvider};
pub use router::LlmRouter;

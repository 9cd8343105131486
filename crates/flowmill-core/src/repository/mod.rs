//! Storage seams. Backends live in `flowmill-infra`.

pub mod agent;
pub mod workflow;

pub use agent::AgentRepository;
pub use workflow::WorkflowRepository;

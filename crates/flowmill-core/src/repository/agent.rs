//! Agent repository trait.

use uuid::Uuid;

use flowmill_types::agent::{AgentDefinition, AgentRunStats};
use flowmill_types::error::RepositoryError;

/// Repository for AI agent definitions and usage accounting.
pub trait AgentRepository: Send + Sync {
    fn save_agent(
        &self,
        agent: &AgentDefinition,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn get_agent(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<AgentDefinition>, RepositoryError>> + Send;

    /// Record token usage and estimated cost for one agent invocation.
    fn record_run(
        &self,
        stats: &AgentRunStats,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

//! Workflow repository trait.
//!
//! Storage interface for workflow definitions, execution records, node
//! attempt records, and execution logs. Uses native async fn in traits
//! (Rust 2024 edition, no async_trait macro).

use serde_json::Value;
use uuid::Uuid;

use flowmill_types::error::RepositoryError;
use flowmill_types::record::{
    ExecutionLogEntry, ExecutionStatus, NodeExecutionRecord, NodeRunStatus,
    WorkflowExecutionRecord,
};
use flowmill_types::workflow::WorkflowDefinition;

/// Repository for workflow persistence.
///
/// Covers three entity families: definitions (the canonical IR),
/// executions (one record per run), and node records (one per node
/// attempt), plus the free-form execution log.
pub trait WorkflowRepository: Send + Sync {
    // -----------------------------------------------------------------------
    // Definitions
    // -----------------------------------------------------------------------

    /// Upsert a workflow definition (insert or replace by id).
    fn save_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn get_definition(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<Option<WorkflowDefinition>, RepositoryError>> + Send;

    fn list_definitions(
        &self,
    ) -> impl Future<Output = Result<Vec<WorkflowDefinition>, RepositoryError>> + Send;

    /// Delete a definition by id. Returns `true` if it existed.
    fn delete_definition(
        &self,
        id: &Uuid,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Executions
    // -----------------------------------------------------------------------

    fn create_execution(
        &self,
        record: &WorkflowExecutionRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Update an execution's status, and on terminal transitions its
    /// error/output and finish time.
    fn update_execution(
        &self,
        execution_id: &Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
        output: Option<&Value>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn get_execution(
        &self,
        execution_id: &Uuid,
    ) -> impl Future<Output = Result<Option<WorkflowExecutionRecord>, RepositoryError>> + Send;

    /// List executions for a workflow, newest first.
    fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<WorkflowExecutionRecord>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Node records
    // -----------------------------------------------------------------------

    fn create_node_record(
        &self,
        record: &NodeExecutionRecord,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn update_node_record(
        &self,
        record_id: &Uuid,
        status: NodeRunStatus,
        output: Option<&Value>,
        error: Option<&str>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Node records for an execution, in start order.
    fn list_node_records(
        &self,
        execution_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<NodeExecutionRecord>, RepositoryError>> + Send;

    // -----------------------------------------------------------------------
    // Logs
    // -----------------------------------------------------------------------

    fn append_log(
        &self,
        entry: &ExecutionLogEntry,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn get_logs(
        &self,
        execution_id: &Uuid,
    ) -> impl Future<Output = Result<Vec<ExecutionLogEntry>, RepositoryError>> + Send;
}

//! Execution recording.
//!
//! Thin wrapper over the workflow repository that owns the shape of the
//! records the orchestrator writes: the execution record lifecycle, one
//! node record per attempt, and log entries.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use flowmill_types::error::RepositoryError;
use flowmill_types::record::{
    ExecutionLogEntry, ExecutionStatus, LogLevel, NodeExecutionRecord, NodeRunStatus,
    WorkflowExecutionRecord,
};

use crate::repository::workflow::WorkflowRepository;

pub struct ExecutionRecorder<R> {
    repository: Arc<R>,
}

impl<R: WorkflowRepository> ExecutionRecorder<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Create the pending execution record and move it to running.
    pub async fn execution_started(
        &self,
        workflow_id: Uuid,
        input: Value,
    ) -> Result<WorkflowExecutionRecord, RepositoryError> {
        let record = WorkflowExecutionRecord::new(workflow_id, input);
        self.repository.create_execution(&record).await?;
        self.repository
            .update_execution(&record.id, ExecutionStatus::Running, None, None)
            .await?;
        Ok(record)
    }

    pub async fn execution_finished(
        &self,
        execution_id: &Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
        output: Option<&Value>,
    ) -> Result<(), RepositoryError> {
        self.repository
            .update_execution(execution_id, status, error, output)
            .await
    }

    /// Record the start of a node attempt. Returns the record id used to
    /// close it out.
    pub async fn node_started(
        &self,
        execution_id: Uuid,
        node_id: &str,
        attempt: u32,
    ) -> Result<Uuid, RepositoryError> {
        let record = NodeExecutionRecord::started(execution_id, node_id, attempt);
        self.repository.create_node_record(&record).await?;
        Ok(record.id)
    }

    pub async fn node_completed(
        &self,
        record_id: &Uuid,
        output: &Value,
    ) -> Result<(), RepositoryError> {
        self.repository
            .update_node_record(record_id, NodeRunStatus::Completed, Some(output), None)
            .await
    }

    pub async fn node_failed(
        &self,
        record_id: &Uuid,
        error: &str,
    ) -> Result<(), RepositoryError> {
        self.repository
            .update_node_record(record_id, NodeRunStatus::Failed, None, Some(error))
            .await
    }

    pub async fn log(
        &self,
        execution_id: Uuid,
        node_id: Option<&str>,
        level: LogLevel,
        message: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let mut entry = ExecutionLogEntry::new(execution_id, level, message);
        if let Some(node_id) = node_id {
            entry = entry.for_node(node_id);
        }
        self.repository.append_log(&entry).await
    }
}

//! In-memory repositories backed by [`DashMap`].
//!
//! The default storage for embedded use and tests. Everything lives in
//! process memory; nothing survives a restart.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Mutex;
use uuid::Uuid;

use flowmill_core::repository::{AgentRepository, WorkflowRepository};
use flowmill_types::agent::{AgentDefinition, AgentRunStats};
use flowmill_types::error::RepositoryError;
use flowmill_types::record::{
    ExecutionLogEntry, ExecutionStatus, NodeExecutionRecord, NodeRunStatus,
    WorkflowExecutionRecord,
};
use flowmill_types::workflow::WorkflowDefinition;

/// In-memory [`WorkflowRepository`] and [`AgentRepository`].
#[derive(Default)]
pub struct MemoryRepository {
    definitions: DashMap<Uuid, WorkflowDefinition>,
    executions: DashMap<Uuid, WorkflowExecutionRecord>,
    /// Node records per execution, in start order.
    node_records: DashMap<Uuid, Vec<NodeExecutionRecord>>,
    logs: DashMap<Uuid, Vec<ExecutionLogEntry>>,
    agents: DashMap<Uuid, AgentDefinition>,
    runs: Mutex<Vec<AgentRunStats>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded agent runs, oldest first.
    pub fn agent_runs(&self) -> Vec<AgentRunStats> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl WorkflowRepository for MemoryRepository {
    async fn save_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> Result<(), RepositoryError> {
        self.definitions.insert(definition.id, definition.clone());
        Ok(())
    }

    async fn get_definition(
        &self,
        id: &Uuid,
    ) -> Result<Option<WorkflowDefinition>, RepositoryError> {
        Ok(self.definitions.get(id).map(|entry| entry.clone()))
    }

    async fn list_definitions(&self) -> Result<Vec<WorkflowDefinition>, RepositoryError> {
        let mut definitions: Vec<_> = self
            .definitions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(definitions)
    }

    async fn delete_definition(&self, id: &Uuid) -> Result<bool, RepositoryError> {
        Ok(self.definitions.remove(id).is_some())
    }

    async fn create_execution(
        &self,
        record: &WorkflowExecutionRecord,
    ) -> Result<(), RepositoryError> {
        if self.executions.contains_key(&record.id) {
            return Err(RepositoryError::AlreadyExists(record.id.to_string()));
        }
        self.executions.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_execution(
        &self,
        execution_id: &Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
        output: Option<&Value>,
    ) -> Result<(), RepositoryError> {
        let mut entry = self
            .executions
            .get_mut(execution_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("execution {execution_id}")))?;
        entry.status = status;
        entry.error = error.map(String::from);
        if output.is_some() {
            entry.output = output.cloned();
        }
        if status.is_terminal() {
            entry.finished_at = Some(chrono::Utc::now());
        }
        Ok(())
    }

    async fn get_execution(
        &self,
        execution_id: &Uuid,
    ) -> Result<Option<WorkflowExecutionRecord>, RepositoryError> {
        Ok(self.executions.get(execution_id).map(|entry| entry.clone()))
    }

    async fn list_executions(
        &self,
        workflow_id: &Uuid,
        limit: usize,
    ) -> Result<Vec<WorkflowExecutionRecord>, RepositoryError> {
        let mut records: Vec<_> = self
            .executions
            .iter()
            .filter(|entry| entry.workflow_id == *workflow_id)
            .map(|entry| entry.value().clone())
            .collect();
        // UUIDv7 ids sort by creation time.
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(limit);
        Ok(records)
    }

    async fn create_node_record(
        &self,
        record: &NodeExecutionRecord,
    ) -> Result<(), RepositoryError> {
        self.node_records
            .entry(record.execution_id)
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn update_node_record(
        &self,
        record_id: &Uuid,
        status: NodeRunStatus,
        output: Option<&Value>,
        error: Option<&str>,
    ) -> Result<(), RepositoryError> {
        for mut records in self.node_records.iter_mut() {
            if let Some(record) = records.iter_mut().find(|r| r.id == *record_id) {
                record.status = status;
                record.output = output.cloned();
                record.error = error.map(String::from);
                record.finished_at = Some(chrono::Utc::now());
                return Ok(());
            }
        }
        Err(RepositoryError::NotFound(format!("node record {record_id}")))
    }

    async fn list_node_records(
        &self,
        execution_id: &Uuid,
    ) -> Result<Vec<NodeExecutionRecord>, RepositoryError> {
        Ok(self
            .node_records
            .get(execution_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }

    async fn append_log(&self, entry: &ExecutionLogEntry) -> Result<(), RepositoryError> {
        self.logs
            .entry(entry.execution_id)
            .or_default()
            .push(entry.clone());
        Ok(())
    }

    async fn get_logs(
        &self,
        execution_id: &Uuid,
    ) -> Result<Vec<ExecutionLogEntry>, RepositoryError> {
        Ok(self
            .logs
            .get(execution_id)
            .map(|entry| entry.clone())
            .unwrap_or_default())
    }
}

impl AgentRepository for MemoryRepository {
    async fn save_agent(&self, agent: &AgentDefinition) -> Result<(), RepositoryError> {
        self.agents.insert(agent.id, agent.clone());
        Ok(())
    }

    async fn get_agent(&self, id: &Uuid) -> Result<Option<AgentDefinition>, RepositoryError> {
        Ok(self.agents.get(id).map(|entry| entry.clone()))
    }

    async fn record_run(&self, stats: &AgentRunStats) -> Result<(), RepositoryError> {
        self.runs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(stats.clone());
        Ok(())
    }
}

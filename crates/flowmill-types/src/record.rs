//! Execution records.
//!
//! Persistent state written by the engine as a workflow run progresses:
//! one [`WorkflowExecutionRecord`] per run, one [`NodeExecutionRecord`] per
//! node attempt, plus free-form [`ExecutionLogEntry`] lines.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use crate::workflow::LogLevel;

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

/// Lifecycle state of a workflow execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Accepted, graph traversal not yet started.
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Lifecycle state of a single node attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRunStatus {
    Running,
    Completed,
    Failed,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Persistent record of one workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowExecutionRecord {
    /// UUIDv7; doubles as the run's sort key.
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: ExecutionStatus,
    /// Trigger input the run was started with.
    pub input: Value,
    /// Final variable snapshot, populated on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Top-level failure message, populated on failure/timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowExecutionRecord {
    /// A fresh pending record for a run starting now.
    pub fn new(workflow_id: Uuid, input: Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id,
            status: ExecutionStatus::Pending,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Persistent record of one node attempt within an execution.
///
/// Retried nodes produce one record per attempt, distinguished by
/// `attempt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionRecord {
    pub id: Uuid,
    pub execution_id: Uuid,
    pub node_id: String,
    /// 1-based attempt counter.
    pub attempt: u32,
    pub status: NodeRunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl NodeExecutionRecord {
    /// A running record for the given attempt, starting now.
    pub fn started(execution_id: Uuid, node_id: &str, attempt: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            execution_id,
            node_id: node_id.to_string(),
            attempt,
            status: NodeRunStatus::Running,
            output: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// One line of the execution log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub execution_id: Uuid,
    /// Node that emitted the entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub level: LogLevel,
    pub message: String,
    /// Structured fields attached to the entry.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, Value>,
    pub at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(execution_id: Uuid, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            execution_id,
            node_id: None,
            level,
            message: message.into(),
            fields: HashMap::new(),
            at: Utc::now(),
        }
    }

    pub fn for_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Workflow orchestrator.
//!
//! [`WorkflowEngine`] drives one execution: pre-flight validation, graph
//! traversal from the trigger nodes, edge-guard evaluation, per-node
//! retry, and record keeping through [`ExecutionRecorder`]. Branch
//! fan-out runs on a `JoinSet` capped by a semaphore; the cap bounds
//! concurrently executing nodes, not branches in flight, so nested
//! fan-outs cannot deadlock on permits.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use flowmill_types::error::RepositoryError;
use flowmill_types::record::{ExecutionStatus, LogLevel, WorkflowExecutionRecord};
use flowmill_types::workflow::{
    ErrorHandling, RetryPolicy, WorkflowDefinition, WorkflowNode,
};

use super::context::{ExecutionContext, RunOptions};
use super::expression::FlowEvaluator;
use super::graph::WorkflowGraph;
use super::definition;
use super::recorder::ExecutionRecorder;
use crate::executor::ExecutorRegistry;
use crate::repository::workflow::WorkflowRepository;

/// Default cap on concurrently executing nodes within one execution.
const DEFAULT_BRANCH_CONCURRENCY: usize = 8;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    #[error("workflow '{0}' is inactive")]
    Inactive(String),

    #[error("workflow definition is invalid: {}", .0.join("; "))]
    Invalid(Vec<String>),

    #[error("execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// The execution engine. Cheap to clone; all state is shared.
pub struct WorkflowEngine<R> {
    inner: Arc<EngineInner<R>>,
}

impl<R> Clone for WorkflowEngine<R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct EngineInner<R> {
    repository: Arc<R>,
    recorder: ExecutionRecorder<R>,
    registry: Arc<ExecutorRegistry>,
    running: DashMap<Uuid, CancellationToken>,
}

impl<R: WorkflowRepository + 'static> WorkflowEngine<R> {
    pub fn new(repository: Arc<R>, registry: Arc<ExecutorRegistry>) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                recorder: ExecutionRecorder::new(repository.clone()),
                repository,
                registry,
                running: DashMap::new(),
            }),
        }
    }

    /// Start an execution in the background. Pre-flight (lookup, active
    /// check, validation) happens inline so callers get definition
    /// problems as errors; traversal runs on a spawned task and the
    /// execution id is returned immediately.
    pub async fn start(
        &self,
        workflow_id: &Uuid,
        input: Value,
        options: RunOptions,
    ) -> Result<Uuid, EngineError> {
        let run = self.prepare(workflow_id, input, options).await?;
        let execution_id = run.record.id;
        tokio::spawn(run_graph(run));
        Ok(execution_id)
    }

    /// Run an execution to completion and return its final record.
    pub async fn run(
        &self,
        workflow_id: &Uuid,
        input: Value,
        options: RunOptions,
    ) -> Result<WorkflowExecutionRecord, EngineError> {
        let run = self.prepare(workflow_id, input, options).await?;
        let execution_id = run.record.id;
        run_graph(run).await;
        self.inner
            .repository
            .get_execution(&execution_id)
            .await?
            .ok_or(EngineError::ExecutionNotFound(execution_id))
    }

    /// Cancel a running execution. Returns `false` when the id is not
    /// currently running.
    pub fn cancel(&self, execution_id: &Uuid) -> bool {
        match self.inner.running.remove(execution_id) {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Ids of executions currently in flight.
    pub fn running_executions(&self) -> Vec<Uuid> {
        self.inner.running.iter().map(|entry| *entry.key()).collect()
    }

    async fn prepare(
        &self,
        workflow_id: &Uuid,
        input: Value,
        options: RunOptions,
    ) -> Result<RunState<R>, EngineError> {
        let definition = self
            .inner
            .repository
            .get_definition(workflow_id)
            .await?
            .ok_or(EngineError::WorkflowNotFound(*workflow_id))?;

        if !definition.active {
            return Err(EngineError::Inactive(definition.name.clone()));
        }

        let report = definition::validate(&definition, &self.inner.registry);
        if !report.is_valid {
            return Err(EngineError::Invalid(report.errors));
        }
        for warning in &report.warnings {
            warn!(workflow_id = %workflow_id, "{warning}");
        }

        let record = self
            .inner
            .recorder
            .execution_started(*workflow_id, input.clone())
            .await?;

        let ctx = Arc::new(
            ExecutionContext::new(
                record.id,
                *workflow_id,
                definition.variables.clone(),
                input,
                definition.config.timeout_ms,
            )
            .with_run_options(options),
        );

        let token = CancellationToken::new();
        self.inner.running.insert(record.id, token.clone());

        let branch_cap = definition
            .config
            .max_branch_concurrency
            .unwrap_or(DEFAULT_BRANCH_CONCURRENCY)
            .max(1);

        info!(
            workflow_id = %workflow_id,
            execution_id = %record.id,
            workflow = %definition.name,
            "execution starting"
        );

        let nodes = definition
            .nodes
            .iter()
            .map(|n| (n.id.clone(), n.clone()))
            .collect();
        let exec_graph = WorkflowGraph::build(&definition);

        Ok(RunState {
            engine: self.inner.clone(),
            definition: Arc::new(definition),
            nodes: Arc::new(nodes),
            graph: Arc::new(exec_graph),
            ctx,
            record,
            token,
            semaphore: Arc::new(Semaphore::new(branch_cap)),
            evaluator: Arc::new(FlowEvaluator::new()),
            outcome: Arc::new(Mutex::new(None)),
        })
    }
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

struct RunState<R> {
    engine: Arc<EngineInner<R>>,
    definition: Arc<WorkflowDefinition>,
    nodes: Arc<HashMap<String, WorkflowNode>>,
    graph: Arc<WorkflowGraph>,
    ctx: Arc<ExecutionContext>,
    record: WorkflowExecutionRecord,
    token: CancellationToken,
    semaphore: Arc<Semaphore>,
    evaluator: Arc<FlowEvaluator>,
    /// First terminal failure (status, message) wins; later ones are
    /// logged only.
    outcome: Arc<Mutex<Option<(ExecutionStatus, String)>>>,
}

impl<R> Clone for RunState<R> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            definition: self.definition.clone(),
            nodes: self.nodes.clone(),
            graph: self.graph.clone(),
            ctx: self.ctx.clone(),
            record: self.record.clone(),
            token: self.token.clone(),
            semaphore: self.semaphore.clone(),
            evaluator: self.evaluator.clone(),
            outcome: self.outcome.clone(),
        }
    }
}

impl<R> RunState<R> {
    fn set_outcome(&self, status: ExecutionStatus, message: String) {
        let mut outcome = self.outcome.lock().unwrap_or_else(|e| e.into_inner());
        if outcome.is_none() {
            *outcome = Some((status, message));
        }
    }

    fn aborted(&self) -> bool {
        self.token.is_cancelled()
            || self
                .outcome
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_some()
    }
}

/// Run the traversal and persist the final execution record.
async fn run_graph<R: WorkflowRepository + 'static>(state: RunState<R>) {
    let execution_id = state.record.id;

    let entries = state.graph.entry_nodes();
    if entries.len() > 1 {
        let mut triggers = JoinSet::new();
        for entry in entries {
            triggers.spawn(visit(state.clone(), entry.clone()));
        }
        while triggers.join_next().await.is_some() {}
    } else if let Some(entry) = entries.first() {
        visit(state.clone(), entry.clone()).await;
    }

    let (status, error, output) = if state.token.is_cancelled() {
        (ExecutionStatus::Cancelled, None, None)
    } else {
        // Clone out of the lock so no guard is held across the snapshot.
        let outcome = state
            .outcome
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match outcome {
            Some((status, message)) => (status, Some(message), None),
            None => {
                let snapshot = state.ctx.snapshot().await;
                let output = json!({
                    "variables": snapshot.variables,
                    "nodes": snapshot.node_outputs,
                });
                (ExecutionStatus::Completed, None, Some(output))
            }
        }
    };

    info!(execution_id = %execution_id, status = %status, "execution finished");

    if let Err(err) = state
        .engine
        .recorder
        .execution_finished(&execution_id, status, error.as_deref(), output.as_ref())
        .await
    {
        error!(execution_id = %execution_id, error = %err, "failed to persist final status");
    }
    state.engine.running.remove(&execution_id);
}

/// Visit one node: claim it, execute with retry, then traverse matching
/// outgoing edges. Boxed because branches recurse through spawned tasks.
fn visit<R: WorkflowRepository + 'static>(
    state: RunState<R>,
    node_id: String,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        if state.aborted() {
            return;
        }

        if state.ctx.deadline_exceeded() {
            state.set_outcome(
                ExecutionStatus::Failed,
                format!(
                    "workflow timed out: {}ms budget exceeded before node '{node_id}'",
                    state.definition.config.timeout_ms
                ),
            );
            return;
        }

        // A join node reached through several branches runs once.
        if !state.ctx.claim_node(&node_id).await {
            debug!(execution_id = %state.record.id, node_id = %node_id, "already executed, skipping");
            return;
        }

        let Some(node) = state.nodes.get(&node_id).cloned() else {
            state.set_outcome(
                ExecutionStatus::Failed,
                format!("node '{node_id}' missing from definition"),
            );
            return;
        };

        let output = match execute_with_retry(&state, &node).await {
            Ok(Some(output)) => output,
            Ok(None) => return, // error_handling: continue
            Err(()) => return,  // outcome already set
        };

        if let Err(err) = state.ctx.set_node_output(&node.id, output.clone()).await {
            state.set_outcome(ExecutionStatus::Failed, err.to_string());
            return;
        }

        if state.ctx.deadline_exceeded() {
            state.set_outcome(
                ExecutionStatus::Failed,
                format!(
                    "workflow timed out: {}ms budget exceeded after node '{node_id}'",
                    state.definition.config.timeout_ms
                ),
            );
            return;
        }

        // Edge guards select the successors, in declaration order.
        let mut targets = Vec::new();
        for &edge_idx in state.graph.outgoing_edges(&node.id) {
            let edge = &state.definition.edges[edge_idx];
            let matched = match &edge.condition {
                None => true,
                Some(condition) => {
                    let namespace = state.ctx.edge_namespace(&output).await;
                    match state.evaluator.evaluate_bool(condition, &namespace) {
                        Ok(matched) => matched,
                        Err(err) => {
                            // A broken guard never fires.
                            warn!(
                                execution_id = %state.record.id,
                                edge_id = %edge.id,
                                error = %err,
                                "edge condition failed to evaluate, treating as false"
                            );
                            false
                        }
                    }
                }
            };
            if matched {
                targets.push(edge.target.clone());
            }
        }

        if targets.len() > 1 || state.definition.config.parallel {
            let mut branches = JoinSet::new();
            for target in targets {
                let state = state.clone();
                branches.spawn(visit(state, target));
            }
            while branches.join_next().await.is_some() {}
        } else if let Some(target) = targets.pop() {
            visit(state.clone(), target).await;
        }
    })
}

/// Execute one node, applying the workflow's error handling policy.
///
/// `Ok(Some(output))` on success, `Ok(None)` when the failure was
/// absorbed (`continue` mode, descendants are not traversed), `Err(())`
/// when the run outcome has been set.
async fn execute_with_retry<R: WorkflowRepository + 'static>(
    state: &RunState<R>,
    node: &WorkflowNode,
) -> Result<Option<Value>, ()> {
    let execution_id = state.record.id;
    let policy = state.definition.config.retry_policy.clone();
    let max_retries = match state.definition.config.error_handling {
        ErrorHandling::Retry => policy.as_ref().map(|p| p.max_retries).unwrap_or(0),
        _ => 0,
    };

    let Some(executor) = state.engine.registry.get(node.node_type) else {
        // Pre-flight validation makes this unreachable in practice.
        state.set_outcome(
            ExecutionStatus::Failed,
            format!("no executor for node type '{}'", node.node_type),
        );
        return Err(());
    };

    if let Err(err) = executor.validate(node) {
        state.set_outcome(
            ExecutionStatus::Failed,
            format!("node '{}' failed validation: {err}", node.id),
        );
        return Err(());
    }

    // The permit caps how many nodes run at once. It is released before
    // successors are traversed, so nested fan-out cannot deadlock.
    let Ok(_permit) = state.semaphore.acquire().await else {
        return Err(());
    };
    if state.token.is_cancelled() {
        return Err(());
    }

    let mut attempt = 1u32;
    loop {
        let record_id = match state
            .engine
            .recorder
            .node_started(execution_id, &node.id, attempt)
            .await
        {
            Ok(record_id) => record_id,
            Err(err) => {
                state.set_outcome(ExecutionStatus::Failed, err.to_string());
                return Err(());
            }
        };

        debug!(execution_id = %execution_id, node_id = %node.id, attempt, "executing node");

        // Cancellation never interrupts a node mid-flight; the token is
        // checked again before any further attempt or traversal.
        let result = executor.execute(node, &state.ctx).await;

        match result {
            Ok(output) => {
                if let Err(err) = state.engine.recorder.node_completed(&record_id, &output).await {
                    state.set_outcome(ExecutionStatus::Failed, err.to_string());
                    return Err(());
                }
                return Ok(Some(output));
            }
            Err(exec_err) => {
                let message = exec_err.to_string();
                warn!(
                    execution_id = %execution_id,
                    node_id = %node.id,
                    attempt,
                    error = %message,
                    "node failed"
                );
                if let Err(err) = state.engine.recorder.node_failed(&record_id, &message).await {
                    state.set_outcome(ExecutionStatus::Failed, err.to_string());
                    return Err(());
                }

                if attempt <= max_retries && !state.token.is_cancelled() {
                    if let Some(policy) = &policy {
                        tokio::time::sleep(backoff_delay(policy, attempt)).await;
                    }
                    if state.token.is_cancelled() {
                        return Err(());
                    }
                    attempt += 1;
                    continue;
                }

                return match state.definition.config.error_handling {
                    ErrorHandling::Continue => {
                        let _ = state
                            .engine
                            .recorder
                            .log(
                                execution_id,
                                Some(&node.id),
                                LogLevel::Warn,
                                format!("node failed, continuing: {message}"),
                            )
                            .await;
                        Ok(None)
                    }
                    ErrorHandling::Stop | ErrorHandling::Retry => {
                        state.set_outcome(
                            ExecutionStatus::Failed,
                            format!("node '{}' failed: {message}", node.id),
                        );
                        Err(())
                    }
                };
            }
        }
    }
}

fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    Duration::from_millis(policy.delay_ms(attempt))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

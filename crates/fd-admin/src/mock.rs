//! In-memory admin client for tests — scripted responses plus per-endpoint
//! call counters, so callers can assert how often the network was hit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use fd_core::execution::{
    NodeExecution, NodeExecutionId, TaskExecution, TaskExecutionId, WorkflowExecution,
    WorkflowExecutionId,
};
use fd_core::filter::RequestConfig;
use fd_core::graph::{CompiledWorkflow, WorkflowId};

use crate::client::{AdminClient, DeckStatus, Page};
use crate::AdminError;

#[derive(Debug, Default)]
pub struct CallCounts {
    pub get_workflow_execution: AtomicUsize,
    pub list_node_executions: AtomicUsize,
    pub list_node_execution_children: AtomicUsize,
    pub list_task_executions: AtomicUsize,
    pub list_task_execution_children: AtomicUsize,
    pub get_workflow: AtomicUsize,
    pub get_dynamic_node_workflow: AtomicUsize,
    pub get_deck: AtomicUsize,
}

#[derive(Default)]
pub struct MockAdminClient {
    workflow_executions: Mutex<HashMap<WorkflowExecutionId, WorkflowExecution>>,
    node_executions: Mutex<HashMap<WorkflowExecutionId, Vec<NodeExecution>>>,
    node_children: Mutex<HashMap<String, Vec<NodeExecution>>>,
    task_executions: Mutex<HashMap<NodeExecutionId, Vec<TaskExecution>>>,
    task_children: Mutex<HashMap<TaskExecutionId, Vec<NodeExecution>>>,
    workflows: Mutex<HashMap<WorkflowId, CompiledWorkflow>>,
    dynamic_workflows: Mutex<HashMap<NodeExecutionId, CompiledWorkflow>>,
    decks: Mutex<HashMap<NodeExecutionId, String>>,
    last_list_config: Mutex<Option<RequestConfig>>,
    pub calls: CallCounts,
}

impl MockAdminClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_workflow_execution(&self, execution: WorkflowExecution) {
        self.workflow_executions
            .lock()
            .unwrap()
            .insert(execution.id.clone(), execution);
    }

    pub fn set_node_executions(&self, id: WorkflowExecutionId, batch: Vec<NodeExecution>) {
        self.node_executions.lock().unwrap().insert(id, batch);
    }

    /// Script the children returned by the list-children-by-parent call.
    pub fn set_node_children(&self, parent_node_id: impl Into<String>, batch: Vec<NodeExecution>) {
        self.node_children
            .lock()
            .unwrap()
            .insert(parent_node_id.into(), batch);
    }

    pub fn set_task_executions(&self, id: NodeExecutionId, batch: Vec<TaskExecution>) {
        self.task_executions.lock().unwrap().insert(id, batch);
    }

    pub fn set_task_children(&self, id: TaskExecutionId, batch: Vec<NodeExecution>) {
        self.task_children.lock().unwrap().insert(id, batch);
    }

    pub fn set_workflow(&self, workflow: CompiledWorkflow) {
        self.workflows
            .lock()
            .unwrap()
            .insert(workflow.id.clone(), workflow);
    }

    pub fn set_dynamic_workflow(&self, id: NodeExecutionId, workflow: CompiledWorkflow) {
        self.dynamic_workflows.lock().unwrap().insert(id, workflow);
    }

    pub fn set_deck(&self, id: NodeExecutionId, uri: impl Into<String>) {
        self.decks.lock().unwrap().insert(id, uri.into());
    }

    /// The `RequestConfig` of the most recent top-level list call; lets tests
    /// assert which filters were sent server-side.
    pub fn last_list_config(&self) -> Option<RequestConfig> {
        self.last_list_config.lock().unwrap().clone()
    }
}

#[async_trait]
impl AdminClient for MockAdminClient {
    async fn get_workflow_execution(
        &self,
        id: &WorkflowExecutionId,
    ) -> Result<WorkflowExecution, AdminError> {
        self.calls
            .get_workflow_execution
            .fetch_add(1, Ordering::SeqCst);
        self.workflow_executions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("execution {}", id.name)))
    }

    async fn list_node_executions(
        &self,
        id: &WorkflowExecutionId,
        config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        self.calls
            .list_node_executions
            .fetch_add(1, Ordering::SeqCst);
        *self.last_list_config.lock().unwrap() = Some(config.clone());
        let entities = self
            .node_executions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        Ok(Page { entities })
    }

    async fn list_node_execution_children(
        &self,
        _id: &WorkflowExecutionId,
        parent_node_id: &str,
        _config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        self.calls
            .list_node_execution_children
            .fetch_add(1, Ordering::SeqCst);
        let entities = self
            .node_children
            .lock()
            .unwrap()
            .get(parent_node_id)
            .cloned()
            .unwrap_or_default();
        Ok(Page { entities })
    }

    async fn list_task_executions(
        &self,
        id: &NodeExecutionId,
        _config: &RequestConfig,
    ) -> Result<Page<TaskExecution>, AdminError> {
        self.calls
            .list_task_executions
            .fetch_add(1, Ordering::SeqCst);
        let entities = self
            .task_executions
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        Ok(Page { entities })
    }

    async fn list_task_execution_children(
        &self,
        id: &TaskExecutionId,
        _config: &RequestConfig,
    ) -> Result<Page<NodeExecution>, AdminError> {
        self.calls
            .list_task_execution_children
            .fetch_add(1, Ordering::SeqCst);
        let entities = self
            .task_children
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default();
        Ok(Page { entities })
    }

    async fn get_workflow(&self, id: &WorkflowId) -> Result<CompiledWorkflow, AdminError> {
        self.calls.get_workflow.fetch_add(1, Ordering::SeqCst);
        self.workflows
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("workflow {}", id.name)))
    }

    async fn get_dynamic_node_workflow(
        &self,
        id: &NodeExecutionId,
    ) -> Result<Option<CompiledWorkflow>, AdminError> {
        self.calls
            .get_dynamic_node_workflow
            .fetch_add(1, Ordering::SeqCst);
        Ok(self.dynamic_workflows.lock().unwrap().get(id).cloned())
    }

    async fn get_deck(&self, id: &NodeExecutionId) -> Result<DeckStatus, AdminError> {
        self.calls.get_deck.fetch_add(1, Ordering::SeqCst);
        match self.decks.lock().unwrap().get(id) {
            Some(uri) => Ok(DeckStatus::Ready { uri: uri.clone() }),
            None => Ok(DeckStatus::NotReady),
        }
    }
}

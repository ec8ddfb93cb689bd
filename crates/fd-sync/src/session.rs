//! Execution view session — owns the runtime map, the canonical display
//! tree, filters, and expansion state for one workflow execution.
//!
//! All mutations are reducer-style: take the lock, compute the next state
//! from the previous one, commit through the single merge entry point. Every
//! commit re-checks the closed flag so a fetch that resolves after teardown
//! discards its result instead of writing into a dead view.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use fd_admin::client::{AdminClient, DeckStatus};
use fd_admin::AdminError;
use fd_core::execution::{NodeExecution, WorkflowExecution, WorkflowExecutionId};
use fd_core::filter::RequestConfig;
use fd_core::graph::CompiledWorkflow;
use fd_core::phase::NodeExecutionPhase;

use crate::expand::{adopt_top_level, fetch_children};
use crate::filter::{apply_phase_filter, FilterState};
use crate::merge::NodeExecutionsById;
use crate::poll::should_poll;
use crate::rows::{timeline_rows, TimelineRow};
use crate::tasks::{fetch_attempt_history, TaskAttempt};
use crate::tree::{build_tree, DisplayTree};
use crate::SyncError;

struct SessionState {
    execution: WorkflowExecution,
    workflow: CompiledWorkflow,
    executions: NodeExecutionsById,
    /// Generated closures resolved for dynamic nodes, keyed by scoped id.
    /// Grafted during tree builds, never patched into `workflow`.
    dynamic_closures: HashMap<String, CompiledWorkflow>,
    tree: DisplayTree,
    filters: FilterState,
    expanded: HashSet<String>,
    /// Parents with a child fetch currently in flight.
    in_flight: HashSet<String>,
    last_error: Option<String>,
    closed: bool,
}

/// Handle to one execution view's synchronized state. Cheap to clone; all
/// clones share the same state.
#[derive(Clone)]
pub struct ExecutionTreeSession {
    client: Arc<dyn AdminClient>,
    id: WorkflowExecutionId,
    state: Arc<RwLock<SessionState>>,
}

impl ExecutionTreeSession {
    /// Fetch the execution, its compiled workflow, and the initial node
    /// execution batch, and build the first tree.
    pub async fn open(
        client: Arc<dyn AdminClient>,
        id: WorkflowExecutionId,
    ) -> Result<Self, SyncError> {
        let execution = client.get_workflow_execution(&id).await?;
        let workflow = client.get_workflow(&execution.workflow_id).await?;
        tracing::debug!(execution = %id.name, workflow = %workflow.id.name, "session open");

        let session = Self {
            client,
            id,
            state: Arc::new(RwLock::new(SessionState {
                execution,
                workflow,
                executions: NodeExecutionsById::new(),
                dynamic_closures: HashMap::new(),
                tree: DisplayTree::default(),
                filters: FilterState::default(),
                expanded: HashSet::new(),
                in_flight: HashSet::new(),
                last_error: None,
                closed: false,
            })),
        };
        session.refresh().await?;
        Ok(session)
    }

    /// One refresh cycle: list top-level node executions, re-read the parent
    /// execution, merge, resolve newly-discovered dynamic closures, rebuild
    /// the tree. Returns whether polling should continue.
    pub async fn refresh(&self) -> Result<bool, SyncError> {
        let config = {
            let state = self.state.read().await;
            if state.closed {
                return Ok(false);
            }
            RequestConfig::with_filters(state.filters.server_filters())
        };

        let page = match self.client.list_node_executions(&self.id, &config).await {
            Ok(page) => page,
            Err(e) => return self.fail(e).await,
        };
        let execution = match self.client.get_workflow_execution(&self.id).await {
            Ok(execution) => execution,
            Err(e) => return self.fail(e).await,
        };

        let batch: Vec<NodeExecution> = page.entities.into_iter().map(adopt_top_level).collect();
        let keep = should_poll(execution.closure.phase, &batch);

        {
            let mut state = self.state.write().await;
            if state.closed {
                return Ok(false);
            }
            state.executions.merge(batch);
            state.execution = execution;
            state.last_error = None;
        }

        self.resolve_dynamic_closures().await?;
        self.rebuild_tree().await;
        Ok(keep)
    }

    /// Lazily fetch children of a parent node. Returns whether a fetch was
    /// issued: repeated expansion of an already-fetched parent is a no-op by
    /// provenance, and concurrent triggers are collapsed by the in-flight
    /// guard.
    pub async fn expand(&self, parent_scoped_id: &str) -> Result<bool, SyncError> {
        let parent = {
            let mut state = self.state.write().await;
            if state.closed {
                return Err(SyncError::SessionClosed);
            }
            if state.executions.has_children_of(parent_scoped_id) {
                return Ok(false);
            }
            if state.in_flight.contains(parent_scoped_id) {
                return Ok(false);
            }
            match state.executions.get(parent_scoped_id) {
                // A completed task-path walk that produced no children leaves
                // only the tasks_fetched patch behind; do not walk it again.
                Some(parent) if !parent.metadata.is_parent_node && parent.tasks_fetched => {
                    return Ok(false);
                }
                Some(parent) => {
                    let parent = parent.clone();
                    state.in_flight.insert(parent_scoped_id.to_string());
                    parent
                }
                None if state.tree.find(parent_scoped_id).is_some() => {
                    // Static node that never ran; there is nothing to fetch.
                    return Ok(false);
                }
                None => return Err(SyncError::UnknownNode(parent_scoped_id.to_string())),
            }
        };

        let fetched = fetch_children(self.client.as_ref(), &parent).await;

        {
            let mut state = self.state.write().await;
            state.in_flight.remove(parent_scoped_id);
            let records = match fetched {
                Ok(records) => records,
                Err(e) => {
                    state.last_error = Some(e.to_string());
                    return Err(e);
                }
            };
            if state.closed {
                return Ok(false);
            }
            state.executions.merge(records);
        }

        self.rebuild_tree().await;
        Ok(true)
    }

    /// Toggle a node's expansion. Expanding triggers the child fetch; the
    /// canonical tree's `expanded` flag is flipped in place.
    pub async fn toggle_expanded(&self, scoped_id: &str) -> Result<bool, SyncError> {
        let now_expanded = {
            let mut state = self.state.write().await;
            if state.closed {
                return Err(SyncError::SessionClosed);
            }
            let now = if state.expanded.contains(scoped_id) {
                state.expanded.remove(scoped_id);
                false
            } else {
                state.expanded.insert(scoped_id.to_string());
                true
            };
            if let Some(node) = state.tree.find_mut(scoped_id) {
                node.expanded = now;
            }
            now
        };

        if now_expanded {
            self.expand(scoped_id).await?;
        }
        Ok(now_expanded)
    }

    /// Replace the active filters and re-issue the list query under the new
    /// routing (phase-only stays client-side, anything else goes to the
    /// server).
    pub async fn set_filters(&self, filters: FilterState) -> Result<(), SyncError> {
        {
            let mut state = self.state.write().await;
            if state.closed {
                return Err(SyncError::SessionClosed);
            }
            state.filters = filters;
        }
        self.refresh().await?;
        Ok(())
    }

    /// The tree to render: a detached copy, phase-pruned when a phase-only
    /// filter is active. Later canonical mutations do not leak into it.
    pub async fn view(&self) -> DisplayTree {
        let state = self.state.read().await;
        match state.filters.client_phases() {
            Some(phases) => apply_phase_filter(&state.tree, phases),
            None => state.tree.clone(),
        }
    }

    pub async fn timeline(&self) -> Vec<TimelineRow> {
        timeline_rows(&self.state.read().await.tree)
    }

    pub async fn attempt_history(&self, scoped_id: &str) -> Result<Vec<TaskAttempt>, SyncError> {
        let id = {
            let state = self.state.read().await;
            state
                .executions
                .get(scoped_id)
                .map(|n| n.id.clone())
                .ok_or_else(|| SyncError::UnknownNode(scoped_id.to_string()))?
        };
        fetch_attempt_history(self.client.as_ref(), &id).await
    }

    pub async fn deck_status(&self, scoped_id: &str) -> Result<DeckStatus, SyncError> {
        let id = {
            let state = self.state.read().await;
            state
                .executions
                .get(scoped_id)
                .map(|n| n.id.clone())
                .ok_or_else(|| SyncError::UnknownNode(scoped_id.to_string()))?
        };
        Ok(self.client.get_deck(&id).await?)
    }

    pub async fn execution(&self) -> WorkflowExecution {
        self.state.read().await.execution.clone()
    }

    pub async fn node_count(&self) -> usize {
        self.state.read().await.executions.len()
    }

    pub async fn map_version(&self) -> u64 {
        self.state.read().await.executions.version()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    /// Tear the view down. In-flight fetches observe the flag and discard
    /// their results.
    pub async fn close(&self) {
        let mut state = self.state.write().await;
        state.closed = true;
        tracing::debug!(execution = %self.id.name, "session closed");
    }

    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }

    async fn fail(&self, e: AdminError) -> Result<bool, SyncError> {
        let mut state = self.state.write().await;
        state.last_error = Some(e.to_string());
        Err(e.into())
    }

    /// Fetch generated closures for dynamic nodes that have started but have
    /// no resolved closure yet. A closure the backend has not produced is
    /// "not yet available", not an error.
    async fn resolve_dynamic_closures(&self) -> Result<(), SyncError> {
        let pending: Vec<(String, fd_core::execution::NodeExecutionId)> = {
            let state = self.state.read().await;
            state
                .executions
                .values()
                .filter(|n| {
                    n.metadata.is_dynamic
                        && n.phase() != NodeExecutionPhase::Undefined
                        && !state.dynamic_closures.contains_key(&n.scoped_id)
                })
                .map(|n| (n.scoped_id.clone(), n.id.clone()))
                .collect()
        };

        for (scoped_id, id) in pending {
            match self.client.get_dynamic_node_workflow(&id).await? {
                Some(closure) => {
                    let mut state = self.state.write().await;
                    if state.closed {
                        return Ok(());
                    }
                    state.dynamic_closures.insert(scoped_id, closure);
                }
                None => {
                    tracing::debug!(%scoped_id, "generated closure not yet available");
                }
            }
        }
        Ok(())
    }

    /// Copy-on-write rebuild; the previous allocation is kept when nothing
    /// changed so downstream equality checks see a stable tree.
    async fn rebuild_tree(&self) {
        let mut state = self.state.write().await;
        if state.closed {
            return;
        }
        let next = build_tree(
            &state.workflow,
            &state.executions,
            &state.dynamic_closures,
            &state.expanded,
        );
        if next != state.tree {
            state.tree = next;
        }
    }
}

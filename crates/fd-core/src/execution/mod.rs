//! Runtime execution records as fetched from the admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::WorkflowId;
use crate::phase::{NodeExecutionPhase, WorkflowExecutionPhase};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identifies one workflow execution. Immutable, externally assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkflowExecutionId {
    pub project: String,
    pub domain: String,
    pub name: String,
}

/// Identifies one node execution. Not globally unique across retries —
/// joining against the static graph goes through the scoped id instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeExecutionId {
    pub node_id: String,
    pub execution_id: WorkflowExecutionId,
}

/// Identifies one task attempt behind a node execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskExecutionId {
    pub task_id: String,
    pub node_execution_id: NodeExecutionId,
    pub retry_attempt: u32,
}

// ---------------------------------------------------------------------------
// Workflow execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecution {
    pub id: WorkflowExecutionId,

    /// The workflow version this execution runs.
    pub workflow_id: WorkflowId,

    pub closure: WorkflowExecutionClosure,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecutionClosure {
    #[serde(default)]
    pub phase: WorkflowExecutionPhase,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Aggregate node counts, when the backend reports them.
    #[serde(default)]
    pub total_nodes: Option<u32>,
    #[serde(default)]
    pub completed_nodes: Option<u32>,
    #[serde(default)]
    pub failed_nodes: Option<u32>,
}

// ---------------------------------------------------------------------------
// Node execution
// ---------------------------------------------------------------------------

/// Runtime record of one node within a workflow execution.
///
/// `scoped_id` is derived client-side at adoption time (see fd-sync); it is
/// the sole join key between the static graph and the runtime map, and it is
/// unique within one workflow execution's tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeExecution {
    pub id: NodeExecutionId,

    /// Derived key, empty until the record is adopted into a view session.
    #[serde(default)]
    pub scoped_id: String,

    #[serde(default)]
    pub metadata: NodeExecutionMetadata,

    #[serde(default)]
    pub closure: NodeExecutionClosure,

    /// Provenance back-reference: which parent's child-fetch produced this
    /// record. Non-owning; used to detect "children already fetched".
    #[serde(default)]
    pub from_unique_parent_id: Option<String>,

    /// Set once this record's task executions have been listed.
    #[serde(default)]
    pub tasks_fetched: bool,

    /// Log links attached per phase as they are discovered.
    #[serde(default)]
    pub logs_by_phase: Vec<PhaseLogs>,
}

impl NodeExecution {
    /// The static-graph node id this runtime node corresponds to.
    pub fn spec_or_node_id(&self) -> &str {
        self.metadata
            .spec_node_id
            .as_deref()
            .unwrap_or(&self.id.node_id)
    }

    pub fn phase(&self) -> NodeExecutionPhase {
        self.closure.phase
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeExecutionMetadata {
    /// Static-graph node id, present when the node was produced dynamically
    /// or via retries.
    #[serde(default)]
    pub spec_node_id: Option<String>,

    /// True when children are fetched via the dedicated children endpoint
    /// rather than by type-based recursion.
    #[serde(default)]
    pub is_parent_node: bool,

    /// True when the node's sub-graph is only known at runtime.
    #[serde(default)]
    pub is_dynamic: bool,

    #[serde(default)]
    pub dynamic_parent_node_id: Option<String>,

    /// Retry attempt this record was grouped under during a child fetch.
    #[serde(default)]
    pub retry_group: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeExecutionClosure {
    #[serde(default)]
    pub phase: NodeExecutionPhase,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
    /// Deck URI, when the task published one.
    #[serde(default)]
    pub deck_uri: Option<String>,
}

/// Log links for one phase of a node execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseLogs {
    pub phase: NodeExecutionPhase,
    pub logs: Vec<LogLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogLink {
    pub name: String,
    pub uri: String,
}

// ---------------------------------------------------------------------------
// Task execution
// ---------------------------------------------------------------------------

/// One attempt of the task backing a node execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskExecution {
    pub id: TaskExecutionId,

    #[serde(default)]
    pub closure: TaskExecutionClosure,

    /// True when this attempt spawned child node executions of its own.
    #[serde(default)]
    pub is_parent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskExecutionClosure {
    #[serde(default)]
    pub phase: NodeExecutionPhase,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

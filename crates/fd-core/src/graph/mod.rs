//! Compiled workflow closure — the static graph of one workflow version.
//!
//! Nodes and edges as the admin API reports them after compilation. Acyclic
//! at this layer: branch bodies and sub-workflows nest, they never loop back.

use serde::{Deserialize, Serialize};

/// Well-known sentinel id of the synthetic start node.
pub const START_NODE_ID: &str = "start-node";
/// Well-known sentinel id of the synthetic end node.
pub const END_NODE_ID: &str = "end-node";

// ---------------------------------------------------------------------------
// WorkflowId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkflowId {
    pub project: String,
    pub domain: String,
    pub name: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// CompiledWorkflow — top-level closure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledWorkflow {
    pub id: WorkflowId,

    /// Top-level nodes, start/end sentinels included.
    pub nodes: Vec<CompiledNode>,

    /// Top-level edges.
    pub edges: Vec<CompiledEdge>,

    /// Nested closures referenced by sub-workflow nodes, keyed by reference.
    #[serde(default)]
    pub sub_workflows: Vec<CompiledSubWorkflow>,
}

impl CompiledWorkflow {
    pub fn node(&self, id: &str) -> Option<&CompiledNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn sub_workflow(&self, reference: &str) -> Option<&CompiledSubWorkflow> {
        self.sub_workflows.iter().find(|s| s.reference == reference)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledSubWorkflow {
    /// Reference name used by `NodeKind::SubWorkflow` nodes.
    pub reference: String,
    pub nodes: Vec<CompiledNode>,
    pub edges: Vec<CompiledEdge>,
}

// ---------------------------------------------------------------------------
// Nodes — polymorphic via tagged enum
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledNode {
    pub id: String,

    /// Display name (falls back to the id).
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub kind: NodeKind,
}

impl CompiledNode {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Start/end sentinels are retained for graph rendering but excluded
    /// from the flattened table/timeline view.
    pub fn is_sentinel(&self) -> bool {
        matches!(self.kind, NodeKind::Start | NodeKind::End)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Start,
    End,
    Task {
        task_ref: String,
    },
    MapTask {
        task_ref: String,
    },
    Gate,
    Branch {
        #[serde(default)]
        nodes: Vec<CompiledNode>,
        #[serde(default)]
        edges: Vec<CompiledEdge>,
    },
    SubWorkflow {
        reference: String,
    },
    /// Sub-graph only known at runtime; the generated closure is fetched
    /// separately once the node starts executing.
    Dynamic {
        task_ref: String,
    },
    /// A node discovered at runtime with no static counterpart (children of
    /// parent-flagged executions).
    Unknown,
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledEdge {
    pub source: String,
    pub target: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

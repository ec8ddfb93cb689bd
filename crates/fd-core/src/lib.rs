//! fd-core: Shared types for Flowdeck
//!
//! Identifiers, lifecycle phases, execution records, compiled-graph types,
//! and request parameters. No internal crate dependencies; every other
//! fd-* crate builds on these.

pub mod execution;
pub mod filter;
pub mod graph;
pub mod phase;
pub mod scope;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::execution::{
        NodeExecution, NodeExecutionClosure, NodeExecutionId, NodeExecutionMetadata,
        TaskExecution, TaskExecutionId, WorkflowExecution, WorkflowExecutionId,
    };
    pub use crate::filter::{
        FilterOperation, FilterSpec, FilterValue, PageLimit, RequestConfig, SortDirection,
        SortSpec,
    };
    pub use crate::graph::{CompiledEdge, CompiledNode, CompiledWorkflow, NodeKind, WorkflowId};
    pub use crate::phase::{NodeExecutionPhase, WorkflowExecutionPhase};
    pub use crate::scope::{child_scoped_id, retries_to_zero, top_level_scoped_id};
}

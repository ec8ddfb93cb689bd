//! Lifecycle phases for workflow and node executions.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Node execution phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeExecutionPhase {
    /// The wire's "absent" phase — a node the backend has not reported on yet.
    #[default]
    Undefined,
    Queued,
    Running,
    Succeeded,
    Failed,
    Aborted,
    TimedOut,
    Skipped,
    Recovered,
    Paused,
    DynamicRunning,
}

impl NodeExecutionPhase {
    /// A terminal phase admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeExecutionPhase::Succeeded
                | NodeExecutionPhase::Failed
                | NodeExecutionPhase::Aborted
                | NodeExecutionPhase::TimedOut
                | NodeExecutionPhase::Skipped
                | NodeExecutionPhase::Recovered
        )
    }

    /// Wire name, as the admin API spells it in filter values.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeExecutionPhase::Undefined => "UNDEFINED",
            NodeExecutionPhase::Queued => "QUEUED",
            NodeExecutionPhase::Running => "RUNNING",
            NodeExecutionPhase::Succeeded => "SUCCEEDED",
            NodeExecutionPhase::Failed => "FAILED",
            NodeExecutionPhase::Aborted => "ABORTED",
            NodeExecutionPhase::TimedOut => "TIMED_OUT",
            NodeExecutionPhase::Skipped => "SKIPPED",
            NodeExecutionPhase::Recovered => "RECOVERED",
            NodeExecutionPhase::Paused => "PAUSED",
            NodeExecutionPhase::DynamicRunning => "DYNAMIC_RUNNING",
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow execution phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowExecutionPhase {
    #[default]
    Undefined,
    Queued,
    Running,
    Succeeding,
    Succeeded,
    Failing,
    Failed,
    Aborting,
    Aborted,
    TimedOut,
}

impl WorkflowExecutionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowExecutionPhase::Succeeded
                | WorkflowExecutionPhase::Failed
                | WorkflowExecutionPhase::Aborted
                | WorkflowExecutionPhase::TimedOut
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

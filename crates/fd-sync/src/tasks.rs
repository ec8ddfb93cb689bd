//! Task-execution detail — the retry-attempt history behind one node
//! execution, for the node detail panel.

use serde::Serialize;

use fd_admin::client::AdminClient;
use fd_core::execution::{NodeExecutionId, TaskExecution};
use fd_core::filter::RequestConfig;

use crate::SyncError;

/// One retry attempt, with the latest attempt marked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskAttempt {
    pub task: TaskExecution,
    pub is_latest: bool,
}

/// Order attempts by retry number and mark the last one.
pub fn attempt_history(mut attempts: Vec<TaskExecution>) -> Vec<TaskAttempt> {
    attempts.sort_by_key(|t| t.id.retry_attempt);
    let last = attempts.len().saturating_sub(1);
    attempts
        .into_iter()
        .enumerate()
        .map(|(i, task)| TaskAttempt {
            task,
            is_latest: i == last,
        })
        .collect()
}

pub async fn fetch_attempt_history(
    client: &dyn AdminClient,
    id: &NodeExecutionId,
) -> Result<Vec<TaskAttempt>, SyncError> {
    let page = client
        .list_task_executions(id, &RequestConfig::all())
        .await?;
    Ok(attempt_history(page.entities))
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::execution::{TaskExecutionClosure, TaskExecutionId, WorkflowExecutionId};

    fn attempt(retry_attempt: u32) -> TaskExecution {
        TaskExecution {
            id: TaskExecutionId {
                task_id: "tasks/transform".into(),
                node_execution_id: NodeExecutionId {
                    node_id: "n0".into(),
                    execution_id: WorkflowExecutionId {
                        project: "flows".into(),
                        domain: "dev".into(),
                        name: "run-1".into(),
                    },
                },
                retry_attempt,
            },
            closure: TaskExecutionClosure::default(),
            is_parent: false,
        }
    }

    #[test]
    fn attempts_sort_and_mark_the_latest() {
        let history = attempt_history(vec![attempt(2), attempt(0), attempt(1)]);
        let retries: Vec<u32> = history.iter().map(|a| a.task.id.retry_attempt).collect();
        assert_eq!(retries, vec![0, 1, 2]);
        assert!(history[2].is_latest);
        assert!(!history[0].is_latest && !history[1].is_latest);
    }

    #[test]
    fn empty_history_stays_empty() {
        assert!(attempt_history(vec![]).is_empty());
    }
}

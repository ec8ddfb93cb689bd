//! Child-fetch composition for lazy expansion.
//!
//! Two strategies, chosen by the parent's runtime metadata: parent-flagged
//! nodes get all descendants from the dedicated children endpoint in one
//! call; everything else walks task executions, and for each attempt that
//! spawned children, lists those child node executions, recursing into them.
//!
//! This module only fetches and adopts; the provenance and in-flight guards,
//! and the single merge commit, live in the session.

use async_recursion::async_recursion;

use fd_admin::client::AdminClient;
use fd_core::execution::NodeExecution;
use fd_core::filter::RequestConfig;
use fd_core::scope::{child_scoped_id, top_level_scoped_id};

use crate::SyncError;

/// Assign a top-level record its scoped id.
pub fn adopt_top_level(mut record: NodeExecution) -> NodeExecution {
    record.scoped_id =
        top_level_scoped_id(record.metadata.spec_node_id.as_deref(), &record.id.node_id);
    record
}

/// Assign a fetched child its composed scoped id and provenance.
fn adopt_child(mut child: NodeExecution, parent_scoped_id: &str) -> NodeExecution {
    child.scoped_id = child_scoped_id(
        parent_scoped_id,
        child.metadata.spec_node_id.as_deref(),
        &child.id.node_id,
    );
    child.from_unique_parent_id = Some(parent_scoped_id.to_string());
    child
}

/// Fetch and adopt the children of one parent record. Returns the complete
/// batch to merge; nothing is committed here, so a failed fetch leaves the
/// map untouched.
pub async fn fetch_children(
    client: &dyn AdminClient,
    parent: &NodeExecution,
) -> Result<Vec<NodeExecution>, SyncError> {
    if parent.metadata.is_parent_node {
        tracing::debug!(parent = %parent.scoped_id, "listing children by parent id");
        let page = client
            .list_node_execution_children(
                &parent.id.execution_id,
                &parent.id.node_id,
                &RequestConfig::all(),
            )
            .await?;
        return Ok(page
            .entities
            .into_iter()
            .map(|child| adopt_child(child, &parent.scoped_id))
            .collect());
    }

    let mut records = fetch_task_children(client, parent).await?;
    let mut patched = parent.clone();
    patched.tasks_fetched = true;
    records.push(patched);
    Ok(records)
}

/// Recursive task-path walk: list the parent's task executions, and for each
/// attempt that is itself a parent, list and adopt its child node executions,
/// grouped by retry attempt.
#[async_recursion]
async fn fetch_task_children(
    client: &dyn AdminClient,
    parent: &NodeExecution,
) -> Result<Vec<NodeExecution>, SyncError> {
    let tasks = client
        .list_task_executions(&parent.id, &RequestConfig::all())
        .await?;

    let mut records = Vec::new();
    for task in tasks.entities.iter().filter(|t| t.is_parent) {
        let page = client
            .list_task_execution_children(&task.id, &RequestConfig::all())
            .await?;
        for child in page.entities {
            let mut child = adopt_child(child, &parent.scoped_id);
            child.metadata.retry_group = Some(task.id.retry_attempt.to_string());

            let nested = fetch_task_children(client, &child).await?;
            child.tasks_fetched = true;
            records.push(child);
            records.extend(nested);
        }
    }
    Ok(records)
}

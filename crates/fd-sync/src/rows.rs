//! Timeline rows — the flattened, depth-annotated view behind bar-chart
//! consumers. Ordered by queue time, unstarted nodes last.

use chrono::{DateTime, Utc};
use serde::Serialize;

use fd_core::phase::NodeExecutionPhase;

use crate::tree::DisplayTree;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineRow {
    pub scoped_id: String,
    pub name: String,
    pub depth: usize,
    pub phase: NodeExecutionPhase,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

pub fn timeline_rows(tree: &DisplayTree) -> Vec<TimelineRow> {
    let mut rows: Vec<TimelineRow> = tree
        .flatten()
        .into_iter()
        .map(|flat| {
            let closure = flat.node.execution.as_ref().map(|e| &e.closure);
            TimelineRow {
                scoped_id: flat.node.scoped_id.clone(),
                name: flat.node.name.clone(),
                depth: flat.depth,
                phase: flat
                    .node
                    .execution
                    .as_ref()
                    .map(|e| e.phase())
                    .unwrap_or_default(),
                started_at: closure.and_then(|c| c.started_at),
                duration_ms: closure.and_then(|c| c.duration_ms),
            }
        })
        .collect();
    // Stable sort: ties and unstarted nodes keep tree order.
    rows.sort_by_key(|r| (r.started_at.is_none(), r.started_at));
    rows
}

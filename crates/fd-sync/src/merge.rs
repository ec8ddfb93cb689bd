//! Merge-owned runtime map — every write path (poll, expansion, dynamic
//! resolution) lands here, keyed by scoped id.
//!
//! Keys are append-only; values are patched field by field. An incoming
//! record never clears a field a previous fetch already populated, so poll
//! and expansion results can interleave in any order.

use std::collections::HashMap;

use fd_core::execution::NodeExecution;
use fd_core::phase::NodeExecutionPhase;

/// Runtime records keyed by scoped id, behind a version counter.
///
/// The version advances only when a merge actually changed some field, so
/// consumers can skip tree rebuilds after no-op refreshes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeExecutionsById {
    entries: HashMap<String, NodeExecution>,
    version: u64,
}

impl NodeExecutionsById {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, scoped_id: &str) -> Option<&NodeExecution> {
        self.entries.get(scoped_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &NodeExecution> {
        self.entries.values()
    }

    /// Provenance check: has some earlier fetch already produced children of
    /// this parent? Used to skip re-fetching on repeated expansion.
    pub fn has_children_of(&self, parent_scoped_id: &str) -> bool {
        self.entries
            .values()
            .any(|n| n.from_unique_parent_id.as_deref() == Some(parent_scoped_id))
    }

    /// Children of one parent, ordered by scoped id.
    pub fn children_of(&self, parent_scoped_id: &str) -> Vec<&NodeExecution> {
        let mut children: Vec<&NodeExecution> = self
            .entries
            .values()
            .filter(|n| n.from_unique_parent_id.as_deref() == Some(parent_scoped_id))
            .collect();
        children.sort_by(|a, b| a.scoped_id.cmp(&b.scoped_id));
        children
    }

    /// Merge a batch of adopted records (scoped ids already assigned) into
    /// the map. Returns true when anything changed; the version advances
    /// exactly then.
    pub fn merge<I>(&mut self, batch: I) -> bool
    where
        I: IntoIterator<Item = NodeExecution>,
    {
        let mut changed = false;
        for incoming in batch {
            if incoming.scoped_id.is_empty() {
                tracing::warn!(node_id = %incoming.id.node_id, "dropping un-adopted record");
                continue;
            }
            match self.entries.get_mut(&incoming.scoped_id) {
                Some(existing) => {
                    changed |= patch_record(existing, incoming);
                }
                None => {
                    self.entries.insert(incoming.scoped_id.clone(), incoming);
                    changed = true;
                }
            }
        }
        if changed {
            self.version += 1;
        }
        changed
    }
}

/// Patch one existing record from an incoming one. The identity (`id`) of an
/// existing key never changes; absent incoming fields keep the present value;
/// `tasks_fetched` and `logs_by_phase` only accumulate.
fn patch_record(existing: &mut NodeExecution, incoming: NodeExecution) -> bool {
    let before = existing.clone();

    if incoming.metadata.spec_node_id.is_some() {
        existing.metadata.spec_node_id = incoming.metadata.spec_node_id;
    }
    existing.metadata.is_parent_node |= incoming.metadata.is_parent_node;
    existing.metadata.is_dynamic |= incoming.metadata.is_dynamic;
    if incoming.metadata.dynamic_parent_node_id.is_some() {
        existing.metadata.dynamic_parent_node_id = incoming.metadata.dynamic_parent_node_id;
    }
    if incoming.metadata.retry_group.is_some() {
        existing.metadata.retry_group = incoming.metadata.retry_group;
    }

    // Undefined is the wire's "absent" phase, not a transition back to it.
    if incoming.closure.phase != NodeExecutionPhase::Undefined {
        existing.closure.phase = incoming.closure.phase;
    }
    if incoming.closure.started_at.is_some() {
        existing.closure.started_at = incoming.closure.started_at;
    }
    if incoming.closure.duration_ms.is_some() {
        existing.closure.duration_ms = incoming.closure.duration_ms;
    }
    if incoming.closure.error_message.is_some() {
        existing.closure.error_message = incoming.closure.error_message;
    }
    if incoming.closure.deck_uri.is_some() {
        existing.closure.deck_uri = incoming.closure.deck_uri;
    }

    if incoming.from_unique_parent_id.is_some() {
        existing.from_unique_parent_id = incoming.from_unique_parent_id;
    }
    existing.tasks_fetched |= incoming.tasks_fetched;

    for group in incoming.logs_by_phase {
        match existing
            .logs_by_phase
            .iter_mut()
            .find(|g| g.phase == group.phase)
        {
            Some(slot) => {
                for link in group.logs {
                    if !slot.logs.contains(&link) {
                        slot.logs.push(link);
                    }
                }
            }
            None => existing.logs_by_phase.push(group),
        }
    }

    *existing != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::execution::{
        LogLink, NodeExecutionClosure, NodeExecutionId, NodeExecutionMetadata, PhaseLogs,
        WorkflowExecutionId,
    };

    fn exec_id() -> WorkflowExecutionId {
        WorkflowExecutionId {
            project: "flows".into(),
            domain: "dev".into(),
            name: "run-1".into(),
        }
    }

    fn record(scoped_id: &str, phase: NodeExecutionPhase) -> NodeExecution {
        NodeExecution {
            id: NodeExecutionId {
                node_id: scoped_id.into(),
                execution_id: exec_id(),
            },
            scoped_id: scoped_id.into(),
            metadata: NodeExecutionMetadata::default(),
            closure: NodeExecutionClosure {
                phase,
                ..Default::default()
            },
            from_unique_parent_id: None,
            tasks_fetched: false,
            logs_by_phase: vec![],
        }
    }

    #[test]
    fn merging_own_entries_is_a_detectable_noop() {
        let mut map = NodeExecutionsById::new();
        map.merge(vec![
            record("n0", NodeExecutionPhase::Running),
            record("n1", NodeExecutionPhase::Succeeded),
        ]);
        let version = map.version();
        let snapshot = map.clone();

        let subset: Vec<NodeExecution> = map.values().take(1).cloned().collect();
        assert!(!map.merge(subset));
        assert!(!map.merge(Vec::new()));
        assert_eq!(map.version(), version);
        assert_eq!(map, snapshot);
    }

    #[test]
    fn new_keys_and_changed_fields_advance_the_version() {
        let mut map = NodeExecutionsById::new();
        assert!(map.merge(vec![record("n0", NodeExecutionPhase::Queued)]));
        assert_eq!(map.version(), 1);

        // Same key, new phase.
        assert!(map.merge(vec![record("n0", NodeExecutionPhase::Running)]));
        assert_eq!(map.version(), 2);
        assert_eq!(
            map.get("n0").unwrap().closure.phase,
            NodeExecutionPhase::Running
        );
    }

    #[test]
    fn absent_incoming_fields_keep_present_values() {
        let mut map = NodeExecutionsById::new();
        let mut first = record("n0", NodeExecutionPhase::Running);
        first.metadata.spec_node_id = Some("n0".into());
        first.closure.started_at = Some(chrono::Utc::now());
        first.from_unique_parent_id = Some("root".into());
        first.tasks_fetched = true;
        map.merge(vec![first]);

        // A sparse poll result for the same key.
        map.merge(vec![record("n0", NodeExecutionPhase::Succeeded)]);

        let merged = map.get("n0").unwrap();
        assert_eq!(merged.closure.phase, NodeExecutionPhase::Succeeded);
        assert_eq!(merged.metadata.spec_node_id.as_deref(), Some("n0"));
        assert!(merged.closure.started_at.is_some());
        assert_eq!(merged.from_unique_parent_id.as_deref(), Some("root"));
        assert!(merged.tasks_fetched);
    }

    #[test]
    fn undefined_phase_does_not_regress_a_known_phase() {
        let mut map = NodeExecutionsById::new();
        map.merge(vec![record("n0", NodeExecutionPhase::Running)]);
        assert!(!map.merge(vec![record("n0", NodeExecutionPhase::Undefined)]));
        assert_eq!(
            map.get("n0").unwrap().closure.phase,
            NodeExecutionPhase::Running
        );
    }

    #[test]
    fn identity_of_an_existing_key_never_changes() {
        let mut map = NodeExecutionsById::new();
        map.merge(vec![record("n0", NodeExecutionPhase::Running)]);

        let mut retry = record("n0", NodeExecutionPhase::Running);
        retry.id.node_id = "n0-2-n0".into();
        map.merge(vec![retry]);

        assert_eq!(map.get("n0").unwrap().id.node_id, "n0");
    }

    #[test]
    fn logs_accumulate_without_duplicates() {
        let link = |name: &str| LogLink {
            name: name.into(),
            uri: format!("s3://logs/{name}"),
        };

        let mut map = NodeExecutionsById::new();
        let mut first = record("n0", NodeExecutionPhase::Running);
        first.logs_by_phase = vec![PhaseLogs {
            phase: NodeExecutionPhase::Running,
            logs: vec![link("stdout")],
        }];
        map.merge(vec![first]);

        let mut second = record("n0", NodeExecutionPhase::Running);
        second.logs_by_phase = vec![PhaseLogs {
            phase: NodeExecutionPhase::Running,
            logs: vec![link("stdout"), link("stderr")],
        }];
        map.merge(vec![second]);

        let logs = &map.get("n0").unwrap().logs_by_phase;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].logs.len(), 2);
    }

    #[test]
    fn un_adopted_records_are_dropped() {
        let mut map = NodeExecutionsById::new();
        let mut raw = record("n0", NodeExecutionPhase::Running);
        raw.scoped_id = String::new();
        assert!(!map.merge(vec![raw]));
        assert!(map.is_empty());
    }

    #[test]
    fn children_of_orders_by_scoped_id() {
        let mut map = NodeExecutionsById::new();
        let mut a = record("n0-0-t1", NodeExecutionPhase::Running);
        a.from_unique_parent_id = Some("n0".into());
        let mut b = record("n0-0-t0", NodeExecutionPhase::Succeeded);
        b.from_unique_parent_id = Some("n0".into());
        map.merge(vec![a, b]);

        assert!(map.has_children_of("n0"));
        assert!(!map.has_children_of("n1"));
        let children = map.children_of("n0");
        assert_eq!(children[0].scoped_id, "n0-0-t0");
        assert_eq!(children[1].scoped_id, "n0-0-t1");
    }
}

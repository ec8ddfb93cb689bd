//! Display tree — the static compiled graph joined against the runtime map.
//!
//! Rebuilt copy-on-write from its inputs; the only sanctioned in-place
//! mutation is the `expanded` flag toggled through the session. Rebuilding
//! from unchanged inputs yields a deep-equal tree, so consumers can compare
//! and keep the previous allocation.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use fd_core::execution::NodeExecution;
use fd_core::graph::{CompiledEdge, CompiledNode, CompiledWorkflow, NodeKind};
use fd_core::scope::{child_scoped_id, retries_to_zero};

use crate::merge::NodeExecutionsById;

/// One display node: a static graph node (or a runtime-discovered child)
/// annotated with its runtime execution record, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayNode {
    /// Static graph node id, or the runtime node id for discovered children.
    pub id: String,
    pub scoped_id: String,
    pub name: String,
    pub kind: NodeKind,
    /// `None` renders as "not run".
    pub execution: Option<NodeExecution>,
    pub children: Vec<DisplayNode>,
    /// Edges of this node's nested subgraph (branch body, sub-workflow,
    /// grafted dynamic closure). Top-level edges live on the tree.
    pub edges: Vec<CompiledEdge>,
    pub expanded: bool,
    pub grayed_out: bool,
}

/// The tree root: top-level nodes (start/end sentinels included, for graph
/// rendering) and top-level edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayTree {
    pub nodes: Vec<DisplayNode>,
    pub edges: Vec<CompiledEdge>,
}

/// Flattened row for table/timeline consumers: sentinels excluded, nesting
/// level attached.
#[derive(Debug, Clone, Copy)]
pub struct FlatNode<'a> {
    pub node: &'a DisplayNode,
    pub depth: usize,
}

impl DisplayTree {
    /// Pre-order walk excluding the start/end sentinels.
    pub fn flatten(&self) -> Vec<FlatNode<'_>> {
        let mut rows = Vec::new();
        for node in &self.nodes {
            flatten_into(node, 0, &mut rows);
        }
        rows
    }

    pub fn find(&self, scoped_id: &str) -> Option<&DisplayNode> {
        self.nodes.iter().find_map(|n| find_in(n, scoped_id))
    }

    pub fn find_mut(&mut self, scoped_id: &str) -> Option<&mut DisplayNode> {
        self.nodes.iter_mut().find_map(|n| find_in_mut(n, scoped_id))
    }
}

fn flatten_into<'a>(node: &'a DisplayNode, depth: usize, rows: &mut Vec<FlatNode<'a>>) {
    if !matches!(node.kind, NodeKind::Start | NodeKind::End) {
        rows.push(FlatNode { node, depth });
        for child in &node.children {
            flatten_into(child, depth + 1, rows);
        }
    }
}

fn find_in<'a>(node: &'a DisplayNode, scoped_id: &str) -> Option<&'a DisplayNode> {
    if node.scoped_id == scoped_id {
        return Some(node);
    }
    node.children.iter().find_map(|c| find_in(c, scoped_id))
}

fn find_in_mut<'a>(node: &'a mut DisplayNode, scoped_id: &str) -> Option<&'a mut DisplayNode> {
    if node.scoped_id == scoped_id {
        return Some(node);
    }
    node.children
        .iter_mut()
        .find_map(|c| find_in_mut(c, scoped_id))
}

/// Build the display tree from the compiled graph and the current runtime
/// map. `dynamic_closures` holds generated sub-workflows already resolved for
/// dynamic nodes, keyed by the dynamic node's scoped id; an unresolved
/// dynamic node renders with its direct fields only.
pub fn build_tree(
    workflow: &CompiledWorkflow,
    executions: &NodeExecutionsById,
    dynamic_closures: &HashMap<String, CompiledWorkflow>,
    expanded: &HashSet<String>,
) -> DisplayTree {
    let mut nodes: Vec<DisplayNode> = workflow
        .nodes
        .iter()
        .map(|n| build_node(n, None, workflow, executions, dynamic_closures, expanded))
        .collect();

    // Top-level runtime records the static graph does not know about (the
    // graph may predate a relaunch) still render, after the static nodes.
    let mut known = HashSet::new();
    for node in &nodes {
        collect_scoped_ids(node, &mut known);
    }
    let mut orphans: Vec<&NodeExecution> = executions
        .values()
        .filter(|r| r.from_unique_parent_id.is_none() && !known.contains(&r.scoped_id))
        .collect();
    orphans.sort_by(|a, b| a.scoped_id.cmp(&b.scoped_id));
    nodes.extend(
        orphans
            .into_iter()
            .map(|r| runtime_node(r, executions, expanded)),
    );

    DisplayTree {
        nodes,
        edges: workflow.edges.clone(),
    }
}

fn collect_scoped_ids(node: &DisplayNode, out: &mut HashSet<String>) {
    out.insert(node.scoped_id.clone());
    for child in &node.children {
        collect_scoped_ids(child, out);
    }
}

fn build_node(
    node: &CompiledNode,
    parent_scope: Option<&str>,
    registry: &CompiledWorkflow,
    executions: &NodeExecutionsById,
    dynamic_closures: &HashMap<String, CompiledWorkflow>,
    expanded: &HashSet<String>,
) -> DisplayNode {
    let scoped_id = match parent_scope {
        None => retries_to_zero(&node.id),
        Some(parent) => child_scoped_id(parent, None, &node.id),
    };

    let (mut children, edges) = match &node.kind {
        NodeKind::Branch { nodes, edges } => (
            nodes
                .iter()
                .map(|n| {
                    build_node(
                        n,
                        Some(&scoped_id),
                        registry,
                        executions,
                        dynamic_closures,
                        expanded,
                    )
                })
                .collect(),
            edges.clone(),
        ),
        NodeKind::SubWorkflow { reference } => match registry.sub_workflow(reference) {
            Some(sub) => (
                sub.nodes
                    .iter()
                    .map(|n| {
                        build_node(
                            n,
                            Some(&scoped_id),
                            registry,
                            executions,
                            dynamic_closures,
                            expanded,
                        )
                    })
                    .collect(),
                sub.edges.clone(),
            ),
            // Missing closure reference degrades to a leaf.
            None => (Vec::new(), Vec::new()),
        },
        NodeKind::Dynamic { .. } => match dynamic_closures.get(&scoped_id) {
            Some(generated) => (
                generated
                    .nodes
                    .iter()
                    .map(|n| {
                        build_node(
                            n,
                            Some(&scoped_id),
                            generated,
                            executions,
                            dynamic_closures,
                            expanded,
                        )
                    })
                    .collect(),
                generated.edges.clone(),
            ),
            None => (Vec::new(), Vec::new()),
        },
        _ => (Vec::new(), Vec::new()),
    };

    // Runtime-discovered children (parent-flagged or task-path fetches) that
    // have no static counterpart in the subtree built above.
    let known: HashSet<&str> = children.iter().map(|c| c.scoped_id.as_str()).collect();
    let discovered: Vec<DisplayNode> = executions
        .children_of(&scoped_id)
        .into_iter()
        .filter(|record| !known.contains(record.scoped_id.as_str()))
        .map(|record| runtime_node(record, executions, expanded))
        .collect();
    children.extend(discovered);

    DisplayNode {
        id: node.id.clone(),
        scoped_id: scoped_id.clone(),
        name: node.display_name().to_string(),
        kind: node.kind.clone(),
        execution: executions.get(&scoped_id).cloned(),
        children,
        edges,
        expanded: expanded.contains(&scoped_id),
        grayed_out: false,
    }
}

/// Display node for a runtime record with no static counterpart. Its own
/// fetched children nest below it the same way.
fn runtime_node(
    record: &NodeExecution,
    executions: &NodeExecutionsById,
    expanded: &HashSet<String>,
) -> DisplayNode {
    let children = executions
        .children_of(&record.scoped_id)
        .into_iter()
        .map(|child| runtime_node(child, executions, expanded))
        .collect();
    DisplayNode {
        id: record.spec_or_node_id().to_string(),
        scoped_id: record.scoped_id.clone(),
        name: record.spec_or_node_id().to_string(),
        kind: NodeKind::Unknown,
        execution: Some(record.clone()),
        children,
        edges: Vec::new(),
        expanded: expanded.contains(&record.scoped_id),
        grayed_out: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fd_core::execution::{
        NodeExecutionClosure, NodeExecutionId, NodeExecutionMetadata, WorkflowExecutionId,
    };
    use fd_core::graph::{CompiledSubWorkflow, WorkflowId, END_NODE_ID, START_NODE_ID};
    use fd_core::phase::NodeExecutionPhase;

    fn exec_id() -> WorkflowExecutionId {
        WorkflowExecutionId {
            project: "flows".into(),
            domain: "dev".into(),
            name: "run-1".into(),
        }
    }

    fn task(id: &str) -> CompiledNode {
        CompiledNode {
            id: id.into(),
            name: None,
            kind: NodeKind::Task {
                task_ref: format!("tasks/{id}"),
            },
        }
    }

    fn sentinel(id: &str, kind: NodeKind) -> CompiledNode {
        CompiledNode {
            id: id.into(),
            name: None,
            kind,
        }
    }

    fn workflow(nodes: Vec<CompiledNode>) -> CompiledWorkflow {
        CompiledWorkflow {
            id: WorkflowId {
                project: "flows".into(),
                domain: "dev".into(),
                name: "etl".into(),
                version: "v1".into(),
            },
            nodes,
            edges: vec![],
            sub_workflows: vec![],
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
    fn static_nodes_without_records_render_as_not_run() {
        let wf = workflow(vec![
            sentinel(START_NODE_ID, NodeKind::Start),
            task("n0"),
            task("n1"),
            sentinel(END_NODE_ID, NodeKind::End),
        ]);
        let mut map = NodeExecutionsById::new();
        map.merge(vec![record("n0", NodeExecutionPhase::Running)]);

        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());

        // Sentinels stay in the graph view but not in the flattened rows.
        assert_eq!(tree.nodes.len(), 4);
        let rows = tree.flatten();
        assert_eq!(rows.len(), 2);
        assert!(tree.find("n0").unwrap().execution.is_some());
        assert!(tree.find("n1").unwrap().execution.is_none());
    }

    #[test]
    fn rebuild_from_unchanged_inputs_is_deep_equal() {
        let wf = workflow(vec![task("n0"), task("n1")]);
        let mut map = NodeExecutionsById::new();
        map.merge(vec![
            record("n0", NodeExecutionPhase::Succeeded),
            record("n1", NodeExecutionPhase::Running),
        ]);
        let dynamic = HashMap::new();
        let expanded = HashSet::new();

        let first = build_tree(&wf, &map, &dynamic, &expanded);
        let second = build_tree(&wf, &map, &dynamic, &expanded);
        assert_eq!(first, second);
    }

    #[test]
    fn scoped_ids_are_pairwise_distinct() {
        let wf = workflow(vec![
            sentinel(START_NODE_ID, NodeKind::Start),
            task("n0"),
            CompiledNode {
                id: "n1".into(),
                name: None,
                kind: NodeKind::Branch {
                    nodes: vec![task("b0"), task("b1")],
                    edges: vec![],
                },
            },
            sentinel(END_NODE_ID, NodeKind::End),
        ]);
        let mut map = NodeExecutionsById::new();
        let mut child = record("n0-0-t0", NodeExecutionPhase::Running);
        child.from_unique_parent_id = Some("n0".into());
        map.merge(vec![record("n0", NodeExecutionPhase::Running), child]);

        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());
        let mut seen = HashSet::new();
        let mut stack: Vec<&DisplayNode> = tree.nodes.iter().collect();
        while let Some(node) = stack.pop() {
            assert!(seen.insert(node.scoped_id.clone()), "{}", node.scoped_id);
            stack.extend(node.children.iter());
        }
        assert!(seen.contains("n1-0-b0"));
        assert!(seen.contains("n0-0-t0"));
    }

    #[test]
    fn discovered_children_nest_under_their_parent_in_order() {
        let wf = workflow(vec![task("n0")]);
        let mut map = NodeExecutionsById::new();
        let mut t1 = record("n0-0-t1", NodeExecutionPhase::Running);
        t1.from_unique_parent_id = Some("n0".into());
        let mut t0 = record("n0-0-t0", NodeExecutionPhase::Succeeded);
        t0.from_unique_parent_id = Some("n0".into());
        map.merge(vec![record("n0", NodeExecutionPhase::Running), t1, t0]);

        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());
        let parent = tree.find("n0").unwrap();
        let ids: Vec<&str> = parent
            .children
            .iter()
            .map(|c| c.scoped_id.as_str())
            .collect();
        assert_eq!(ids, vec!["n0-0-t0", "n0-0-t1"]);
        assert!(matches!(parent.children[0].kind, NodeKind::Unknown));
    }

    #[test]
    fn records_without_static_nodes_render_after_them() {
        let wf = workflow(vec![
            sentinel(START_NODE_ID, NodeKind::Start),
            task("n0"),
            sentinel(END_NODE_ID, NodeKind::End),
        ]);
        let mut map = NodeExecutionsById::new();
        map.merge(vec![
            record("n0", NodeExecutionPhase::Succeeded),
            record("n1", NodeExecutionPhase::Running),
        ]);

        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.nodes[3].scoped_id, "n1");
        let n1 = tree.find("n1").unwrap();
        assert!(matches!(n1.kind, NodeKind::Unknown));
        assert!(n1.children.is_empty());
        // A fetched child is nested, not duplicated at top level.
        let mut child = record("n0-0-t0", NodeExecutionPhase::Running);
        child.from_unique_parent_id = Some("n0".into());
        map.merge(vec![child]);
        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.find("n0").unwrap().children.len(), 1);
    }

    #[test]
    fn sub_workflow_closure_nests_with_prefixed_scope() {
        let mut wf = workflow(vec![CompiledNode {
            id: "n0".into(),
            name: None,
            kind: NodeKind::SubWorkflow {
                reference: "sub.fetch".into(),
            },
        }]);
        wf.sub_workflows = vec![CompiledSubWorkflow {
            reference: "sub.fetch".into(),
            nodes: vec![task("s0")],
            edges: vec![],
        }];

        let tree = build_tree(
            &wf,
            &NodeExecutionsById::new(),
            &HashMap::new(),
            &HashSet::new(),
        );
        assert!(tree.find("n0-0-s0").is_some());
    }

    #[test]
    fn unresolved_dynamic_node_renders_without_children() {
        let wf = workflow(vec![CompiledNode {
            id: "d0".into(),
            name: None,
            kind: NodeKind::Dynamic {
                task_ref: "tasks/gen".into(),
            },
        }]);
        let mut map = NodeExecutionsById::new();
        let mut rec = record("d0", NodeExecutionPhase::DynamicRunning);
        rec.metadata.is_dynamic = true;
        map.merge(vec![rec]);

        let tree = build_tree(&wf, &map, &HashMap::new(), &HashSet::new());
        assert!(tree.find("d0").unwrap().children.is_empty());

        // Once the generated closure is resolved it is grafted in.
        let mut dynamic = HashMap::new();
        dynamic.insert("d0".to_string(), workflow(vec![task("g0"), task("g1")]));
        let tree = build_tree(&wf, &map, &dynamic, &HashSet::new());
        assert_eq!(tree.find("d0").unwrap().children.len(), 2);
        assert!(tree.find("d0-0-g0").is_some());
    }

    #[test]
    fn expanded_flags_come_from_the_set() {
        let wf = workflow(vec![task("n0"), task("n1")]);
        let expanded: HashSet<String> = ["n0".to_string()].into();
        let tree = build_tree(&wf, &NodeExecutionsById::new(), &HashMap::new(), &expanded);
        assert!(tree.find("n0").unwrap().expanded);
        assert!(!tree.find("n1").unwrap().expanded);
    }
}

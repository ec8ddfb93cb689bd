//! Filter state and the client-side phase prune.
//!
//! Routing rule: a phase filter on its own is applied client-side over the
//! full fetched tree, so ancestor context nodes survive; as soon as any other
//! filter is active, everything (phase included) goes to the server and the
//! client-side prune is skipped.

use fd_core::filter::FilterSpec;
use fd_core::phase::NodeExecutionPhase;

use crate::tree::{DisplayNode, DisplayTree};

/// Filters applied to one execution view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    /// Phase membership filter; empty means no phase filtering.
    pub phases: Vec<NodeExecutionPhase>,
    /// Every non-phase filter (time range, node name, ...), sent server-side
    /// verbatim.
    pub extra: Vec<FilterSpec>,
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty() && self.extra.is_empty()
    }

    fn phase_only(&self) -> bool {
        !self.phases.is_empty() && self.extra.is_empty()
    }

    /// Filters to send with the server list query. Empty when the phase
    /// filter is the only one active: the query stays unfiltered so the
    /// fetched tree keeps the context nodes a server-side phase filter would
    /// drop.
    pub fn server_filters(&self) -> Vec<FilterSpec> {
        if self.extra.is_empty() {
            return Vec::new();
        }
        let mut filters = self.extra.clone();
        if !self.phases.is_empty() {
            filters.push(FilterSpec::value_in(
                "phase",
                self.phases.iter().map(|p| p.as_str().to_string()).collect(),
            ));
        }
        filters
    }

    /// Phases to prune client-side, when this is a phase-only filter.
    pub fn client_phases(&self) -> Option<&[NodeExecutionPhase]> {
        self.phase_only().then_some(self.phases.as_slice())
    }
}

/// Post-order prune of the canonical tree against a phase set. Produces a
/// detached copy: a node survives when its own phase matches (UNDEFINED when
/// it has no execution record) or some descendant survived; nodes kept only
/// for ancestry are marked `grayed_out`.
pub fn apply_phase_filter(tree: &DisplayTree, phases: &[NodeExecutionPhase]) -> DisplayTree {
    DisplayTree {
        nodes: tree
            .nodes
            .iter()
            .filter_map(|n| filter_node(n, phases))
            .collect(),
        edges: tree.edges.clone(),
    }
}

fn filter_node(node: &DisplayNode, phases: &[NodeExecutionPhase]) -> Option<DisplayNode> {
    let children: Vec<DisplayNode> = node
        .children
        .iter()
        .filter_map(|c| filter_node(c, phases))
        .collect();

    let own_phase = node
        .execution
        .as_ref()
        .map(|e| e.phase())
        .unwrap_or_default();
    let matches = phases.contains(&own_phase);
    if !matches && children.is_empty() {
        return None;
    }

    Some(DisplayNode {
        children,
        grayed_out: !matches,
        ..node.clone()
    })
}

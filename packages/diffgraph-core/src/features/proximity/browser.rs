//! Proximity browsing
//!
//! Keeps a bounded neighborhood around the anchor set visible and
//! stands in for everything beyond it with counted stub nodes. Large
//! visibility changes are handed back to the caller as a sized delta to
//! accept or reject; nothing is applied until then.

use ahash::AHashSet;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;
use tracing::debug;

use crate::errors::{DiffGraphError, Result};
use crate::features::graphs::{
    GraphsContainer, NodeRef, SiblingLinks, StubDirection, ViewEdge, ViewGraph, ViewNode,
    ViewNodeKind,
};
use crate::shared::events::GraphChange;
use crate::shared::models::{AddressPair, Side, ViewKind};

/// Visibility change computed but not necessarily applied yet
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityDelta {
    pub show: Vec<AddressPair>,
    pub hide: Vec<AddressPair>,
}

impl VisibilityDelta {
    pub fn magnitude(&self) -> usize {
        self.show.len() + self.hide.len()
    }

    pub fn is_empty(&self) -> bool {
        self.show.is_empty() && self.hide.is_empty()
    }
}

/// Result of a proximity operation
#[derive(Debug, Clone, PartialEq)]
pub enum ProximityOutcome {
    /// The visibility change was applied
    Applied { shown: usize, hidden: usize },
    /// The change exceeds the configured threshold; the caller decides
    /// and applies the delta explicitly
    NeedsConfirmation(VisibilityDelta),
    /// Proximity browsing is disabled or frozen
    Inactive,
}

impl GraphsContainer {
    /// Recompute the visible window around the given anchor pairs
    ///
    /// The window is every node within `children_depth` successor steps
    /// or `parents_depth` predecessor steps of an anchor. Deltas larger
    /// than the configured threshold are returned unapplied.
    pub fn update_proximity(&mut self, anchors: &[AddressPair]) -> Result<ProximityOutcome> {
        if !self.config().proximity.enabled || self.proximity_frozen {
            return Ok(ProximityOutcome::Inactive);
        }

        let mut starts = Vec::with_capacity(anchors.len());
        for pair in anchors {
            let entry = self.pair_entry(pair).ok_or_else(|| {
                DiffGraphError::invariant(format!("proximity anchor {pair} has no node"))
            })?;
            starts.push(entry.super_node);
        }

        let children_depth = self.config().proximity.children_depth;
        let parents_depth = self.config().proximity.parents_depth;
        let super_view = self.view(ViewKind::Super);

        let mut keep: AHashSet<NodeIndex> = starts.iter().copied().collect();
        keep.extend(bounded_reachability(
            super_view,
            &starts,
            Direction::Outgoing,
            children_depth,
        ));
        keep.extend(bounded_reachability(
            super_view,
            &starts,
            Direction::Incoming,
            parents_depth,
        ));

        let mut delta = VisibilityDelta::default();
        for index in super_view.node_indices() {
            let Some(node) = super_view.node(index) else { continue };
            let Some(pair) = node.pair() else { continue };
            let wanted = keep.contains(&index);
            if wanted && !node.visible {
                delta.show.push(pair);
            } else if !wanted && node.visible {
                delta.hide.push(pair);
            }
        }

        self.resolve_delta(delta)
    }

    /// Reveal the hidden neighbors a stub stands in for
    ///
    /// The neighbor set is collected with a breadth-limited reachability
    /// query in the stub's direction. Stubs are deleted and recomputed
    /// for the new frontier when the delta is applied.
    pub fn expand_stub(&mut self, stub: NodeRef) -> Result<ProximityOutcome> {
        if !self.config().proximity.enabled || self.proximity_frozen {
            return Ok(ProximityOutcome::Inactive);
        }

        let view = self.view(stub.view());
        let node = view.node(stub.index()).ok_or_else(|| {
            DiffGraphError::invariant("expand_stub: stub node does not exist")
        })?;
        let (owner, direction) = match node.kind {
            ViewNodeKind::Stub {
                owner, direction, ..
            } => (owner, direction),
            ViewNodeKind::Element { .. } => {
                return Err(DiffGraphError::invariant(
                    "expand_stub: node is not a stub".to_string(),
                ))
            }
        };

        // work on the super graph: stubs in single views resolve their
        // owner through the sibling links
        let owner_super = view
            .node(owner)
            .and_then(|weight| weight.links.super_node)
            .ok_or_else(|| {
                DiffGraphError::invariant("expand_stub: stub owner has no super counterpart")
            })?;

        let depth = match direction {
            StubDirection::Outgoing => self.config().proximity.children_depth,
            StubDirection::Incoming => self.config().proximity.parents_depth,
        }
        // a stub click always reveals at least the direct neighbors
        .max(1);
        let petgraph_direction = match direction {
            StubDirection::Outgoing => Direction::Outgoing,
            StubDirection::Incoming => Direction::Incoming,
        };

        let super_view = self.view(ViewKind::Super);
        let reached = bounded_reachability(
            super_view,
            &[owner_super],
            petgraph_direction,
            depth,
        );

        let mut delta = VisibilityDelta::default();
        for index in reached {
            let Some(node) = super_view.node(index) else { continue };
            if !node.visible {
                if let Some(pair) = node.pair() {
                    delta.show.push(pair);
                }
            }
        }

        self.resolve_delta(delta)
    }

    fn resolve_delta(&mut self, delta: VisibilityDelta) -> Result<ProximityOutcome> {
        if delta.magnitude() > self.config().proximity.visibility_threshold {
            debug!(
                magnitude = delta.magnitude(),
                threshold = self.config().proximity.visibility_threshold,
                "visibility delta needs confirmation"
            );
            return Ok(ProximityOutcome::NeedsConfirmation(delta));
        }
        let shown = delta.show.len();
        let hidden = delta.hide.len();
        self.apply_visibility_delta(&delta)?;
        Ok(ProximityOutcome::Applied { shown, hidden })
    }

    /// Apply a visibility delta to all four views and refresh stubs
    ///
    /// Used directly by callers confirming a `NeedsConfirmation` delta.
    pub fn apply_visibility_delta(&mut self, delta: &VisibilityDelta) -> Result<()> {
        self.transaction(|c| {
            for (pairs, visible) in [(&delta.show, true), (&delta.hide, false)] {
                for pair in pairs.iter() {
                    let links = c.element_links(pair)?;
                    for view in ViewKind::ALL {
                        let Some(index) = links.get(view) else { continue };
                        if let Some(node) = c.view_mut(view).node_mut(index) {
                            node.visible = visible;
                        }
                    }
                }
            }

            c.refresh_edge_visibility();
            c.recompute_stubs()?;

            for view in ViewKind::ALL {
                let side = view.side();
                let count = |pairs: &[AddressPair]| {
                    pairs
                        .iter()
                        .filter(|pair| side.map_or(true, |s| pair.has_side(s)))
                        .count()
                };
                let shown = count(&delta.show);
                let hidden = count(&delta.hide);
                if shown > 0 || hidden > 0 {
                    c.events.emit(GraphChange::VisibilityChanged {
                        view,
                        shown,
                        hidden,
                    });
                }
            }
            Ok(())
        })
    }

    /// Pin the current visible window; `update_proximity` and
    /// `expand_stub` become no-ops while frozen
    pub fn set_proximity_frozen(&mut self, frozen: bool) {
        self.proximity_frozen = frozen;
    }

    pub fn is_proximity_frozen(&self) -> bool {
        self.proximity_frozen
    }

    /// Delete all stubs and synthesize fresh ones for the visible frontier
    ///
    /// Super and combined stubs carry per-side hidden counts derived
    /// from the super graph; each single graph gets its own independent
    /// stubs counted in that graph.
    pub fn recompute_stubs(&mut self) -> Result<()> {
        for view in ViewKind::ALL {
            let stubs = self.view(view).stub_indices();
            let graph = self.view_mut(view);
            for stub in stubs {
                graph.remove_node(stub);
            }
        }

        // super + combined: counts derived per side on the super graph
        let mut shared_stubs: Vec<(NodeIndex, StubDirection, usize, usize, usize)> = Vec::new();
        {
            let super_view = self.view(ViewKind::Super);
            for index in super_view.visible_node_indices() {
                for (direction, stub_direction) in [
                    (Direction::Incoming, StubDirection::Incoming),
                    (Direction::Outgoing, StubDirection::Outgoing),
                ] {
                    let counts = hidden_neighbor_counts(super_view, index, direction);
                    if counts.2 > 0 {
                        shared_stubs.push((
                            index,
                            stub_direction,
                            counts.0,
                            counts.1,
                            counts.2,
                        ));
                    }
                }
            }
        }
        for (super_owner, direction, hidden_primary, hidden_secondary, hidden_total) in
            shared_stubs
        {
            let combined_owner = self
                .view(ViewKind::Super)
                .node(super_owner)
                .and_then(|node| node.links.combined)
                .ok_or_else(|| {
                    DiffGraphError::invariant("visible super node without combined sibling")
                })?;

            let super_stub = attach_stub(
                self.view_mut(ViewKind::Super),
                super_owner,
                direction,
                hidden_primary,
                hidden_secondary,
                hidden_total,
            );
            let combined_stub = attach_stub(
                self.view_mut(ViewKind::Combined),
                combined_owner,
                direction,
                hidden_primary,
                hidden_secondary,
                hidden_total,
            );

            // shared stubs know each other; single-graph stubs stay independent
            let links = SiblingLinks {
                primary: None,
                secondary: None,
                super_node: Some(super_stub),
                combined: Some(combined_stub),
            };
            if let Some(node) = self.view_mut(ViewKind::Super).node_mut(super_stub) {
                node.links = links;
            }
            if let Some(node) = self.view_mut(ViewKind::Combined).node_mut(combined_stub) {
                node.links = links;
            }
        }

        // single graphs: independent per-graph stubs
        for (view, side) in [
            (ViewKind::Primary, Side::Primary),
            (ViewKind::Secondary, Side::Secondary),
        ] {
            let mut single_stubs: Vec<(NodeIndex, StubDirection, usize)> = Vec::new();
            {
                let graph = self.view(view);
                for index in graph.visible_node_indices() {
                    for (direction, stub_direction) in [
                        (Direction::Incoming, StubDirection::Incoming),
                        (Direction::Outgoing, StubDirection::Outgoing),
                    ] {
                        let (_, _, total) = hidden_neighbor_counts(graph, index, direction);
                        if total > 0 {
                            single_stubs.push((index, stub_direction, total));
                        }
                    }
                }
            }
            let graph = self.view_mut(view);
            for (owner, direction, total) in single_stubs {
                let (hidden_primary, hidden_secondary) = match side {
                    Side::Primary => (total, 0),
                    Side::Secondary => (0, total),
                };
                attach_stub(
                    graph,
                    owner,
                    direction,
                    hidden_primary,
                    hidden_secondary,
                    total,
                );
            }
        }

        Ok(())
    }

    /// Edges show only while both endpoints do, in every view
    pub(crate) fn refresh_edge_visibility(&mut self) {
        for view in ViewKind::ALL {
            let graph = self.view_mut(view);
            for index in graph.edge_indices() {
                let Some((source, target)) = graph.endpoints(index) else { continue };
                let visible = graph.node(source).map(|n| n.visible).unwrap_or(false)
                    && graph.node(target).map(|n| n.visible).unwrap_or(false);
                if let Some(edge) = graph.edge_mut(index) {
                    edge.visible = visible;
                }
            }
        }
    }

    pub(crate) fn element_links(&self, pair: &AddressPair) -> Result<SiblingLinks> {
        let entry = self
            .pair_entry(pair)
            .ok_or_else(|| DiffGraphError::invariant(format!("pair {pair} has no node")))?;
        self.view(ViewKind::Super)
            .node(entry.super_node)
            .map(|node| node.links)
            .ok_or_else(|| DiffGraphError::invariant(format!("pair {pair}: super node missing")))
    }
}

/// (primary, secondary, total) counts of invisible element neighbors
///
/// A neighbor counts on a side when the connecting edge carries that
/// side's raw edge; it counts once in the total regardless.
fn hidden_neighbor_counts(
    graph: &ViewGraph,
    index: NodeIndex,
    direction: Direction,
) -> (usize, usize, usize) {
    let mut primary: AHashSet<NodeIndex> = AHashSet::new();
    let mut secondary: AHashSet<NodeIndex> = AHashSet::new();
    let mut total: AHashSet<NodeIndex> = AHashSet::new();

    for (edge_index, neighbor) in graph.edges_directed(index, direction) {
        let Some(node) = graph.node(neighbor) else { continue };
        if node.is_stub() || node.visible {
            continue;
        }
        let Some(edge) = graph.edge(edge_index) else { continue };
        if edge.is_stub {
            continue;
        }
        total.insert(neighbor);
        if edge.has_side(Side::Primary) {
            primary.insert(neighbor);
        }
        if edge.has_side(Side::Secondary) {
            secondary.insert(neighbor);
        }
    }
    (primary.len(), secondary.len(), total.len())
}

fn attach_stub(
    graph: &mut ViewGraph,
    owner: NodeIndex,
    direction: StubDirection,
    hidden_primary: usize,
    hidden_secondary: usize,
    hidden_total: usize,
) -> NodeIndex {
    let stub = graph.add_node(ViewNode::stub(
        owner,
        direction,
        hidden_primary,
        hidden_secondary,
        hidden_total,
    ));
    match direction {
        StubDirection::Incoming => graph.add_edge(stub, owner, ViewEdge::stub()),
        StubDirection::Outgoing => graph.add_edge(owner, stub, ViewEdge::stub()),
    };
    stub
}

/// Element nodes within `depth` steps of `starts` in one direction
///
/// Stub nodes neither count nor extend the frontier. Depth 0 returns
/// the empty set.
pub(crate) fn bounded_reachability(
    graph: &ViewGraph,
    starts: &[NodeIndex],
    direction: Direction,
    depth: u32,
) -> AHashSet<NodeIndex> {
    let mut reached: AHashSet<NodeIndex> = AHashSet::new();
    if depth == 0 {
        return reached;
    }
    let mut visited: AHashSet<NodeIndex> = starts.iter().copied().collect();
    let mut frontier: Vec<NodeIndex> = starts.to_vec();

    for _ in 0..depth {
        let mut next = Vec::new();
        for &node in &frontier {
            for neighbor in graph.neighbors_directed(node, direction) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let Some(weight) = graph.node(neighbor) else { continue };
                if weight.is_stub() {
                    continue;
                }
                reached.insert(neighbor);
                next.push(neighbor);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    reached
}

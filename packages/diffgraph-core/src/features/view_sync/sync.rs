//! Selection/visibility propagation

use ahash::AHashMap;
use petgraph::stable_graph::NodeIndex;
use petgraph::Direction;

use crate::errors::{DiffGraphError, Result};
use crate::features::graphs::{GraphsContainer, NodeRef};
use crate::features::proximity::bounded_reachability;
use crate::shared::events::GraphChange;
use crate::shared::models::{DisplayMode, ViewKind};

/// Per-operation tally of selection flips
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectionSummary {
    pub selected: usize,
    pub deselected: usize,
}

impl GraphsContainer {
    /// Select or deselect nodes, propagating according to the display mode
    pub fn set_selected(&mut self, nodes: &[NodeRef], selected: bool) -> Result<SelectionSummary> {
        self.transaction(|c| {
            let mut per_view: AHashMap<ViewKind, SelectionSummary> = AHashMap::new();
            for &node in nodes {
                for (view, index) in c.propagation_targets(node)? {
                    let Some(weight) = c.view_mut(view).node_mut(index) else { continue };
                    if weight.selected != selected {
                        weight.selected = selected;
                        let entry = per_view.entry(view).or_default();
                        if selected {
                            entry.selected += 1;
                        } else {
                            entry.deselected += 1;
                        }
                    }
                }
            }

            let mut summary = SelectionSummary::default();
            for (view, counts) in per_view {
                summary.selected += counts.selected;
                summary.deselected += counts.deselected;
                c.events.emit(GraphChange::SelectionChanged {
                    view,
                    selected: counts.selected,
                    deselected: counts.deselected,
                });
            }
            Ok(summary)
        })
    }

    /// Show or hide nodes, propagating according to the display mode
    ///
    /// In synchronized mode a combined node and its super counterpart
    /// always move together; independent mode intentionally decouples
    /// the views.
    pub fn set_node_visibility(&mut self, nodes: &[NodeRef], visible: bool) -> Result<()> {
        self.transaction(|c| {
            let mut per_view: AHashMap<ViewKind, (usize, usize)> = AHashMap::new();
            for &node in nodes {
                for (view, index) in c.propagation_targets(node)? {
                    let Some(weight) = c.view_mut(view).node_mut(index) else { continue };
                    if weight.visible != visible {
                        weight.visible = visible;
                        let entry = per_view.entry(view).or_default();
                        if visible {
                            entry.0 += 1;
                        } else {
                            entry.1 += 1;
                        }
                    }
                }
            }

            c.refresh_edge_visibility();
            if c.config().proximity.enabled {
                c.recompute_stubs()?;
            }
            for (view, (shown, hidden)) in per_view {
                c.events.emit(GraphChange::VisibilityChanged {
                    view,
                    shown,
                    hidden,
                });
            }
            Ok(())
        })
    }

    /// Select everything reachable against edge direction from `origin`
    pub fn select_ancestors(&mut self, origin: NodeRef) -> Result<SelectionSummary> {
        self.select_reachable(origin, Direction::Incoming)
    }

    /// Select everything reachable along edge direction from `origin`
    pub fn select_descendants(&mut self, origin: NodeRef) -> Result<SelectionSummary> {
        self.select_reachable(origin, Direction::Outgoing)
    }

    /// Select the direct neighbors of `origin` in both directions
    pub fn select_neighbors(&mut self, origin: NodeRef) -> Result<SelectionSummary> {
        let view = origin.view();
        let graph = self.view(view);
        if graph.node(origin.index()).is_none() {
            return Err(DiffGraphError::invariant(
                "select_neighbors: origin does not exist",
            ));
        }
        let mut refs = vec![origin];
        for direction in [Direction::Incoming, Direction::Outgoing] {
            for neighbor in graph.neighbors_directed(origin.index(), direction) {
                if graph.node(neighbor).map(|n| !n.is_stub()).unwrap_or(false) {
                    refs.push(NodeRef::new(view, neighbor));
                }
            }
        }
        self.set_selected(&refs, true)
    }

    /// Flip the selection of every element node in one view
    pub fn invert_selection(&mut self, view: ViewKind) -> Result<SelectionSummary> {
        let (to_select, to_deselect): (Vec<NodeRef>, Vec<NodeRef>) = {
            let graph = self.view(view);
            let mut select = Vec::new();
            let mut deselect = Vec::new();
            for index in graph.node_indices() {
                let Some(node) = graph.node(index) else { continue };
                if node.is_stub() {
                    continue;
                }
                if node.selected {
                    deselect.push(NodeRef::new(view, index));
                } else {
                    select.push(NodeRef::new(view, index));
                }
            }
            (select, deselect)
        };

        self.transaction(|c| {
            let selected = c.set_selected(&to_select, true)?;
            let deselected = c.set_selected(&to_deselect, false)?;
            Ok(SelectionSummary {
                selected: selected.selected,
                deselected: deselected.deselected,
            })
        })
    }

    /// Element nodes currently selected in one view
    pub fn selected_nodes(&self, view: ViewKind) -> Vec<NodeIndex> {
        let graph = self.view(view);
        graph
            .node_indices()
            .into_iter()
            .filter(|&index| {
                graph
                    .node(index)
                    .map(|node| node.selected && !node.is_stub())
                    .unwrap_or(false)
            })
            .collect()
    }

    fn select_reachable(
        &mut self,
        origin: NodeRef,
        direction: Direction,
    ) -> Result<SelectionSummary> {
        let view = origin.view();
        let graph = self.view(view);
        if graph.node(origin.index()).is_none() {
            return Err(DiffGraphError::invariant(
                "select_reachable: origin does not exist",
            ));
        }
        let reached = bounded_reachability(graph, &[origin.index()], direction, u32::MAX);
        let mut refs = vec![origin];
        refs.extend(reached.into_iter().map(|index| NodeRef::new(view, index)));
        self.set_selected(&refs, true)
    }

    /// The (view, node) set a change to one node fans out to
    ///
    /// The closed `NodeRef` union is dispatched exhaustively; a ref into
    /// a view where the node no longer exists is an invariant violation.
    pub(crate) fn propagation_targets(&self, node: NodeRef) -> Result<Vec<(ViewKind, NodeIndex)>> {
        let weight = match node {
            NodeRef::Primary(index) => self.view(ViewKind::Primary).node(index),
            NodeRef::Secondary(index) => self.view(ViewKind::Secondary).node(index),
            NodeRef::Super(index) => self.view(ViewKind::Super).node(index),
            NodeRef::Combined(index) => self.view(ViewKind::Combined).node(index),
        }
        .ok_or_else(|| {
            DiffGraphError::invariant(format!(
                "{:?} node {:?} does not exist",
                node.view(),
                node.index()
            ))
        })?;

        // stubs never propagate across views
        if weight.is_stub() {
            return Ok(vec![(node.view(), node.index())]);
        }

        match self.display_mode() {
            DisplayMode::Independent => Ok(vec![(node.view(), node.index())]),
            DisplayMode::Synchronized => {
                let links = weight.links;
                Ok(ViewKind::ALL
                    .iter()
                    .filter_map(|&view| links.get(view).map(|index| (view, index)))
                    .collect())
            }
        }
    }
}

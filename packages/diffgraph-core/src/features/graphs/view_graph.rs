//! One view graph over a stable arena
//!
//! Each of the four views owns a `StableDiGraph` whose indices stay
//! valid across removals, so sibling links between views are plain
//! indices instead of references. Nodes and edges carry their own
//! visual and visibility state; structural queries go through the
//! petgraph arena.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::shared::models::{
    AddressPair, BorderStyle, MatchState, NodeColor, Point, RawEdgeKind, Side, ViewKind,
};

/// Which frontier a stub stands in for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StubDirection {
    /// Hidden predecessors of the owner
    Incoming,
    /// Hidden successors of the owner
    Outgoing,
}

/// Payload distinguishing real diff elements from ephemeral stubs
#[derive(Debug, Clone, PartialEq)]
pub enum ViewNodeKind {
    /// A function or basic block pair
    Element { pair: AddressPair },
    /// Placeholder for hidden neighbors of `owner`; degree 1 by construction
    ///
    /// Per-side counts can overlap: a neighbor reachable through a
    /// both-sided edge counts on each side but once in the total.
    Stub {
        owner: NodeIndex,
        direction: StubDirection,
        hidden_primary: usize,
        hidden_secondary: usize,
        hidden_total: usize,
    },
}

/// Indices of an element's counterparts in the other three views
///
/// An element's own view is filled in too, so lookups never need to
/// special-case the origin graph.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SiblingLinks {
    pub primary: Option<NodeIndex>,
    pub secondary: Option<NodeIndex>,
    pub super_node: Option<NodeIndex>,
    pub combined: Option<NodeIndex>,
}

impl SiblingLinks {
    pub fn get(&self, view: ViewKind) -> Option<NodeIndex> {
        match view {
            ViewKind::Primary => self.primary,
            ViewKind::Secondary => self.secondary,
            ViewKind::Super => self.super_node,
            ViewKind::Combined => self.combined,
        }
    }

    pub fn set(&mut self, view: ViewKind, index: Option<NodeIndex>) {
        match view {
            ViewKind::Primary => self.primary = index,
            ViewKind::Secondary => self.secondary = index,
            ViewKind::Super => self.super_node = index,
            ViewKind::Combined => self.combined = index,
        }
    }
}

/// Edge counterparts across the four views
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EdgeLinks {
    pub primary: Option<EdgeIndex>,
    pub secondary: Option<EdgeIndex>,
    pub super_edge: Option<EdgeIndex>,
    pub combined: Option<EdgeIndex>,
}

impl EdgeLinks {
    pub fn get(&self, view: ViewKind) -> Option<EdgeIndex> {
        match view {
            ViewKind::Primary => self.primary,
            ViewKind::Secondary => self.secondary,
            ViewKind::Super => self.super_edge,
            ViewKind::Combined => self.combined,
        }
    }

    pub fn set(&mut self, view: ViewKind, index: Option<EdgeIndex>) {
        match view {
            ViewKind::Primary => self.primary = index,
            ViewKind::Secondary => self.secondary = index,
            ViewKind::Super => self.super_edge = index,
            ViewKind::Combined => self.combined = index,
        }
    }
}

/// One node of a view graph
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub kind: ViewNodeKind,
    pub state: MatchState,
    /// Content differs although matched
    pub changed: bool,
    pub primary_name: Option<String>,
    pub secondary_name: Option<String>,
    pub visible: bool,
    pub selected: bool,
    pub color: NodeColor,
    pub border: BorderStyle,
    pub position: Option<Point>,
    pub links: SiblingLinks,
}

impl ViewNode {
    /// Node for a real diff element
    pub fn element(pair: AddressPair, changed: bool) -> Self {
        let state = pair.state();
        Self {
            kind: ViewNodeKind::Element { pair },
            state,
            changed,
            primary_name: None,
            secondary_name: None,
            visible: true,
            selected: false,
            color: crate::shared::models::derive_color(state, changed),
            border: BorderStyle::Normal,
            position: None,
            links: SiblingLinks::default(),
        }
    }

    /// Ephemeral placeholder node
    pub fn stub(
        owner: NodeIndex,
        direction: StubDirection,
        hidden_primary: usize,
        hidden_secondary: usize,
        hidden_total: usize,
    ) -> Self {
        Self {
            kind: ViewNodeKind::Stub {
                owner,
                direction,
                hidden_primary,
                hidden_secondary,
                hidden_total,
            },
            // stubs have no match state of their own; Matched is inert here
            state: MatchState::Matched,
            changed: false,
            primary_name: None,
            secondary_name: None,
            visible: true,
            selected: false,
            color: NodeColor::Stub,
            border: BorderStyle::Normal,
            position: None,
            links: SiblingLinks::default(),
        }
    }

    pub fn pair(&self) -> Option<AddressPair> {
        match self.kind {
            ViewNodeKind::Element { pair } => Some(pair),
            ViewNodeKind::Stub { .. } => None,
        }
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.kind, ViewNodeKind::Stub { .. })
    }

    /// Display label: names where known, addresses otherwise, counts for stubs
    pub fn label(&self) -> String {
        match &self.kind {
            ViewNodeKind::Element { pair } => {
                match (&self.primary_name, &self.secondary_name) {
                    (Some(p), Some(s)) if p == s => p.clone(),
                    (Some(p), Some(s)) => format!("{p} \u{2194} {s}"),
                    (Some(p), None) => p.clone(),
                    (None, Some(s)) => s.clone(),
                    (None, None) => pair.to_string(),
                }
            }
            ViewNodeKind::Stub { hidden_total, .. } => format!("{hidden_total}"),
        }
    }

    pub fn name(&self, side: Side) -> Option<&str> {
        match side {
            Side::Primary => self.primary_name.as_deref(),
            Side::Secondary => self.secondary_name.as_deref(),
        }
    }
}

/// One edge of a view graph
#[derive(Debug, Clone)]
pub struct ViewEdge {
    pub primary_kind: Option<RawEdgeKind>,
    pub secondary_kind: Option<RawEdgeKind>,
    pub state: MatchState,
    pub visible: bool,
    pub selected: bool,
    /// Stub edges attach placeholders; they carry no raw edge kinds
    pub is_stub: bool,
    pub bends: Vec<Point>,
    pub links: EdgeLinks,
}

impl ViewEdge {
    pub fn element(primary_kind: Option<RawEdgeKind>, secondary_kind: Option<RawEdgeKind>) -> Self {
        Self {
            primary_kind,
            secondary_kind,
            state: edge_state(primary_kind, secondary_kind),
            visible: true,
            selected: false,
            is_stub: false,
            bends: Vec::new(),
            links: EdgeLinks::default(),
        }
    }

    pub fn stub() -> Self {
        Self {
            primary_kind: None,
            secondary_kind: None,
            state: MatchState::Matched,
            visible: true,
            selected: false,
            is_stub: true,
            bends: Vec::new(),
            links: EdgeLinks::default(),
        }
    }

    pub fn kind(&self, side: Side) -> Option<RawEdgeKind> {
        match side {
            Side::Primary => self.primary_kind,
            Side::Secondary => self.secondary_kind,
        }
    }

    pub fn has_side(&self, side: Side) -> bool {
        self.kind(side).is_some()
    }
}

/// Match state implied by which side kinds an edge carries
pub fn edge_state(
    primary_kind: Option<RawEdgeKind>,
    secondary_kind: Option<RawEdgeKind>,
) -> MatchState {
    match (primary_kind, secondary_kind) {
        (Some(_), Some(_)) => MatchState::Matched,
        (Some(_), None) => MatchState::PrimaryUnmatched,
        (None, Some(_)) => MatchState::SecondaryUnmatched,
        (None, None) => MatchState::Matched,
    }
}

/// A node in one of the four views
///
/// The closed union the selection/visibility propagation code matches
/// on exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Primary(NodeIndex),
    Secondary(NodeIndex),
    Super(NodeIndex),
    Combined(NodeIndex),
}

impl NodeRef {
    pub fn new(view: ViewKind, index: NodeIndex) -> Self {
        match view {
            ViewKind::Primary => NodeRef::Primary(index),
            ViewKind::Secondary => NodeRef::Secondary(index),
            ViewKind::Super => NodeRef::Super(index),
            ViewKind::Combined => NodeRef::Combined(index),
        }
    }

    pub fn view(&self) -> ViewKind {
        match self {
            NodeRef::Primary(_) => ViewKind::Primary,
            NodeRef::Secondary(_) => ViewKind::Secondary,
            NodeRef::Super(_) => ViewKind::Super,
            NodeRef::Combined(_) => ViewKind::Combined,
        }
    }

    pub fn index(&self) -> NodeIndex {
        match self {
            NodeRef::Primary(idx)
            | NodeRef::Secondary(idx)
            | NodeRef::Super(idx)
            | NodeRef::Combined(idx) => *idx,
        }
    }
}

/// One live view of the diff
#[derive(Debug)]
pub struct ViewGraph {
    kind: ViewKind,
    graph: StableDiGraph<ViewNode, ViewEdge>,
}

impl ViewGraph {
    pub fn new(kind: ViewKind) -> Self {
        Self {
            kind,
            graph: StableDiGraph::new(),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn add_node(&mut self, node: ViewNode) -> NodeIndex {
        self.graph.add_node(node)
    }

    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, edge: ViewEdge) -> EdgeIndex {
        self.graph.add_edge(source, target, edge)
    }

    pub fn remove_node(&mut self, index: NodeIndex) -> Option<ViewNode> {
        self.graph.remove_node(index)
    }

    pub fn remove_edge(&mut self, index: EdgeIndex) -> Option<ViewEdge> {
        self.graph.remove_edge(index)
    }

    pub fn contains_node(&self, index: NodeIndex) -> bool {
        self.graph.contains_node(index)
    }

    pub fn node(&self, index: NodeIndex) -> Option<&ViewNode> {
        self.graph.node_weight(index)
    }

    pub fn node_mut(&mut self, index: NodeIndex) -> Option<&mut ViewNode> {
        self.graph.node_weight_mut(index)
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&ViewEdge> {
        self.graph.edge_weight(index)
    }

    pub fn edge_mut(&mut self, index: EdgeIndex) -> Option<&mut ViewEdge> {
        self.graph.edge_weight_mut(index)
    }

    pub fn endpoints(&self, index: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.graph.edge_endpoints(index)
    }

    /// Snapshot of all node indices; safe to hold across mutation
    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.graph.node_indices().collect()
    }

    /// Snapshot of all edge indices
    pub fn edge_indices(&self) -> Vec<EdgeIndex> {
        self.graph.edge_indices().collect()
    }

    pub fn neighbors_directed(&self, index: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        self.graph.neighbors_directed(index, direction).collect()
    }

    /// Incident edges in one direction as (edge, far endpoint)
    pub fn edges_directed(
        &self,
        index: NodeIndex,
        direction: Direction,
    ) -> Vec<(EdgeIndex, NodeIndex)> {
        self.graph
            .edges_directed(index, direction)
            .map(|edge| match direction {
                Direction::Outgoing => (edge.id(), edge.target()),
                Direction::Incoming => (edge.id(), edge.source()),
            })
            .collect()
    }

    /// All incident edges, deduplicated (a self-loop appears once)
    pub fn incident_edges(&self, index: NodeIndex) -> Vec<EdgeIndex> {
        let mut seen = ahash::AHashSet::new();
        let mut result = Vec::new();
        for direction in [Direction::Outgoing, Direction::Incoming] {
            for edge in self.graph.edges_directed(index, direction) {
                if seen.insert(edge.id()) {
                    result.push(edge.id());
                }
            }
        }
        result
    }

    pub fn visible_node_indices(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph[*idx].visible)
            .collect()
    }

    /// Indices of all stub nodes
    pub fn stub_indices(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|idx| self.graph[*idx].is_stub())
            .collect()
    }

    /// The stub attached to `owner` in the given direction, if present
    ///
    /// Stubs have no address, so cross-view correspondence finds them
    /// by structural adjacency: the unique degree-1 stub neighbor with
    /// the matching direction.
    pub fn stub_of(&self, owner: NodeIndex, direction: StubDirection) -> Option<NodeIndex> {
        let petgraph_dir = match direction {
            StubDirection::Incoming => Direction::Incoming,
            StubDirection::Outgoing => Direction::Outgoing,
        };
        self.graph
            .neighbors_directed(owner, petgraph_dir)
            .find(|&candidate| match &self.graph[candidate] {
                ViewNode {
                    kind: ViewNodeKind::Stub {
                        owner: stub_owner,
                        direction: stub_dir,
                        ..
                    },
                    ..
                } => *stub_owner == owner && *stub_dir == direction,
                _ => false,
            })
    }

    pub(crate) fn petgraph(&self) -> &StableDiGraph<ViewNode, ViewEdge> {
        &self.graph
    }
}

//! Raw diff model
//!
//! Per-side graphs of functions or basic blocks plus the match table
//! linking the two sides. Supplied by an external importer; everything
//! downstream is derived from this.

use serde::{Deserialize, Serialize};

use super::{Address, Side};

/// Whether a diff covers whole functions (call graph) or the basic
/// blocks of one function pair (flow graph)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GraphScope {
    CallGraph,
    FlowGraph,
}

/// Kind of a structural edge in a raw graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RawEdgeKind {
    Call,
    JumpTrue,
    JumpFalse,
    JumpUnconditional,
    Switch,
}

/// One function or basic block, owned by exactly one side's raw graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawNode {
    pub address: Address,
    pub side: Side,
    pub name: String,
}

impl RawNode {
    pub fn new(address: Address, side: Side, name: impl Into<String>) -> Self {
        Self {
            address,
            side,
            name: name.into(),
        }
    }
}

/// One call or jump edge between two same-side raw nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: Address,
    pub target: Address,
    pub kind: RawEdgeKind,
}

impl RawEdge {
    pub fn new(source: Address, target: Address, kind: RawEdgeKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }
}

/// One side's raw graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraph {
    pub side: Side,
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    /// Entry block address, meaningful for flow graphs
    pub entry: Option<Address>,
}

impl RawGraph {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            nodes: Vec::new(),
            edges: Vec::new(),
            entry: None,
        }
    }

    pub fn push_node(&mut self, address: Address, name: impl Into<String>) -> &mut Self {
        self.nodes.push(RawNode::new(address, self.side, name));
        self
    }

    pub fn push_edge(&mut self, source: Address, target: Address, kind: RawEdgeKind) -> &mut Self {
        self.edges.push(RawEdge::new(source, target, kind));
        self
    }

    pub fn node(&self, address: Address) -> Option<&RawNode> {
        self.nodes.iter().find(|n| n.address == address)
    }
}

/// One entry of the match table keyed by address pairs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub primary: Address,
    pub secondary: Address,
    /// Content differs although the elements are matched
    pub changed: bool,
}

impl MatchRecord {
    pub fn new(primary: Address, secondary: Address) -> Self {
        Self {
            primary,
            secondary,
            changed: false,
        }
    }

    pub fn changed(primary: Address, secondary: Address) -> Self {
        Self {
            primary,
            secondary,
            changed: true,
        }
    }
}

/// A complete raw diff: both side graphs plus the match table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDiff {
    pub scope: GraphScope,
    pub primary: RawGraph,
    pub secondary: RawGraph,
    pub matches: Vec<MatchRecord>,
}

impl RawDiff {
    pub fn new(scope: GraphScope) -> Self {
        Self {
            scope,
            primary: RawGraph::new(Side::Primary),
            secondary: RawGraph::new(Side::Secondary),
            matches: Vec::new(),
        }
    }

    pub fn graph(&self, side: Side) -> &RawGraph {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }
}

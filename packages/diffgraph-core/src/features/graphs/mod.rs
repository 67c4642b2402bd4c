// Live view graphs
//
// The four mutually cross-linked views of one diff, the lookup indices
// over them, and the container that ties them to notifications and the
// match-store port.

mod container;
mod snapshot;
mod view_graph;

pub use container::{DiffStatistics, GraphsContainer, PairEntry};
pub use snapshot::{EdgeSnapshot, NodeSnapshot, ViewSnapshot};
pub use view_graph::{
    edge_state, EdgeLinks, NodeRef, SiblingLinks, StubDirection, ViewEdge, ViewGraph, ViewNode,
    ViewNodeKind,
};

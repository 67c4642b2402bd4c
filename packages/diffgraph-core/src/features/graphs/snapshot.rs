//! Geometry snapshot export
//!
//! What the core pushes to the external canvas layer: a flat,
//! serializable picture of one view's nodes and edges. The canvas owns
//! pixels, zoom and animation; it only needs ids, geometry and visual
//! state.

use serde::{Deserialize, Serialize};

use crate::shared::models::{AddressPair, BorderStyle, MatchState, NodeColor, Point, ViewKind};

use super::container::GraphsContainer;
use super::view_graph::ViewNodeKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u32,
    pub pair: Option<AddressPair>,
    pub label: String,
    pub state: MatchState,
    pub color: NodeColor,
    pub border: BorderStyle,
    pub visible: bool,
    pub selected: bool,
    pub position: Option<Point>,
    pub is_stub: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: u32,
    pub source: u32,
    pub target: u32,
    pub state: MatchState,
    pub visible: bool,
    pub selected: bool,
    pub bends: Vec<Point>,
    pub is_stub: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSnapshot {
    pub view: ViewKind,
    pub nodes: Vec<NodeSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
}

impl GraphsContainer {
    /// Serializable picture of one view for the render layer
    pub fn snapshot(&self, view: ViewKind) -> ViewSnapshot {
        let graph = self.view(view).petgraph();

        let nodes = graph
            .node_indices()
            .map(|index| {
                let node = &graph[index];
                NodeSnapshot {
                    id: index.index() as u32,
                    pair: node.pair(),
                    label: node.label(),
                    state: node.state,
                    color: node.color,
                    border: node.border,
                    visible: node.visible,
                    selected: node.selected,
                    position: node.position,
                    is_stub: matches!(node.kind, ViewNodeKind::Stub { .. }),
                }
            })
            .collect();

        let edges = graph
            .edge_indices()
            .filter_map(|index| {
                let edge = &graph[index];
                let (source, target) = graph.edge_endpoints(index)?;
                Some(EdgeSnapshot {
                    id: index.index() as u32,
                    source: source.index() as u32,
                    target: target.index() as u32,
                    state: edge.state,
                    visible: edge.visible,
                    selected: edge.selected,
                    bends: edge.bends.clone(),
                    is_stub: edge.is_stub,
                })
            })
            .collect();

        ViewSnapshot {
            view,
            nodes,
            edges,
        }
    }
}

//! Layout algorithm port
//!
//! The force-directed/hierarchical algorithms are a black box; the
//! coordinator hands one a flat node/edge list and gets back geometry.
//! Engines must honor the cancellation token at safe points.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::cancel::CancelToken;
use crate::shared::models::Point;

/// Node handed to the engine; `id` is the view graph's stable node index
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutNodeSpec {
    pub id: u32,
    pub width: f32,
    pub height: f32,
}

/// Edge handed to the engine; `id` is the view graph's stable edge index
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutEdgeSpec {
    pub id: u32,
    pub source: u32,
    pub target: u32,
}

/// Visible subgraph to lay out
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayoutInput {
    pub nodes: Vec<LayoutNodeSpec>,
    pub edges: Vec<LayoutEdgeSpec>,
}

/// Geometry produced by an engine, keyed by the input ids
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub positions: AHashMap<u32, Point>,
    pub bends: AHashMap<u32, Vec<Point>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout cancelled")]
    Cancelled,

    #[error("layout engine failed: {0}")]
    Engine(String),
}

/// Pluggable layout algorithm
///
/// `Send + Sync` so the coordinator can run two computations on worker
/// threads in synchronized mode.
pub trait LayoutEngine: Send + Sync {
    fn compute(&self, input: &LayoutInput, cancel: &CancelToken)
        -> Result<LayoutResult, LayoutError>;
}

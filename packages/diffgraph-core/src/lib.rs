/*
 * diffgraph-core - Multi-View Binary Diff Graph Model
 *
 * Feature-First Architecture:
 * - shared/   : Common models (Side, AddressPair, raw diff), ports, events
 * - features/ : Vertical slices (graph_build -> graphs -> match_editor,
 *               proximity, layout, view_sync)
 * - config/   : View configuration with validation
 *
 * Four parallel views of one diff (primary, secondary, super, combined)
 * kept mutually consistent while matches are edited, visibility is
 * proximity-browsed and layouts are computed on worker threads. All
 * graph mutation runs on the control thread; workers exist only for
 * layout computation.
 */

#![allow(clippy::too_many_arguments)] // stub synthesis carries per-side counts
#![allow(clippy::type_complexity)] // snapshot tuples in the coloring pass

/// Shared models and utilities
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Public API Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, DiffViewConfig, LayoutConfig, ProximityConfig};
pub use errors::{DiffGraphError, Result};

pub use shared::cancel::CancelToken;
pub use shared::events::{GraphChange, ListenerId};
pub use shared::models::{
    Address, AddressPair, BorderStyle, DisplayMode, GraphScope, MatchRecord, MatchState,
    NodeColor, Point, RawDiff, RawEdge, RawEdgeKind, RawGraph, RawNode, Side, ViewKind,
};
pub use shared::ports::{
    InMemoryMatchStore, LayoutEdgeSpec, LayoutEngine, LayoutError, LayoutInput, LayoutNodeSpec,
    LayoutResult, MatchStore, MatchStoreError,
};

pub use features::graph_build::build_container;
pub use features::graphs::{
    DiffStatistics, EdgeLinks, EdgeSnapshot, GraphsContainer, NodeRef, NodeSnapshot,
    SiblingLinks, StubDirection, ViewEdge, ViewGraph, ViewNode, ViewNodeKind, ViewSnapshot,
};
pub use features::layout::{
    LayeredLayoutEngine, LayoutCoordinator, LayoutMode, LayoutOutcome, LayoutPhase,
};
pub use features::proximity::{ProximityOutcome, VisibilityDelta};
pub use features::view_sync::SelectionSummary;

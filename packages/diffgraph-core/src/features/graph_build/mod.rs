// Graph builders
//
// Raw diff -> combined raw graph -> four cross-linked view graphs.
// Two passes: nodes first so edge endpoints always resolve, then edges;
// a final idempotent coloring pass assigns visual state.

pub mod coloring;
pub mod combined_raw;
pub mod view_builder;

pub use combined_raw::{build_combined_raw, RawCombinedEdge, RawCombinedGraph, RawCombinedNode};
pub use view_builder::build_container;

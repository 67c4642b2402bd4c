//! Ports to external collaborators
//!
//! The matches database and the layout algorithm live outside this
//! crate; these traits are the seams they plug into.

mod layout_engine;
mod match_store;

pub use layout_engine::{
    LayoutEdgeSpec, LayoutEngine, LayoutError, LayoutInput, LayoutNodeSpec, LayoutResult,
};
pub use match_store::{InMemoryMatchStore, MatchStore, MatchStoreError};

//! Shared models

mod address;
mod raw;
mod side;
mod visual;

pub use address::{Address, AddressPair, Point};
pub use raw::{GraphScope, MatchRecord, RawDiff, RawEdge, RawEdgeKind, RawGraph, RawNode};
pub use side::{DisplayMode, MatchState, Side, ViewKind};
pub use visual::{derive_color, BorderStyle, NodeColor};

//! Core state enums for the diff model
//!
//! Every element in the diff belongs to one side of the comparison, and
//! every merged element is in exactly one match state at all times.

use serde::{Deserialize, Serialize};

/// One of the two binaries being compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    /// The opposite side
    pub fn other(self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }
}

/// Match state of a merged node or edge
///
/// Exactly one of these holds for every super/combined element at all
/// times; it is derived from which side references are present and is
/// never stored independently of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    Matched,
    PrimaryUnmatched,
    SecondaryUnmatched,
}

impl MatchState {
    /// Whether an element in this state carries the given side
    pub fn has_side(self, side: Side) -> bool {
        match (self, side) {
            (MatchState::Matched, _) => true,
            (MatchState::PrimaryUnmatched, Side::Primary) => true,
            (MatchState::SecondaryUnmatched, Side::Secondary) => true,
            _ => false,
        }
    }
}

/// The four live views of one diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Primary,
    Secondary,
    Super,
    Combined,
}

impl ViewKind {
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Primary,
        ViewKind::Secondary,
        ViewKind::Super,
        ViewKind::Combined,
    ];

    /// The side a single view projects, if any
    pub fn side(self) -> Option<Side> {
        match self {
            ViewKind::Primary => Some(Side::Primary),
            ViewKind::Secondary => Some(Side::Secondary),
            ViewKind::Super | ViewKind::Combined => None,
        }
    }
}

/// How selection, visibility and layout propagate between views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayMode {
    /// All four views move together; the super graph is the layout reference
    Synchronized,
    /// Each side is browsed on its own; only the focused graph changes
    Independent,
}

impl Default for DisplayMode {
    fn default() -> Self {
        DisplayMode::Synchronized
    }
}

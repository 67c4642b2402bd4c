//! Visual state derived from match state
//!
//! Colors and borders are a pure function of the element's match state
//! and changed flag, so reapplying the coloring pass is idempotent.

use serde::{Deserialize, Serialize};

use super::MatchState;

/// Fill color class of a node; the canvas layer maps these to pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeColor {
    Matched,
    MatchedChanged,
    PrimaryOnly,
    SecondaryOnly,
    Stub,
}

/// Line border of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorderStyle {
    Normal,
    /// The function's entry block; relative to the whole visible set
    Entry,
}

/// Color implied by a match state and changed flag
pub fn derive_color(state: MatchState, changed: bool) -> NodeColor {
    match state {
        MatchState::Matched if changed => NodeColor::MatchedChanged,
        MatchState::Matched => NodeColor::Matched,
        MatchState::PrimaryUnmatched => NodeColor::PrimaryOnly,
        MatchState::SecondaryUnmatched => NodeColor::SecondaryOnly,
    }
}

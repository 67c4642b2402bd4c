//! Addresses, address pairs and 2D geometry
//!
//! The `(primary address, secondary address)` pair is the unique key for
//! merged nodes; one-sided elements leave the missing side as `None`.

use serde::{Deserialize, Serialize};

use super::{MatchState, Side};

/// Virtual address of a function or basic block in one binary
pub type Address = u64;

/// Key of a merged element: up to one address per side, never both absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressPair {
    pub primary: Option<Address>,
    pub secondary: Option<Address>,
}

impl AddressPair {
    /// Pair for a matched element
    pub fn matched(primary: Address, secondary: Address) -> Self {
        Self {
            primary: Some(primary),
            secondary: Some(secondary),
        }
    }

    /// Pair for a primary-only element
    pub fn primary_only(primary: Address) -> Self {
        Self {
            primary: Some(primary),
            secondary: None,
        }
    }

    /// Pair for a secondary-only element
    pub fn secondary_only(secondary: Address) -> Self {
        Self {
            primary: None,
            secondary: Some(secondary),
        }
    }

    /// Match state implied by which sides are present
    pub fn state(&self) -> MatchState {
        match (self.primary, self.secondary) {
            (Some(_), Some(_)) => MatchState::Matched,
            (Some(_), None) => MatchState::PrimaryUnmatched,
            (None, Some(_)) => MatchState::SecondaryUnmatched,
            (None, None) => unreachable!("address pair with both sides absent"),
        }
    }

    /// The address on the given side, if present
    pub fn address(&self, side: Side) -> Option<Address> {
        match side {
            Side::Primary => self.primary,
            Side::Secondary => self.secondary,
        }
    }

    pub fn has_side(&self, side: Side) -> bool {
        self.address(side).is_some()
    }
}

impl std::fmt::Display for AddressPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.primary, self.secondary) {
            (Some(p), Some(s)) => write!(f, "{p:#x}/{s:#x}"),
            (Some(p), None) => write!(f, "{p:#x}/-"),
            (None, Some(s)) => write!(f, "-/{s:#x}"),
            (None, None) => write!(f, "-/-"),
        }
    }
}

/// Position in layout space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

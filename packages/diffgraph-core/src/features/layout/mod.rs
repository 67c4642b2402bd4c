// Layout coordinator
//
// State machine per invocation: Idle -> Running -> Done | Cancelled |
// Failed. Synchronized mode joins two worker threads before any
// geometry is applied; cancellation is cooperative through the shared
// token.

mod coordinator;
mod engine;

pub use coordinator::{LayoutCoordinator, LayoutMode, LayoutOutcome, LayoutPhase};
pub use engine::LayeredLayoutEngine;

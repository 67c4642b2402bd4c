//! Error types for diffgraph-core
//!
//! Invariant violations are programming errors: the operation that hit
//! one fails fast and does not try to roll graph content back. Layout
//! and match-store problems are recoverable at the operation boundary.

use thiserror::Error;

use crate::config::ConfigError;
use crate::shared::ports::{LayoutError, MatchStoreError};

/// Main error type for diffgraph-core operations
#[derive(Debug, Error)]
pub enum DiffGraphError {
    /// Missing cross-reference, duplicate address-pair key, violated
    /// precondition: a bug, never expected in normal use
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// Layout worker failure or cancellation
    #[error("layout error: {0}")]
    Layout(#[from] LayoutError),

    /// Backing match table rejected an operation
    #[error("match store error: {0}")]
    MatchStore(#[from] MatchStoreError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl DiffGraphError {
    /// Create an invariant-violation error
    pub fn invariant(msg: impl Into<String>) -> Self {
        DiffGraphError::Invariant(msg.into())
    }
}

/// Result type alias for diffgraph operations
pub type Result<T> = std::result::Result<T, DiffGraphError>;

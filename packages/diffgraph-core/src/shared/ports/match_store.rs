//! Backing match table port
//!
//! The on-disk matches database is an external collaborator; the core
//! only needs add/remove and lookup by address.

use thiserror::Error;

use crate::shared::models::{Address, MatchRecord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchStoreError {
    #[error("primary {primary:#x} is already matched to {existing:#x}")]
    PrimaryTaken { primary: Address, existing: Address },

    #[error("secondary {secondary:#x} is already matched to {existing:#x}")]
    SecondaryTaken {
        secondary: Address,
        existing: Address,
    },

    #[error("no match for {primary:#x}/{secondary:#x}")]
    NotFound {
        primary: Address,
        secondary: Address,
    },

    #[error("match store backend error: {0}")]
    Backend(String),
}

/// Match table keyed by address pairs
pub trait MatchStore {
    /// Register a match; re-registering the identical pair is a no-op
    fn add_match(&mut self, record: MatchRecord) -> Result<(), MatchStoreError>;

    fn remove_match(
        &mut self,
        primary: Address,
        secondary: Address,
    ) -> Result<(), MatchStoreError>;

    fn by_primary(&self, primary: Address) -> Option<MatchRecord>;

    fn by_secondary(&self, secondary: Address) -> Option<MatchRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Match table held in memory; the default store for tests and headless use
#[derive(Debug, Default)]
pub struct InMemoryMatchStore {
    by_primary: ahash::AHashMap<Address, MatchRecord>,
    by_secondary: ahash::AHashMap<Address, MatchRecord>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn add_match(&mut self, record: MatchRecord) -> Result<(), MatchStoreError> {
        if let Some(existing) = self.by_primary.get(&record.primary) {
            if existing.secondary == record.secondary {
                return Ok(());
            }
            return Err(MatchStoreError::PrimaryTaken {
                primary: record.primary,
                existing: existing.secondary,
            });
        }
        if let Some(existing) = self.by_secondary.get(&record.secondary) {
            return Err(MatchStoreError::SecondaryTaken {
                secondary: record.secondary,
                existing: existing.primary,
            });
        }
        self.by_primary.insert(record.primary, record);
        self.by_secondary.insert(record.secondary, record);
        Ok(())
    }

    fn remove_match(
        &mut self,
        primary: Address,
        secondary: Address,
    ) -> Result<(), MatchStoreError> {
        match self.by_primary.get(&primary) {
            Some(record) if record.secondary == secondary => {
                self.by_primary.remove(&primary);
                self.by_secondary.remove(&secondary);
                Ok(())
            }
            _ => Err(MatchStoreError::NotFound { primary, secondary }),
        }
    }

    fn by_primary(&self, primary: Address) -> Option<MatchRecord> {
        self.by_primary.get(&primary).copied()
    }

    fn by_secondary(&self, secondary: Address) -> Option<MatchRecord> {
        self.by_secondary.get(&secondary).copied()
    }

    fn len(&self) -> usize {
        self.by_primary.len()
    }
}

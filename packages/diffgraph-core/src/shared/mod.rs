//! Shared models and utilities

pub mod cancel;
pub mod events;
pub mod models;
pub mod ports;

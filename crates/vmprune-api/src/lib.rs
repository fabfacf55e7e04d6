//! # vmprune API
//!
//! vCenter REST adapter for the vmprune core.
//! This crate owns the session with vCenter and implements the core's
//! `InventoryProvider` and `Actuator` traits on top of it.

pub mod client;
pub mod errors;
pub mod inventory;
pub mod models;

// Re-export common types for convenience
pub use client::*;
pub use errors::*;

// Re-export core types that API consumers will need
pub use vmprune_core::{Actuator, InventoryProvider, PlatformError};

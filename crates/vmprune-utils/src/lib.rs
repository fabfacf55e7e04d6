//! # vmprune Utils
//!
//! Formatting and parsing helpers shared by the API adapter and the CLI.

pub mod errors;
pub mod formatters;
pub mod parsers;

// Re-export common types for convenience
pub use errors::*;
pub use formatters::*;
pub use parsers::*;

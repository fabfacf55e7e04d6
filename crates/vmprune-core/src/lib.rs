//! # vmprune Core
//!
//! Retention logic for versioned virtual-machine images.
//!
//! This crate contains the decision logic and the sequencing of destructive
//! platform calls, with the platform itself kept behind traits:
//! - Image matching and version extraction
//! - Version ranking
//! - Keep-count retention with current-artifact exemption
//! - Template conversion and destruction with per-image failure isolation
//!
//! ## Design Principles
//!
//! - **Pure Decisions**: Matching, ranking and selection have no side effects
//! - **Opaque References**: Platform objects are only ever handed back to collaborators
//! - **Run-Scoped**: Everything is built from a fresh inventory snapshot per run
//! - **No Retries**: Failures are recorded and the batch moves on

pub mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod platform;
pub mod ranking;
pub mod reclaim;
pub mod retention;

// Re-export commonly used types
pub use errors::{CleanupError, PlatformError, PlatformResult, Result};
pub use matcher::{match_name, ImageMatcher};
pub use models::{
    HostRef, ImageOutcome, InventoryObject, ManagedImage, ObjectInfo, ObjectRef, PerImageResult,
    ResourcePool, RetentionDecision, RunReport,
};
pub use pipeline::{decide, run, run_with, RunPolicy, RunRequest, DEFAULT_KEEP_COUNT};
pub use platform::{Actuator, InventoryProvider, RunContext};
pub use ranking::{rank, Ranker, VersionRanker};
pub use reclaim::{escape_inventory_name, find_host_pool, reclaim, Reclaimer};
pub use retention::{select, RetentionSelector};

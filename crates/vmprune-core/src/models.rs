use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to a platform object (managed object id such as `vm-42`).
///
/// The core never looks inside; it is only handed back to collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectRef(String);

impl ObjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the unfiltered candidate listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryObject {
    pub name: String,
    pub reference: ObjectRef,
}

impl InventoryObject {
    pub fn new(name: impl Into<String>, reference: ObjectRef) -> Self {
        Self {
            name: name.into(),
            reference,
        }
    }
}

/// Template/VM status of an inventory object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectInfo {
    pub is_template: bool,
}

/// Host an object is registered on. The name drives resource pool lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRef {
    pub reference: ObjectRef,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePool {
    pub inventory_path: String,
    pub reference: ObjectRef,
}

/// An inventory object that belongs to the configured image family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedImage {
    pub name: String,
    pub version: u64,
    pub source_ref: ObjectRef,
}

/// Partition of a ranked image set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionDecision {
    pub to_delete: Vec<ManagedImage>,
    pub to_keep: Vec<ManagedImage>,
}

impl RetentionDecision {
    pub fn delete_names(&self) -> Vec<String> {
        self.to_delete.iter().map(|i| i.name.clone()).collect()
    }

    pub fn keep_names(&self) -> Vec<String> {
        self.to_keep.iter().map(|i| i.name.clone()).collect()
    }
}

/// Outcome of reclaiming a single image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Deleted,
    ConversionFailed { reason: String },
    DeletionFailed { reason: String },
    InfoRetrievalFailed { reason: String },
    SkippedNoPool { reason: String },
}

impl ImageOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, ImageOutcome::Deleted)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ImageOutcome::Deleted => None,
            ImageOutcome::ConversionFailed { reason }
            | ImageOutcome::DeletionFailed { reason }
            | ImageOutcome::InfoRetrievalFailed { reason }
            | ImageOutcome::SkippedNoPool { reason } => Some(reason),
        }
    }
}

impl fmt::Display for ImageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageOutcome::Deleted => write!(f, "deleted"),
            ImageOutcome::ConversionFailed { reason } => write!(f, "conversion failed: {}", reason),
            ImageOutcome::DeletionFailed { reason } => write!(f, "deletion failed: {}", reason),
            ImageOutcome::InfoRetrievalFailed { reason } => {
                write!(f, "info retrieval failed: {}", reason)
            }
            ImageOutcome::SkippedNoPool { reason } => write!(f, "skipped: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerImageResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ImageOutcome,
}

impl PerImageResult {
    pub fn new(name: impl Into<String>, outcome: ImageOutcome) -> Self {
        Self {
            name: name.into(),
            outcome,
        }
    }
}

/// Everything a run decided and did, in the order it happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub pattern: String,
    pub keep_count: usize,
    pub to_delete: Vec<String>,
    pub to_keep: Vec<String>,
    pub results: Vec<PerImageResult>,
}

impl RunReport {
    pub fn deleted_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_deleted()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.deleted_count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }
}

use thiserror::Error;

/// Run-fatal errors raised by the core
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("Invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid image name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Inventory listing failed: {0}")]
    Inventory(#[source] PlatformError),
}

/// Errors reported by the inventory provider and actuator collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Listing failed: {0}")]
    Listing(String),

    #[error("Unable to retrieve object information: {0}")]
    Describe(String),

    #[error("Unable to resolve host: {0}")]
    HostResolution(String),

    #[error("Conversion to virtual machine failed: {0}")]
    Conversion(String),

    #[error("Destroy failed: {0}")]
    Destroy(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, CleanupError>;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

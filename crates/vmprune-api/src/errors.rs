use thiserror::Error;
use vmprune_core::PlatformError;

/// API-specific errors for vmprune-api
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Datacenter error: {0}")]
    Datacenter(String),
}

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Permission denied")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Service unavailable")]
    ServiceUnavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
}

impl ApiError {
    /// Transport-level failures, as opposed to vCenter refusing the operation
    pub fn is_connectivity(&self) -> bool {
        match self {
            ApiError::Request(e) | ApiError::Http(HttpError::Request(e)) => {
                e.is_connect() || e.is_timeout()
            }
            ApiError::Http(HttpError::ServiceUnavailable)
            | ApiError::Http(HttpError::Timeout)
            | ApiError::Http(HttpError::AuthenticationFailed) => true,
            _ => false,
        }
    }

    /// Map into the core taxonomy, using `wrap` for operation-level failures
    pub fn into_platform(self, wrap: fn(String) -> PlatformError) -> PlatformError {
        if self.is_connectivity() {
            PlatformError::Connectivity(self.to_string())
        } else {
            wrap(self.to_string())
        }
    }
}

impl From<ApiError> for PlatformError {
    fn from(err: ApiError) -> Self {
        err.into_platform(PlatformError::Listing)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_errors_keep_their_kind() {
        let err = ApiError::Http(HttpError::NotFound("vm-42".to_string()));
        assert_eq!(
            err.into_platform(PlatformError::Destroy),
            PlatformError::Destroy("HTTP error: Not found: vm-42".to_string())
        );
    }

    #[test]
    fn test_unavailable_service_is_connectivity() {
        let err = ApiError::Http(HttpError::ServiceUnavailable);
        assert!(matches!(
            err.into_platform(PlatformError::Describe),
            PlatformError::Connectivity(_)
        ));

        let listing: PlatformError = ApiError::Datacenter("none".to_string()).into();
        assert!(matches!(listing, PlatformError::Listing(_)));
    }
}

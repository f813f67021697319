//! CDN error types.

use thiserror::Error;

/// CDN operation errors.
#[derive(Debug, Error)]
pub enum CdnError {
    #[error("distribution not found: {0}")]
    DistributionNotFound(String),

    #[error("invalid invalidation request: {0}")]
    InvalidRequest(String),

    #[error("CloudFront error: {0}")]
    CloudFront(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for CDN operations.
pub type CdnResult<T> = std::result::Result<T, CdnError>;

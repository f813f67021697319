//! Pipeline error types.
//!
//! Each stage has its own error type; [`DeployError`] unifies them for the
//! orchestrator and classifies them into a [`FailureKind`].

use edgepush_core::{ExtractError, FailureKind, RequestError};
use thiserror::Error;

/// Distribution resolution failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no CDN distribution serves domain {0}")]
    DistributionNotFound(String),

    /// The domain is served, but not from the requested bucket.
    #[error("distribution serving {domain} does not use bucket {bucket} as its origin")]
    OriginMismatch { domain: String, bucket: String },

    #[error("CDN backend failure: {0}")]
    BackendFailure(String),
}

/// Bucket synchronization failure. Only the clear phase is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("failed to clear bucket {bucket}: {detail}")]
    ClearFailed { bucket: String, detail: String },
}

/// Any error that aborts a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("deployment cancelled before the bucket was modified")]
    Cancelled,

    #[error("extraction task failed: {0}")]
    Extraction(String),
}

impl DeployError {
    /// Classify this error for reporting.
    pub fn kind(&self) -> FailureKind {
        match self {
            DeployError::Request(_) | DeployError::Extract(_) => FailureKind::ClientInput,
            DeployError::Resolve(ResolveError::DistributionNotFound(_)) => {
                FailureKind::DistributionNotFound
            }
            DeployError::Resolve(ResolveError::OriginMismatch { .. }) => FailureKind::OriginMismatch,
            DeployError::Resolve(ResolveError::BackendFailure(_))
            | DeployError::Sync(_)
            | DeployError::Extraction(_) => FailureKind::Backend,
            DeployError::Cancelled => FailureKind::Cancelled,
        }
    }
}

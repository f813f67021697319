//! CDN trait definitions.

use crate::error::CdnResult;
use async_trait::async_trait;
use edgepush_core::Distribution;

/// Path pattern that covers every object behind a distribution.
pub const INVALIDATE_ALL: &str = "/*";

/// CDN control plane: distribution discovery and cache invalidation.
///
/// Clients are shared across requests and must be safe for concurrent use.
#[async_trait]
pub trait CdnClient: Send + Sync + 'static {
    /// List every distribution, following backend pagination to the end.
    ///
    /// Order is the backend's listing order and is preserved.
    async fn list_distributions(&self) -> CdnResult<Vec<Distribution>>;

    /// Request invalidation of `paths` and return the invalidation id.
    ///
    /// `caller_reference` must be unique per distinct request; the backend
    /// treats a repeated reference as a retry of the earlier request.
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> CdnResult<String>;

    /// Static backend identifier used in logs and metrics.
    fn backend_name(&self) -> &'static str;
}

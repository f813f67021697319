//! Cache invalidation.

use crate::deadline;
use edgepush_cdn::{CdnClient, INVALIDATE_ALL};
use edgepush_core::InvalidationOutcome;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

/// Purges every cached path of a distribution.
pub struct CacheInvalidator {
    cdn: Arc<dyn CdnClient>,
    timeout: Duration,
}

impl CacheInvalidator {
    pub fn new(cdn: Arc<dyn CdnClient>, timeout: Duration) -> Self {
        Self { cdn, timeout }
    }

    /// Invalidate `/*` on `distribution_id`. Never fails; backend errors are
    /// captured in the outcome.
    #[instrument(skip(self), fields(backend = self.cdn.backend_name()))]
    pub async fn invalidate(&self, distribution_id: &str) -> InvalidationOutcome {
        let caller_reference = Uuid::new_v4().to_string();
        let paths = [INVALIDATE_ALL.to_string()];

        let request = self
            .cdn
            .create_invalidation(distribution_id, &paths, &caller_reference);
        match deadline::within(self.timeout, request).await {
            Ok(invalidation_id) => {
                tracing::info!(distribution_id, invalidation_id = %invalidation_id, "Cache invalidation created");
                InvalidationOutcome::success(invalidation_id)
            }
            Err(detail) => {
                tracing::warn!(distribution_id, error = %detail, "Cache invalidation failed");
                InvalidationOutcome::failure(detail)
            }
        }
    }
}

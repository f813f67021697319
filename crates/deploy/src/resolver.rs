//! Domain to distribution resolution.

use crate::deadline;
use crate::error::ResolveError;
use edgepush_cdn::CdnClient;
use edgepush_core::Distribution;
use edgepush_core::distribution::bucket_origin_host;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Maps a public domain to the distribution serving it, verifying that the
/// distribution fronts the target bucket.
pub struct DistributionResolver {
    cdn: Arc<dyn CdnClient>,
    storage_host: String,
    timeout: Duration,
}

impl DistributionResolver {
    /// `storage_host` is the object store host without the bucket label,
    /// e.g. `s3.ap-south-1.amazonaws.com`.
    pub fn new(cdn: Arc<dyn CdnClient>, storage_host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            cdn,
            storage_host: storage_host.into(),
            timeout,
        }
    }

    /// Resolve `domain` to a distribution id.
    ///
    /// The first distribution aliasing `domain` is selected; it must have an
    /// origin at `{bucket}.{storage_host}`.
    #[instrument(skip(self), fields(backend = self.cdn.backend_name()))]
    pub async fn resolve(&self, domain: &str, bucket: &str) -> Result<String, ResolveError> {
        let distributions = self.distributions().await?;

        let Some(distribution) = distributions.iter().find(|d| d.serves(domain)) else {
            return Err(ResolveError::DistributionNotFound(domain.to_string()));
        };

        let expected = bucket_origin_host(bucket, &self.storage_host);
        if !distribution.has_origin(&expected) {
            tracing::warn!(
                distribution_id = %distribution.id,
                expected_origin = %expected,
                origins = ?distribution.origin_hosts,
                "Distribution alias matched but origin does not"
            );
            return Err(ResolveError::OriginMismatch {
                domain: domain.to_string(),
                bucket: bucket.to_string(),
            });
        }

        tracing::debug!(distribution_id = %distribution.id, "Resolved distribution");
        Ok(distribution.id.clone())
    }

    /// Every alias of every distribution, in backend order.
    pub async fn list_alias_domains(&self) -> Result<Vec<String>, ResolveError> {
        let distributions = self.distributions().await?;
        Ok(distributions
            .into_iter()
            .flat_map(|distribution| distribution.aliases)
            .collect())
    }

    async fn distributions(&self) -> Result<Vec<Distribution>, ResolveError> {
        deadline::within(self.timeout, self.cdn.list_distributions())
            .await
            .map_err(ResolveError::BackendFailure)
    }
}

//! CloudFront backend using AWS SDK.

use crate::error::{CdnError, CdnResult};
use crate::traits::CdnClient;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::config::Credentials;
use aws_sdk_cloudfront::error::{DisplayErrorContext, SdkError};
use aws_sdk_cloudfront::types::{DistributionSummary, InvalidationBatch, Paths};
use aws_smithy_http_client::Builder as SmithyHttpClientBuilder;
use edgepush_core::Distribution;
use tracing::instrument;

/// CloudFront is a global service; requests are signed for us-east-1.
const DEFAULT_CLOUDFRONT_REGION: &str = "us-east-1";

fn map_cloudfront_error<E>(err: SdkError<E>) -> CdnError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CdnError::CloudFront(DisplayErrorContext(&err).to_string().into())
}

fn to_distribution(summary: &DistributionSummary) -> Distribution {
    let aliases = summary
        .aliases()
        .map(|aliases| aliases.items().to_vec())
        .unwrap_or_default();
    let origin_hosts = summary
        .origins()
        .map(|origins| {
            origins
                .items()
                .iter()
                .map(|origin| origin.domain_name().to_string())
                .collect()
        })
        .unwrap_or_default();

    Distribution {
        id: summary.id().to_string(),
        aliases,
        origin_hosts,
    }
}

/// AWS CloudFront distribution client.
pub struct CloudFrontBackend {
    client: Client,
    region: String,
}

impl std::fmt::Debug for CloudFrontBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudFrontBackend")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl CloudFrontBackend {
    /// Create a new CloudFront client.
    ///
    /// Without explicit credentials the default AWS credential chain is used.
    pub async fn new(
        region: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
    ) -> CdnResult<Self> {
        if access_key_id.is_some() != secret_access_key.is_some() {
            return Err(CdnError::Config(
                "cloudfront config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ));
        }

        let region = region.unwrap_or_else(|| DEFAULT_CLOUDFRONT_REGION.to_string());
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.clone()));

        if let (Some(key_id), Some(secret)) = (access_key_id, secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                key_id,
                secret,
                None,
                None,
                "edgepush-config",
            ));
        }

        if let Some(url) = endpoint {
            if url.to_ascii_lowercase().starts_with("http://") {
                loader = loader.http_client(SmithyHttpClientBuilder::new().build_http());
            }
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;

        Ok(Self {
            client: Client::new(&sdk_config),
            region,
        })
    }
}

#[async_trait]
impl CdnClient for CloudFrontBackend {
    #[instrument(skip(self), fields(backend = "cloudfront"))]
    async fn list_distributions(&self) -> CdnResult<Vec<Distribution>> {
        let mut distributions = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut request = self.client.list_distributions();
            if let Some(marker) = marker.take() {
                request = request.marker(marker);
            }

            let output = request.send().await.map_err(map_cloudfront_error)?;
            let Some(list) = output.distribution_list() else {
                break;
            };

            distributions.extend(list.items().iter().map(to_distribution));

            // NextMarker is only present while the listing is truncated
            match list.next_marker().filter(|m| !m.is_empty()) {
                Some(next) => marker = Some(next.to_string()),
                None => break,
            }
        }

        tracing::debug!(count = distributions.len(), "Listed CloudFront distributions");
        Ok(distributions)
    }

    #[instrument(skip(self, paths), fields(backend = "cloudfront"))]
    async fn create_invalidation(
        &self,
        distribution_id: &str,
        paths: &[String],
        caller_reference: &str,
    ) -> CdnResult<String> {
        if paths.is_empty() {
            return Err(CdnError::InvalidRequest(
                "at least one path is required".to_string(),
            ));
        }

        let paths = Paths::builder()
            .quantity(paths.len() as i32)
            .set_items(Some(paths.to_vec()))
            .build()
            .map_err(|e| CdnError::InvalidRequest(e.to_string()))?;
        let batch = InvalidationBatch::builder()
            .paths(paths)
            .caller_reference(caller_reference)
            .build()
            .map_err(|e| CdnError::InvalidRequest(e.to_string()))?;

        let output = self
            .client
            .create_invalidation()
            .distribution_id(distribution_id)
            .invalidation_batch(batch)
            .send()
            .await
            .map_err(|e| {
                if let SdkError::ServiceError(ref service_err) = e
                    && service_err.raw().status().as_u16() == 404
                {
                    return CdnError::DistributionNotFound(distribution_id.to_string());
                }
                map_cloudfront_error(e)
            })?;

        output
            .invalidation()
            .map(|invalidation| invalidation.id().to_string())
            .ok_or_else(|| {
                CdnError::CloudFront("CloudFront did not return an invalidation id".into())
            })
    }

    fn backend_name(&self) -> &'static str {
        "cloudfront"
    }
}

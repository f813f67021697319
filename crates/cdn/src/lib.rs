//! CDN abstraction and backends for edgepush.
//!
//! This crate provides:
//! - Distribution discovery (ids, alias domains, origin hosts)
//! - Cache invalidation requests
//! - Backends: AWS CloudFront and a static, config-driven CDN

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{
    cloudfront::CloudFrontBackend,
    fixed::{RecordedInvalidation, StaticCdn},
};
pub use error::{CdnError, CdnResult};
pub use traits::{CdnClient, INVALIDATE_ALL};

use edgepush_core::config::CdnConfig;
use std::sync::Arc;

/// Create a CDN client from configuration.
pub async fn from_config(config: &CdnConfig) -> CdnResult<Arc<dyn CdnClient>> {
    config.validate().map_err(CdnError::Config)?;

    match config {
        CdnConfig::Cloudfront {
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let backend = CloudFrontBackend::new(
                region.clone(),
                endpoint.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
            )
            .await?;
            Ok(Arc::new(backend))
        }
        CdnConfig::Static { distributions } => {
            Ok(Arc::new(StaticCdn::new(distributions.clone())))
        }
    }
}

//! Config-driven CDN backend.
//!
//! Serves a fixed distribution list and acknowledges invalidations locally.
//! Pairs with the filesystem storage backend for development setups. Only
//! the most recent invalidations are kept; older ones are forgotten.

use crate::error::{CdnError, CdnResult};
use crate::traits::CdnClient;
use async_trait::async_trait;
use edgepush_core::Distribution;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::instrument;
use uuid::Uuid;

/// Invalidations retained by a [`StaticCdn`] before the oldest is dropped.
pub const MAX_RECORDED_INVALIDATIONS: usize = 1000;

/// An invalidation accepted by [`StaticCdn`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedInvalidation {
    pub id: String,
    pub distribution_id: String,
    pub paths: Vec<String>,
    pub caller_reference: String,
}

/// CDN backend with a fixed set of distributions.
#[derive(Debug, Default)]
pub struct StaticCdn {
    distributions: Vec<Distribution>,
    invalidations: Mutex<VecDeque<RecordedInvalidation>>,
}

impl StaticCdn {
    pub fn new(distributions: Vec<Distribution>) -> Self {
        Self {
            distributions,
            invalidations: Mutex::new(VecDeque::new()),
        }
    }

    /// Recently accepted invalidations, oldest first.
    pub fn invalidations(&self) -> Vec<RecordedInvalidation> {
        self.invalidations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CdnClient for StaticCdn {
    async fn list_distributions(&self) -> CdnResult<Vec<Distribution>> {
        Ok(self.distributions.clone())
    }

    #[instrument(skip(self, paths), fields(backend = "static"))]
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
        if !self.distributions.iter().any(|d| d.id == distribution_id) {
            return Err(CdnError::DistributionNotFound(distribution_id.to_string()));
        }

        let mut invalidations = self
            .invalidations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // A repeated caller reference is a retry of the same request
        if let Some(existing) = invalidations
            .iter()
            .find(|inv| inv.distribution_id == distribution_id && inv.caller_reference == caller_reference)
        {
            return Ok(existing.id.clone());
        }

        let id = format!("I{}", Uuid::new_v4().simple()).to_uppercase();
        if invalidations.len() >= MAX_RECORDED_INVALIDATIONS {
            invalidations.pop_front();
        }
        invalidations.push_back(RecordedInvalidation {
            id: id.clone(),
            distribution_id: distribution_id.to_string(),
            paths: paths.to_vec(),
            caller_reference: caller_reference.to_string(),
        });
        tracing::info!(distribution_id, invalidation_id = %id, "Recorded invalidation");

        Ok(id)
    }

    fn backend_name(&self) -> &'static str {
        "static"
    }
}

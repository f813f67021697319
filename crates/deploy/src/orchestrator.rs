//! Deployment orchestration.
//!
//! A deployment moves through
//! `Validating → Extracting → Resolving → Clearing → Uploading → Invalidating → Done`.
//! Any failure up to and including `Clearing` moves it to `Aborted` and the
//! bucket is left untouched (or, for a clear failure, partially cleared).
//! From `Uploading` on, failures are recorded as outcomes and the pipeline
//! always reaches `Done`.

use crate::error::DeployError;
use crate::invalidator::CacheInvalidator;
use crate::resolver::DistributionResolver;
use crate::synchronizer::BucketSynchronizer;
use edgepush_cdn::CdnClient;
use edgepush_core::config::AppConfig;
use edgepush_core::{
    ArchiveEntry, DeploymentReport, DeploymentRequest, DeploymentStage, ExtractLimits,
    InvalidationOutcome, RootStrip, extract,
};
use edgepush_storage::ObjectStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Tunables for a [`Deployer`].
#[derive(Clone, Debug)]
pub struct DeployerOptions {
    pub limits: ExtractLimits,
    pub root_strip: RootStrip,
    pub upload_concurrency: usize,
    pub delete_batch_size: usize,
    pub backend_timeout: Duration,
    /// Object store host without the bucket label.
    pub storage_host: String,
}

impl DeployerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            limits: config.deploy.extract_limits(),
            root_strip: config.deploy.root_strip,
            upload_concurrency: config.deploy.upload_concurrency,
            delete_batch_size: config.deploy.delete_batch_size,
            backend_timeout: config.deploy.backend_timeout(),
            storage_host: config.storage_host(),
        }
    }
}

impl Default for DeployerOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Stage tracker for one pipeline run.
struct Pipeline {
    stage: DeploymentStage,
}

impl Pipeline {
    fn new() -> Self {
        Self {
            stage: DeploymentStage::Validating,
        }
    }

    fn enter(&mut self, next: DeploymentStage) {
        tracing::debug!(from = %self.stage, to = %next, "Deployment stage transition");
        self.stage = next;
    }
}

/// Runs deployments against injected storage and CDN clients.
///
/// One `Deployer` serves any number of concurrent deployments.
pub struct Deployer {
    resolver: DistributionResolver,
    synchronizer: BucketSynchronizer,
    invalidator: CacheInvalidator,
    limits: ExtractLimits,
    root_strip: RootStrip,
}

impl Deployer {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        cdn: Arc<dyn CdnClient>,
        options: DeployerOptions,
    ) -> Self {
        Self {
            resolver: DistributionResolver::new(
                Arc::clone(&cdn),
                options.storage_host,
                options.backend_timeout,
            ),
            synchronizer: BucketSynchronizer::new(
                storage,
                options.upload_concurrency,
                options.delete_batch_size,
                options.backend_timeout,
            ),
            invalidator: CacheInvalidator::new(cdn, options.backend_timeout),
            limits: options.limits,
            root_strip: options.root_strip,
        }
    }

    pub fn resolver(&self) -> &DistributionResolver {
        &self.resolver
    }

    pub fn limits(&self) -> &ExtractLimits {
        &self.limits
    }

    /// Run one deployment to completion.
    ///
    /// Never fails: every error becomes part of the returned report.
    #[instrument(skip_all, fields(bucket = %request.bucket(), domain = %request.domain()))]
    pub async fn deploy(
        &self,
        request: DeploymentRequest,
        cancel: &CancellationToken,
    ) -> DeploymentReport {
        let started = Instant::now();
        tracing::info!(archive_bytes = request.archive.len(), "Deployment started");

        let mut pipeline = Pipeline::new();
        let report = match self.run(&mut pipeline, &request, cancel).await {
            Ok(report) => report,
            Err(err) => {
                let stage = pipeline.stage;
                pipeline.enter(DeploymentStage::Aborted);
                tracing::warn!(stage = %stage, error = %err, "Deployment aborted");
                DeploymentReport::aborted(stage, err.kind(), err.to_string())
            }
        };

        tracing::info!(
            status = %report.status,
            uploaded = report.succeeded_uploads().count(),
            failed = report.failed_uploads().count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Deployment finished"
        );
        report
    }

    async fn run(
        &self,
        pipeline: &mut Pipeline,
        request: &DeploymentRequest,
        cancel: &CancellationToken,
    ) -> Result<DeploymentReport, DeployError> {
        request.validate(self.limits.max_archive_bytes)?;
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        let bucket = request.bucket();
        let domain = request.domain();

        // Extraction and resolution are independent; both must succeed
        // before the bucket is touched.
        pipeline.enter(DeploymentStage::Extracting);
        let archive = request.archive.clone();
        let limits = self.limits.clone();
        let root_strip = self.root_strip;
        let extraction =
            tokio::task::spawn_blocking(move || extract(&archive, &limits, root_strip));
        let (extracted, resolved) =
            tokio::join!(extraction, self.resolver.resolve(domain, bucket));

        let entries: Vec<ArchiveEntry> =
            extracted.map_err(|e| DeployError::Extraction(e.to_string()))??;

        pipeline.enter(DeploymentStage::Resolving);
        let distribution_id = resolved?;
        tracing::info!(
            files = entries.len(),
            distribution_id = %distribution_id,
            "Archive extracted and distribution resolved"
        );

        pipeline.enter(DeploymentStage::Clearing);
        if cancel.is_cancelled() {
            return Err(DeployError::Cancelled);
        }
        self.synchronizer.clear(bucket).await?;

        pipeline.enter(DeploymentStage::Uploading);
        let upload_outcomes = self
            .synchronizer
            .upload(bucket, Arc::from(entries), cancel)
            .await;

        pipeline.enter(DeploymentStage::Invalidating);
        let invalidation = if cancel.is_cancelled() {
            InvalidationOutcome::failure("invalidation skipped: deployment cancelled")
        } else {
            self.invalidator.invalidate(&distribution_id).await
        };

        pipeline.enter(DeploymentStage::Done);
        Ok(DeploymentReport::completed(upload_outcomes, invalidation))
    }
}

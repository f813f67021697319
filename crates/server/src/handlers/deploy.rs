//! Site deployment endpoint.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use bytes::Bytes;
use edgepush_core::{DeploymentReport, DeploymentRequest, DeploymentResponse, FailureKind};
use std::time::Instant;

/// Multipart field carrying the zip archive.
pub const FILE_FIELD: &str = "file";
/// Multipart field naming the target bucket.
pub const BUCKET_FIELD: &str = "bucket";
/// Multipart field naming the public domain.
pub const DOMAIN_FIELD: &str = "domain";

/// HTTP status for a finished deployment.
///
/// `success` and `partial_error` are 200; an aborted deployment maps its
/// failure kind to a 4xx or 5xx code.
pub fn status_for(report: &DeploymentReport) -> StatusCode {
    match report.abort.as_ref().map(|abort| abort.kind) {
        None => StatusCode::OK,
        Some(FailureKind::ClientInput) => StatusCode::BAD_REQUEST,
        Some(FailureKind::DistributionNotFound) => StatusCode::NOT_FOUND,
        Some(FailureKind::OriginMismatch) => StatusCode::CONFLICT,
        Some(FailureKind::Backend) => StatusCode::BAD_GATEWAY,
        Some(FailureKind::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// POST /uploads - Deploy a zipped site to a bucket and purge its CDN cache.
///
/// Form fields: `file` (zip archive), `bucket`, `domain`. Missing fields are
/// reported by the pipeline as a client-input error.
pub async fn deploy_site(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<DeploymentResponse>)> {
    let mut archive = Bytes::new();
    let mut bucket = String::new();
    let mut domain = String::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(FILE_FIELD) => archive = field.bytes().await?,
            Some(BUCKET_FIELD) => bucket = field.text().await?,
            Some(DOMAIN_FIELD) => domain = field.text().await?,
            other => tracing::debug!(field = ?other, "Ignoring unknown form field"),
        }
    }

    let request = DeploymentRequest::new(archive, bucket, domain);
    let archive_bytes = request.archive.len();
    let deployer = state.deployer.clone();
    let cancel = state.shutdown.child_token();
    let started = Instant::now();

    // Detached so a client disconnect cannot stop a deployment halfway
    // through the bucket replacement.
    let report = tokio::spawn(async move { deployer.deploy(request, &cancel).await })
        .await
        .map_err(|e| ApiError::Internal(format!("deployment task failed: {e}")))?;

    metrics::record_deployment(&report, archive_bytes, started.elapsed());
    Ok((status_for(&report), Json(report.to_response())))
}

//! Prometheus metrics for the edgepush server.
//!
//! The `/metrics` endpoint is unauthenticated. Metrics carry no bucket or
//! domain labels, only aggregate deployment counts and timings; still keep
//! the endpoint off public networks.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use edgepush_core::DeploymentReport;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::sync::{LazyLock, Once};
use std::time::Duration;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static DEPLOYMENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "edgepush_deployments_total",
            "Total number of deployments by final status",
        ),
        &["status"],
    )
    .expect("metric creation failed")
});

pub static FILES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "edgepush_files_uploaded_total",
        "Total number of files uploaded to buckets",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "edgepush_upload_failures_total",
        "Total number of file uploads that failed",
    )
    .expect("metric creation failed")
});

pub static INVALIDATIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "edgepush_invalidations_total",
            "Total number of CDN cache invalidations by result",
        ),
        &["result"],
    )
    .expect("metric creation failed")
});

pub static DEPLOYMENT_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "edgepush_deployment_duration_seconds",
            "Time taken to run a deployment end to end",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .expect("metric creation failed")
});

pub static ARCHIVE_SIZE: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "edgepush_archive_size_bytes",
            "Size of uploaded site archives",
        )
        .buckets(prometheus::exponential_buckets(16_384.0, 4.0, 7).unwrap_or_default()),
    )
    .expect("metric creation failed")
});

/// Guard to ensure metrics are only registered once.
static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the global registry.
///
/// Safe to call more than once; test servers call it per instance.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(DEPLOYMENTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(FILES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_FAILURES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(INVALIDATIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(DEPLOYMENT_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ARCHIVE_SIZE.clone()))
            .expect("metric registration failed");
    });
}

/// Record the outcome of one deployment.
pub fn record_deployment(report: &DeploymentReport, archive_bytes: usize, elapsed: Duration) {
    DEPLOYMENTS
        .with_label_values(&[report.status.as_str()])
        .inc();
    FILES_UPLOADED.inc_by(report.succeeded_uploads().count() as u64);
    UPLOAD_FAILURES.inc_by(report.failed_uploads().count() as u64);
    if let Some(invalidation) = &report.invalidation {
        let result = if invalidation.succeeded {
            "success"
        } else {
            "failure"
        };
        INVALIDATIONS.with_label_values(&[result]).inc();
    }
    DEPLOYMENT_DURATION.observe(elapsed.as_secs_f64());
    ARCHIVE_SIZE.observe(archive_bytes as f64);
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}

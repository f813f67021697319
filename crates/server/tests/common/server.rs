//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use edgepush_cdn::{CdnClient, StaticCdn};
use edgepush_core::Distribution;
use edgepush_core::config::{AppConfig, CdnConfig, StorageConfig};
use edgepush_server::{AppState, create_router};
use edgepush_storage::{FilesystemBackend, ObjectStore};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn default_distributions() -> Vec<Distribution> {
    vec![
        Distribution::new(
            "E1",
            ["www.example.com"],
            ["site.s3.ap-south-1.amazonaws.com"],
        ),
        Distribution::new(
            "E2",
            ["ghost.example.com"],
            ["ghost.s3.ap-south-1.amazonaws.com"],
        ),
    ]
}

/// A test server over filesystem storage and a static CDN.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub storage: Arc<FilesystemBackend>,
    pub cdn: Arc<StaticCdn>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Buckets `site` and `other`; `www.example.com` is served from `site`,
    /// `ghost.example.com` from a bucket that does not exist.
    pub async fn new() -> Self {
        Self::with_config(AppConfig::for_testing()).await
    }

    /// Default buckets and distributions with custom settings.
    pub async fn with_config(config: AppConfig) -> Self {
        Self::build(&["site", "other"], default_distributions(), config).await
    }

    /// No buckets and no distributions.
    pub async fn empty() -> Self {
        Self::build(&[], Vec::new(), AppConfig::for_testing()).await
    }

    async fn build(buckets: &[&str], distributions: Vec<Distribution>, mut config: AppConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("storage");

        let storage = Arc::new(
            FilesystemBackend::new(&storage_path)
                .await
                .expect("Failed to create storage backend"),
        );
        for bucket in buckets {
            storage.create_bucket(bucket).await.expect("Failed to create bucket");
        }
        let cdn = Arc::new(StaticCdn::new(distributions.clone()));

        config.storage = StorageConfig::Filesystem { path: storage_path };
        config.cdn = CdnConfig::Static { distributions };
        config.deploy.storage_host = Some("s3.ap-south-1.amazonaws.com".to_string());

        edgepush_server::metrics::register_metrics();

        let state = AppState::new(
            config,
            storage.clone() as Arc<dyn ObjectStore>,
            cdn.clone() as Arc<dyn CdnClient>,
        );
        let router = create_router(state.clone());

        Self {
            router,
            state,
            storage,
            cdn,
            _temp_dir: temp_dir,
        }
    }

    /// Send a request and decode the JSON response body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    /// POST a multipart body to `/uploads`.
    pub async fn upload(&self, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/uploads")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", super::fixtures::BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

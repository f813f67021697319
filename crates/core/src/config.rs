//! Configuration types shared across crates.

use crate::archive::{ExtractLimits, RootStrip};
use crate::distribution::Distribution;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Region used when the storage configuration does not name one.
pub const DEFAULT_REGION: &str = "ap-south-1";

/// Multipart framing allowance on top of the archive limit.
const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Hard ceiling on objects per delete request imposed by S3.
pub const MAX_DELETE_BATCH_SIZE: usize = 1000;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8004").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Origins allowed by CORS. `"*"` allows any origin.
    #[serde(default = "default_cors_allow_origins")]
    pub cors_allow_origins: Vec<String>,
    /// Maximum HTTP request body size. Must leave room for the archive plus
    /// multipart framing.
    #[serde(default = "default_request_body_limit_bytes")]
    pub request_body_limit_bytes: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8004".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_cors_allow_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_request_body_limit_bytes() -> u64 {
    crate::DEFAULT_MAX_ARCHIVE_BYTES + MULTIPART_OVERHEAD_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            cors_allow_origins: default_cors_allow_origins(),
            request_body_limit_bytes: default_request_body_limit_bytes(),
        }
    }
}

impl ServerConfig {
    /// Whether CORS should allow any origin.
    pub fn cors_allows_any(&self) -> bool {
        self.cors_allow_origins.iter().any(|origin| origin == "*")
    }
}

/// Object storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// S3 or an S3-compatible service.
    S3 {
        /// AWS region (default: ap-south-1).
        region: Option<String>,
        /// Optional endpoint URL (for MinIO, LocalStack, etc.).
        endpoint: Option<String>,
        /// AWS access key ID. Falls back to the default credential chain if not set.
        /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the default credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs. Required for MinIO and some S3-compatible services.
        #[serde(default)]
        force_path_style: bool,
    },
    /// Local filesystem storage. Each bucket is a directory under `path`.
    Filesystem {
        /// Root directory holding one directory per bucket.
        path: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::S3 {
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

impl StorageConfig {
    /// Effective region of the storage service.
    pub fn region(&self) -> &str {
        match self {
            StorageConfig::S3 {
                region: Some(region),
                ..
            } => region,
            _ => DEFAULT_REGION,
        }
    }

    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => validate_credentials("storage", access_key_id, secret_access_key),
            StorageConfig::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    return Err("storage.path must not be empty".to_string());
                }
                Ok(())
            }
        }
    }
}

/// CDN backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CdnConfig {
    /// AWS CloudFront.
    Cloudfront {
        /// Region used for signing. CloudFront is global; defaults to us-east-1.
        region: Option<String>,
        /// Optional endpoint URL (for local emulators).
        endpoint: Option<String>,
        /// AWS access key ID. Falls back to the default credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the default credential chain if not set.
        secret_access_key: Option<String>,
    },
    /// Fixed set of distributions declared in configuration. Invalidations are
    /// acknowledged locally; useful for development against filesystem storage.
    Static {
        #[serde(default)]
        distributions: Vec<Distribution>,
    },
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self::Cloudfront {
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl CdnConfig {
    /// Validate CDN configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CdnConfig::Cloudfront {
                access_key_id,
                secret_access_key,
                ..
            } => validate_credentials("cdn", access_key_id, secret_access_key),
            CdnConfig::Static { distributions } => {
                if let Some(dist) = distributions.iter().find(|d| d.id.is_empty()) {
                    return Err(format!(
                        "cdn distribution with aliases {:?} has an empty id",
                        dist.aliases
                    ));
                }
                Ok(())
            }
        }
    }
}

fn validate_credentials(
    section: &str,
    access_key_id: &Option<String>,
    secret_access_key: &Option<String>,
) -> Result<(), String> {
    match (access_key_id.as_ref(), secret_access_key.as_ref()) {
        (Some(_), Some(_)) | (None, None) => Ok(()),
        _ => Err(format!(
            "{section} config requires both access_key_id and secret_access_key when either is set"
        )),
    }
}

/// Deployment pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Maximum uploaded archive size in bytes (default: 10 MiB).
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
    /// Maximum total decompressed size in bytes (default: 256 MiB).
    #[serde(default = "default_max_extracted_bytes")]
    pub max_extracted_bytes: u64,
    /// Maximum number of archive entries (default: 10000).
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Number of upload workers per deployment (default: 10).
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    /// Keys per delete request while clearing a bucket (default: 1000).
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,
    /// Deadline for each individual backend call in seconds (default: 30).
    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,
    /// How the archive's top-level folder is handled.
    #[serde(default)]
    pub root_strip: RootStrip,
    /// Storage service host used to verify distribution origins.
    /// Defaults to `s3.{region}.amazonaws.com`.
    #[serde(default)]
    pub storage_host: Option<String>,
}

fn default_max_archive_bytes() -> u64 {
    crate::DEFAULT_MAX_ARCHIVE_BYTES
}

fn default_max_extracted_bytes() -> u64 {
    crate::DEFAULT_MAX_EXTRACTED_BYTES
}

fn default_max_entries() -> usize {
    crate::DEFAULT_MAX_ENTRIES
}

fn default_upload_concurrency() -> usize {
    10
}

fn default_delete_batch_size() -> usize {
    MAX_DELETE_BATCH_SIZE
}

fn default_backend_timeout_secs() -> u64 {
    30
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            max_archive_bytes: default_max_archive_bytes(),
            max_extracted_bytes: default_max_extracted_bytes(),
            max_entries: default_max_entries(),
            upload_concurrency: default_upload_concurrency(),
            delete_batch_size: default_delete_batch_size(),
            backend_timeout_secs: default_backend_timeout_secs(),
            root_strip: RootStrip::default(),
            storage_host: None,
        }
    }
}

impl DeployConfig {
    /// Extraction limits derived from this configuration.
    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_archive_bytes: self.max_archive_bytes,
            max_extracted_bytes: self.max_extracted_bytes,
            max_entries: self.max_entries,
        }
    }

    /// Get the per-call backend deadline as a Duration.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    /// Validate deployment configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_archive_bytes == 0 {
            return Err("deploy.max_archive_bytes must be greater than 0".to_string());
        }
        if self.max_extracted_bytes == 0 {
            return Err("deploy.max_extracted_bytes must be greater than 0".to_string());
        }
        if self.max_entries == 0 {
            return Err("deploy.max_entries must be greater than 0".to_string());
        }
        if self.upload_concurrency == 0 {
            return Err("deploy.upload_concurrency must be greater than 0".to_string());
        }
        if self.delete_batch_size == 0 || self.delete_batch_size > MAX_DELETE_BATCH_SIZE {
            return Err(format!(
                "deploy.delete_batch_size must be between 1 and {MAX_DELETE_BATCH_SIZE}, got {}",
                self.delete_batch_size
            ));
        }
        if self.backend_timeout_secs == 0 {
            return Err("deploy.backend_timeout_secs must be greater than 0".to_string());
        }
        if let Some(host) = &self.storage_host
            && host.trim().is_empty()
        {
            return Err("deploy.storage_host must not be empty when set".to_string());
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Object storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// CDN backend configuration.
    #[serde(default)]
    pub cdn: CdnConfig,
    /// Deployment pipeline configuration.
    #[serde(default)]
    pub deploy: DeployConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses filesystem storage and a static CDN with
    /// no distributions.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Filesystem {
                path: PathBuf::from("./data/storage"),
            },
            cdn: CdnConfig::Static {
                distributions: Vec::new(),
            },
            deploy: DeployConfig::default(),
        }
    }

    /// Host that a distribution origin must point at, minus the bucket prefix.
    pub fn storage_host(&self) -> String {
        match &self.deploy.storage_host {
            Some(host) => host.clone(),
            None => format!("s3.{}.amazonaws.com", self.storage.region()),
        }
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.cdn.validate()?;
        self.deploy.validate()?;

        if self.server.request_body_limit_bytes < self.deploy.max_archive_bytes {
            return Err(format!(
                "server.request_body_limit_bytes ({}) must not be smaller than deploy.max_archive_bytes ({})",
                self.server.request_body_limit_bytes, self.deploy.max_archive_bytes
            ));
        }
        Ok(())
    }
}

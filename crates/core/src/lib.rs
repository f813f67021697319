//! Core domain types and shared logic for edgepush.
//!
//! This crate defines the data model used across all other crates:
//! - Deployment requests and their validation
//! - Archive extraction into uploadable entries
//! - CDN distributions as seen by the resolver
//! - Per-file and per-deployment outcomes
//! - Configuration shared by the server and backends

pub mod archive;
pub mod config;
pub mod distribution;
pub mod error;
pub mod report;
pub mod request;

pub use archive::{ArchiveEntry, ExtractLimits, RootStrip, extract};
pub use distribution::Distribution;
pub use error::{ExtractError, RequestError};
pub use report::{
    Abort, CloudfrontStatus, DeploymentReport, DeploymentResponse, DeploymentStage,
    DeploymentStatus, FailureKind, FileError, InvalidationOutcome, UploadOutcome, UploadedFile,
};
pub use request::DeploymentRequest;

/// Default maximum archive size: 10 MiB.
pub const DEFAULT_MAX_ARCHIVE_BYTES: u64 = 10 * 1024 * 1024;

/// Default maximum total size of extracted content: 256 MiB.
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 256 * 1024 * 1024;

/// Default maximum number of entries in one archive.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Content type used when the extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

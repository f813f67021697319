//! Per-file and per-deployment outcomes.
//!
//! The pipeline produces a [`DeploymentReport`]; the transport layer turns
//! it into the wire-level [`DeploymentResponse`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of uploading one archive entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadOutcome {
    pub key: String,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

impl UploadOutcome {
    pub fn success(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            succeeded: true,
            error_detail: None,
        }
    }

    pub fn failure(key: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Result of the cache invalidation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidationOutcome {
    pub invalidation_id: Option<String>,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

impl InvalidationOutcome {
    pub fn success(invalidation_id: impl Into<String>) -> Self {
        Self {
            invalidation_id: Some(invalidation_id.into()),
            succeeded: true,
            error_detail: None,
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            invalidation_id: None,
            succeeded: false,
            error_detail: Some(detail.into()),
        }
    }
}

/// Overall deployment status.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    Success,
    PartialError,
    Error,
}

impl DeploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialError => "partial_error",
            Self::Error => "error",
        }
    }

    /// Status of a pipeline that reached `Done`.
    pub fn from_outcomes(uploads: &[UploadOutcome], invalidation: &InvalidationOutcome) -> Self {
        if invalidation.succeeded && uploads.iter().all(|outcome| outcome.succeeded) {
            Self::Success
        } else {
            Self::PartialError
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline stages. `Aborted` is absorbing and reachable from every stage
/// before `Uploading`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStage {
    Validating,
    Extracting,
    Resolving,
    Clearing,
    Uploading,
    Invalidating,
    Done,
    Aborted,
}

impl DeploymentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Extracting => "extracting",
            Self::Resolving => "resolving",
            Self::Clearing => "clearing",
            Self::Uploading => "uploading",
            Self::Invalidating => "invalidating",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for DeploymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a fatal pipeline error.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Missing or invalid fields, oversized or malformed archive.
    ClientInput,
    /// No distribution serves the requested domain.
    DistributionNotFound,
    /// A distribution serves the domain but does not front the bucket.
    OriginMismatch,
    /// Object store or CDN call failed.
    Backend,
    /// The deployment was cancelled before the bucket was touched.
    Cancelled,
}

/// Where and why a pipeline aborted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Abort {
    /// Stage that was running when the pipeline aborted.
    pub stage: DeploymentStage,
    pub kind: FailureKind,
}

/// Terminal artifact of one deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeploymentReport {
    pub status: DeploymentStatus,
    /// One outcome per entry, in archive order.
    pub upload_outcomes: Vec<UploadOutcome>,
    /// `None` when the pipeline aborted before invalidating.
    pub invalidation: Option<InvalidationOutcome>,
    pub message: String,
    /// Set only when `status` is `Error`.
    pub abort: Option<Abort>,
}

impl DeploymentReport {
    /// Report for a pipeline that reached `Done`.
    pub fn completed(upload_outcomes: Vec<UploadOutcome>, invalidation: InvalidationOutcome) -> Self {
        let status = DeploymentStatus::from_outcomes(&upload_outcomes, &invalidation);
        let total = upload_outcomes.len();
        let failed = upload_outcomes.iter().filter(|o| !o.succeeded).count();

        let message = match (status, invalidation.succeeded) {
            (DeploymentStatus::Success, _) => {
                format!("Deployed {total} files and invalidated the CDN cache")
            }
            (_, true) => format!("Deployment completed with errors: {failed} of {total} uploads failed"),
            (_, false) if failed == 0 => {
                format!("Deployed {total} files but the CDN cache invalidation failed")
            }
            (_, false) => format!(
                "Deployment completed with errors: {failed} of {total} uploads failed and the CDN cache invalidation failed"
            ),
        };

        Self {
            status,
            upload_outcomes,
            invalidation: Some(invalidation),
            message,
            abort: None,
        }
    }

    /// Report for a pipeline that aborted in `stage`.
    pub fn aborted(stage: DeploymentStage, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            status: DeploymentStatus::Error,
            upload_outcomes: Vec::new(),
            invalidation: None,
            message: message.into(),
            abort: Some(Abort { stage, kind }),
        }
    }

    pub fn failed_uploads(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.upload_outcomes.iter().filter(|o| !o.succeeded)
    }

    pub fn succeeded_uploads(&self) -> impl Iterator<Item = &UploadOutcome> {
        self.upload_outcomes.iter().filter(|o| o.succeeded)
    }

    /// Wire representation of this report.
    pub fn to_response(&self) -> DeploymentResponse {
        DeploymentResponse {
            status: self.status,
            message: self.message.clone(),
            uploaded_files: self
                .succeeded_uploads()
                .map(|o| UploadedFile {
                    filename: o.key.clone(),
                    status: "uploaded".to_string(),
                })
                .collect(),
            errors: self
                .failed_uploads()
                .map(|o| FileError {
                    filename: o.key.clone(),
                    error: o.error_detail.clone().unwrap_or_default(),
                })
                .collect(),
            cloudfront_status: self.invalidation.as_ref().map(CloudfrontStatus::from),
            stage: self.abort.as_ref().map(|a| a.stage),
            error_kind: self.abort.as_ref().map(|a| a.kind),
        }
    }
}

/// JSON body returned for a deployment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentResponse {
    pub status: DeploymentStatus,
    pub message: String,
    pub uploaded_files: Vec<UploadedFile>,
    pub errors: Vec<FileError>,
    pub cloudfront_status: Option<CloudfrontStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<DeploymentStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileError {
    pub filename: String,
    pub error: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CloudfrontStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&InvalidationOutcome> for CloudfrontStatus {
    fn from(outcome: &InvalidationOutcome) -> Self {
        if outcome.succeeded {
            Self {
                status: "invalidated".to_string(),
                invalidation_id: outcome.invalidation_id.clone(),
                error: None,
            }
        } else {
            Self {
                status: "error".to_string(),
                invalidation_id: None,
                error: outcome.error_detail.clone(),
            }
        }
    }
}

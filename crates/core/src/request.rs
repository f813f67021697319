//! Deployment requests.

use crate::error::RequestError;
use bytes::Bytes;

/// A parsed deployment request: the archive and where it goes.
#[derive(Clone, Debug)]
pub struct DeploymentRequest {
    pub archive: Bytes,
    pub bucket_name: String,
    pub target_domain: String,
}

impl DeploymentRequest {
    pub fn new(
        archive: impl Into<Bytes>,
        bucket_name: impl Into<String>,
        target_domain: impl Into<String>,
    ) -> Self {
        Self {
            archive: archive.into(),
            bucket_name: bucket_name.into(),
            target_domain: target_domain.into(),
        }
    }

    /// Check required fields and the archive size limit.
    ///
    /// Surrounding whitespace in names is not significant; callers should
    /// use the trimmed values returned by [`bucket`](Self::bucket) and
    /// [`domain`](Self::domain).
    pub fn validate(&self, max_archive_bytes: u64) -> Result<(), RequestError> {
        if self.archive.is_empty() {
            return Err(RequestError::MissingField("file"));
        }
        if self.bucket().is_empty() {
            return Err(RequestError::MissingField("bucket"));
        }
        if self.domain().is_empty() {
            return Err(RequestError::MissingField("domain"));
        }

        let size = self.archive.len() as u64;
        if size > max_archive_bytes {
            return Err(RequestError::ArchiveTooLarge {
                size,
                max: max_archive_bytes,
            });
        }
        Ok(())
    }

    pub fn bucket(&self) -> &str {
        self.bucket_name.trim()
    }

    pub fn domain(&self) -> &str {
        self.target_domain.trim()
    }
}

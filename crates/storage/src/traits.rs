//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// A boxed stream of listing pages.
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = StorageResult<ListingPage>> + Send + 'a>>;

/// Page size constraints for listing operations. S3 caps a page at 1000 keys.
pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 1000;

/// A single page of listing results.
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    /// Object keys in this page.
    pub keys: Vec<String>,
}

/// Options for listing operations.
#[derive(Clone, Debug)]
pub struct ListingOptions {
    /// Number of keys to fetch per page, clamped to
    /// [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`].
    pub page_size: usize,
}

impl ListingOptions {
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Get the normalized page size.
    pub fn normalized_page_size(&self) -> usize {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// An object read back from a bucket.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub data: Bytes,
    /// Content type recorded with the object, if the backend keeps one.
    pub content_type: Option<String>,
}

/// Bucket-addressed object store.
///
/// Implementations must be safe to call concurrently from many upload
/// workers and across requests.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// List the names of all buckets visible to this store.
    async fn list_buckets(&self) -> StorageResult<Vec<String>>;

    /// List every object key in a bucket as a stream of pages.
    ///
    /// The stream follows backend pagination until the listing is exhausted.
    /// A missing bucket yields [`StorageError::BucketNotFound`](crate::StorageError::BucketNotFound).
    fn list_pages<'a>(&'a self, bucket: &str, options: ListingOptions) -> PageStream<'a>;

    /// Delete a batch of objects. Missing keys are not an error.
    ///
    /// Callers keep batches within [`MAX_PAGE_SIZE`] keys.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StorageResult<()>;

    /// Store an object, replacing any existing object under the same key.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Read an object back.
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<StoredObject>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for metrics and logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// Called once during server startup. The default implementation does
    /// nothing, suitable for backends without a remote endpoint.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use edgepush_storage::{
    ListingOptions, ListingPage, ObjectStore, PageStream, StorageError, StorageResult,
    StoredObject,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read-only backend that serves synthetic keys page by page without
/// holding them in memory. Optionally fails after a number of pages.
#[allow(dead_code)]
pub struct MockPagedBackend {
    pub total_keys: usize,
    pub fail_after_pages: Option<usize>,
    pub pages_served: AtomicUsize,
}

#[allow(dead_code)]
impl MockPagedBackend {
    pub fn new(total_keys: usize) -> Arc<Self> {
        Arc::new(Self {
            total_keys,
            fail_after_pages: None,
            pages_served: AtomicUsize::new(0),
        })
    }

    pub fn failing_after(total_keys: usize, pages: usize) -> Arc<Self> {
        Arc::new(Self {
            total_keys,
            fail_after_pages: Some(pages),
            pages_served: AtomicUsize::new(0),
        })
    }

    fn key(i: usize) -> String {
        format!("assets/{:02x}/file-{i:06}.js", i & 0xff)
    }
}

#[async_trait]
impl ObjectStore for MockPagedBackend {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        Ok(vec!["mock".to_string()])
    }

    fn list_pages<'a>(&'a self, _bucket: &str, options: ListingOptions) -> PageStream<'a> {
        let page_size = options.normalized_page_size();
        let stream = async_stream::try_stream! {
            let mut start = 0;
            let mut served = 0;
            while start < self.total_keys {
                if let Some(limit) = self.fail_after_pages
                    && served >= limit
                {
                    Err(StorageError::S3("listing interrupted".into()))?;
                }
                let end = (start + page_size).min(self.total_keys);
                let keys = (start..end).map(Self::key).collect();
                self.pages_served.fetch_add(1, Ordering::SeqCst);
                served += 1;
                yield ListingPage { keys };
                start = end;
            }
        };
        Box::pin(stream)
    }

    async fn delete_objects(&self, _bucket: &str, _keys: &[String]) -> StorageResult<()> {
        Err(StorageError::InvalidKey("mock backend is read-only".to_string()))
    }

    async fn put_object(
        &self,
        _bucket: &str,
        _key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> StorageResult<()> {
        Err(StorageError::InvalidKey("mock backend is read-only".to_string()))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<StoredObject> {
        Err(StorageError::NotFound(format!("{bucket}/{key}")))
    }

    fn backend_name(&self) -> &'static str {
        "mock"
    }
}

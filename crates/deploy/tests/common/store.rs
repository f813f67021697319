use async_trait::async_trait;
use bytes::Bytes;
use edgepush_storage::{
    ListingOptions, ListingPage, ObjectStore, PageStream, StorageError, StorageResult,
    StoredObject,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory object store with call counters and fault injection.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    failing_keys: Mutex<HashSet<String>>,
    pub fail_list: AtomicBool,
    pub fail_delete: AtomicBool,
    put_delay: Mutex<Option<Duration>>,

    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub largest_delete_batch: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store
            .buckets
            .lock()
            .unwrap()
            .insert(bucket.to_string(), BTreeMap::new());
        store
    }

    /// Put objects directly, bypassing counters.
    pub fn seed(&self, bucket: &str, keys: impl IntoIterator<Item = impl Into<String>>) {
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets.entry(bucket.to_string()).or_default();
        for key in keys {
            objects.insert(
                key.into(),
                StoredObject {
                    data: Bytes::from_static(b"stale"),
                    content_type: None,
                },
            );
        }
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.buckets
            .lock()
            .unwrap()
            .get(bucket)
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn fail_key(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }

    pub fn set_put_delay(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = Some(delay);
    }

    pub fn backend_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
            + self.delete_calls.load(Ordering::SeqCst)
            + self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        Ok(self.buckets.lock().unwrap().keys().cloned().collect())
    }

    fn list_pages<'a>(&'a self, bucket: &str, options: ListingOptions) -> PageStream<'a> {
        let bucket = bucket.to_string();
        let page_size = options.normalized_page_size();
        let stream = async_stream::try_stream! {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                Err(StorageError::S3("injected list failure".into()))?;
            }
            let listed: Option<Vec<String>> = self
                .buckets
                .lock()
                .unwrap()
                .get(&bucket)
                .map(|objects| objects.keys().cloned().collect());
            let keys = listed.ok_or_else(|| StorageError::BucketNotFound(bucket.clone()))?;
            for page in keys.chunks(page_size) {
                yield ListingPage { keys: page.to_vec() };
            }
        };
        Box::pin(stream)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.largest_delete_batch
            .fetch_max(keys.len(), Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StorageError::DeleteFailed {
                failed: keys.len(),
                detail: "injected delete failure".to_string(),
            });
        }
        let mut buckets = self.buckets.lock().unwrap();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::BucketNotFound(bucket.to_string()))?;
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = if self.failing_keys.lock().unwrap().contains(key) {
            Err(StorageError::S3(format!("injected put failure for {key}").into()))
        } else {
            let mut buckets = self.buckets.lock().unwrap();
            match buckets.get_mut(bucket) {
                Some(objects) => {
                    objects.insert(
                        key.to_string(),
                        StoredObject {
                            data,
                            content_type: Some(content_type.to_string()),
                        },
                    );
                    Ok(())
                }
                None => Err(StorageError::BucketNotFound(bucket.to_string())),
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<StoredObject> {
        self.object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

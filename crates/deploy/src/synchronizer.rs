//! Full-replace bucket synchronization.
//!
//! Sync runs in two phases. [`BucketSynchronizer::clear`] deletes every
//! existing object and is fatal on failure. [`BucketSynchronizer::upload`]
//! pushes the new entries through a bounded worker pool and records one
//! outcome per entry without ever failing as a whole. There is no rollback:
//! a failed upload after a successful clear leaves the bucket partially
//! populated.

use crate::deadline;
use crate::error::SyncError;
use edgepush_core::{ArchiveEntry, UploadOutcome};
use edgepush_storage::{ListingOptions, ObjectStore};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

const CANCELLED_DETAIL: &str = "deployment cancelled before upload started";

pub struct BucketSynchronizer {
    storage: Arc<dyn ObjectStore>,
    concurrency: usize,
    delete_batch_size: usize,
    timeout: Duration,
}

impl BucketSynchronizer {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        concurrency: usize,
        delete_batch_size: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            storage,
            concurrency: concurrency.max(1),
            delete_batch_size: delete_batch_size.max(1),
            timeout,
        }
    }

    /// Delete every object in `bucket`. Returns the number of deleted keys.
    ///
    /// All pages are listed before the first delete so deletions cannot
    /// disturb the listing.
    #[instrument(skip(self), fields(backend = self.storage.backend_name()))]
    pub async fn clear(&self, bucket: &str) -> Result<usize, SyncError> {
        let clear_failed = |detail: String| SyncError::ClearFailed {
            bucket: bucket.to_string(),
            detail,
        };

        let mut pages = self
            .storage
            .list_pages(bucket, ListingOptions::new(self.delete_batch_size));
        let mut keys = Vec::new();
        while let Some(page) =
            deadline::within(self.timeout, async { pages.next().await.transpose() })
                .await
                .map_err(clear_failed)?
        {
            keys.extend(page.keys);
        }

        for batch in keys.chunks(self.delete_batch_size) {
            deadline::within(self.timeout, self.storage.delete_objects(bucket, batch))
                .await
                .map_err(clear_failed)?;
        }

        tracing::info!(bucket, deleted = keys.len(), "Cleared bucket");
        Ok(keys.len())
    }

    /// Upload every entry, returning outcomes in entry order.
    ///
    /// Once `cancel` fires no new uploads start; uploads already in flight
    /// finish, and entries that never started are recorded as failed.
    #[instrument(skip(self, entries, cancel), fields(backend = self.storage.backend_name(), entries = entries.len()))]
    pub async fn upload(
        &self,
        bucket: &str,
        entries: Arc<[ArchiveEntry]>,
        cancel: &CancellationToken,
    ) -> Vec<UploadOutcome> {
        let total = entries.len();
        let next = Arc::new(AtomicUsize::new(0));
        let mut pool = JoinSet::new();

        for worker in 0..self.concurrency.min(total) {
            let storage = Arc::clone(&self.storage);
            let entries = Arc::clone(&entries);
            let next = Arc::clone(&next);
            let cancel = cancel.clone();
            let bucket = bucket.to_string();
            let timeout = self.timeout;

            pool.spawn(async move {
                let mut finished = Vec::new();
                while !cancel.is_cancelled() {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(entry) = entries.get(index) else {
                        break;
                    };
                    let outcome = upload_entry(storage.as_ref(), &bucket, entry, timeout).await;
                    finished.push((index, outcome));
                }
                tracing::trace!(worker, uploads = finished.len(), "Upload worker done");
                finished
            });
        }

        let mut slots: Vec<Option<UploadOutcome>> = vec![None; total];
        let mut worker_failure: Option<String> = None;
        while let Some(joined) = pool.join_next().await {
            match joined {
                Ok(finished) => {
                    for (index, outcome) in finished {
                        slots[index] = Some(outcome);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Upload worker failed");
                    worker_failure = Some(format!("upload worker failed: {e}"));
                }
            }
        }

        let missing_detail = worker_failure.as_deref().unwrap_or(CANCELLED_DETAIL);
        let outcomes: Vec<UploadOutcome> = slots
            .into_iter()
            .zip(entries.iter())
            .map(|(slot, entry)| {
                slot.unwrap_or_else(|| UploadOutcome::failure(entry.key(), missing_detail))
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.succeeded).count();
        tracing::info!(bucket, uploaded = total - failed, failed, "Upload phase finished");
        outcomes
    }
}

async fn upload_entry(
    storage: &dyn ObjectStore,
    bucket: &str,
    entry: &ArchiveEntry,
    timeout: Duration,
) -> UploadOutcome {
    let put = storage.put_object(
        bucket,
        entry.key(),
        entry.content.clone(),
        &entry.content_type,
    );
    match deadline::within(timeout, put).await {
        Ok(()) => {
            tracing::debug!(key = %entry.key(), size = entry.content.len(), "Uploaded");
            UploadOutcome::success(entry.key())
        }
        Err(detail) => {
            tracing::warn!(key = %entry.key(), error = %detail, "Upload failed");
            UploadOutcome::failure(entry.key(), detail)
        }
    }
}

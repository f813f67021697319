//! Local filesystem storage backend.
//!
//! Each bucket is a directory directly under the storage root and object keys
//! are relative paths inside it.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ListingOptions, ListingPage, ObjectStore, PageStream, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Marker embedded in in-flight temp file names; such files are never listed.
const TEMP_MARKER: &str = ".edgepush-tmp.";

/// Local filesystem object store.
#[derive(Debug)]
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Create a bucket directory. Existing buckets are left untouched.
    pub async fn create_bucket(&self, bucket: &str) -> StorageResult<()> {
        let path = self.bucket_dir(bucket)?;
        fs::create_dir_all(&path).await?;
        Ok(())
    }

    fn bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        let valid = !bucket.is_empty()
            && !bucket.starts_with('.')
            && bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidBucket(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    /// Resolve the directory of an existing bucket.
    async fn existing_bucket_dir(&self, bucket: &str) -> StorageResult<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            Ok(_) => Err(StorageError::BucketNotFound(bucket.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::BucketNotFound(bucket.to_string()))
            }
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    /// Path of `key` inside `bucket`, with traversal protection.
    ///
    /// Runs on the blocking pool since it canonicalizes and stats paths.
    async fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        let bucket_dir = self.existing_bucket_dir(bucket).await?;
        let key = key.to_string();
        tokio::task::spawn_blocking(move || resolve_within(&bucket_dir, &key))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }
}

/// Join `key` onto `root`, refusing anything that would land outside `root`.
///
/// Symlinks are followed for the target (if it exists) or its nearest
/// existing ancestor, and the canonical result must stay under `root`.
fn resolve_within(root: &Path, key: &str) -> StorageResult<PathBuf> {
    if key.is_empty() || key.contains(TEMP_MARKER) {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    if Path::new(key)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
        || key.contains('\\')
    {
        return Err(StorageError::InvalidKey(format!(
            "contains unsafe path component: {key}"
        )));
    }

    let root_canonical = root.canonicalize()?;
    let path = root.join(key);

    let mut probe = Some(path.as_path());
    while let Some(candidate) = probe {
        match std::fs::symlink_metadata(candidate) {
            Ok(_) => {
                let canonical = candidate.canonicalize().map_err(|_| {
                    StorageError::InvalidKey(format!("dangling symlink in path: {key}"))
                })?;
                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {key}"
                    )));
                }
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                probe = candidate.parent();
            }
            Err(e) => return Err(StorageError::Io(e)),
        }
    }

    Ok(path)
}

/// Write `data` to `temp_path`, then move it over `path`.
async fn write_then_rename(temp_path: &Path, path: &Path, data: &[u8]) -> StorageResult<()> {
    {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
    }
    // An empty directory left at the key by an earlier layout is replaced
    if let Ok(meta) = fs::symlink_metadata(path).await
        && meta.is_dir()
    {
        let _ = fs::remove_dir(path).await;
    }
    fs::rename(temp_path, path).await?;
    Ok(())
}

/// Remove now-empty directories between a deleted object and its bucket.
///
/// Stops at the first directory that is not empty or cannot be removed.
async fn prune_empty_dirs(bucket_dir: &Path, object: &Path) {
    let mut current = object.parent();
    while let Some(dir) = current {
        if dir == bucket_dir || !dir.starts_with(bucket_dir) {
            break;
        }
        if fs::remove_dir(dir).await.is_err() {
            break;
        }
        current = dir.parent();
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list_buckets(&self) -> StorageResult<Vec<String>> {
        let mut buckets = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir()
                && let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                buckets.push(name.to_string());
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    fn list_pages<'a>(&'a self, bucket: &str, options: ListingOptions) -> PageStream<'a> {
        let bucket = bucket.to_string();
        let page_size = options.normalized_page_size();

        let stream = async_stream::try_stream! {
            let base = self.existing_bucket_dir(&bucket).await?;
            let mut stack = vec![base.clone()];
            let mut current = Vec::with_capacity(page_size);

            while let Some(dir) = stack.pop() {
                let mut entries = fs::read_dir(&dir).await?;
                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    // file_type() does not follow symlinks; links are never listed
                    let file_type = entry.file_type().await?;
                    if file_type.is_dir() {
                        stack.push(path);
                    } else if file_type.is_file()
                        && let Ok(rel) = path.strip_prefix(&base)
                    {
                        let key = rel.to_string_lossy().replace('\\', "/");
                        if key.contains(TEMP_MARKER) {
                            continue;
                        }
                        current.push(key);
                        if current.len() >= page_size {
                            yield ListingPage {
                                keys: std::mem::replace(&mut current, Vec::with_capacity(page_size)),
                            };
                        }
                    }
                }
            }

            if !current.is_empty() {
                yield ListingPage { keys: current };
            }
        };

        Box::pin(stream)
    }

    #[instrument(skip(self, keys), fields(backend = "filesystem", count = keys.len()))]
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> StorageResult<()> {
        let bucket_dir = self.bucket_dir(bucket)?;
        let mut failures = Vec::new();
        for key in keys {
            let result = match self.object_path(bucket, key).await {
                Ok(path) => match fs::remove_file(&path).await {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.to_string()),
                    _ => {
                        prune_empty_dirs(&bucket_dir, &path).await;
                        Ok(())
                    }
                },
                Err(e) => Err(e.to_string()),
            };
            if let Err(detail) = result {
                failures.push(format!("{key}: {detail}"));
            }
        }

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(StorageError::DeleteFailed {
                failed: failures.len(),
                detail: first.clone(),
            }),
        }
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<()> {
        let path = self.object_path(bucket, key).await?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Unique temp name so concurrent writers of one key never share a file
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = path.with_file_name(format!("{file_name}{TEMP_MARKER}{}", Uuid::new_v4()));
        let written = write_then_rename(&temp_path, &path, &data).await;
        if written.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }
        written
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get_object(&self, bucket: &str, key: &str) -> StorageResult<StoredObject> {
        let path = self.object_path(bucket, key).await?;
        let data = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(format!("{bucket}/{key}"))
            } else {
                StorageError::Io(e)
            }
        })?;

        Ok(StoredObject {
            data: Bytes::from(data),
            content_type: None,
        })
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}

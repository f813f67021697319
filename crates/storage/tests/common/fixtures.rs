use bytes::Bytes;
use edgepush_storage::{ListingOptions, ListingPage, ObjectStore, StorageResult};
use futures::TryStreamExt;

/// Generate deterministic test data using a seeded pseudo-random generator.
/// Same seed produces same output.
#[allow(dead_code)]
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        chunk.copy_from_slice(&bytes[..chunk.len()]);
    }

    Bytes::from(data)
}

/// Collect every key in `bucket` across all listing pages.
#[allow(dead_code)]
pub async fn all_keys<S: ObjectStore + ?Sized>(
    store: &S,
    bucket: &str,
) -> StorageResult<Vec<String>> {
    let pages: Vec<ListingPage> = store
        .list_pages(bucket, ListingOptions::default())
        .try_collect()
        .await?;
    Ok(pages.into_iter().flat_map(|page| page.keys).collect())
}

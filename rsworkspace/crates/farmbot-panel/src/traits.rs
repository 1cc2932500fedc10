use bytes::Bytes;
use std::future::Future;

/// Key/value storage for the published snapshot.
///
/// Only the bot writes; the panel only reads. Kept as one trait since both
/// operations address the same bucket.
pub trait SnapshotStore: Send + Sync + Clone + 'static {
    type Error: std::error::Error + Send + Sync;

    /// `None` when the key was never written, deleted or purged.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send;

    /// Returns the new revision.
    fn put(&self, key: &str, value: Bytes) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

use async_nats::jetstream::{self, kv};
use bytes::Bytes;
use tracing::info;

use crate::error::PanelError;
use crate::traits::SnapshotStore;

/// Open the snapshot bucket, creating it with a single-revision history on
/// first use.
pub async fn get_or_create_snapshot_bucket(
    js: &jetstream::Context,
    bucket: &str,
) -> Result<kv::Store, PanelError> {
    let config = kv::Config {
        bucket: bucket.to_string(),
        history: 1,
        ..Default::default()
    };
    let store = match js.create_key_value(config).await {
        Ok(store) => store,
        Err(_) => js
            .get_key_value(bucket)
            .await
            .map_err(|e| PanelError::ChannelUnavailable(e.to_string()))?,
    };
    info!(bucket, "Snapshot bucket ready");
    Ok(store)
}

impl SnapshotStore for kv::Store {
    type Error = PanelError;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, PanelError> {
        kv::Store::get(self, key)
            .await
            .map_err(|e| PanelError::ChannelUnavailable(e.to_string()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<u64, PanelError> {
        kv::Store::put(self, key, value)
            .await
            .map_err(|e| PanelError::ChannelUnavailable(e.to_string()))
    }
}

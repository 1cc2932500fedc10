//! Reads (panel) and writes (bot) of the shared snapshot key.

use farmbot_types::Snapshot;
use farmbot_types::subjects::{SNAPSHOT_KEY, kv_key};
use tracing::{debug, instrument, warn};

use crate::error::{PanelError, Result};
use crate::traits::SnapshotStore;

/// Single well-known key, last writer wins. The bot is the only writer.
#[derive(Debug, Clone)]
pub struct SnapshotCache<S> {
    store: S,
    key: String,
}

impl<S: SnapshotStore> SnapshotCache<S>
where
    PanelError: From<S::Error>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            key: kv_key(SNAPSHOT_KEY),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// An absent key reads as an empty snapshot; malformed content is a
    /// parse error rather than a partial snapshot.
    #[instrument(name = "snapshot.read", skip(self), fields(key = %self.key))]
    pub async fn read_snapshot(&self) -> Result<Snapshot> {
        let Some(raw) = self.store.get(&self.key).await? else {
            debug!("No snapshot published yet");
            return Ok(Snapshot::default());
        };
        if raw.is_empty() {
            return Ok(Snapshot::default());
        }
        Snapshot::parse(&raw).map_err(|e| {
            warn!(error = %e, "Snapshot is not valid JSON");
            PanelError::parse(SNAPSHOT_KEY, e)
        })
    }

    /// Bot side only.
    #[instrument(name = "snapshot.write", skip(self, snapshot), fields(key = %self.key))]
    pub async fn write(&self, snapshot: &Snapshot) -> Result<u64> {
        let payload = serde_json::to_vec(snapshot).map_err(|e| PanelError::encode(SNAPSHOT_KEY, e))?;
        let revision = self.store.put(&self.key, payload.into()).await?;
        debug!(revision, "Snapshot published");
        Ok(revision)
    }
}

//! In-memory stand-ins for unit and integration tests.
//!
//! Enabled with the `test-support` feature:
//!
//! ```toml
//! [dev-dependencies]
//! farmbot-panel = { path = "...", features = ["test-support"] }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use crate::error::PanelError;
use crate::traits::SnapshotStore;

#[derive(Default)]
struct KvState {
    entries: HashMap<String, (Bytes, u64)>,
    revision: u64,
    unavailable: bool,
}

/// Shared in-memory KV bucket. Clones see the same entries.
#[derive(Clone, Default)]
pub struct MemKvStore {
    state: Arc<Mutex<KvState>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: impl Into<Bytes>) {
        let mut state = self.state.lock().unwrap();
        state.revision += 1;
        let revision = state.revision;
        state.entries.insert(key.to_string(), (value.into(), revision));
    }

    pub fn value(&self, key: &str) -> Option<Bytes> {
        self.state
            .lock()
            .unwrap()
            .entries
            .get(key)
            .map(|(value, _)| value.clone())
    }

    pub fn revision(&self, key: &str) -> Option<u64> {
        self.state.lock().unwrap().entries.get(key).map(|(_, rev)| *rev)
    }

    /// Simulate losing the connection: every call fails until restored.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().unavailable = unavailable;
    }
}

impl SnapshotStore for MemKvStore {
    type Error = PanelError;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, PanelError> {
        let state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(PanelError::ChannelUnavailable("kv: simulated outage".into()));
        }
        Ok(state.entries.get(key).map(|(value, _)| value.clone()))
    }

    async fn put(&self, key: &str, value: Bytes) -> Result<u64, PanelError> {
        let mut state = self.state.lock().unwrap();
        if state.unavailable {
            return Err(PanelError::ChannelUnavailable("kv: simulated outage".into()));
        }
        state.revision += 1;
        let revision = state.revision;
        state.entries.insert(key.to_string(), (value, revision));
        Ok(revision)
    }
}

//! # farmbot-panel
//!
//! Control panel for the farmbot module of a chat bot.
//!
//! Two panel variants share one session state machine ([`PanelController`]):
//!
//! - **local** edits `{base_dir}/config-{user_id}.json` directly
//!   ([`LocalBackend`] over [`ConfigStore`])
//! - **remote** reads the bot's snapshot from a KV bucket ([`SnapshotCache`])
//!   and sends commands on `panel:cmd` ([`CommandChannel`]), waiting for each
//!   result on `panel:resp:{corr}`
//!
//! [`CommandResponder`] is the bot's end of the same protocol: it applies
//! commands to the config file and republishes the snapshot.
//!
//! ## Remote save
//!
//! Edits are grouped (toggles, forest, craft, milk, cactus, chicken house,
//! log categories, general) and each group is one independent command. A
//! group that fails or goes unanswered leaves the session in `error` with
//! its edits reported as unsaved; groups that were applied stay applied.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use farmbot_panel::{AppState, CommandChannel, RemoteBackend, SnapshotCache, router, serve};
//! use farmbot_panel::nats_impls::get_or_create_snapshot_bucket;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let nats = async_nats::connect("nats://localhost:4222").await?;
//! let js = async_nats::jetstream::new(nats.clone());
//! let kv = get_or_create_snapshot_bucket(&js, "panel").await?;
//! let backend = RemoteBackend::new(
//!     CommandChannel::new(nats, Duration::from_secs(5)),
//!     SnapshotCache::new(kv),
//! );
//! serve(router(AppState::new(backend, Some("1".into()))), 8080, async {}).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod channel;
pub mod config;
pub mod controller;
pub mod error;
pub mod nats_impls;
pub mod responder;
pub mod server;
pub mod snapshot;
pub mod store;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use backend::{
    ActionReport, GroupOutcome, GroupReport, LocalBackend, PanelBackend, RemoteBackend,
    RemoteStatus, SessionContext, Variant,
};
pub use channel::{CommandChannel, Outcome, Sent};
pub use config::PanelConfig;
pub use controller::{FieldView, PanelController, PanelState, PanelView, SaveReport};
pub use error::{ErrorBody, PanelError, Result};
pub use responder::CommandResponder;
pub use server::{AppState, HealthStatus, SessionView, router, serve};
pub use snapshot::SnapshotCache;
pub use store::ConfigStore;
pub use traits::SnapshotStore;

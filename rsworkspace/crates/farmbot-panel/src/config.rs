use std::path::PathBuf;
use std::time::Duration;

use farmbot_nats::NatsConfig;
use farmbot_std::env::ReadEnv;
use farmbot_types::subjects::DEFAULT_KV_BUCKET;

const DEFAULT_BASE_DIR: &str = "/root/data";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

/// Configuration for every panel mode.
///
/// Resolved from environment variables:
/// - `HIKKA_DIR`: directory holding `config-{user_id}.json` files (default: `/root/data`)
/// - `PANEL_PORT`: HTTP listening port (default: 8080)
/// - `PANEL_KV_BUCKET`: KV bucket holding the snapshot (default: `panel`)
/// - `PANEL_RESPONSE_TIMEOUT_SECS`: how long to wait for a command result;
///   `0` publishes without waiting (default: 5)
/// - `PANEL_SESSION_IDLE_SECS`: drop panel sessions unused for this long (default: 1800)
/// - `PANEL_USER_ID`: user whose bot the remote panel and the responder serve
/// - Standard `NATS_*` variables for the channel connection (see `farmbot-nats`)
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub base_dir: PathBuf,
    pub port: u16,
    pub kv_bucket: String,
    pub response_timeout: Duration,
    pub session_idle_timeout: Duration,
    pub user_id: Option<String>,
    pub nats: NatsConfig,
}

impl PanelConfig {
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            base_dir: env
                .var("HIKKA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_BASE_DIR)),
            port: env.parsed("PANEL_PORT").unwrap_or(DEFAULT_PORT),
            kv_bucket: env
                .var("PANEL_KV_BUCKET")
                .unwrap_or_else(|_| DEFAULT_KV_BUCKET.to_string()),
            response_timeout: Duration::from_secs(
                env.parsed("PANEL_RESPONSE_TIMEOUT_SECS")
                    .unwrap_or(DEFAULT_RESPONSE_TIMEOUT_SECS),
            ),
            session_idle_timeout: Duration::from_secs(
                env.parsed("PANEL_SESSION_IDLE_SECS")
                    .unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            ),
            user_id: env
                .var("PANEL_USER_ID")
                .ok()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            nats: NatsConfig::from_env(env),
        }
    }
}

//! Commands published by the panel on `panel:cmd`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Config keys are restricted to `[A-Za-z0-9_-]+` so they can be embedded in
/// correlation ids and subjects.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    SetConfig,
    SetConfigBulk,
    Action,
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetConfig => "set_config",
            Self::SetConfigBulk => "set_config_bulk",
            Self::Action => "action",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request nonce: `{session_token}-{counter}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Nonce {
    token: String,
    counter: u64,
}

impl Nonce {
    pub fn new(token: impl Into<String>, counter: u64) -> Self {
        Self {
            token: token.into(),
            counter,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.token, self.counter)
    }
}

/// Hands out nonces for one panel session. The token is random per source
/// and the counter never repeats, so two sources never alias.
#[derive(Debug)]
pub struct NonceSource {
    token: String,
    counter: AtomicU64,
}

impl NonceSource {
    pub fn new() -> Self {
        Self::with_token(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            counter: AtomicU64::new(0),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn next(&self) -> Nonce {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Nonce::new(self.token.clone(), counter)
    }
}

impl Default for NonceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Links a command to its result: `{op}:{key}:{nonce}`.
///
/// The key segment is empty for bulk updates and actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Pure: equal inputs give equal ids.
    pub fn new(op: OpKind, key: &str, nonce: &Nonce) -> Self {
        Self(format!("{}:{}:{}", op.as_str(), key, nonce))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CommandOp {
    SetConfig { key: String, value: Value },
    /// Applied by the bot in one write.
    SetConfigBulk { values: Map<String, Value> },
    Action { name: String },
}

impl CommandOp {
    pub fn set_config(key: impl Into<String>, value: Value) -> Self {
        Self::SetConfig {
            key: key.into(),
            value,
        }
    }

    pub fn set_config_bulk(values: Map<String, Value>) -> Self {
        Self::SetConfigBulk { values }
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::Action { name: name.into() }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Self::SetConfig { .. } => OpKind::SetConfig,
            Self::SetConfigBulk { .. } => OpKind::SetConfigBulk,
            Self::Action { .. } => OpKind::Action,
        }
    }

    /// Key segment of the correlation id.
    pub fn target_key(&self) -> &str {
        match self {
            Self::SetConfig { key, .. } => key,
            Self::SetConfigBulk { .. } | Self::Action { .. } => "",
        }
    }

    /// First key or action name that cannot travel on the channel.
    pub fn invalid_key(&self) -> Option<&str> {
        match self {
            Self::SetConfig { key, .. } => (!is_valid_key(key)).then_some(key.as_str()),
            Self::SetConfigBulk { values } => values
                .keys()
                .find(|k| !is_valid_key(k))
                .map(String::as_str),
            Self::Action { name } => (!is_valid_key(name)).then_some(name.as_str()),
        }
    }
}

/// Wire form: `{"corr": "...", "op": "...", ...op fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub corr: CorrelationId,
    #[serde(flatten)]
    pub op: CommandOp,
}

impl Command {
    pub fn new(op: CommandOp, nonce: &Nonce) -> Self {
        Self {
            corr: CorrelationId::new(op.kind(), op.target_key(), nonce),
            op,
        }
    }
}

//! Results published by the bot on `panel:resp:{corr}`

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::CorrelationId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub corr: CorrelationId,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl CommandResult {
    pub fn ok(corr: CorrelationId) -> Self {
        Self {
            corr,
            ok: true,
            error: None,
            payload: None,
        }
    }

    pub fn ok_with(corr: CorrelationId, payload: Value) -> Self {
        Self {
            payload: Some(payload),
            ..Self::ok(corr)
        }
    }

    pub fn failed(corr: CorrelationId, error: impl Into<String>) -> Self {
        Self {
            corr,
            ok: false,
            error: Some(error.into()),
            payload: None,
        }
    }
}

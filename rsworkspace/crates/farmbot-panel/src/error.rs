//! Error taxonomy for the panel, the channel and the responder.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use farmbot_types::{DocumentError, FieldError};
use serde::Serialize;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, PanelError>;

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("config not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed JSON in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("cannot encode {target} as JSON: {message}")]
    Encode { target: String, message: String },

    #[error("failed to write {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("no response for {corr} in time; the bot may still apply it")]
    Timeout { corr: String },

    #[error("bot rejected {corr}: {error}")]
    Rejected { corr: String, error: String },

    #[error("invalid user id '{0}': use letters, digits, '_' or '-'")]
    InvalidUserId(String),

    #[error("'{0}' cannot be sent on the channel: use letters, digits, '_' or '-'")]
    InvalidKey(String),

    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("actions need a running bot; this panel edits the config file directly")]
    ActionsUnsupported,

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

impl PanelError {
    pub fn parse(source_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: err.to_string(),
        }
    }

    pub fn encode(target: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            target: target.into(),
            message: err.to_string(),
        }
    }

    pub fn document(source_name: impl Into<String>, err: DocumentError) -> Self {
        Self::parse(source_name, err)
    }

    /// Stable machine-readable name, also used in session views.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Parse { .. } => "parse_error",
            Self::Encode { .. } => "encode_error",
            Self::Io { .. } => "io_error",
            Self::ChannelUnavailable(_) => "channel_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Rejected { .. } => "rejected",
            Self::InvalidUserId(_) => "invalid_user_id",
            Self::InvalidKey(_) => "invalid_key",
            Self::Field(_) => "invalid_field",
            Self::UnknownAction(_) => "unknown_action",
            Self::ActionsUnsupported => "actions_unsupported",
            Self::SessionNotFound(_) => "session_not_found",
            Self::InvalidState { .. } => "invalid_state",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } | Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Encode { .. } | Self::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ChannelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Rejected { .. } => StatusCode::BAD_GATEWAY,
            Self::InvalidUserId(_)
            | Self::InvalidKey(_)
            | Self::Field(_)
            | Self::UnknownAction(_) => StatusCode::BAD_REQUEST,
            Self::ActionsUnsupported | Self::InvalidState { .. } => StatusCode::CONFLICT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

impl From<&PanelError> for ErrorBody {
    fn from(err: &PanelError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, kind = self.kind(), "Request failed");
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "Request rejected");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

//! Shared types for the farmbot control panel protocol
//!
//! Everything that crosses the wire between the panel and the bot lives here:
//! the configuration document, the published snapshot, commands and their
//! results, subject names, and the catalog of editable fields and actions.

pub mod actions;
pub mod command;
pub mod document;
pub mod fields;
pub mod result;
pub mod snapshot;
pub mod subjects;

pub use actions::{ACTIONS, ActionSpec, REFRESH_SNAPSHOT, WATER_CACTUS};
pub use command::{Command, CommandOp, CorrelationId, Nonce, NonceSource, OpKind, is_valid_key};
pub use document::{ConfigDocument, DocumentError};
pub use fields::{
    FIELDS, FieldError, FieldGroup, FieldKind, FieldSpec, SelectStorage, resolve_selection,
};
pub use result::CommandResult;
pub use snapshot::{CactusThresholds, Snapshot};

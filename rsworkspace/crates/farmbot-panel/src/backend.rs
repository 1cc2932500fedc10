//! Where a panel session reads its values from and sends its saves to.
//!
//! [`LocalBackend`] edits the config file directly. [`RemoteBackend`] reads
//! the bot's snapshot and sends commands, one per field group with edits.

use std::collections::BTreeMap;
use std::future::Future;

use chrono::{DateTime, Utc};
use farmbot_nats::CommandTransport;
use farmbot_types::actions::{self, ActionSpec};
use farmbot_types::fields::lookup;
use farmbot_types::{
    CommandOp, ConfigDocument, CorrelationId, FieldGroup, NonceSource, Snapshot,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};

use crate::channel::{CommandChannel, Outcome};
use crate::error::{ErrorBody, PanelError, Result};
use crate::snapshot::SnapshotCache;
use crate::store::{ConfigFs, ConfigStore};
use crate::traits::SnapshotStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Local,
    Remote,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
        }
    }
}

/// Per-session identity handed to the backend on every call.
#[derive(Debug)]
pub struct SessionContext {
    pub user_id: String,
    pub nonces: NonceSource,
}

impl SessionContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            nonces: NonceSource::new(),
        }
    }
}

/// Read-only bot status shown by the remote panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteStatus {
    pub chat_id: String,
    pub bot_commands: Vec<String>,
    pub timers: BTreeMap<String, u64>,
    pub published_at: Option<DateTime<Utc>>,
}

impl From<&Snapshot> for RemoteStatus {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            chat_id: snapshot.chat_id_display().to_string(),
            bot_commands: snapshot.bot_commands.clone(),
            timers: snapshot.timers.clone(),
            published_at: snapshot.published_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub document: ConfigDocument,
    pub status: Option<RemoteStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    /// Written to disk or applied by the bot.
    Applied,
    /// Sent without waiting for a result.
    Published,
    Rejected { error: String },
    /// No result in time; the bot may still apply it.
    Unresolved,
    Failed { error: ErrorBody },
}

impl GroupOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Applied | Self::Published)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub group: FieldGroup,
    pub keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corr: Option<CorrelationId>,
    #[serde(flatten)]
    pub outcome: GroupOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub name: String,
    pub idempotent: bool,
    pub corr: CorrelationId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

pub trait PanelBackend: Send + Sync + 'static {
    fn variant(&self) -> Variant;

    fn load(&self, session: &SessionContext) -> impl Future<Output = Result<Loaded>> + Send;

    /// Save `edits` on top of `baseline`; one report per affected group, in
    /// [`FieldGroup::ALL`] order.
    fn save(
        &self,
        session: &SessionContext,
        baseline: &ConfigDocument,
        edits: &Map<String, Value>,
    ) -> impl Future<Output = Vec<GroupReport>> + Send;

    fn action(
        &self,
        session: &SessionContext,
        name: &str,
    ) -> impl Future<Output = Result<ActionReport>> + Send;

    fn actions(&self) -> &'static [ActionSpec] {
        match self.variant() {
            Variant::Local => &[],
            Variant::Remote => actions::ACTIONS,
        }
    }
}

/// Edited keys bucketed by field group, groups in catalog order.
///
/// Keys outside the catalog cannot reach the edit buffer, so they are skipped.
pub fn group_edits(edits: &Map<String, Value>) -> Vec<(FieldGroup, Map<String, Value>)> {
    FieldGroup::ALL
        .iter()
        .filter_map(|group| {
            let values: Map<String, Value> = edits
                .iter()
                .filter(|(key, _)| lookup(key).map(|f| f.group == *group).unwrap_or(false))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (!values.is_empty()).then_some((*group, values))
        })
        .collect()
}

pub struct LocalBackend<F> {
    store: ConfigStore<F>,
}

impl<F> LocalBackend<F> {
    pub fn new(store: ConfigStore<F>) -> Self {
        Self { store }
    }
}

impl<F> PanelBackend for LocalBackend<F>
where
    F: ConfigFs + Send + Sync + 'static,
{
    fn variant(&self) -> Variant {
        Variant::Local
    }

    async fn load(&self, session: &SessionContext) -> Result<Loaded> {
        Ok(Loaded {
            document: self.store.load(&session.user_id)?,
            status: None,
        })
    }

    /// The whole document is rewritten at once, so every group shares one outcome.
    #[instrument(name = "panel.local.save", skip_all, fields(user_id = %session.user_id, edits = edits.len()))]
    async fn save(
        &self,
        session: &SessionContext,
        baseline: &ConfigDocument,
        edits: &Map<String, Value>,
    ) -> Vec<GroupReport> {
        let groups = group_edits(edits);
        if groups.is_empty() {
            return Vec::new();
        }

        let mut doc = baseline.clone();
        doc.merge(edits);
        let outcome = match self.store.save(&session.user_id, &doc) {
            Ok(()) => GroupOutcome::Applied,
            Err(e) => GroupOutcome::Failed {
                error: ErrorBody::from(&e),
            },
        };

        groups
            .into_iter()
            .map(|(group, values)| GroupReport {
                group,
                keys: values.keys().cloned().collect(),
                corr: None,
                outcome: outcome.clone(),
            })
            .collect()
    }

    async fn action(&self, _session: &SessionContext, _name: &str) -> Result<ActionReport> {
        Err(PanelError::ActionsUnsupported)
    }
}

pub struct RemoteBackend<N, S> {
    channel: CommandChannel<N>,
    snapshots: SnapshotCache<S>,
}

impl<N, S> RemoteBackend<N, S> {
    pub fn new(channel: CommandChannel<N>, snapshots: SnapshotCache<S>) -> Self {
        Self { channel, snapshots }
    }
}

/// A group with a single edit goes out as `set_config`, larger groups as one
/// `set_config_bulk`.
fn group_command(values: Map<String, Value>) -> CommandOp {
    if values.len() == 1 {
        if let Some((key, value)) = values.iter().next() {
            return CommandOp::set_config(key.clone(), value.clone());
        }
    }
    CommandOp::set_config_bulk(values)
}

impl<N, S> PanelBackend for RemoteBackend<N, S>
where
    N: CommandTransport,
    S: SnapshotStore,
    PanelError: From<S::Error>,
{
    fn variant(&self) -> Variant {
        Variant::Remote
    }

    async fn load(&self, _session: &SessionContext) -> Result<Loaded> {
        let snapshot = self.snapshots.read_snapshot().await?;
        Ok(Loaded {
            document: snapshot.config_view(),
            status: Some(RemoteStatus::from(&snapshot)),
        })
    }

    /// Groups are independent: a failure in one does not stop the others.
    #[instrument(name = "panel.remote.save", skip_all, fields(edits = edits.len()))]
    async fn save(
        &self,
        session: &SessionContext,
        _baseline: &ConfigDocument,
        edits: &Map<String, Value>,
    ) -> Vec<GroupReport> {
        let mut reports = Vec::new();
        for (group, values) in group_edits(edits) {
            let keys: Vec<String> = values.keys().cloned().collect();
            let report = match self.channel.send(group_command(values), &session.nonces).await {
                Ok(sent) => GroupReport {
                    group,
                    keys,
                    corr: Some(sent.corr),
                    outcome: match sent.outcome {
                        Outcome::Applied { .. } => GroupOutcome::Applied,
                        Outcome::Published => GroupOutcome::Published,
                        Outcome::Rejected { error } => GroupOutcome::Rejected { error },
                        Outcome::Unresolved => GroupOutcome::Unresolved,
                    },
                },
                Err(e) => {
                    warn!(group = group.as_str(), error = %e, "Group not sent");
                    GroupReport {
                        group,
                        keys,
                        corr: None,
                        outcome: GroupOutcome::Failed {
                            error: ErrorBody::from(&e),
                        },
                    }
                }
            };
            reports.push(report);
        }
        reports
    }

    #[instrument(name = "panel.remote.action", skip(self, session))]
    async fn action(&self, session: &SessionContext, name: &str) -> Result<ActionReport> {
        let spec = actions::action(name).ok_or_else(|| PanelError::UnknownAction(name.to_string()))?;
        let sent = self
            .channel
            .send(CommandOp::action(spec.name), &session.nonces)
            .await?;
        info!(corr = %sent.corr, idempotent = spec.idempotent, "Action sent");
        Ok(ActionReport {
            name: spec.name.to_string(),
            idempotent: spec.idempotent,
            corr: sent.corr,
            outcome: sent.outcome,
        })
    }
}

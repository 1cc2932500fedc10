//! Per-session panel state machine.
//!
//! ```text
//! Idle --load--> Loaded --edit--> Editing --save--> Saving --> Loaded | Error
//! ```
//!
//! Edits are validated when entered and buffered until save. Reload goes back
//! to `Loaded` from any state and discards the buffer. A session whose last
//! read failed accepts no edits, saves or actions until a reload succeeds.

use std::sync::Arc;

use farmbot_types::actions::ActionSpec;
use farmbot_types::fields::lookup;
use farmbot_types::{ConfigDocument, FIELDS, FieldGroup, FieldKind, FieldSpec};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::backend::{
    ActionReport, GroupOutcome, GroupReport, PanelBackend, RemoteStatus, SessionContext, Variant,
};
use crate::error::{ErrorBody, PanelError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Idle,
    Loaded,
    Editing,
    Saving,
    Error,
}

impl PanelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loaded => "loaded",
            Self::Editing => "editing",
            Self::Saving => "saving",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldView {
    pub key: &'static str,
    pub group: FieldGroup,
    pub kind: &'static str,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'static [&'static str]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    pub edited: bool,
}

impl FieldView {
    fn new(spec: &'static FieldSpec, doc: &ConfigDocument, edited: bool) -> Self {
        let (min, max) = match spec.kind {
            FieldKind::Integer { min, max, .. } => (Some(min), Some(max)),
            _ => (None, None),
        };
        Self {
            key: spec.key,
            group: spec.group,
            kind: spec.kind_name(),
            value: spec.display_value(doc),
            options: spec.options(),
            selected_index: spec.selected_index(doc),
            min,
            max,
            edited,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelView {
    pub user_id: String,
    pub variant: Variant,
    pub state: PanelState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub fields: Vec<FieldView>,
    pub edits: Map<String, Value>,
    /// Edits from the last save that did not make it, kept for the user.
    pub unsaved: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RemoteStatus>,
    pub actions: &'static [ActionSpec],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveReport {
    pub state: PanelState,
    pub groups: Vec<GroupReport>,
    pub unsaved: Map<String, Value>,
}

fn failure_summary(report: &GroupReport) -> Option<ErrorBody> {
    let corr = || {
        report
            .corr
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_default()
    };
    match &report.outcome {
        GroupOutcome::Applied | GroupOutcome::Published => None,
        GroupOutcome::Failed { error } => Some(error.clone()),
        GroupOutcome::Rejected { error } => Some(ErrorBody::from(&PanelError::Rejected {
            corr: corr(),
            error: error.clone(),
        })),
        GroupOutcome::Unresolved => Some(ErrorBody::from(&PanelError::Timeout { corr: corr() })),
    }
}

pub struct PanelController<B> {
    backend: Arc<B>,
    session: SessionContext,
    state: PanelState,
    baseline: ConfigDocument,
    edits: Map<String, Value>,
    unsaved: Map<String, Value>,
    status: Option<RemoteStatus>,
    error: Option<ErrorBody>,
    /// Whether `baseline` came from the last read. Without it there is
    /// nothing safe to write edits on top of.
    has_baseline: bool,
}

impl<B: PanelBackend> PanelController<B> {
    pub fn new(backend: Arc<B>, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            session: SessionContext::new(user_id),
            state: PanelState::Idle,
            baseline: ConfigDocument::new(),
            edits: Map::new(),
            unsaved: Map::new(),
            status: None,
            error: None,
            has_baseline: false,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn user_id(&self) -> &str {
        &self.session.user_id
    }

    /// Last successfully loaded or saved values.
    pub fn baseline(&self) -> &ConfigDocument {
        &self.baseline
    }

    pub fn edits(&self) -> &Map<String, Value> {
        &self.edits
    }

    pub fn unsaved(&self) -> &Map<String, Value> {
        &self.unsaved
    }

    pub fn error(&self) -> Option<&ErrorBody> {
        self.error.as_ref()
    }

    /// Baseline with the buffered edits on top.
    pub fn current(&self) -> ConfigDocument {
        let mut doc = self.baseline.clone();
        doc.merge(&self.edits);
        doc
    }

    fn invalid(&self, operation: &'static str) -> PanelError {
        PanelError::InvalidState {
            operation,
            state: self.state.as_str(),
        }
    }

    /// Editing needs a baseline from a successful read; a session whose
    /// last read failed must reload first.
    fn editable(&self, operation: &'static str) -> Result<()> {
        if !self.has_baseline || matches!(self.state, PanelState::Idle | PanelState::Saving) {
            return Err(self.invalid(operation));
        }
        Ok(())
    }

    /// `Idle -> Loaded`. A failed read moves to `Error`; use [`reload`](Self::reload) to retry.
    pub async fn load(&mut self) -> Result<()> {
        if self.state != PanelState::Idle {
            return Err(self.invalid("load"));
        }
        self.reload().await
    }

    /// Discard buffered edits and read fresh values. Allowed from any state.
    #[instrument(name = "panel.reload", skip(self), fields(user_id = %self.session.user_id, variant = self.backend.variant().as_str()))]
    pub async fn reload(&mut self) -> Result<()> {
        match self.backend.load(&self.session).await {
            Ok(loaded) => {
                if !self.edits.is_empty() {
                    info!(discarded = self.edits.len(), "Reload discarded buffered edits");
                }
                self.baseline = loaded.document;
                self.status = loaded.status;
                self.edits.clear();
                self.unsaved.clear();
                self.error = None;
                self.has_baseline = true;
                self.state = PanelState::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Load failed");
                self.error = Some(ErrorBody::from(&e));
                self.has_baseline = false;
                self.edits.clear();
                self.state = PanelState::Error;
                Err(e)
            }
        }
    }

    /// Validate and buffer one edit. Returns the value in stored form.
    ///
    /// Setting a field back to its baseline value drops the edit.
    pub fn edit(&mut self, key: &str, value: &Value) -> Result<Value> {
        self.editable("edit")?;
        let spec = lookup(key)?;
        let stored = spec.normalize_edit(value, &self.baseline)?;

        if self.baseline.get(key) == Some(&stored) {
            self.edits.remove(key);
        } else {
            self.edits.insert(key.to_string(), stored.clone());
        }
        debug!(key, edits = self.edits.len(), "Edit buffered");

        self.error = None;
        self.state = if self.edits.is_empty() {
            PanelState::Loaded
        } else {
            PanelState::Editing
        };
        Ok(stored)
    }

    /// Send buffered edits. Groups that were saved join the baseline; the
    /// rest are reported in `unsaved` and the view reverts to the baseline.
    #[instrument(name = "panel.save", skip(self), fields(user_id = %self.session.user_id, edits = self.edits.len()))]
    pub async fn save(&mut self) -> Result<SaveReport> {
        self.editable("save")?;
        if !matches!(self.state, PanelState::Loaded | PanelState::Editing) {
            return Err(self.invalid("save"));
        }
        if self.edits.is_empty() {
            return Ok(SaveReport {
                state: self.state,
                groups: Vec::new(),
                unsaved: Map::new(),
            });
        }

        self.state = PanelState::Saving;
        let edits = std::mem::take(&mut self.edits);
        let groups = self.backend.save(&self.session, &self.baseline, &edits).await;

        let mut unsaved = Map::new();
        for report in &groups {
            for key in &report.keys {
                let Some(value) = edits.get(key) else {
                    continue;
                };
                if report.outcome.is_saved() {
                    self.baseline.set(key.clone(), value.clone());
                } else {
                    unsaved.insert(key.clone(), value.clone());
                }
            }
        }

        self.error = groups.iter().find_map(failure_summary);
        self.state = if self.error.is_none() {
            info!(groups = groups.len(), "Save complete");
            PanelState::Loaded
        } else {
            warn!(unsaved = unsaved.len(), "Save incomplete");
            PanelState::Error
        };
        self.unsaved = unsaved.clone();

        Ok(SaveReport {
            state: self.state,
            groups,
            unsaved,
        })
    }

    /// Trigger a named action. Does not touch buffered edits.
    pub async fn action(&mut self, name: &str) -> Result<ActionReport> {
        self.editable("run an action")?;
        self.backend.action(&self.session, name).await
    }

    pub fn view(&self) -> PanelView {
        let current = self.current();
        PanelView {
            user_id: self.session.user_id.clone(),
            variant: self.backend.variant(),
            state: self.state,
            error: self.error.clone(),
            fields: FIELDS
                .iter()
                .map(|spec| FieldView::new(spec, &current, self.edits.contains_key(spec.key)))
                .collect(),
            edits: self.edits.clone(),
            unsaved: self.unsaved.clone(),
            status: self.status.clone(),
            actions: self.backend.actions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{LocalBackend, RemoteBackend};
    use crate::channel::CommandChannel;
    use crate::mocks::MemKvStore;
    use crate::snapshot::SnapshotCache;
    use crate::store::ConfigStore;
    use bytes::Bytes;
    use farmbot_nats::MockNatsClient;
    use farmbot_std::MemFs;
    use farmbot_types::{Command, CommandOp, CommandResult, subjects};
    use serde_json::json;
    use std::time::Duration;

    const PATH: &str = "/root/data/config-1.json";

    fn local(fs: &MemFs) -> PanelController<LocalBackend<MemFs>> {
        let backend = LocalBackend::new(ConfigStore::new(fs.clone(), "/root/data"));
        PanelController::new(Arc::new(backend), "1")
    }

    /// Bot stand-in: rejects any command touching `reject_key`, answers the rest.
    fn bot(reject_key: &'static str) -> MockNatsClient {
        MockNatsClient::new().with_responder(move |subject, payload| {
            if subject != subjects::COMMAND {
                return Vec::new();
            }
            let cmd: Command = serde_json::from_slice(payload).unwrap();
            let touches = match &cmd.op {
                CommandOp::SetConfig { key, .. } => key == reject_key,
                CommandOp::SetConfigBulk { values } => values.contains_key(reject_key),
                CommandOp::Action { name } => name == reject_key,
            };
            let result = if touches {
                CommandResult::failed(cmd.corr.clone(), "refused")
            } else {
                CommandResult::ok(cmd.corr.clone())
            };
            vec![(
                subjects::response(cmd.corr.as_str()),
                Bytes::from(serde_json::to_vec(&result).unwrap()),
            )]
        })
    }

    fn remote(
        client: MockNatsClient,
        kv: MemKvStore,
        timeout_secs: u64,
    ) -> PanelController<RemoteBackend<MockNatsClient, MemKvStore>> {
        let backend = RemoteBackend::new(
            CommandChannel::new(client, Duration::from_secs(timeout_secs)),
            SnapshotCache::new(kv),
        );
        PanelController::new(Arc::new(backend), "1")
    }

    fn field<'a>(view: &'a PanelView, key: &str) -> &'a FieldView {
        view.fields.iter().find(|f| f.key == key).unwrap()
    }

    #[tokio::test]
    async fn load_moves_idle_to_loaded() {
        let fs = MemFs::new();
        fs.insert(PATH, r#"{"config_bot_auto_forest": true}"#);
        let mut panel = local(&fs);
        assert_eq!(panel.state(), PanelState::Idle);

        panel.load().await.unwrap();

        assert_eq!(panel.state(), PanelState::Loaded);
        assert_eq!(field(&panel.view(), "config_bot_auto_forest").value, json!(true));
        assert!(matches!(
            panel.load().await,
            Err(PanelError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn missing_config_is_an_error_state_with_kind() {
        let mut panel = local(&MemFs::new());

        let err = panel.load().await.unwrap_err();

        assert!(matches!(err, PanelError::NotFound { .. }));
        assert_eq!(panel.state(), PanelState::Error);
        assert_eq!(panel.error().map(|e| e.kind), Some("not_found"));
    }

    #[tokio::test]
    async fn reload_recovers_after_the_file_appears() {
        let fs = MemFs::new();
        let mut panel = local(&fs);
        let _ = panel.load().await;

        fs.insert(PATH, "{}");
        panel.reload().await.unwrap();

        assert_eq!(panel.state(), PanelState::Loaded);
        assert!(panel.error().is_none());
    }

    #[tokio::test]
    async fn edits_are_buffered_until_save() {
        let fs = MemFs::new();
        fs.insert(PATH, r#"{"config_bot_auto_forest": false}"#);
        let mut panel = local(&fs);
        panel.load().await.unwrap();

        panel.edit("config_bot_auto_forest", &json!(true)).unwrap();

        assert_eq!(panel.state(), PanelState::Editing);
        assert_eq!(fs.contents(PATH).as_deref(), Some(r#"{"config_bot_auto_forest": false}"#));
        let view = panel.view();
        let forest = field(&view, "config_bot_auto_forest");
        assert_eq!(forest.value, json!(true));
        assert!(forest.edited);
    }

    #[tokio::test]
    async fn enabling_forest_and_saving_rewrites_only_that_key() {
        let fs = MemFs::new();
        fs.insert(
            PATH,
            r#"{"config_bot_auto_forest": false, "config_user_tz": "Europe/Moscow", "legacy_key": [1]}"#,
        );
        let mut panel = local(&fs);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_forest", &json!(true)).unwrap();

        let report = panel.save().await.unwrap();

        assert_eq!(report.state, PanelState::Loaded);
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.groups[0].outcome, GroupOutcome::Applied);
        let saved = ConfigDocument::parse(&fs.contents(PATH).unwrap()).unwrap();
        assert_eq!(
            saved,
            ConfigDocument::parse(
                r#"{"config_bot_auto_forest": true, "config_user_tz": "Europe/Moscow", "legacy_key": [1]}"#
            )
            .unwrap()
        );
        assert!(panel.edits().is_empty());
    }

    #[tokio::test]
    async fn reverting_an_edit_drops_it() {
        let fs = MemFs::new();
        fs.insert(PATH, r#"{"config_bot_auto_craft_count": "50"}"#);
        let mut panel = local(&fs);
        panel.load().await.unwrap();

        panel.edit("config_bot_auto_craft_count", &json!(60)).unwrap();
        panel.edit("config_bot_auto_craft_count", &json!("50")).unwrap();

        assert!(panel.edits().is_empty());
        assert_eq!(panel.state(), PanelState::Loaded);
    }

    #[tokio::test]
    async fn invalid_edits_are_rejected_and_not_buffered() {
        let fs = MemFs::new();
        fs.insert(PATH, "{}");
        let mut panel = local(&fs);
        panel.load().await.unwrap();

        assert!(matches!(
            panel.edit("config_bot_chicken_house_count", &json!(11)),
            Err(PanelError::Field(_))
        ));
        assert!(matches!(
            panel.edit("config_made_up", &json!(true)),
            Err(PanelError::Field(_))
        ));
        assert!(panel.edits().is_empty());
    }

    #[tokio::test]
    async fn edit_before_load_is_invalid() {
        let mut panel = local(&MemFs::new());
        assert!(matches!(
            panel.edit("config_bot_auto_forest", &json!(true)),
            Err(PanelError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_file_cannot_be_overwritten_by_edits() {
        let fs = MemFs::new();
        let broken = r#"{"config_bot_auto_forest": false, "config_user_tz": "Asia/Tokyo", "precious": [1,2,3],"#;
        fs.insert(PATH, broken);
        let mut panel = local(&fs);

        assert!(matches!(panel.load().await, Err(PanelError::Parse { .. })));
        assert!(matches!(
            panel.edit("config_bot_auto_forest", &json!(true)),
            Err(PanelError::InvalidState { .. })
        ));
        assert!(matches!(panel.save().await, Err(PanelError::InvalidState { .. })));

        assert_eq!(panel.state(), PanelState::Error);
        assert!(panel.edits().is_empty());
        assert_eq!(fs.contents(PATH).as_deref(), Some(broken));
    }

    #[tokio::test]
    async fn unreadable_file_blocks_edits_until_reload_succeeds() {
        let fs = MemFs::new();
        let mut panel = local(&fs);
        let _ = panel.load().await;

        assert!(panel.edit("config_debug_msg", &json!(true)).is_err());

        fs.insert(PATH, r#"{"config_debug_msg": false, "kept": 1}"#);
        panel.reload().await.unwrap();
        panel.edit("config_debug_msg", &json!(true)).unwrap();
        panel.save().await.unwrap();

        let saved = ConfigDocument::parse(&fs.contents(PATH).unwrap()).unwrap();
        assert_eq!(saved.bool("config_debug_msg"), Some(true));
        assert_eq!(saved.get("kept"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn failed_reload_after_load_blocks_edits() {
        let fs = MemFs::new();
        fs.insert(PATH, r#"{"config_bot_auto_eat": false}"#);
        let mut panel = local(&fs);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_eat", &json!(true)).unwrap();

        fs.insert(PATH, "{oops");
        assert!(panel.reload().await.is_err());

        assert!(panel.edits().is_empty());
        assert!(matches!(
            panel.edit("config_bot_auto_eat", &json!(true)),
            Err(PanelError::InvalidState { .. })
        ));
        assert_eq!(fs.contents(PATH).as_deref(), Some("{oops"));
    }

    #[tokio::test]
    async fn failed_local_write_reverts_view_and_reports_edits() {
        let fs = MemFs::new();
        fs.insert(PATH, r#"{"config_bot_auto_milk": false}"#);
        let mut panel = local(&fs);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_milk", &json!(true)).unwrap();
        fs.fail_writes(1);

        let report = panel.save().await.unwrap();

        assert_eq!(report.state, PanelState::Error);
        assert_eq!(report.unsaved.get("config_bot_auto_milk"), Some(&json!(true)));
        assert_eq!(panel.error().map(|e| e.kind), Some("io_error"));
        let view = panel.view();
        assert_eq!(field(&view, "config_bot_auto_milk").value, json!(false));
        assert_eq!(view.unsaved.get("config_bot_auto_milk"), Some(&json!(true)));

        panel.edit("config_bot_auto_milk", &json!(true)).unwrap();
        assert_eq!(panel.save().await.unwrap().state, PanelState::Loaded);
        assert_eq!(
            ConfigDocument::parse(&fs.contents(PATH).unwrap()).unwrap().bool("config_bot_auto_milk"),
            Some(true)
        );
    }

    #[tokio::test]
    async fn empty_snapshot_renders_documented_defaults() {
        let mut panel = remote(bot("none"), MemKvStore::new(), 5);

        panel.load().await.unwrap();

        let view = panel.view();
        assert_eq!(view.status.as_ref().map(|s| s.chat_id.as_str()), Some("-"));
        assert_eq!(field(&view, "config_user_tz").value, json!("UTC"));
        assert_eq!(field(&view, "config_user_tz").selected_index, Some(0));
        assert_eq!(field(&view, "config_bot_auto_cactus").value, json!(true));
        assert_eq!(view.actions.len(), 2);
    }

    #[tokio::test]
    async fn remote_save_sends_one_command_per_group() {
        let client = bot("none");
        let mut panel = remote(client.clone(), MemKvStore::new(), 5);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_milk", &json!(true)).unwrap();
        panel.edit("config_bot_auto_eat", &json!(true)).unwrap();
        panel.edit("config_bot_auto_craft_count", &json!(10)).unwrap();

        let report = panel.save().await.unwrap();

        assert_eq!(report.state, PanelState::Loaded);
        let groups: Vec<FieldGroup> = report.groups.iter().map(|g| g.group).collect();
        assert_eq!(groups, vec![FieldGroup::Toggles, FieldGroup::Craft]);
        let ops: Vec<String> = client
            .published_on(subjects::COMMAND)
            .iter()
            .map(|p| serde_json::from_slice::<Value>(p).unwrap()["op"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ops, vec!["set_config_bulk", "set_config"]);
        assert_eq!(panel.baseline().str("config_bot_auto_craft_count"), Some("10"));
    }

    #[tokio::test]
    async fn partial_failure_keeps_applied_groups_and_reports_the_rest() {
        let mut panel = remote(bot("config_bot_auto_craft_count"), MemKvStore::new(), 5);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_milk", &json!(true)).unwrap();
        panel.edit("config_bot_auto_craft_count", &json!(10)).unwrap();

        let report = panel.save().await.unwrap();

        assert_eq!(report.state, PanelState::Error);
        assert_eq!(report.groups[0].outcome, GroupOutcome::Applied);
        assert!(matches!(report.groups[1].outcome, GroupOutcome::Rejected { .. }));
        assert_eq!(panel.baseline().bool("config_bot_auto_milk"), Some(true));
        assert_eq!(report.unsaved.get("config_bot_auto_craft_count"), Some(&json!("10")));
        assert_eq!(panel.error().map(|e| e.kind), Some("rejected"));
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_group_is_unresolved_not_saved() {
        let mut panel = remote(MockNatsClient::new(), MemKvStore::new(), 5);
        panel.load().await.unwrap();
        panel.edit("config_debug_msg", &json!(true)).unwrap();

        let report = panel.save().await.unwrap();

        assert_eq!(report.groups[0].outcome, GroupOutcome::Unresolved);
        assert_eq!(panel.state(), PanelState::Error);
        assert_eq!(panel.error().map(|e| e.kind), Some("timeout"));
        assert_eq!(panel.unsaved().get("config_debug_msg"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn channel_outage_fails_every_group() {
        let client = bot("none");
        client.fail_publish_count(10);
        let mut panel = remote(client, MemKvStore::new(), 5);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_milk", &json!(true)).unwrap();
        panel.edit("config_user_tz", &json!("Asia/Tokyo")).unwrap();

        let report = panel.save().await.unwrap();

        assert!(report
            .groups
            .iter()
            .all(|g| matches!(g.outcome, GroupOutcome::Failed { .. })));
        assert_eq!(panel.error().map(|e| e.kind), Some("channel_unavailable"));
        assert_eq!(report.unsaved.len(), 2);
    }

    #[tokio::test]
    async fn zero_timeout_saves_as_published() {
        let mut panel = remote(MockNatsClient::new(), MemKvStore::new(), 0);
        panel.load().await.unwrap();
        panel.edit("config_bot_auto_forest", &json!(true)).unwrap();

        let report = panel.save().await.unwrap();

        assert_eq!(report.groups[0].outcome, GroupOutcome::Published);
        assert_eq!(report.state, PanelState::Loaded);
    }

    #[tokio::test]
    async fn actions_report_idempotency() {
        let mut panel = remote(bot("none"), MemKvStore::new(), 5);
        panel.load().await.unwrap();

        let report = panel.action("water_cactus").await.unwrap();

        assert!(!report.idempotent);
        assert!(report.outcome.is_delivered());
        assert!(matches!(
            panel.action("dance").await,
            Err(PanelError::UnknownAction(_))
        ));
    }

    #[tokio::test]
    async fn local_panel_has_no_actions() {
        let fs = MemFs::new();
        fs.insert(PATH, "{}");
        let mut panel = local(&fs);
        panel.load().await.unwrap();

        assert!(panel.view().actions.is_empty());
        assert!(matches!(
            panel.action("water_cactus").await,
            Err(PanelError::ActionsUnsupported)
        ));
    }

    #[tokio::test]
    async fn snapshot_values_populate_the_remote_form() {
        let kv = MemKvStore::new();
        kv.insert(
            "panel.snapshot",
            r#"{"chat_id": "-100", "timers": {"forest": 30}, "flags": {"config_bot_auto_forest": true}, "config": {"config_user_tz": "Asia/Tokyo"}}"#,
        );
        let mut panel = remote(bot("none"), kv, 5);

        panel.load().await.unwrap();

        let view = panel.view();
        let status = view.status.as_ref().unwrap();
        assert_eq!(status.chat_id, "-100");
        assert_eq!(status.timers.get("forest"), Some(&30));
        assert_eq!(field(&view, "config_bot_auto_forest").value, json!(true));
        assert_eq!(field(&view, "config_user_tz").selected_index, Some(3));
    }
}

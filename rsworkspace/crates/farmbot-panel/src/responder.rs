//! Bot side of the command protocol.
//!
//! Subscribes to `panel:cmd`, applies each command to the user's config
//! file, answers once on `panel:resp:{corr}` and republishes the snapshot.
//! Results are remembered per correlation id, so a redelivered command is
//! answered again from memory without being applied twice.

use std::collections::{HashMap, VecDeque};
use std::future::Future;

use chrono::Utc;
use farmbot_nats::{CommandTransport, Delivery, publish};
use farmbot_types::actions::{self, REFRESH_SNAPSHOT};
use farmbot_types::{
    Command, CommandOp, CommandResult, ConfigDocument, CorrelationId, Snapshot, subjects,
};
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::{PanelError, Result};
use crate::snapshot::SnapshotCache;
use crate::store::{ConfigFs, ConfigStore};
use crate::traits::SnapshotStore;

const DEFAULT_SEEN_CAPACITY: usize = 1024;

/// Bounded memory of answered commands, oldest evicted first.
struct SeenResults {
    capacity: usize,
    order: VecDeque<CorrelationId>,
    results: HashMap<CorrelationId, CommandResult>,
}

impl SeenResults {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            results: HashMap::new(),
        }
    }

    fn get(&self, corr: &CorrelationId) -> Option<&CommandResult> {
        self.results.get(corr)
    }

    fn remember(&mut self, result: CommandResult) {
        if self.results.contains_key(&result.corr) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.results.remove(&oldest);
            }
        }
        self.order.push_back(result.corr.clone());
        self.results.insert(result.corr.clone(), result);
    }
}

pub struct CommandResponder<N, F, S> {
    client: N,
    store: ConfigStore<F>,
    snapshots: SnapshotCache<S>,
    user_id: String,
    seen: SeenResults,
}

impl<N, F, S> CommandResponder<N, F, S>
where
    N: CommandTransport,
    F: ConfigFs,
    S: SnapshotStore,
    PanelError: From<S::Error>,
{
    pub fn new(
        client: N,
        store: ConfigStore<F>,
        snapshots: SnapshotCache<S>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            snapshots,
            user_id: user_id.into(),
            seen: SeenResults::new(DEFAULT_SEEN_CAPACITY),
        }
    }

    pub fn with_seen_capacity(mut self, capacity: usize) -> Self {
        self.seen = SeenResults::new(capacity);
        self
    }

    /// Answer commands until `shutdown` resolves or the subscription ends.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut commands = self
            .client
            .subscribe(subjects::COMMAND.into())
            .await
            .map_err(|e| PanelError::ChannelUnavailable(format!("subscribe {}: {e}", subjects::COMMAND)))?;
        info!(subject = subjects::COMMAND, user_id = %self.user_id, "Responder listening");

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Responder stopping");
                    return Ok(());
                }
                msg = commands.next() => {
                    let Some(msg) = msg else {
                        warn!("Command subscription closed");
                        return Ok(());
                    };
                    if let Err(e) = self.handle(&msg.payload).await {
                        warn!(error = %e, "Failed to answer command");
                    }
                }
            }
        }
    }

    /// Apply one raw command and publish its result.
    ///
    /// Returns `None` for payloads that are not commands; they carry no
    /// correlation id to answer on.
    #[instrument(name = "responder.handle", skip_all, fields(corr = tracing::field::Empty))]
    pub async fn handle(&mut self, payload: &[u8]) -> Result<Option<CommandResult>> {
        let command: Command = match serde_json::from_slice(payload) {
            Ok(command) => command,
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable command");
                return Ok(None);
            }
        };
        tracing::Span::current().record("corr", command.corr.as_str());

        let result = match self.seen.get(&command.corr) {
            Some(previous) => {
                debug!("Duplicate command, replaying result");
                previous.clone()
            }
            None => {
                let result = self.apply(&command).await;
                self.seen.remember(result.clone());
                result
            }
        };

        publish(
            &self.client,
            &subjects::response(command.corr.as_str()),
            &result,
            Delivery::Flushed,
        )
        .await
        .map_err(|e| PanelError::ChannelUnavailable(e.to_string()))?;
        Ok(Some(result))
    }

    async fn apply(&self, command: &Command) -> CommandResult {
        let corr = command.corr.clone();
        if let Some(bad) = command.op.invalid_key() {
            return CommandResult::failed(corr, PanelError::InvalidKey(bad.to_string()).to_string());
        }

        match &command.op {
            CommandOp::SetConfig { key, value } => {
                let mut values = serde_json::Map::new();
                values.insert(key.clone(), value.clone());
                self.apply_values(corr, &values).await
            }
            CommandOp::SetConfigBulk { values } => self.apply_values(corr, values).await,
            CommandOp::Action { name } => self.apply_action(corr, command, name).await,
        }
    }

    async fn apply_values(
        &self,
        corr: CorrelationId,
        values: &serde_json::Map<String, serde_json::Value>,
    ) -> CommandResult {
        let mut doc = match self.current_config() {
            Ok(doc) => doc,
            Err(e) => return CommandResult::failed(corr, e.to_string()),
        };
        doc.merge(values);
        if let Err(e) = self.store.save(&self.user_id, &doc) {
            warn!(error = %e, "Config write failed");
            return CommandResult::failed(corr, e.to_string());
        }
        info!(keys = values.len(), "Config updated");
        self.republish(&doc).await;
        CommandResult::ok(corr)
    }

    async fn apply_action(&self, corr: CorrelationId, command: &Command, name: &str) -> CommandResult {
        let Some(spec) = actions::action(name) else {
            return CommandResult::failed(corr, PanelError::UnknownAction(name.to_string()).to_string());
        };

        if spec.name == REFRESH_SNAPSHOT {
            let doc = match self.current_config() {
                Ok(doc) => doc,
                Err(e) => return CommandResult::failed(corr, e.to_string()),
            };
            return match self.republish(&doc).await {
                Some(revision) => CommandResult::ok_with(corr, json!({ "revision": revision })),
                None => CommandResult::failed(corr, "snapshot could not be published"),
            };
        }

        match publish(
            &self.client,
            &subjects::action(spec.name),
            command,
            Delivery::Flushed,
        )
        .await
        {
            Ok(()) => {
                info!(action = spec.name, "Action forwarded");
                CommandResult::ok(corr)
            }
            Err(e) => CommandResult::failed(corr, e.to_string()),
        }
    }

    /// The bot's config; a user without a file yet starts empty.
    fn current_config(&self) -> Result<ConfigDocument> {
        match self.store.load(&self.user_id) {
            Err(PanelError::NotFound { .. }) => Ok(ConfigDocument::new()),
            other => other,
        }
    }

    /// Rebuild the snapshot around `doc`, keeping the runtime state already
    /// published. A failure here does not undo the applied change.
    async fn republish(&self, doc: &ConfigDocument) -> Option<u64> {
        let previous = self.snapshots.read_snapshot().await.unwrap_or_else(|e| {
            warn!(error = %e, "Previous snapshot unreadable, runtime state reset");
            Snapshot::default()
        });
        let snapshot = Snapshot::from_config(doc, &previous, Utc::now());
        match self.snapshots.write(&snapshot).await {
            Ok(revision) => Some(revision),
            Err(e) => {
                warn!(error = %e, "Snapshot publish failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MemKvStore;
    use bytes::Bytes;
    use farmbot_nats::MockNatsClient;
    use farmbot_std::MemFs;
    use farmbot_types::NonceSource;
    use serde_json::{Map, Value};

    const PATH: &str = "/data/config-1.json";

    struct Bot {
        client: MockNatsClient,
        fs: MemFs,
        kv: MemKvStore,
        responder: CommandResponder<MockNatsClient, MemFs, MemKvStore>,
    }

    fn bot() -> Bot {
        let client = MockNatsClient::new();
        let fs = MemFs::new();
        let kv = MemKvStore::new();
        let responder = CommandResponder::new(
            client.clone(),
            ConfigStore::new(fs.clone(), "/data"),
            SnapshotCache::new(kv.clone()),
            "1",
        );
        Bot {
            client,
            fs,
            kv,
            responder,
        }
    }

    fn encode(op: CommandOp, nonces: &NonceSource) -> (CorrelationId, Vec<u8>) {
        let command = Command::new(op, &nonces.next());
        (command.corr.clone(), serde_json::to_vec(&command).unwrap())
    }

    fn saved(fs: &MemFs) -> ConfigDocument {
        ConfigDocument::parse(&fs.contents(PATH).unwrap()).unwrap()
    }

    fn snapshot(kv: &MemKvStore) -> Snapshot {
        Snapshot::parse(&kv.value("panel.snapshot").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn set_config_updates_file_and_answers() {
        let mut bot = bot();
        bot.fs.insert(PATH, r#"{"config_bot_auto_forest": false, "legacy": 1}"#);
        let (corr, raw) = encode(
            CommandOp::set_config("config_bot_auto_forest", Value::Bool(true)),
            &NonceSource::with_token("p"),
        );

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(result.ok);
        assert_eq!(result.corr, corr);
        let doc = saved(&bot.fs);
        assert_eq!(doc.bool("config_bot_auto_forest"), Some(true));
        assert!(doc.contains_key("legacy"));
        let answers = bot.client.published_on(&subjects::response(corr.as_str()));
        assert_eq!(answers.len(), 1);
        let answer: CommandResult = serde_json::from_slice(&answers[0]).unwrap();
        assert_eq!(answer, result);
    }

    #[tokio::test]
    async fn bulk_is_a_single_write_and_snapshot() {
        let mut bot = bot();
        let mut values = Map::new();
        values.insert("config_bot_auto_milk".into(), Value::Bool(true));
        values.insert("config_bot_auto_eat".into(), Value::Bool(false));
        let (_, raw) = encode(CommandOp::set_config_bulk(values), &NonceSource::with_token("p"));

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(result.ok);
        let doc = saved(&bot.fs);
        assert_eq!(doc.bool("config_bot_auto_milk"), Some(true));
        assert_eq!(doc.bool("config_bot_auto_eat"), Some(false));
        assert_eq!(bot.kv.revision("panel.snapshot"), Some(1));
        let snap = snapshot(&bot.kv);
        assert_eq!(snap.flags.get("config_bot_auto_milk"), Some(&true));
    }

    #[tokio::test]
    async fn snapshot_keeps_runtime_state() {
        let mut bot = bot();
        bot.kv.insert(
            "panel.snapshot",
            r#"{"chat_id": "-100", "bot_commands": ["/forest"], "timers": {"forest": 120}}"#,
        );
        let (_, raw) = encode(
            CommandOp::set_config("config_user_tz", Value::from("Asia/Tokyo")),
            &NonceSource::with_token("p"),
        );

        bot.responder.handle(&raw).await.unwrap();

        let snap = snapshot(&bot.kv);
        assert_eq!(snap.chat_id.as_deref(), Some("-100"));
        assert_eq!(snap.timers.get("forest"), Some(&120));
        assert_eq!(snap.config.str("config_user_tz"), Some("Asia/Tokyo"));
        assert!(snap.published_at.is_some());
    }

    #[tokio::test]
    async fn redelivered_command_is_not_applied_twice() {
        let mut bot = bot();
        let (corr, raw) = encode(CommandOp::action("water_cactus"), &NonceSource::with_token("p"));

        let first = bot.responder.handle(&raw).await.unwrap().unwrap();
        let second = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert_eq!(first, second);
        assert_eq!(bot.client.published_on("panel:action:water_cactus").len(), 1);
        assert_eq!(
            bot.client.published_on(&subjects::response(corr.as_str())).len(),
            2
        );
    }

    #[tokio::test]
    async fn fresh_corr_is_applied_again() {
        let mut bot = bot();
        let nonces = NonceSource::with_token("p");
        let (_, first) = encode(CommandOp::action("water_cactus"), &nonces);
        let (_, second) = encode(CommandOp::action("water_cactus"), &nonces);

        bot.responder.handle(&first).await.unwrap();
        bot.responder.handle(&second).await.unwrap();

        assert_eq!(bot.client.published_on("panel:action:water_cactus").len(), 2);
    }

    #[tokio::test]
    async fn seen_results_are_bounded() {
        let mut bot = bot();
        bot.responder = bot.responder.with_seen_capacity(1);
        let nonces = NonceSource::with_token("p");
        let (_, first) = encode(CommandOp::action("water_cactus"), &nonces);
        let (_, second) = encode(CommandOp::action("water_cactus"), &nonces);

        bot.responder.handle(&first).await.unwrap();
        bot.responder.handle(&second).await.unwrap();
        bot.responder.handle(&first).await.unwrap();

        assert_eq!(bot.client.published_on("panel:action:water_cactus").len(), 3);
    }

    #[tokio::test]
    async fn refresh_republishes_snapshot() {
        let mut bot = bot();
        bot.fs.insert(PATH, r#"{"config_bot_auto_cactus": false}"#);
        let (_, raw) = encode(CommandOp::action(REFRESH_SNAPSHOT), &NonceSource::with_token("p"));

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(result.ok);
        assert_eq!(result.payload, Some(json!({"revision": 1})));
        assert_eq!(snapshot(&bot.kv).flags.get("config_bot_auto_cactus"), Some(&false));
        assert!(bot.client.published_on("panel:action:refresh_snapshot").is_empty());
    }

    #[tokio::test]
    async fn unknown_action_fails() {
        let mut bot = bot();
        let (_, raw) = encode(CommandOp::action("dance"), &NonceSource::with_token("p"));

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("unknown action 'dance'"));
    }

    #[tokio::test]
    async fn malformed_config_fails_without_overwriting() {
        let mut bot = bot();
        bot.fs.insert(PATH, "{broken");
        let (_, raw) = encode(
            CommandOp::set_config("config_debug_msg", Value::Bool(true)),
            &NonceSource::with_token("p"),
        );

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(!result.ok);
        assert_eq!(bot.fs.contents(PATH).as_deref(), Some("{broken"));
        assert!(bot.kv.value("panel.snapshot").is_none());
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let mut bot = bot();
        bot.fs.insert(PATH, "{}");
        bot.fs.fail_writes(1);
        let (_, raw) = encode(
            CommandOp::set_config("config_debug_msg", Value::Bool(true)),
            &NonceSource::with_token("p"),
        );

        let result = bot.responder.handle(&raw).await.unwrap().unwrap();

        assert!(!result.ok);
        assert!(result.error.unwrap().contains("failed to write"));
    }

    #[tokio::test]
    async fn garbage_is_ignored() {
        let mut bot = bot();

        assert!(bot.responder.handle(b"not a command").await.unwrap().is_none());
        assert!(bot.client.published().is_empty());
    }

    #[tokio::test]
    async fn run_answers_until_shutdown() {
        let bot = bot();
        let client = bot.client.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let task = tokio::spawn(bot.responder.run(async {
            let _ = stop_rx.await;
        }));

        while client.active_subscriptions().is_empty() {
            tokio::task::yield_now().await;
        }
        let (corr, raw) = encode(
            CommandOp::set_config("config_debug_msg", Value::Bool(true)),
            &NonceSource::with_token("p"),
        );
        client.deliver(subjects::COMMAND, Bytes::from(raw));
        while client
            .published_on(&subjects::response(corr.as_str()))
            .is_empty()
        {
            tokio::task::yield_now().await;
        }

        stop_tx.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert_eq!(saved(&bot.fs).bool("config_debug_msg"), Some(true));
    }
}

//! Bot-published view of runtime state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::document::ConfigDocument;
use crate::fields::{FIELDS, FieldKind};

const CACTUS_WATER_DRINK: &str = "config_bot_auto_cactus_water_drink";
const CACTUS_LVL: &str = "config_bot_auto_cactus_water_drink_lvl";
const CACTUS_CLICK: &str = "config_bot_auto_cactus_water_drink_click";

/// Cactus watering thresholds, published as their own block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CactusThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_drink: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lvl: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<i64>,
}

fn int_setting(doc: &ConfigDocument, key: &str) -> Option<i64> {
    match doc.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

impl CactusThresholds {
    fn from_config(doc: &ConfigDocument) -> Option<Self> {
        let block = Self {
            water_drink: doc.bool(CACTUS_WATER_DRINK),
            lvl: int_setting(doc, CACTUS_LVL),
            click: int_setting(doc, CACTUS_CLICK),
        };
        (block != Self::default()).then_some(block)
    }
}

/// Read-only projection of bot state stored under `panel:snapshot`.
///
/// Every field defaults, so an absent key reads as [`Snapshot::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub bot_commands: Vec<String>,
    /// Remaining seconds per timer.
    #[serde(default)]
    pub timers: BTreeMap<String, u64>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cactus: Option<CactusThresholds>,
    #[serde(default)]
    pub config: ConfigDocument,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

impl Snapshot {
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Chat id for display; `-` when the bot has not reported one.
    pub fn chat_id_display(&self) -> &str {
        self.chat_id.as_deref().unwrap_or("-")
    }

    /// The bot's config with the flag map and cactus block laid over it.
    ///
    /// Flags and the cactus block are rebuilt on every publish, so they win
    /// over the embedded config when both are present.
    pub fn config_view(&self) -> ConfigDocument {
        let mut doc = self.config.clone();
        for (key, enabled) in &self.flags {
            doc.set(key.clone(), Value::Bool(*enabled));
        }
        if let Some(cactus) = &self.cactus {
            if let Some(water_drink) = cactus.water_drink {
                doc.set(CACTUS_WATER_DRINK, Value::Bool(water_drink));
            }
            if let Some(lvl) = cactus.lvl {
                doc.set(CACTUS_LVL, Value::String(lvl.to_string()));
            }
            if let Some(click) = cactus.click {
                doc.set(CACTUS_CLICK, Value::String(click.to_string()));
            }
        }
        doc
    }

    /// Rebuild from the bot's current config. Bot-owned runtime state (chat
    /// id, command set, timers) is carried over from `previous`.
    pub fn from_config(doc: &ConfigDocument, previous: &Snapshot, now: DateTime<Utc>) -> Self {
        let flags = FIELDS
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Toggle { .. }))
            .filter_map(|f| doc.bool(f.key).map(|v| (f.key.to_string(), v)))
            .collect();

        Self {
            chat_id: previous.chat_id.clone(),
            bot_commands: previous.bot_commands.clone(),
            timers: previous.timers.clone(),
            flags,
            cactus: CactusThresholds::from_config(doc),
            config: doc.clone(),
            published_at: Some(now),
        }
    }
}

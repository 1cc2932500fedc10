//! Catalog of the settings the panel can edit
//!
//! Each entry names a config key, the logical save group it belongs to, and
//! how its stored value is read, defaulted and validated. Stored integers are
//! strings, and some single-choice settings are stored as one-item lists.

use serde::Serialize;
use serde_json::Value;

use crate::document::ConfigDocument;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FieldError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{key}' expects {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("field '{key}' must be between {min} and {max}, got {value}")]
    OutOfRange {
        key: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("'{value}' is not an option of field '{key}'")]
    NotAnOption { key: String, value: String },
}

/// Logical save groups. A remote save sends one command per group with edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    Toggles,
    Forest,
    Craft,
    Milk,
    Cactus,
    ChickenHouse,
    LogCategories,
    General,
}

impl FieldGroup {
    pub const ALL: [FieldGroup; 8] = [
        Self::Toggles,
        Self::Forest,
        Self::Craft,
        Self::Milk,
        Self::Cactus,
        Self::ChickenHouse,
        Self::LogCategories,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Toggles => "toggles",
            Self::Forest => "forest",
            Self::Craft => "craft",
            Self::Milk => "milk",
            Self::Cactus => "cactus",
            Self::ChickenHouse => "chicken_house",
            Self::LogCategories => "log_categories",
            Self::General => "general",
        }
    }

    pub fn fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        FIELDS.iter().filter(move |f| f.group == self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectStorage {
    Scalar,
    SingleItemList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Toggle {
        default: bool,
    },
    Text {
        default: &'static str,
    },
    /// Stored as a decimal string.
    Integer {
        default: i64,
        min: i64,
        max: i64,
    },
    Select {
        options: &'static [&'static str],
        default: &'static str,
        /// Used when the stored value is not one of `options`.
        fallback_index: usize,
        /// Used when a list-stored value is blank: null, empty list or empty string.
        empty_index: usize,
        storage: SelectStorage,
    },
    /// Entries outside `options` already in the document are kept.
    MultiSelect {
        options: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub group: FieldGroup,
    pub kind: FieldKind,
}

const FOREST_COMMANDS: &[&str] = &["/forest", "мулс", "му лес"];
const CRAFT_COMMANDS: &[&str] = &["/craft", "мув", "му крафт"];
const MILK_COMMANDS: &[&str] = &["/cow", "мук", "му корова"];
const NPCS: &[&str] = &[
    "npc_belka",
    "npc_jabomraz",
    "npc_edinorog",
    "npc_djun",
    "npc_chick",
    "npc_bear",
    "npc_ejik",
];
const LOG_CATEGORIES: &[&str] = &["forest", "craft", "milk", "cactus", "eat", "chicken"];
const TIMEZONES: &[&str] = &[
    "UTC",
    "Europe/Kiev",
    "Europe/Moscow",
    "Asia/Tokyo",
    "America/New_York",
    "Europe/London",
];

const fn toggle(key: &'static str, group: FieldGroup, default: bool) -> FieldSpec {
    FieldSpec {
        key,
        group,
        kind: FieldKind::Toggle { default },
    }
}

const fn integer(key: &'static str, group: FieldGroup, default: i64, min: i64, max: i64) -> FieldSpec {
    FieldSpec {
        key,
        group,
        kind: FieldKind::Integer { default, min, max },
    }
}

const fn text(key: &'static str, group: FieldGroup, default: &'static str) -> FieldSpec {
    FieldSpec {
        key,
        group,
        kind: FieldKind::Text { default },
    }
}

pub static FIELDS: &[FieldSpec] = &[
    toggle("config_bot_auto_forest", FieldGroup::Toggles, false),
    toggle("config_bot_auto_craft", FieldGroup::Toggles, false),
    toggle("config_bot_auto_milk", FieldGroup::Toggles, false),
    toggle("config_bot_auto_cactus", FieldGroup::Toggles, true),
    toggle("config_bot_auto_eat", FieldGroup::Toggles, false),
    toggle("config_bot_auto_forest_skip_npc", FieldGroup::Forest, true),
    FieldSpec {
        key: "config_bot_auto_forest_command",
        group: FieldGroup::Forest,
        kind: FieldKind::Select {
            options: FOREST_COMMANDS,
            default: "мулс",
            fallback_index: 0,
            empty_index: 0,
            storage: SelectStorage::SingleItemList,
        },
    },
    FieldSpec {
        key: "config_bot_autoforest_npcs",
        group: FieldGroup::Forest,
        kind: FieldKind::MultiSelect { options: NPCS },
    },
    text("config_bot_auto_craft_item_name", FieldGroup::Craft, "масло"),
    integer("config_bot_auto_craft_count", FieldGroup::Craft, 50, 1, 100),
    FieldSpec {
        key: "config_bot_auto_craft_command",
        group: FieldGroup::Craft,
        kind: FieldKind::Select {
            options: CRAFT_COMMANDS,
            default: "мув",
            fallback_index: 1,
            empty_index: 1,
            storage: SelectStorage::Scalar,
        },
    },
    FieldSpec {
        key: "config_bot_auto_milk_command",
        group: FieldGroup::Milk,
        kind: FieldKind::Select {
            options: MILK_COMMANDS,
            default: "мук",
            fallback_index: 1,
            empty_index: 0,
            storage: SelectStorage::SingleItemList,
        },
    },
    toggle("config_bot_auto_cactus_water_drink", FieldGroup::Cactus, true),
    integer("config_bot_auto_cactus_water_drink_lvl", FieldGroup::Cactus, 50, 0, 100),
    integer("config_bot_auto_cactus_water_drink_click", FieldGroup::Cactus, 1, 1, 10),
    integer("config_bot_chicken_house_count", FieldGroup::ChickenHouse, 1, 1, 10),
    FieldSpec {
        key: "config_bot_log_categories",
        group: FieldGroup::LogCategories,
        kind: FieldKind::MultiSelect {
            options: LOG_CATEGORIES,
        },
    },
    toggle("config_debug_msg", FieldGroup::General, false),
    text("config_bot_used_chat_id", FieldGroup::General, "1606812809"),
    text("config_bot_send_logs", FieldGroup::General, "me"),
    FieldSpec {
        key: "config_user_tz",
        group: FieldGroup::General,
        kind: FieldKind::Select {
            options: TIMEZONES,
            default: "UTC",
            fallback_index: 0,
            empty_index: 0,
            storage: SelectStorage::Scalar,
        },
    },
];

/// Index of `stored` within `options`, or `default_index` when it is absent
/// or not one of them.
///
/// `default_index` is clamped to the option list; an empty list yields 0.
pub fn resolve_selection(options: &[&str], stored: Option<&str>, default_index: usize) -> usize {
    stored
        .and_then(|value| options.iter().position(|o| *o == value))
        .unwrap_or_else(|| default_index.min(options.len().saturating_sub(1)))
}

pub fn field(key: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|f| f.key == key)
}

pub fn lookup(key: &str) -> Result<&'static FieldSpec, FieldError> {
    field(key).ok_or_else(|| FieldError::UnknownField(key.to_string()))
}

/// A document holding every field at its default, in catalog order.
pub fn defaults() -> ConfigDocument {
    FIELDS
        .iter()
        .map(|f| (f.key.to_string(), f.default_value()))
        .collect()
}

fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Null, `false`, zero and empty strings, lists or objects.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn string_entries(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    })
}

impl FieldSpec {
    /// Default in stored form.
    pub fn default_value(&self) -> Value {
        match self.kind {
            FieldKind::Toggle { default } => Value::Bool(default),
            FieldKind::Text { default } => Value::String(default.to_string()),
            FieldKind::Integer { default, .. } => Value::String(default.to_string()),
            FieldKind::Select {
                default, storage, ..
            } => stored_choice(storage, default),
            FieldKind::MultiSelect { .. } => Value::Array(Vec::new()),
        }
    }

    /// Selected option index for select fields, following the fallback rules.
    pub fn selected_index(&self, doc: &ConfigDocument) -> Option<usize> {
        let FieldKind::Select {
            options,
            default,
            fallback_index,
            empty_index,
            storage,
        } = self.kind
        else {
            return None;
        };

        let last = options.len().saturating_sub(1);
        let index = match (storage, doc.get(self.key)) {
            (_, None) => resolve_selection(options, Some(default), fallback_index),
            (SelectStorage::SingleItemList, Some(value)) if is_blank(value) => empty_index.min(last),
            (SelectStorage::SingleItemList, Some(Value::Array(items))) => {
                resolve_selection(options, items.first().and_then(Value::as_str), fallback_index)
            }
            // Only the first list entry is ever compared, so a bare value never matches.
            (SelectStorage::SingleItemList, Some(_)) => fallback_index.min(last),
            (SelectStorage::Scalar, Some(value)) => {
                resolve_selection(options, value.as_str(), fallback_index)
            }
        };
        Some(index)
    }

    /// Value to show for this field. Integers are clamped into range; values
    /// of the wrong shape show the default.
    pub fn display_value(&self, doc: &ConfigDocument) -> Value {
        let stored = doc.get(self.key);
        match self.kind {
            FieldKind::Toggle { default } => {
                Value::Bool(stored.and_then(Value::as_bool).unwrap_or(default))
            }
            FieldKind::Text { default } => match stored {
                Some(Value::String(s)) => Value::String(s.clone()),
                Some(Value::Number(n)) => Value::String(n.to_string()),
                _ => Value::String(default.to_string()),
            },
            FieldKind::Integer { default, min, max } => {
                let n = stored.and_then(parse_int).unwrap_or(default).clamp(min, max);
                Value::from(n)
            }
            FieldKind::Select { options, .. } => {
                let index = self.selected_index(doc).unwrap_or(0);
                options
                    .get(index)
                    .map(|o| Value::String(o.to_string()))
                    .unwrap_or(Value::Null)
            }
            FieldKind::MultiSelect { .. } => Value::Array(
                stored
                    .and_then(string_entries)
                    .unwrap_or_default()
                    .into_iter()
                    .map(Value::String)
                    .collect(),
            ),
        }
    }

    /// Validate an edit and convert it to stored form.
    ///
    /// `current` is consulted for multi-selects, where entries unknown to the
    /// catalog are accepted only if the document already holds them.
    pub fn normalize_edit(&self, value: &Value, current: &ConfigDocument) -> Result<Value, FieldError> {
        match self.kind {
            FieldKind::Toggle { .. } => value
                .as_bool()
                .map(Value::Bool)
                .ok_or_else(|| self.wrong_type("a boolean")),
            FieldKind::Text { .. } => match value {
                Value::String(s) => Ok(Value::String(s.clone())),
                Value::Number(n) => Ok(Value::String(n.to_string())),
                _ => Err(self.wrong_type("a string")),
            },
            FieldKind::Integer { min, max, .. } => {
                let n = parse_int(value).ok_or_else(|| self.wrong_type("an integer"))?;
                if !(min..=max).contains(&n) {
                    return Err(FieldError::OutOfRange {
                        key: self.key.to_string(),
                        value: n,
                        min,
                        max,
                    });
                }
                Ok(Value::String(n.to_string()))
            }
            FieldKind::Select {
                options, storage, ..
            } => {
                let choice = match value {
                    Value::String(s) => s.as_str(),
                    Value::Array(items) if items.len() == 1 => items[0]
                        .as_str()
                        .ok_or_else(|| self.wrong_type("one of its options"))?,
                    _ => return Err(self.wrong_type("one of its options")),
                };
                if !options.contains(&choice) {
                    return Err(FieldError::NotAnOption {
                        key: self.key.to_string(),
                        value: choice.to_string(),
                    });
                }
                Ok(stored_choice(storage, choice))
            }
            FieldKind::MultiSelect { options } => {
                let entries = string_entries(value)
                    .filter(|entries| Some(entries.len()) == value.as_array().map(Vec::len))
                    .ok_or_else(|| self.wrong_type("a list of strings"))?;
                let existing = current.string_list(self.key).unwrap_or_default();
                let mut out: Vec<String> = Vec::with_capacity(entries.len());
                for entry in entries {
                    if !options.contains(&entry.as_str()) && !existing.contains(&entry) {
                        return Err(FieldError::NotAnOption {
                            key: self.key.to_string(),
                            value: entry,
                        });
                    }
                    if !out.contains(&entry) {
                        out.push(entry);
                    }
                }
                Ok(Value::Array(out.into_iter().map(Value::String).collect()))
            }
        }
    }

    pub fn options(&self) -> Option<&'static [&'static str]> {
        match self.kind {
            FieldKind::Select { options, .. } | FieldKind::MultiSelect { options } => Some(options),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            FieldKind::Toggle { .. } => "toggle",
            FieldKind::Text { .. } => "text",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Select { .. } => "select",
            FieldKind::MultiSelect { .. } => "multi_select",
        }
    }

    fn wrong_type(&self, expected: &'static str) -> FieldError {
        FieldError::WrongType {
            key: self.key.to_string(),
            expected,
        }
    }
}

fn stored_choice(storage: SelectStorage, choice: &str) -> Value {
    match storage {
        SelectStorage::Scalar => Value::String(choice.to_string()),
        SelectStorage::SingleItemList => Value::Array(vec![Value::String(choice.to_string())]),
    }
}

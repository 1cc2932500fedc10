//! Named actions the panel can trigger.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionSpec {
    pub name: &'static str,
    /// Whether sending it twice has the same effect as sending it once.
    /// A duplicate submit always produces a second command.
    pub idempotent: bool,
    pub description: &'static str,
}

pub const WATER_CACTUS: &str = "water_cactus";
pub const REFRESH_SNAPSHOT: &str = "refresh_snapshot";

pub static ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: WATER_CACTUS,
        idempotent: false,
        description: "Water the cactus now. Each command waters once more.",
    },
    ActionSpec {
        name: REFRESH_SNAPSHOT,
        idempotent: true,
        description: "Ask the bot to republish its snapshot.",
    },
];

pub fn action(name: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|a| a.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idempotency_is_documented_per_action() {
        assert_eq!(action(WATER_CACTUS).map(|a| a.idempotent), Some(false));
        assert_eq!(action(REFRESH_SNAPSHOT).map(|a| a.idempotent), Some(true));
        assert!(action("feed_chickens").is_none());
    }

    #[test]
    fn action_names_are_channel_safe() {
        for spec in ACTIONS {
            assert!(crate::command::is_valid_key(spec.name), "{}", spec.name);
        }
    }
}

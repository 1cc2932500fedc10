//! Subject and key names shared by the panel and the bot.

/// Commands from any panel session to the bot.
pub const COMMAND: &str = "panel:cmd";

/// Well-known snapshot key.
pub const SNAPSHOT_KEY: &str = "panel:snapshot";

/// Default KV bucket holding the snapshot.
pub const DEFAULT_KV_BUCKET: &str = "panel";

/// Result for one command, published once by the bot.
pub fn response(corr: &str) -> String {
    format!("panel:resp:{}", corr)
}

/// Named actions other than snapshot refresh are forwarded here for the bot's
/// automation to pick up.
pub fn action(name: &str) -> String {
    format!("panel:action:{}", name)
}

/// KV keys may not contain `:`; use `.` as the separator instead.
pub fn kv_key(key: &str) -> String {
    key.replace(':', ".")
}

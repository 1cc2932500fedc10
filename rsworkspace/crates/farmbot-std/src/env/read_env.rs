use std::env;

/// Does **not** require `Send + Sync`; add the bounds at the call site when
/// the reader crosses tasks.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError>;

    /// Parse a variable, treating absent or unparseable values as `None`.
    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.var(key).ok().and_then(|v| v.trim().parse().ok())
    }
}

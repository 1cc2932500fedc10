use std::env;

use super::ReadEnv;

/// Zero-sized type, delegates to `std::env`.
pub struct SystemEnv;

impl ReadEnv for SystemEnv {
    #[inline]
    fn var(&self, key: &str) -> Result<String, env::VarError> {
        env::var(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_matches_std() {
        assert_eq!(SystemEnv.var("PATH").is_ok(), std::env::var("PATH").is_ok());
    }

    #[test]
    fn missing_variable_parses_to_none() {
        let parsed: Option<u16> = SystemEnv.parsed("FARMBOT_STD_SURELY_UNSET_12345");
        assert!(parsed.is_none());
    }
}

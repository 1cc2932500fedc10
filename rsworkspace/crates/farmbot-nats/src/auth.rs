use std::path::PathBuf;

use farmbot_std::env::ReadEnv;

const ENV_NATS_URL: &str = "NATS_URL";
const ENV_NATS_CREDS: &str = "NATS_CREDS";
const ENV_NATS_NKEY: &str = "NATS_NKEY";
const ENV_NATS_USER: &str = "NATS_USER";
const ENV_NATS_PASSWORD: &str = "NATS_PASSWORD";
const ENV_NATS_TOKEN: &str = "NATS_TOKEN";
const ENV_NATS_CLIENT_NAME: &str = "NATS_CLIENT_NAME";

const DEFAULT_NATS_URL: &str = "localhost:4222";
const DEFAULT_CLIENT_NAME: &str = "farmbot-panel";

/// How the panel authenticates against the channel endpoint.
///
/// Resolution order from the environment:
/// 1. Credentials file (`NATS_CREDS`)
/// 2. NKey seed (`NATS_NKEY`)
/// 3. User/password (`NATS_USER` + `NATS_PASSWORD`)
/// 4. Token (`NATS_TOKEN`)
/// 5. No auth
#[derive(Debug, Clone)]
pub enum NatsAuth {
    Credentials(PathBuf),
    NKey(String),
    UserPassword { user: String, password: String },
    Token(String),
    None,
}

impl NatsAuth {
    /// Safe to log: never includes the secret itself.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Credentials(_) => "credentials file",
            Self::NKey(_) => "NKey",
            Self::UserPassword { .. } => "user/password",
            Self::Token(_) => "token",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NatsConfig {
    pub servers: Vec<String>,
    pub auth: NatsAuth,
    /// Connection name reported to the server (`NATS_CLIENT_NAME`).
    pub client_name: String,
}

impl NatsConfig {
    pub fn new(servers: Vec<String>, auth: NatsAuth) -> Self {
        Self {
            servers,
            auth,
            client_name: DEFAULT_CLIENT_NAME.to_string(),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::new(vec![url.into()], NatsAuth::None)
    }

    /// `NATS_URL` is a comma-separated server list (default `localhost:4222`).
    pub fn from_env<E: ReadEnv>(env: &E) -> Self {
        Self {
            servers: servers_from_env(env),
            auth: auth_from_env(env),
            client_name: env
                .var(ENV_NATS_CLIENT_NAME)
                .unwrap_or_else(|_| DEFAULT_CLIENT_NAME.to_string()),
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }
}

fn servers_from_env<E: ReadEnv>(env: &E) -> Vec<String> {
    let raw = env
        .var(ENV_NATS_URL)
        .unwrap_or_else(|_| DEFAULT_NATS_URL.to_string());
    let servers: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if servers.is_empty() {
        vec![DEFAULT_NATS_URL.to_string()]
    } else {
        servers
    }
}

fn auth_from_env<E: ReadEnv>(env: &E) -> NatsAuth {
    if let Ok(path) = env.var(ENV_NATS_CREDS) {
        return NatsAuth::Credentials(PathBuf::from(path));
    }
    if let Ok(seed) = env.var(ENV_NATS_NKEY) {
        return NatsAuth::NKey(seed);
    }
    if let (Ok(user), Ok(password)) = (env.var(ENV_NATS_USER), env.var(ENV_NATS_PASSWORD)) {
        return NatsAuth::UserPassword { user, password };
    }
    if let Ok(token) = env.var(ENV_NATS_TOKEN) {
        return NatsAuth::Token(token);
    }
    NatsAuth::None
}

#[cfg(test)]
mod tests {
    use super::*;
    use farmbot_std::env::InMemoryEnv;

    #[test]
    fn defaults_to_local_server_without_auth() {
        let config = NatsConfig::from_env(&InMemoryEnv::new());

        assert_eq!(config.servers, vec!["localhost:4222"]);
        assert!(matches!(config.auth, NatsAuth::None));
        assert_eq!(config.client_name, "farmbot-panel");
    }

    #[test]
    fn splits_and_trims_server_list() {
        let env = InMemoryEnv::new();
        env.set("NATS_URL", "nats-a:4222 , ,nats-b:4222");

        assert_eq!(
            NatsConfig::from_env(&env).servers,
            vec!["nats-a:4222", "nats-b:4222"]
        );
    }

    #[test]
    fn blank_server_list_falls_back_to_default() {
        let env = InMemoryEnv::new();
        env.set("NATS_URL", " , ");

        assert_eq!(NatsConfig::from_env(&env).servers, vec!["localhost:4222"]);
    }

    #[test]
    fn credentials_file_wins_over_everything() {
        let env = InMemoryEnv::new();
        env.set("NATS_CREDS", "/secrets/panel.creds");
        env.set("NATS_NKEY", "SUAxxx");
        env.set("NATS_TOKEN", "tok");

        assert!(matches!(
            NatsConfig::from_env(&env).auth,
            NatsAuth::Credentials(p) if p == std::path::Path::new("/secrets/panel.creds")
        ));
    }

    #[test]
    fn user_password_needs_both_halves() {
        let env = InMemoryEnv::new();
        env.set("NATS_USER", "panel");
        assert!(matches!(NatsConfig::from_env(&env).auth, NatsAuth::None));

        env.set("NATS_PASSWORD", "hunter2");
        assert!(matches!(
            NatsConfig::from_env(&env).auth,
            NatsAuth::UserPassword { user, password } if user == "panel" && password == "hunter2"
        ));
    }

    #[test]
    fn token_is_last_resort() {
        let env = InMemoryEnv::new();
        env.set("NATS_TOKEN", "tok");
        assert!(matches!(NatsConfig::from_env(&env).auth, NatsAuth::Token(t) if t == "tok"));
    }

    #[test]
    fn client_name_override() {
        let env = InMemoryEnv::new();
        env.set("NATS_CLIENT_NAME", "farmbot-responder");
        assert_eq!(NatsConfig::from_env(&env).client_name, "farmbot-responder");
        assert_eq!(
            NatsConfig::from_url("nats://x:4222")
                .with_client_name("other")
                .client_name,
            "other"
        );
    }

    #[test]
    fn descriptions_never_leak_secrets() {
        assert_eq!(NatsAuth::Token("secret".into()).description(), "token");
        assert_eq!(NatsAuth::NKey("SUAsecret".into()).description(), "NKey");
        assert_eq!(
            NatsAuth::UserPassword {
                user: "u".into(),
                password: "p".into()
            }
            .description(),
            "user/password"
        );
        assert_eq!(NatsAuth::Credentials("/c".into()).description(), "credentials file");
        assert_eq!(NatsAuth::None.description(), "none");
    }
}

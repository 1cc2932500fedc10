use crate::auth::{NatsAuth, NatsConfig};
use async_nats::{Client, ConnectOptions, Event};
use std::time::Duration;
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub enum ConnectError {
    InvalidCredentials(std::io::Error),
    ConnectionFailed {
        servers: Vec<String>,
        error: async_nats::ConnectError,
    },
}

impl std::fmt::Display for ConnectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials(e) => {
                write!(f, "Failed to load credentials file: {}", e)
            }
            Self::ConnectionFailed { servers, error } => {
                write!(
                    f,
                    "Failed to connect to channel endpoint {:?}: {}",
                    servers, error
                )
            }
        }
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidCredentials(e) => Some(e),
            Self::ConnectionFailed { error, .. } => Some(error),
        }
    }
}

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

fn reconnect_delay(attempts: usize) -> Duration {
    let exp = u32::try_from(attempts).unwrap_or(u32::MAX);
    let delay = Duration::from_secs(std::cmp::min(
        MAX_RECONNECT_DELAY.as_secs(),
        2u64.saturating_pow(exp),
    ));
    info!(attempts, delay_secs = delay.as_secs(), "NATS reconnect delay");
    delay
}

async fn handle_event(event: Event) {
    match event {
        Event::Connected => info!("NATS connected"),
        Event::Disconnected => warn!("NATS disconnected, panel commands will fail until reconnect"),
        Event::ServerError(err) => warn!(error = %err, "NATS server error"),
        Event::ClientError(err) => warn!(error = %err, "NATS client error"),
        Event::SlowConsumer(sid) => warn!(sid, "NATS slow consumer detected"),
        Event::LameDuckMode => warn!("NATS server entering lame duck mode"),
        Event::Closed => info!("NATS connection closed"),
        Event::Draining => info!("NATS connection draining"),
    }
}

fn base_options(auth: &NatsAuth) -> ConnectOptions {
    match auth {
        NatsAuth::NKey(seed) => ConnectOptions::with_nkey(seed.clone()),
        NatsAuth::UserPassword { user, password } => {
            ConnectOptions::with_user_and_password(user.clone(), password.clone())
        }
        NatsAuth::Token(token) => ConnectOptions::with_token(token.clone()),
        NatsAuth::Credentials(_) | NatsAuth::None => ConnectOptions::new(),
    }
}

fn apply_connection_options(opts: ConnectOptions, config: &NatsConfig) -> ConnectOptions {
    opts.name(config.client_name.clone())
        .retry_on_initial_connect()
        .connection_timeout(CONNECTION_TIMEOUT)
        .reconnect_delay_callback(reconnect_delay)
        .event_callback(|event| async move { handle_event(event).await })
}

/// Connect with automatic reconnection and event logging.
#[instrument(name = "nats.connect", skip(config), fields(servers = ?config.servers, auth = %config.auth.description()))]
pub async fn connect(config: &NatsConfig) -> Result<Client, ConnectError> {
    info!(client_name = %config.client_name, "Connecting to NATS");

    let opts = match &config.auth {
        NatsAuth::Credentials(path) => {
            info!(path = %path.display(), "Using credentials file");
            ConnectOptions::with_credentials_file(path.clone())
                .await
                .map_err(|e| {
                    warn!(error = %e, path = %path.display(), "Failed to load credentials file");
                    ConnectError::InvalidCredentials(e)
                })?
        }
        other => base_options(other),
    };

    match apply_connection_options(opts, config)
        .connect(&config.servers)
        .await
    {
        Ok(client) => {
            info!("Connected to NATS");
            Ok(client)
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS");
            Err(ConnectError::ConnectionFailed {
                servers: config.servers.clone(),
                error: e,
            })
        }
    }
}

/// Drain subscriptions and flush pending publishes before exit.
///
/// Failures are logged, not returned: there is nothing left to do with the
/// connection at this point.
#[instrument(name = "nats.shutdown", skip(client))]
pub async fn shutdown(client: &Client) {
    match client.drain().await {
        Ok(()) => info!("NATS connection drained"),
        Err(e) => warn!(error = %e, "Failed to drain NATS connection"),
    }
}

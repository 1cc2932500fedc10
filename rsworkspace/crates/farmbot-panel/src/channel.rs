//! Panel side of the command protocol.
//!
//! A command is published on `panel:cmd` and its result awaited on
//! `panel:resp:{corr}`. Delivery is best effort: the channel keeps nothing,
//! so a bot that is offline at publish time never sees the command, and
//! nothing is re-published automatically.

use std::time::Duration;

use farmbot_nats::{CommandTransport, Delivery, publish};
use farmbot_types::{Command, CommandOp, CommandResult, CorrelationId, NonceSource, subjects};
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{PanelError, Result};

/// What the panel learned about one command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The bot applied it.
    Applied {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<Value>,
    },
    /// The bot answered with a failure.
    Rejected { error: String },
    /// No answer within the wait bound. The bot may still have applied it.
    Unresolved,
    /// Sent without waiting (zero timeout).
    Published,
}

impl Outcome {
    /// Whether the change is known or assumed to have reached the bot.
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Published)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sent {
    pub corr: CorrelationId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone)]
pub struct CommandChannel<N> {
    client: N,
    response_timeout: Duration,
}

impl<N> CommandChannel<N>
where
    N: CommandTransport,
{
    /// A zero `response_timeout` publishes without waiting for results.
    pub fn new(client: N, response_timeout: Duration) -> Self {
        Self {
            client,
            response_timeout,
        }
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    /// Publish one command and wait for its result.
    ///
    /// A publish or flush failure is `ChannelUnavailable`, never success.
    /// Every call draws a fresh nonce, so repeated submits get distinct ids.
    #[instrument(name = "channel.send", skip(self, op, nonces), fields(op = %op.kind(), corr = tracing::field::Empty))]
    pub async fn send(&self, op: CommandOp, nonces: &NonceSource) -> Result<Sent> {
        if let Some(bad) = op.invalid_key() {
            return Err(PanelError::InvalidKey(bad.to_string()));
        }
        let command = Command::new(op, &nonces.next());
        let corr = command.corr.clone();
        tracing::Span::current().record("corr", corr.as_str());

        if self.response_timeout.is_zero() {
            self.publish(&command).await?;
            info!("Command published without waiting for a result");
            return Ok(Sent {
                corr,
                outcome: Outcome::Published,
            });
        }

        // Subscribe before publishing so a fast reply cannot be missed.
        let reply_subject = subjects::response(corr.as_str());
        let mut replies = self
            .client
            .subscribe(reply_subject.clone().into())
            .await
            .map_err(|e| PanelError::ChannelUnavailable(format!("subscribe {reply_subject}: {e}")))?;

        self.publish(&command).await?;
        debug!(subject = %reply_subject, "Command published, awaiting result");

        let wait = async {
            while let Some(msg) = replies.next().await {
                match serde_json::from_slice::<CommandResult>(&msg.payload) {
                    Ok(result) if result.corr == corr => return Some(result),
                    Ok(result) => {
                        debug!(other = %result.corr, "Ignoring result for another command");
                    }
                    Err(e) => warn!(error = %e, "Ignoring undecodable result"),
                }
            }
            None
        };

        let outcome = match tokio::time::timeout(self.response_timeout, wait).await {
            Err(_) => {
                warn!(
                    timeout_secs = self.response_timeout.as_secs(),
                    "No result before timeout; outcome unresolved"
                );
                Outcome::Unresolved
            }
            Ok(None) => {
                return Err(PanelError::ChannelUnavailable(format!(
                    "reply subscription {reply_subject} closed"
                )));
            }
            Ok(Some(result)) if result.ok => {
                info!("Command applied");
                Outcome::Applied {
                    payload: result.payload,
                }
            }
            Ok(Some(result)) => {
                let error = result.error.unwrap_or_else(|| "rejected".to_string());
                warn!(error = %error, "Command rejected by bot");
                Outcome::Rejected { error }
            }
        };
        // Dropping `replies` here unsubscribes.
        Ok(Sent { corr, outcome })
    }

    async fn publish(&self, command: &Command) -> Result<()> {
        publish(
            &self.client,
            subjects::COMMAND,
            command,
            Delivery::Flushed,
        )
        .await
        .map_err(|e| PanelError::ChannelUnavailable(e.to_string()))
    }
}

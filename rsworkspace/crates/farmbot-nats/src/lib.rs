//! # farmbot-nats
//!
//! NATS infrastructure shared by the panel and the bot-side responder.
//!
//! - [`NatsConfig`] resolved from `NATS_*` environment variables
//! - [`connect`] with automatic reconnection, and [`shutdown`] to drain on exit
//! - Per-operation client traits so callers depend only on what they use
//! - [`publish`] with an explicit [`Delivery`] mode; a failed publish or flush
//!   is an error, never silent success
//! - OpenTelemetry trace context carried in message headers
//! - [`MockNatsClient`] with loopback delivery (with `test-support`)
//!
//! ```rust,no_run
//! use farmbot_nats::{NatsConfig, connect, shutdown};
//! use farmbot_std::env::SystemEnv;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = NatsConfig::from_env(&SystemEnv);
//!     let client = connect(&config).await.expect("Failed to connect");
//!     shutdown(&client).await;
//! }
//! ```

pub mod auth;
pub mod client;
pub mod connect;
pub mod messaging;

#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use auth::{NatsAuth, NatsConfig};
pub use client::{CommandTransport, FlushClient, PublishClient, SubscribeClient};
pub use connect::{ConnectError, connect, shutdown};
pub use messaging::{Delivery, NatsError, publish, trace_headers};

#[cfg(any(test, feature = "test-support"))]
pub use mocks::{MockNatsClient, PublishedMessage};

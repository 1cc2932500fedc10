//! One trait per NATS operation the panel and the responder use.
//!
//! Code that only publishes asks for [`PublishClient`]; code that runs the
//! command protocol asks for [`CommandTransport`]. Both are implemented for
//! [`async_nats::Client`] and, under `test-support`, for the loopback mock.

use async_nats::{Client, HeaderMap, Message, Subject, Subscriber};
use bytes::Bytes;
use futures::Stream;
use std::error::Error;
use std::future::Future;

pub trait PublishClient: Send + Sync + Clone + 'static {
    type PublishError: Error + Send + Sync;

    /// Queue a message. Success says nothing about the server having it.
    ///
    /// The subject is owned so that callers' futures can be spawned.
    fn publish_with_headers(
        &self,
        subject: Subject,
        headers: HeaderMap,
        payload: Bytes,
    ) -> impl Future<Output = Result<(), Self::PublishError>> + Send;
}

pub trait FlushClient: Send + Sync + Clone + 'static {
    type FlushError: Error + Send + Sync;

    /// Resolves once everything queued so far reached the server.
    fn flush(&self) -> impl Future<Output = Result<(), Self::FlushError>> + Send;
}

pub trait SubscribeClient: Send + Sync + Clone + 'static {
    type SubscribeError: Error + Send + Sync;
    /// Dropping it unsubscribes.
    type Subscription: Stream<Item = Message> + Send + Unpin + 'static;

    fn subscribe(
        &self,
        subject: Subject,
    ) -> impl Future<Output = Result<Self::Subscription, Self::SubscribeError>> + Send;
}

/// Everything needed to send a command and wait for its result.
pub trait CommandTransport: PublishClient + FlushClient + SubscribeClient {}

impl<T: PublishClient + FlushClient + SubscribeClient> CommandTransport for T {}

impl PublishClient for Client {
    type PublishError = async_nats::client::PublishError;

    async fn publish_with_headers(
        &self,
        subject: Subject,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<(), Self::PublishError> {
        Client::publish_with_headers(self, subject, headers, payload).await
    }
}

impl FlushClient for Client {
    type FlushError = async_nats::client::FlushError;

    async fn flush(&self) -> Result<(), Self::FlushError> {
        Client::flush(self).await
    }
}

impl SubscribeClient for Client {
    type SubscribeError = async_nats::client::SubscribeError;
    type Subscription = Subscriber;

    async fn subscribe(&self, subject: Subject) -> Result<Subscriber, Self::SubscribeError> {
        Client::subscribe(self, subject).await
    }
}

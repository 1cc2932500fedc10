use crate::client::{FlushClient, PublishClient, SubscribeClient};
use async_nats::{HeaderMap, Message, Subject};
use bytes::Bytes;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct MockError(pub String);

impl std::fmt::Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MockError {}

#[derive(Clone, Debug)]
pub struct PublishedMessage {
    pub subject: String,
    pub headers: HeaderMap,
    pub payload: Bytes,
}

/// Replies produced by a simulated remote peer: `(subject, payload)` pairs
/// delivered to local subscribers after a publish.
type Responder = Arc<dyn Fn(&str, &Bytes) -> Vec<(String, Bytes)> + Send + Sync>;

#[derive(Default)]
struct MockState {
    published: Vec<PublishedMessage>,
    subscribed: Vec<String>,
    subscribers: HashMap<String, Vec<UnboundedSender<Message>>>,
    responder: Option<Responder>,
    publish_fail_count: u32,
    fail_flush: bool,
    fail_subscribe_count: u32,
    flush_count: usize,
}

/// In-process stand-in for a NATS connection.
///
/// Published messages are recorded and looped back to subscribers of the
/// exact same subject. Wildcards are not interpreted.
#[derive(Clone, Default)]
pub struct MockNatsClient {
    state: Arc<Mutex<MockState>>,
}

impl std::fmt::Debug for MockNatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("MockNatsClient")
            .field("published", &state.published.len())
            .field("subscribed", &state.subscribed)
            .field("has_responder", &state.responder.is_some())
            .finish()
    }
}

fn message(subject: &str, headers: Option<HeaderMap>, payload: Bytes) -> Message {
    Message {
        subject: subject.into(),
        reply: None,
        length: payload.len(),
        payload,
        headers,
        status: None,
        description: None,
    }
}

impl MockNatsClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a simulated peer. It sees every publish and its replies are
    /// delivered to local subscribers.
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: Fn(&str, &Bytes) -> Vec<(String, Bytes)> + Send + Sync + 'static,
    {
        self.state.lock().unwrap().responder = Some(Arc::new(responder));
        self
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn published_subjects(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .published
            .iter()
            .map(|m| m.subject.clone())
            .collect()
    }

    pub fn published_on(&self, subject: &str) -> Vec<Bytes> {
        self.state
            .lock()
            .unwrap()
            .published
            .iter()
            .filter(|m| m.subject == subject)
            .map(|m| m.payload.clone())
            .collect()
    }

    pub fn subscribed_to(&self) -> Vec<String> {
        self.state.lock().unwrap().subscribed.clone()
    }

    /// Subjects with at least one live subscription.
    pub fn active_subscriptions(&self) -> Vec<String> {
        let mut state = self.state.lock().unwrap();
        state
            .subscribers
            .retain(|_, senders| {
                senders.retain(|tx| !tx.is_closed());
                !senders.is_empty()
            });
        let mut subjects: Vec<String> = state.subscribers.keys().cloned().collect();
        subjects.sort();
        subjects
    }

    pub fn flush_count(&self) -> usize {
        self.state.lock().unwrap().flush_count
    }

    /// Fail the next `n` publish attempts.
    pub fn fail_publish_count(&self, n: u32) {
        self.state.lock().unwrap().publish_fail_count = n;
    }

    pub fn fail_flush(&self, fail: bool) {
        self.state.lock().unwrap().fail_flush = fail;
    }

    pub fn fail_next_subscribe(&self) {
        self.state.lock().unwrap().fail_subscribe_count = 1;
    }

    /// Deliver a message to local subscribers as if a remote peer had published it.
    pub fn deliver(&self, subject: &str, payload: impl Into<Bytes>) {
        self.fan_out(subject, None, payload.into());
    }

    fn fan_out(&self, subject: &str, headers: Option<HeaderMap>, payload: Bytes) {
        let mut state = self.state.lock().unwrap();
        if let Some(senders) = state.subscribers.get_mut(subject) {
            let msg = message(subject, headers, payload);
            senders.retain(|tx| tx.unbounded_send(msg.clone()).is_ok());
        }
    }
}

impl SubscribeClient for MockNatsClient {
    type SubscribeError = MockError;
    type Subscription = UnboundedReceiver<Message>;

    async fn subscribe(&self, subject: Subject) -> Result<UnboundedReceiver<Message>, MockError> {
        let subject = subject.to_string();
        let mut state = self.state.lock().unwrap();
        if state.fail_subscribe_count > 0 {
            state.fail_subscribe_count -= 1;
            return Err(MockError(format!("simulated subscribe failure on {subject}")));
        }
        let (tx, rx) = mpsc::unbounded();
        state.subscribed.push(subject.clone());
        state.subscribers.entry(subject).or_default().push(tx);
        Ok(rx)
    }
}

impl PublishClient for MockNatsClient {
    type PublishError = MockError;

    async fn publish_with_headers(
        &self,
        subject: Subject,
        headers: HeaderMap,
        payload: Bytes,
    ) -> Result<(), MockError> {
        let subject = subject.to_string();
        let responder = {
            let mut state = self.state.lock().unwrap();
            if state.publish_fail_count > 0 {
                state.publish_fail_count -= 1;
                return Err(MockError(format!("simulated publish failure on {subject}")));
            }
            state.published.push(PublishedMessage {
                subject: subject.clone(),
                headers: headers.clone(),
                payload: payload.clone(),
            });
            state.responder.clone()
        };

        self.fan_out(&subject, Some(headers), payload.clone());

        if let Some(responder) = responder {
            for (reply_subject, reply) in responder(&subject, &payload) {
                self.fan_out(&reply_subject, None, reply);
            }
        }
        Ok(())
    }
}

impl FlushClient for MockNatsClient {
    type FlushError = MockError;

    async fn flush(&self) -> Result<(), MockError> {
        let mut state = self.state.lock().unwrap();
        state.flush_count += 1;
        if state.fail_flush {
            return Err(MockError("simulated flush failure".to_string()));
        }
        Ok(())
    }
}

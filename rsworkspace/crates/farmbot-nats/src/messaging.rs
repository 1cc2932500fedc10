//! JSON publishing with an explicit delivery mode.
//!
//! Nothing here re-sends: a failed publish or flush is returned to the caller,
//! which decides what to tell the user. Each message carries the current
//! OpenTelemetry context in its headers.

use crate::client::{FlushClient, PublishClient};
use async_nats::Subject;
use async_nats::header::HeaderMap;
use bytes::Bytes;
use opentelemetry::propagation::Injector;
use serde::Serialize;
use tracing::{Span, debug, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt;

struct HeaderInjector<'a>(&'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key, value.as_str());
    }
}

/// Headers carrying the current span's trace context.
pub fn trace_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    let cx = Span::current().context();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector(&mut headers));
    });
    headers
}

/// How far a publish is confirmed before it counts as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Handed to the client's outgoing buffer.
    #[default]
    Buffered,
    /// Buffered, then flushed to the server. A flush failure is an error.
    Flushed,
}

#[derive(Debug)]
pub enum NatsError {
    Serialize(serde_json::Error),
    Publish { subject: String, error: String },
    Flush { subject: String, error: String },
}

impl std::fmt::Display for NatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(e) => write!(f, "failed to encode message: {}", e),
            Self::Publish { subject, error } => write!(f, "publish to '{}' failed: {}", subject, error),
            Self::Flush { subject, error } => {
                write!(f, "flush after publishing to '{}' failed: {}", subject, error)
            }
        }
    }
}

impl std::error::Error for NatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Serialize(e) => Some(e),
            Self::Publish { .. } | Self::Flush { .. } => None,
        }
    }
}

/// Serialize `message` as JSON and publish it on `subject`.
pub async fn publish<N, M>(
    client: &N,
    subject: &str,
    message: &M,
    delivery: Delivery,
) -> Result<(), NatsError>
where
    N: PublishClient + FlushClient,
    M: Serialize,
{
    let payload = Bytes::from(serde_json::to_vec(message).map_err(NatsError::Serialize)?);
    let size = payload.len();

    client
        .publish_with_headers(Subject::from(subject), trace_headers(), payload)
        .await
        .map_err(|e| {
            warn!(subject, error = %e, "Publish failed");
            NatsError::Publish {
                subject: subject.to_string(),
                error: e.to_string(),
            }
        })?;

    if delivery == Delivery::Flushed {
        client.flush().await.map_err(|e| {
            warn!(subject, error = %e, "Flush failed");
            NatsError::Flush {
                subject: subject.to_string(),
                error: e.to_string(),
            }
        })?;
    }

    debug!(subject, size, ?delivery, "Published");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockNatsClient;
    use serde_json::json;

    #[test]
    fn trace_headers_without_a_propagator_are_empty() {
        assert!(trace_headers().is_empty());
    }

    #[tokio::test]
    async fn flushed_publish_records_json_and_flushes() {
        let mock = MockNatsClient::new();

        publish(&mock, "panel:cmd", &json!({"op": "action"}), Delivery::Flushed)
            .await
            .unwrap();

        let published = mock.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].subject, "panel:cmd");
        assert_eq!(&published[0].payload[..], br#"{"op":"action"}"#);
        assert_eq!(mock.flush_count(), 1);
    }

    #[tokio::test]
    async fn buffered_publish_does_not_flush() {
        let mock = MockNatsClient::new();

        publish(&mock, "panel:cmd", &json!(1), Delivery::Buffered)
            .await
            .unwrap();

        assert_eq!(mock.flush_count(), 0);
    }

    #[tokio::test]
    async fn publish_failure_is_not_retried() {
        let mock = MockNatsClient::new();
        mock.fail_publish_count(1);

        let err = publish(&mock, "panel:cmd", &json!(1), Delivery::Flushed)
            .await
            .unwrap_err();

        assert!(matches!(err, NatsError::Publish { ref subject, .. } if subject == "panel:cmd"));
        assert!(mock.published().is_empty());
        assert_eq!(mock.flush_count(), 0);
    }

    #[tokio::test]
    async fn flush_failure_is_an_error_after_publish() {
        let mock = MockNatsClient::new();
        mock.fail_flush(true);

        let err = publish(&mock, "panel:cmd", &json!(1), Delivery::Flushed)
            .await
            .unwrap_err();

        assert!(matches!(err, NatsError::Flush { .. }));
        assert_eq!(mock.published().len(), 1);
    }

    #[test]
    fn error_display() {
        let err = NatsError::Publish {
            subject: "panel:resp:x".to_string(),
            error: "closed".to_string(),
        };
        assert_eq!(err.to_string(), "publish to 'panel:resp:x' failed: closed");
        assert!(std::error::Error::source(&err).is_none());
    }
}

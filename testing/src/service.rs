//! Scripted dependent services for request/reply tests.

use futures::StreamExt;
use review_search_core::broker::{Broker, BrokerError};
use review_search_core::message::Envelope;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

type Handler = Arc<dyn Fn(Value) -> Option<Value> + Send + Sync>;

/// A fake service consuming one named queue.
///
/// For every request it evaluates the handler: `Some(reply)` is published to
/// the request's `reply_to` queue with the same correlation id, `None` means
/// the service never answers. Requests are handled concurrently.
///
/// # Example
///
/// ```ignore
/// MockService::new(broker.clone(), "media-service")
///     .respond(|request| {
///         assert_eq!(request["mediaId"], 9);
///         Some(serde_json::json!({ "name": "Dune" }))
///     })
///     .with_delay(Duration::from_millis(20))
///     .spawn()
///     .await?;
/// ```
pub struct MockService {
    broker: Arc<dyn Broker>,
    queue: String,
    handler: Handler,
    delay: Option<Duration>,
    raw_reply: Option<Vec<u8>>,
}

impl MockService {
    /// Create a service on `queue` that answers every request with JSON `null`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            handler: Arc::new(|_| Some(Value::Null)),
            delay: None,
            raw_reply: None,
        }
    }

    /// Answer with the handler's result.
    #[must_use]
    pub fn respond<F>(mut self, handler: F) -> Self
    where
        F: Fn(Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.handler = Arc::new(handler);
        self
    }

    /// Answer every request with the same JSON value.
    #[must_use]
    pub fn reply_with(self, reply: Value) -> Self {
        self.respond(move |_| Some(reply.clone()))
    }

    /// Never answer.
    #[must_use]
    pub fn silent(self) -> Self {
        self.respond(|_| None)
    }

    /// Answer with raw bytes instead of JSON (for decode-failure tests).
    #[must_use]
    pub fn reply_raw(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.raw_reply = Some(bytes.into());
        self
    }

    /// Wait before answering each request.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Declare the queue, register the consumer, and start serving.
    ///
    /// # Errors
    ///
    /// Returns the broker error if the queue cannot be declared or consumed.
    pub async fn spawn(self) -> Result<JoinHandle<()>, BrokerError> {
        self.broker.declare_queue(&self.queue).await?;
        let mut deliveries = self.broker.consume(&self.queue).await?;

        let Self {
            broker,
            queue,
            handler,
            delay,
            raw_reply,
        } = self;

        Ok(tokio::spawn(async move {
            while let Some(Ok(delivery)) = deliveries.next().await {
                let broker = Arc::clone(&broker);
                let handler = Arc::clone(&handler);
                let raw_reply = raw_reply.clone();
                let queue = queue.clone();

                tokio::spawn(async move {
                    if let Some(delay) = delay {
                        tokio::time::sleep(delay).await;
                    }
                    let request = serde_json::from_slice(&delivery.payload).unwrap_or(Value::Null);
                    let payload = match (raw_reply, handler(request)) {
                        (_, None) => return,
                        (Some(raw), Some(_)) => raw,
                        (None, Some(reply)) => reply.to_string().into_bytes(),
                    };
                    let Some(reply_to) = delivery.reply_to else {
                        return;
                    };

                    let mut envelope = Envelope::new(payload);
                    if let Some(correlation_id) = delivery.correlation_id {
                        envelope = envelope.with_correlation_id(correlation_id);
                    }
                    if let Err(error) = broker.publish(&reply_to, &envelope).await {
                        tracing::warn!(queue = %queue, error = %error, "Mock reply failed");
                    }
                });
            }
        }))
    }
}

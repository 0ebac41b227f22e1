//! Serving a [`QueueContract`] on a named queue.
//!
//! The responder is the other half of [`crate::client::RequestClient`]: it
//! consumes requests from a well-known queue, hands each decoded request to a
//! handler, and publishes the handler's reply to the request's `reply_to`
//! queue carrying the same correlation id.
//!
//! Requests are handled concurrently. A request without `reply_to`, one that
//! does not decode, or one whose handler fails is logged and dropped; the
//! caller's deadline covers the missing reply.
//!
//! On shutdown the responder stops consuming, then waits up to its drain
//! timeout for requests already being handled to publish their replies.

use futures::StreamExt;
use review_search_core::broker::{Broker, BrokerError};
use review_search_core::contract::QueueContract;
use review_search_core::message::{Delivery, Envelope};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// How long [`Responder::serve`] waits for in-flight requests after shutdown.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Consumes one queue and answers each request.
#[derive(Clone)]
pub struct Responder {
    broker: Arc<dyn Broker>,
    queue: String,
    drain_timeout: Duration,
}

impl Responder {
    /// Create a responder for `queue`.
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>, queue: impl Into<String>) -> Self {
        Self {
            broker,
            queue: queue.into(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    /// Bound the wait for in-flight requests once serving stops.
    #[must_use]
    pub const fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Queue this responder consumes.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Declare the queue and answer requests until `shutdown` fires or the
    /// consumer ends, then drain requests still being handled.
    ///
    /// # Errors
    ///
    /// Returns the broker error if the queue cannot be declared or consumed.
    /// Per-request failures are logged, not returned.
    pub async fn serve<C, F, Fut>(
        &self,
        handler: F,
        shutdown: CancellationToken,
    ) -> Result<(), BrokerError>
    where
        C: QueueContract,
        F: Fn(C::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C::Reply, String>> + Send + 'static,
    {
        self.broker.declare_queue(&self.queue).await?;
        let mut deliveries = self.broker.consume(&self.queue).await?;
        let handler = Arc::new(handler);
        let in_flight = TaskTracker::new();

        tracing::info!(queue = %self.queue, "Responder listening");

        loop {
            let delivery = tokio::select! {
                () = shutdown.cancelled() => break,
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => delivery,
                    Some(Err(e)) => {
                        tracing::error!(queue = %self.queue, error = %e, "Consumer error");
                        continue;
                    }
                    None => {
                        tracing::warn!(queue = %self.queue, "Consumer ended");
                        break;
                    }
                },
            };

            let broker = Arc::clone(&self.broker);
            let handler = Arc::clone(&handler);
            let queue = self.queue.clone();
            in_flight.spawn(async move {
                answer::<C, F, Fut>(&*broker, &queue, delivery, &*handler).await;
            });
        }

        in_flight.close();
        if !in_flight.is_empty() {
            tracing::info!(queue = %self.queue, pending = in_flight.len(), "Draining in-flight requests");
        }
        if tokio::time::timeout(self.drain_timeout, in_flight.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                queue = %self.queue,
                abandoned = in_flight.len(),
                timeout = ?self.drain_timeout,
                "Drain timed out, in-flight requests will not be answered"
            );
        }

        tracing::info!(queue = %self.queue, "Responder stopped");
        Ok(())
    }
}

async fn answer<C, F, Fut>(broker: &dyn Broker, queue: &str, delivery: Delivery, handler: &F)
where
    C: QueueContract,
    F: Fn(C::Request) -> Fut,
    Fut: Future<Output = Result<C::Reply, String>>,
{
    let Some(reply_to) = delivery.reply_to else {
        tracing::warn!(queue = %queue, "Dropping request without reply_to");
        return;
    };

    let request: C::Request = match serde_json::from_slice(&delivery.payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(queue = %queue, error = %e, "Dropping undecodable request");
            return;
        }
    };

    let reply = match handler(request).await {
        Ok(reply) => reply,
        Err(reason) => {
            tracing::warn!(queue = %queue, error = %reason, "Handler failed, not replying");
            return;
        }
    };

    let mut envelope = match Envelope::json(&reply) {
        Ok(envelope) => envelope.with_schema_version(C::SCHEMA_VERSION),
        Err(e) => {
            tracing::error!(queue = %queue, error = %e, "Failed to encode reply");
            return;
        }
    };
    if let Some(correlation_id) = delivery.correlation_id {
        envelope = envelope.with_correlation_id(correlation_id);
    }

    if let Err(e) = broker.publish(&reply_to, &envelope).await {
        tracing::error!(queue = %queue, reply_to = %reply_to, error = %e, "Failed to publish reply");
    }
}

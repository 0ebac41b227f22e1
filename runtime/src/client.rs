//! Correlated request client.
//!
//! Turns a publish and a later reply into one awaitable call:
//!
//! 1. declare a private, server-named, exclusive reply queue
//! 2. generate a fresh [`CorrelationId`]
//! 3. register a consumer on the reply queue
//! 4. publish the request with `reply_to` and `correlation_id`
//! 5. wait for the delivery whose correlation id matches, ignoring any other
//! 6. release the reply queue, whatever the outcome
//!
//! Every call has a deadline ([`RequestClient::with_timeout`]) and can be
//! cancelled with a [`CancellationToken`]. A call future dropped mid-flight
//! still releases its reply queue.
//!
//! # Example
//!
//! ```ignore
//! use review_search_core::contract::{UserLookup, UserLookupRequest};
//!
//! let client = RequestClient::new(broker);
//! let user = client
//!     .request::<UserLookup>("user-service", &UserLookupRequest { user_id: 3 })
//!     .await?;
//! ```

use crate::metrics::RequestMetrics;
use futures::StreamExt;
use review_search_core::broker::{Broker, BrokerError, DeliveryStream};
use review_search_core::contract::QueueContract;
use review_search_core::correlation::CorrelationId;
use review_search_core::message::Envelope;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Deadline applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors a correlated call can end with.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The broker rejected an operation or the connection failed.
    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The request could not be serialized.
    #[error("Failed to encode request for '{queue}': {reason}")]
    Encode {
        /// Destination queue
        queue: String,
        /// Serializer message
        reason: String,
    },

    /// The reply did not match the queue's reply schema.
    #[error("Failed to decode reply from '{queue}': {reason}")]
    Decode {
        /// Destination queue
        queue: String,
        /// Deserializer message
        reason: String,
    },

    /// No matching reply arrived before the deadline.
    #[error("No reply from '{queue}' within {timeout:?} (correlation id {correlation_id})")]
    Timeout {
        /// Destination queue
        queue: String,
        /// Id the reply was expected to carry
        correlation_id: String,
        /// Deadline that expired
        timeout: Duration,
    },

    /// The caller cancelled the call.
    #[error("Request to '{queue}' was cancelled")]
    Cancelled {
        /// Destination queue
        queue: String,
    },

    /// The reply queue's consumer ended before a matching reply arrived.
    #[error("Reply queue closed before '{queue}' answered")]
    ReplyQueueClosed {
        /// Destination queue
        queue: String,
    },
}

impl RequestError {
    /// Whether the call ended because its deadline expired.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Issues correlated calls over a shared [`Broker`].
///
/// Cheap to clone; clones share the broker.
#[derive(Clone)]
pub struct RequestClient {
    broker: Arc<dyn Broker>,
    timeout: Duration,
}

impl RequestClient {
    /// Create a client with [`DEFAULT_REQUEST_TIMEOUT`].
    #[must_use]
    pub fn new(broker: Arc<dyn Broker>) -> Self {
        Self {
            broker,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the per-call deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send a typed request and decode the typed reply.
    ///
    /// # Errors
    ///
    /// See [`RequestError`]; decode failures are reported as [`RequestError::Decode`].
    pub async fn request<C: QueueContract>(
        &self,
        queue: &str,
        request: &C::Request,
    ) -> Result<C::Reply, RequestError> {
        self.request_with_cancel::<C>(queue, request, &CancellationToken::new())
            .await
    }

    /// Like [`RequestClient::request`], ending early with
    /// [`RequestError::Cancelled`] once `cancel` fires.
    ///
    /// # Errors
    ///
    /// See [`RequestError`].
    pub async fn request_with_cancel<C: QueueContract>(
        &self,
        queue: &str,
        request: &C::Request,
        cancel: &CancellationToken,
    ) -> Result<C::Reply, RequestError> {
        let envelope = Envelope::json(request)
            .map_err(|e| RequestError::Encode {
                queue: queue.to_string(),
                reason: e.to_string(),
            })?
            .with_schema_version(C::SCHEMA_VERSION);

        let payload = self.call(queue, envelope, cancel).await?;

        serde_json::from_slice(&payload).map_err(|e| {
            tracing::warn!(queue = %queue, error = %e, "Reply does not match contract");
            RequestError::Decode {
                queue: queue.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Send a raw envelope and return the raw reply payload.
    ///
    /// Any `reply_to` or `correlation_id` already on `envelope` is replaced.
    ///
    /// # Errors
    ///
    /// See [`RequestError`].
    pub async fn call(
        &self,
        queue: &str,
        envelope: Envelope,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RequestError> {
        let reply_queue = self.broker.declare_reply_queue().await?;
        let guard = ReplyQueueGuard::new(Arc::clone(&self.broker), reply_queue.clone());
        let mut deliveries = self.broker.consume(&reply_queue).await?;

        let correlation_id = CorrelationId::new().to_string();
        let envelope = envelope
            .with_reply_to(reply_queue.clone())
            .with_correlation_id(correlation_id.clone());

        tracing::debug!(
            queue = %queue,
            reply_queue = %reply_queue,
            correlation_id = %correlation_id,
            payload_bytes = envelope.payload.len(),
            "Sending request"
        );

        let started = Instant::now();
        self.broker.publish(queue, &envelope).await?;
        RequestMetrics::record_sent(queue);

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                RequestMetrics::record_cancelled(queue);
                Err(RequestError::Cancelled { queue: queue.to_string() })
            }
            reply = tokio::time::timeout(
                self.timeout,
                await_reply(&mut deliveries, queue, &correlation_id),
            ) => match reply {
                Ok(result) => result,
                Err(_elapsed) => {
                    tracing::warn!(
                        queue = %queue,
                        correlation_id = %correlation_id,
                        timeout = ?self.timeout,
                        "Request timed out"
                    );
                    RequestMetrics::record_timeout(queue);
                    Err(RequestError::Timeout {
                        queue: queue.to_string(),
                        correlation_id: correlation_id.clone(),
                        timeout: self.timeout,
                    })
                }
            },
        };

        drop(deliveries);
        guard.release().await;

        if outcome.is_ok() {
            RequestMetrics::record_reply(queue, started.elapsed());
            tracing::debug!(
                queue = %queue,
                correlation_id = %correlation_id,
                elapsed = ?started.elapsed(),
                "Received reply"
            );
        }
        outcome
    }
}

/// Wait for the delivery carrying `correlation_id`.
async fn await_reply(
    deliveries: &mut DeliveryStream,
    queue: &str,
    correlation_id: &str,
) -> Result<Vec<u8>, RequestError> {
    while let Some(delivery) = deliveries.next().await {
        let delivery = delivery?;
        if delivery.matches(correlation_id) {
            return Ok(delivery.payload);
        }
        RequestMetrics::record_mismatch(queue);
        tracing::debug!(
            queue = %queue,
            expected = %correlation_id,
            received = ?delivery.correlation_id,
            "Ignoring reply with foreign correlation id"
        );
    }
    Err(RequestError::ReplyQueueClosed {
        queue: queue.to_string(),
    })
}

/// Deletes a reply queue exactly once: explicitly via `release`, or on drop
/// when the owning call future is abandoned.
struct ReplyQueueGuard {
    broker: Arc<dyn Broker>,
    queue: Option<String>,
}

impl ReplyQueueGuard {
    const fn new(broker: Arc<dyn Broker>, queue: String) -> Self {
        Self {
            broker,
            queue: Some(queue),
        }
    }

    async fn release(mut self) {
        if let Some(queue) = self.queue.take() {
            delete_reply_queue(&*self.broker, &queue).await;
        }
    }
}

impl Drop for ReplyQueueGuard {
    fn drop(&mut self) {
        let Some(queue) = self.queue.take() else {
            return;
        };
        let broker = Arc::clone(&self.broker);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                delete_reply_queue(&*broker, &queue).await;
            });
        } else {
            tracing::warn!(reply_queue = %queue, "No runtime to release reply queue");
        }
    }
}

async fn delete_reply_queue(broker: &dyn Broker, queue: &str) {
    if let Err(e) = broker.delete_queue(queue).await {
        tracing::warn!(reply_queue = %queue, error = %e, "Failed to release reply queue");
    }
}

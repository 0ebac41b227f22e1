//! Broker abstraction for request/reply messaging over named queues.
//!
//! This module provides the [`Broker`] trait used by the request client and
//! the responder. Only direct named queues are used: a message published to a
//! queue name is routed straight to that queue, with no exchanges or routing
//! keys in between.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐        ┌───────────────────┐
//! │  RequestClient   │        │     Responder     │
//! │ (one call each)  │        │ (service queue)   │
//! └────────┬─────────┘        └─────────┬─────────┘
//!          │                            │
//!          ▼                            ▼
//! ┌─────────────────────────────────────────────┐
//! │          Broker (one shared channel)        │
//! │  declare_reply_queue / publish / consume    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **One channel**: every in-flight call shares the same channel
//! - **Private reply queues**: each call declares its own exclusive, server-named queue
//! - **No delivery guarantees**: consumers do not acknowledge, queues are not durable
//! - **Explicit release**: reply queues are deleted once their call settles
//!
//! # Implementations
//!
//! - `InMemoryBroker` (review-search-testing) - For tests
//! - `RabbitMqBroker` (review-search-rabbitmq) - For production (AMQP 0-9-1)

use crate::message::{Delivery, Envelope};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during broker operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// Failed to establish the connection or open the channel
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to declare a queue
    #[error("Queue declaration failed for '{queue}': {reason}")]
    DeclareFailed {
        /// The queue that failed ("" for server-named queues)
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to publish a message to a queue
    #[error("Publish failed for queue '{queue}': {reason}")]
    PublishFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to register a consumer
    #[error("Consume failed for queue '{queue}': {reason}")]
    ConsumeFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to delete a queue
    #[error("Queue deletion failed for '{queue}': {reason}")]
    DeleteFailed {
        /// The queue that failed
        queue: String,
        /// The reason for failure
        reason: String,
    },

    /// The broker has been closed and can no longer be used
    #[error("Broker is closed")]
    Closed,

    /// Network or transport error while receiving
    #[error("Transport error: {0}")]
    TransportError(String),
}

/// Stream of deliveries from a consumer.
///
/// The stream ends when the consumer is cancelled, the queue is deleted, or
/// the broker is closed.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BrokerError>> + Send>>;

/// Trait for broker implementations.
///
/// All methods go through a single shared channel. Implementations must
/// tolerate interleaved calls from many concurrent requests.
///
/// # Dyn Compatibility
///
/// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of `async fn`
/// so it can be shared as `Arc<dyn Broker>` between the request client, the
/// responder and the HTTP handlers.
pub trait Broker: Send + Sync {
    /// Declare a named, non-durable queue. Declaring an existing queue is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DeclareFailed`] if the broker rejects the declaration,
    /// or [`BrokerError::ConnectionFailed`] if the channel cannot be acquired.
    fn declare_queue(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Declare a private, server-named, exclusive reply queue and return its name.
    ///
    /// The queue is deleted automatically when the declaring connection closes,
    /// and explicitly via [`Broker::delete_queue`] once the call settles.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DeclareFailed`] or [`BrokerError::ConnectionFailed`].
    fn declare_reply_queue(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<String, BrokerError>> + Send + '_>>;

    /// Register a consumer on a queue and return its delivery stream.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ConsumeFailed`] if the consumer cannot be registered.
    fn consume(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, BrokerError>> + Send + '_>>;

    /// Publish a message directly to a named queue.
    ///
    /// Messages sent to a queue nobody declared are silently dropped by the broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::PublishFailed`] if the publish is rejected.
    fn publish(
        &self,
        queue: &str,
        envelope: &Envelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Delete a queue, cancelling every consumer registered on it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::DeleteFailed`] if the broker rejects the deletion.
    fn delete_queue(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;

    /// Close the channel, then the connection. Runs at most once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::TransportError`] if closing fails.
    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>>;
}

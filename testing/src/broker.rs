//! In-memory broker for fast, deterministic tests.
//!
//! Mirrors the parts of AMQP the request/reply layer relies on:
//! - publishing to a queue nobody declared drops the message
//! - messages published before any consumer exists are buffered
//! - several consumers on one queue are served round-robin
//! - deleting a queue ends every consumer stream on it

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning is the only panic source

use review_search_core::broker::{Broker, BrokerError, DeliveryStream};
use review_search_core::message::{Delivery, Envelope};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Prefix the broker uses for server-named queues.
pub const REPLY_QUEUE_PREFIX: &str = "amq.gen-";

type ConsumerSender = mpsc::UnboundedSender<Result<Delivery, BrokerError>>;

#[derive(Default)]
struct QueueState {
    buffered: VecDeque<Delivery>,
    consumers: Vec<ConsumerSender>,
    next_consumer: usize,
}

impl QueueState {
    fn route(&mut self, delivery: Delivery) {
        self.consumers.retain(|tx| !tx.is_closed());
        if self.consumers.is_empty() {
            self.buffered.push_back(delivery);
            return;
        }
        let index = self.next_consumer % self.consumers.len();
        self.next_consumer = self.next_consumer.wrapping_add(1);
        if let Err(mpsc::error::SendError(Ok(returned))) = self.consumers[index].send(Ok(delivery)) {
            self.buffered.push_back(returned);
        }
    }
}

#[derive(Default)]
struct Inner {
    queues: HashMap<String, QueueState>,
    published: Vec<(String, Envelope)>,
    failing_queues: HashSet<String>,
    declared_reply_queues: usize,
    close_count: usize,
    closed: bool,
}

/// In-memory [`Broker`] implementation.
///
/// Cheap to clone; clones share the same queues.
///
/// # Example
///
/// ```
/// use review_search_core::broker::Broker;
/// use review_search_core::message::Envelope;
/// use review_search_testing::InMemoryBroker;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let broker = InMemoryBroker::new();
/// broker.declare_queue("user-service").await?;
/// broker.publish("user-service", &Envelope::new(b"{}".to_vec())).await?;
/// assert_eq!(broker.published_to("user-service").len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every envelope published to `queue`, in publish order.
    #[must_use]
    pub fn published_to(&self, queue: &str) -> Vec<Envelope> {
        self.inner
            .lock()
            .unwrap()
            .published
            .iter()
            .filter(|(target, _)| target == queue)
            .map(|(_, envelope)| envelope.clone())
            .collect()
    }

    /// Total number of publishes across all queues.
    #[must_use]
    pub fn publish_count(&self) -> usize {
        self.inner.lock().unwrap().published.len()
    }

    /// Number of server-named reply queues that currently exist.
    #[must_use]
    pub fn live_reply_queues(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .queues
            .keys()
            .filter(|name| name.starts_with(REPLY_QUEUE_PREFIX))
            .count()
    }

    /// Number of reply queues ever declared.
    #[must_use]
    pub fn declared_reply_queues(&self) -> usize {
        self.inner.lock().unwrap().declared_reply_queues
    }

    /// Whether a queue currently exists.
    #[must_use]
    pub fn queue_exists(&self, queue: &str) -> bool {
        self.inner.lock().unwrap().queues.contains_key(queue)
    }

    /// How many times the broker was actually closed.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.inner.lock().unwrap().close_count
    }

    /// Make every future publish to `queue` fail.
    pub fn fail_publishes_to(&self, queue: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_queues
            .insert(queue.to_string());
    }

    fn ensure_open(inner: &Inner) -> Result<(), BrokerError> {
        if inner.closed {
            Err(BrokerError::Closed)
        } else {
            Ok(())
        }
    }
}

impl Broker for InMemoryBroker {
    fn declare_queue(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        let queue = queue.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            Self::ensure_open(&inner)?;
            inner.queues.entry(queue).or_default();
            Ok(())
        })
    }

    fn declare_reply_queue(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<String, BrokerError>> + Send + '_>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            Self::ensure_open(&inner)?;
            let name = format!("{REPLY_QUEUE_PREFIX}{}", Uuid::new_v4().simple());
            inner.queues.insert(name.clone(), QueueState::default());
            inner.declared_reply_queues += 1;
            Ok(name)
        })
    }

    fn consume(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<DeliveryStream, BrokerError>> + Send + '_>> {
        let queue = queue.to_string();
        Box::pin(async move {
            let (tx, mut rx) = mpsc::unbounded_channel();
            {
                let mut inner = self.inner.lock().unwrap();
                Self::ensure_open(&inner)?;
                let state = inner.queues.get_mut(&queue).ok_or_else(|| {
                    BrokerError::ConsumeFailed {
                        queue: queue.clone(),
                        reason: "NOT_FOUND - no queue".to_string(),
                    }
                })?;
                while let Some(delivery) = state.buffered.pop_front() {
                    let _ = tx.send(Ok(delivery));
                }
                state.consumers.push(tx);
            }

            let stream = async_stream::stream! {
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };
            Ok(Box::pin(stream) as DeliveryStream)
        })
    }

    fn publish(
        &self,
        queue: &str,
        envelope: &Envelope,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        let queue = queue.to_string();
        let envelope = envelope.clone();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            Self::ensure_open(&inner)?;
            if inner.failing_queues.contains(&queue) {
                return Err(BrokerError::PublishFailed {
                    queue,
                    reason: "injected failure".to_string(),
                });
            }
            inner.published.push((queue.clone(), envelope.clone()));
            if let Some(state) = inner.queues.get_mut(&queue) {
                state.route(Delivery::from(envelope));
            } else {
                tracing::debug!(queue = %queue, "Dropping message for undeclared queue");
            }
            Ok(())
        })
    }

    fn delete_queue(
        &self,
        queue: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        let queue = queue.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            Self::ensure_open(&inner)?;
            inner.queues.remove(&queue);
            Ok(())
        })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + '_>> {
        Box::pin(async move {
            let mut inner = self.inner.lock().unwrap();
            if !inner.closed {
                inner.closed = true;
                inner.close_count += 1;
                inner.queues.clear();
            }
            Ok(())
        })
    }
}

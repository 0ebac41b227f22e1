//! # Review Search Core
//!
//! Core traits and types for the review search service.
//!
//! The service answers `GET /review/{title}` by loading matching reviews from
//! storage and enriching each one with data owned by other services. Those
//! services are reached through a message broker using request/reply over
//! one-shot reply queues.
//!
//! ## Core Concepts
//!
//! - **Broker**: named-queue publish/consume plus private reply queues ([`broker::Broker`])
//! - **Envelope / Delivery**: outbound and inbound broker messages ([`message`])
//! - **Correlation id**: unique token matching a reply to its request ([`correlation::CorrelationId`])
//! - **Queue contract**: typed, versioned request/reply schema per queue ([`contract`])
//! - **Review / `EnrichedReview`**: primary record and its enriched form ([`review`])
//! - **Repository**: the primary data source ([`repository::ReviewRepository`])
//!
//! ## Request/Reply Flow
//!
//! ```text
//!  caller                 broker                  service
//!    │  declare reply queue  │                        │
//!    │──────────────────────▶│                        │
//!    │  publish(replyTo, id) │                        │
//!    │──────────────────────▶│───────────────────────▶│
//!    │                       │   publish(replyTo, id) │
//!    │◀──────────────────────│◀───────────────────────│
//!    │  match id, release    │                        │
//! ```

pub mod broker;
pub mod contract;
pub mod correlation;
pub mod message;
pub mod repository;
pub mod review;

pub use broker::{Broker, BrokerError, DeliveryStream};
pub use contract::QueueContract;
pub use correlation::CorrelationId;
pub use message::{Delivery, Envelope};
pub use repository::{RepositoryError, ReviewRepository};
pub use review::{EnrichedReview, Review};

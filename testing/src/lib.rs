//! # Review Search Testing
//!
//! Testing utilities for the review search service.
//!
//! This crate provides:
//! - [`InMemoryBroker`]: a broker with private reply queues and direct queue routing
//! - [`MockService`]: a scripted dependent service answering on a named queue
//! - [`InMemoryReviewRepository`]: a substring-matching review store
//! - [`init_test_tracing`]: opt-in log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use review_search_testing::{InMemoryBroker, MockService};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn user_lookup() {
//!     let broker = Arc::new(InMemoryBroker::new());
//!     MockService::new(broker.clone(), "user-service")
//!         .respond(|_| Some(serde_json::json!({ "name": "Alice" })))
//!         .spawn()
//!         .await
//!         .unwrap();
//!
//!     // issue calls through a RequestClient built on `broker`...
//! }
//! ```

pub mod broker;
pub mod repository;
pub mod service;

pub use broker::InMemoryBroker;
pub use repository::InMemoryReviewRepository;
pub use service::MockService;

/// Install a test subscriber honouring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

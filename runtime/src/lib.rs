//! # Review Search Runtime
//!
//! The request/reply layer and the enrichment built on top of it.
//!
//! - [`client::RequestClient`]: synchronous-looking calls over a shared broker channel
//! - [`enrichment::ReviewEnricher`]: concurrent fan-out of dependent lookups per review
//! - [`search::ReviewSearch`]: storage lookup followed by batch enrichment
//! - [`responder::Responder`]: serves a contract on a named queue
//! - [`metrics`]: Prometheus counters and histograms
//!
//! # Example
//!
//! ```ignore
//! use review_search_runtime::{RequestClient, ReviewEnricher, ReviewSearch};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let client = RequestClient::new(broker).with_timeout(Duration::from_secs(5));
//! let search = ReviewSearch::new(repository, ReviewEnricher::new(client));
//!
//! let reviews = search.search_by_title("Dune").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod enrichment;
pub mod metrics;
pub mod responder;
pub mod search;

pub use client::{DEFAULT_REQUEST_TIMEOUT, RequestClient, RequestError};
pub use enrichment::{ReviewEnricher, ServiceQueues};
pub use responder::{DEFAULT_DRAIN_TIMEOUT, Responder};
pub use search::{ReviewSearch, SearchError};

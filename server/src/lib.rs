//! Review search service.
//!
//! Looks up reviews by title and enriches each one with its owner's name,
//! its subject's name, and its genres, fetched over the message broker.
//! The search is served over HTTP and on the `search-review-service` queue.

pub mod app;
pub mod config;

pub use app::{Services, run, serve};
pub use config::Config;

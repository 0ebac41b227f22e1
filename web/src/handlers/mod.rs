//! HTTP request handlers.

pub mod health;
pub mod review;

pub use health::health_check;
pub use review::search_review;

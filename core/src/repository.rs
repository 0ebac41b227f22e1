//! Primary data source for reviews.
//!
//! # Implementations
//!
//! - **`PostgresReviewRepository`** (production): `ILIKE '%fragment%'` over the reviews table
//! - **`InMemoryReviewRepository`** (testing): substring match over a `Vec`

use crate::review::Review;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while querying the primary data source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Database connection or query error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A stored row could not be mapped to a [`Review`].
    #[error("Row mapping error: {0}")]
    MappingError(String),
}

/// Lookup of stored reviews by partial title.
///
/// # Dyn Compatibility
///
/// Explicit `Pin<Box<dyn Future>>` returns keep this usable as `Arc<dyn ReviewRepository>`.
pub trait ReviewRepository: Send + Sync {
    /// Return every review whose title contains `fragment`.
    ///
    /// No match is an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DatabaseError`] if the query fails.
    fn find_by_title(
        &self,
        fragment: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>, RepositoryError>> + Send + '_>>;
}

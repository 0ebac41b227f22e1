//! In-memory review repository.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use review_search_core::repository::{RepositoryError, ReviewRepository};
use review_search_core::review::Review;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// `Vec`-backed [`ReviewRepository`] matching titles by case-insensitive substring.
#[derive(Clone, Debug, Default)]
pub struct InMemoryReviewRepository {
    reviews: Arc<RwLock<Vec<Review>>>,
    queries: Arc<AtomicUsize>,
    failure: Arc<RwLock<Option<RepositoryError>>>,
}

impl InMemoryReviewRepository {
    /// Create a repository holding `reviews`.
    #[must_use]
    pub fn with_reviews(reviews: impl IntoIterator<Item = Review>) -> Self {
        let repository = Self::default();
        repository.reviews.write().unwrap().extend(reviews);
        repository
    }

    /// Add a review.
    pub fn insert(&self, review: Review) {
        self.reviews.write().unwrap().push(review);
    }

    /// Number of queries served so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Make every future query fail with `error`.
    pub fn fail_with(&self, error: RepositoryError) {
        *self.failure.write().unwrap() = Some(error);
    }
}

impl ReviewRepository for InMemoryReviewRepository {
    fn find_by_title(
        &self,
        fragment: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Review>, RepositoryError>> + Send + '_>> {
        let needle = fragment.to_lowercase();
        Box::pin(async move {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.failure.read().unwrap().clone() {
                return Err(error);
            }
            Ok(self
                .reviews
                .read()
                .unwrap()
                .iter()
                .filter(|review| review.title.to_lowercase().contains(&needle))
                .cloned()
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: i64, title: &str) -> Review {
        Review {
            id,
            title: title.to_string(),
            description: String::new(),
            user_fk: 1,
            media_fk: 1,
        }
    }

    #[tokio::test]
    async fn matches_partial_titles_case_insensitively() {
        let repository = InMemoryReviewRepository::with_reviews([
            review(1, "Dune Review"),
            review(2, "Arrival"),
            review(3, "dune: part two"),
        ]);

        let found = repository.find_by_title("DUNE").await.unwrap();
        let ids: Vec<i64> = found.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(repository.query_count(), 1);
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let repository = InMemoryReviewRepository::with_reviews([review(1, "Dune Review")]);
        assert!(repository.find_by_title("Alien").await.unwrap().is_empty());
    }
}

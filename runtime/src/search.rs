//! Search by title followed by batch enrichment.

use crate::client::RequestError;
use crate::enrichment::ReviewEnricher;
use crate::metrics::SearchMetrics;
use review_search_core::repository::{RepositoryError, ReviewRepository};
use review_search_core::review::EnrichedReview;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort a search.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The primary lookup failed.
    #[error("Review lookup failed: {0}")]
    Repository(#[from] RepositoryError),

    /// A dependent lookup failed for at least one review.
    #[error("Review enrichment failed: {0}")]
    Enrichment(#[from] RequestError),
}

/// Resolves reviews matching a title and enriches them.
#[derive(Clone)]
pub struct ReviewSearch {
    repository: Arc<dyn ReviewRepository>,
    enricher: ReviewEnricher,
}

impl ReviewSearch {
    /// Create a search over `repository`.
    #[must_use]
    pub fn new(repository: Arc<dyn ReviewRepository>, enricher: ReviewEnricher) -> Self {
        Self {
            repository,
            enricher,
        }
    }

    /// Find reviews whose title contains `title` and enrich each one.
    ///
    /// No match yields an empty vector without contacting any dependent service.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the lookup fails or any review's enrichment fails.
    #[tracing::instrument(skip(self), fields(matches))]
    pub async fn search_by_title(&self, title: &str) -> Result<Vec<EnrichedReview>, SearchError> {
        let outcome = self.run(title).await;
        match &outcome {
            Ok(enriched) => SearchMetrics::record_search(enriched.len()),
            Err(e) => {
                tracing::error!(error = %e, "Error searching reviews by title");
                SearchMetrics::record_failure();
            }
        }
        outcome
    }

    async fn run(&self, title: &str) -> Result<Vec<EnrichedReview>, SearchError> {
        let reviews = self.repository.find_by_title(title).await?;
        tracing::Span::current().record("matches", reviews.len());

        if reviews.is_empty() {
            tracing::info!("No reviews found matching the title");
            return Ok(Vec::new());
        }

        tracing::debug!(count = reviews.len(), "Fetched reviews, enriching");
        Ok(self.enricher.enrich_all(&reviews).await?)
    }
}

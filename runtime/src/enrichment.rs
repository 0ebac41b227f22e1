//! Concurrent enrichment of reviews with data owned by other services.
//!
//! For each review three lookups run concurrently and the enricher waits for
//! all of them before merging:
//!
//! ```text
//!                ┌──▶ user-service   {userId}   ──┐
//!  Review ───────┼──▶ media-service  {mediaId}  ──┼──▶ EnrichedReview
//!                └──▶ genre-service  {reviewId} ──┘
//! ```
//!
//! A lookup that times out, or that answers without usable data, degrades to
//! its placeholder. Any other failure aborts the review, and with it the batch.

use crate::client::{RequestClient, RequestError};
use futures::future::try_join_all;
use review_search_core::contract::{
    GenreLookup, GenreLookupRequest, MediaLookup, MediaLookupRequest, QueueContract, UserLookup,
    UserLookupRequest,
};
use review_search_core::review::{EnrichedReview, Review};
use std::sync::Arc;

/// Queue names of the dependent services.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceQueues {
    /// Owner identity
    pub user: String,
    /// Subject metadata
    pub media: String,
    /// Category tags
    pub genre: String,
}

impl Default for ServiceQueues {
    fn default() -> Self {
        Self {
            user: UserLookup::DEFAULT_QUEUE.to_string(),
            media: MediaLookup::DEFAULT_QUEUE.to_string(),
            genre: GenreLookup::DEFAULT_QUEUE.to_string(),
        }
    }
}

impl ServiceQueues {
    /// All three queue names.
    #[must_use]
    pub fn all(&self) -> [&str; 3] {
        [&self.user, &self.media, &self.genre]
    }
}

/// Merges reviews with their dependent lookups.
#[derive(Clone)]
pub struct ReviewEnricher {
    client: RequestClient,
    queues: Arc<ServiceQueues>,
}

impl ReviewEnricher {
    /// Create an enricher using the default queue names.
    #[must_use]
    pub fn new(client: RequestClient) -> Self {
        Self::with_queues(client, ServiceQueues::default())
    }

    /// Create an enricher using explicit queue names.
    #[must_use]
    pub fn with_queues(client: RequestClient, queues: ServiceQueues) -> Self {
        Self {
            client,
            queues: Arc::new(queues),
        }
    }

    /// Queue names in use.
    #[must_use]
    pub fn queues(&self) -> &ServiceQueues {
        &self.queues
    }

    /// Enrich one review.
    ///
    /// # Errors
    ///
    /// Returns the first non-timeout [`RequestError`] among the three lookups,
    /// after all three have settled.
    pub async fn enrich(&self, review: &Review) -> Result<EnrichedReview, RequestError> {
        let user_request = UserLookupRequest {
            user_id: review.user_fk,
        };
        let media_request = MediaLookupRequest {
            media_id: review.media_fk,
        };
        let genre_request = GenreLookupRequest {
            review_id: review.id,
        };

        let (user, media, genres) = tokio::join!(
            self.client
                .request::<UserLookup>(&self.queues.user, &user_request),
            self.client
                .request::<MediaLookup>(&self.queues.media, &media_request),
            self.client
                .request::<GenreLookup>(&self.queues.genre, &genre_request),
        );

        let user = degrade_timeout(user, review)?.flatten();
        let media = degrade_timeout(media, review)?.flatten();
        let genres = degrade_timeout(genres, review)?.flatten();

        Ok(EnrichedReview::assemble(
            review,
            user.as_ref(),
            media.as_ref(),
            genres.as_deref(),
        ))
    }

    /// Enrich every review concurrently, preserving order.
    ///
    /// An empty batch issues no lookups.
    ///
    /// # Errors
    ///
    /// The first review that fails aborts the whole batch; no partial result
    /// is returned.
    pub async fn enrich_all(&self, reviews: &[Review]) -> Result<Vec<EnrichedReview>, RequestError> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }
        try_join_all(reviews.iter().map(|review| self.enrich(review))).await
    }
}

/// A timed-out lookup becomes "no data"; every other error is logged and kept.
fn degrade_timeout<T>(
    result: Result<T, RequestError>,
    review: &Review,
) -> Result<Option<T>, RequestError> {
    match result {
        Ok(reply) => Ok(Some(reply)),
        Err(e) if e.is_timeout() => {
            tracing::warn!(review_id = review.id, error = %e, "Lookup timed out, using placeholder");
            Ok(None)
        }
        Err(e) => {
            tracing::error!(review_id = review.id, error = %e, "Lookup failed, aborting enrichment");
            Err(e)
        }
    }
}

//! Integration tests for review enrichment and title search.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use review_search_core::broker::Broker;
use review_search_core::repository::RepositoryError;
use review_search_core::review::{EnrichedReview, Review};
use review_search_runtime::{
    RequestClient, RequestError, ReviewEnricher, ReviewSearch, SearchError, ServiceQueues,
};
use review_search_testing::{InMemoryBroker, InMemoryReviewRepository, MockService};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Fixtures
// ============================================================================

fn dune() -> Review {
    Review {
        id: 7,
        title: "Dune Review".to_string(),
        description: "...".to_string(),
        user_fk: 3,
        media_fk: 9,
    }
}

fn review(id: i64, title: &str) -> Review {
    Review {
        id,
        title: title.to_string(),
        description: format!("description {id}"),
        user_fk: id * 10,
        media_fk: id * 100,
    }
}

struct Harness {
    broker: InMemoryBroker,
    enricher: ReviewEnricher,
}

impl Harness {
    fn new() -> Self {
        Self::with_timeout(Duration::from_secs(5))
    }

    fn with_timeout(timeout: Duration) -> Self {
        let broker = InMemoryBroker::new();
        let client =
            RequestClient::new(Arc::new(broker.clone()) as Arc<dyn Broker>).with_timeout(timeout);
        Self {
            broker,
            enricher: ReviewEnricher::new(client),
        }
    }

    fn service(&self, queue: &str) -> MockService {
        MockService::new(Arc::new(self.broker.clone()), queue)
    }

    /// Services that derive names from the request ids.
    async fn spawn_echo_services(&self) {
        self.service("user-service")
            .respond(|r| Some(json!({ "name": format!("user-{}", r["userId"]) })))
            .spawn()
            .await
            .unwrap();
        self.service("media-service")
            .respond(|r| Some(json!({ "name": format!("media-{}", r["mediaId"]) })))
            .spawn()
            .await
            .unwrap();
        self.service("genre-service")
            .respond(|r| Some(json!([{ "name": format!("genre-{}", r["reviewId"]) }])))
            .spawn()
            .await
            .unwrap();
    }

    async fn spawn_dune_services(&self, media: Option<Value>) {
        self.service("user-service")
            .reply_with(json!({ "name": "Alice" }))
            .spawn()
            .await
            .unwrap();
        let media_service = self.service("media-service");
        match media {
            Some(reply) => media_service.reply_with(reply),
            None => media_service.silent(),
        }
        .spawn()
        .await
        .unwrap();
        self.service("genre-service")
            .reply_with(json!([{ "name": "Sci-Fi" }, { "name": "Drama" }]))
            .spawn()
            .await
            .unwrap();
    }
}

async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

// ============================================================================
// Enrichment
// ============================================================================

#[tokio::test]
async fn test_dune_review_is_fully_enriched() {
    let harness = Harness::new();
    harness
        .spawn_dune_services(Some(json!({ "name": "Dune" })))
        .await;

    let enriched = harness.enricher.enrich(&dune()).await.unwrap();

    assert_eq!(
        enriched,
        EnrichedReview {
            id: 7,
            title: "Dune Review".to_string(),
            description: "...".to_string(),
            user_name: "Alice".to_string(),
            media_name: "Dune".to_string(),
            genre_names: "Sci-Fi, Drama".to_string(),
        }
    );

    assert_eq!(
        serde_json::to_value(&enriched).unwrap(),
        json!({
            "id": 7,
            "title": "Dune Review",
            "description": "...",
            "userName": "Alice",
            "mediaName": "Dune",
            "genreNames": "Sci-Fi, Drama",
        })
    );
}

#[tokio::test]
async fn test_each_lookup_carries_the_right_key() {
    let harness = Harness::new();
    harness.spawn_echo_services().await;

    harness.enricher.enrich(&dune()).await.unwrap();

    let user = harness.broker.published_to("user-service");
    let media = harness.broker.published_to("media-service");
    let genre = harness.broker.published_to("genre-service");
    assert_eq!(user[0].payload, br#"{"userId":3}"#.to_vec());
    assert_eq!(media[0].payload, br#"{"mediaId":9}"#.to_vec());
    assert_eq!(genre[0].payload, br#"{"reviewId":7}"#.to_vec());

    // Three independent private reply queues.
    let reply_queues: std::collections::HashSet<_> = [&user[0], &media[0], &genre[0]]
        .iter()
        .map(|envelope| envelope.reply_to.clone().unwrap())
        .collect();
    assert_eq!(reply_queues.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_media_timeout_degrades_to_unknown() {
    let harness = Harness::with_timeout(Duration::from_secs(2));
    harness.spawn_dune_services(None).await;

    let enriched = harness.enricher.enrich(&dune()).await.unwrap();

    assert_eq!(enriched.user_name, "Alice");
    assert_eq!(enriched.media_name, "Unknown");
    assert_eq!(enriched.genre_names, "Sci-Fi, Drama");

    settle().await;
    assert_eq!(harness.broker.live_reply_queues(), 0);
}

#[tokio::test]
async fn test_empty_payloads_become_placeholders() {
    let harness = Harness::new();
    harness
        .service("user-service")
        .reply_with(json!({}))
        .spawn()
        .await
        .unwrap();
    harness
        .service("media-service")
        .reply_with(json!({ "name": "" }))
        .spawn()
        .await
        .unwrap();
    harness
        .service("genre-service")
        .reply_with(json!([]))
        .spawn()
        .await
        .unwrap();

    let enriched = harness.enricher.enrich(&dune()).await.unwrap();

    assert_eq!(enriched.user_name, "Unknown");
    assert_eq!(enriched.media_name, "Unknown");
    assert_eq!(enriched.genre_names, "None");
    assert_eq!(enriched.title, "Dune Review");
}

#[tokio::test]
async fn test_null_replies_become_placeholders() {
    let harness = Harness::new();
    for queue in ["user-service", "media-service", "genre-service"] {
        harness.service(queue).spawn().await.unwrap();
    }

    let enriched = harness.enricher.enrich(&dune()).await.unwrap();

    assert_eq!(enriched.user_name, "Unknown");
    assert_eq!(enriched.media_name, "Unknown");
    assert_eq!(enriched.genre_names, "None");
}

#[tokio::test]
async fn test_empty_batch_issues_no_lookups() {
    let harness = Harness::new();

    let enriched = harness.enricher.enrich_all(&[]).await.unwrap();

    assert!(enriched.is_empty());
    assert_eq!(harness.broker.publish_count(), 0);
    assert_eq!(harness.broker.declared_reply_queues(), 0);
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_replies() {
    let harness = Harness::new();
    harness.spawn_echo_services().await;
    let reviews: Vec<_> = (1..=8).map(|id| review(id, "Batch")).collect();

    let enriched = harness.enricher.enrich_all(&reviews).await.unwrap();

    assert_eq!(enriched.len(), 8);
    for (review, enriched) in reviews.iter().zip(&enriched) {
        assert_eq!(enriched.id, review.id);
        assert_eq!(enriched.user_name, format!("user-{}", review.user_fk));
        assert_eq!(enriched.media_name, format!("media-{}", review.media_fk));
        assert_eq!(enriched.genre_names, format!("genre-{}", review.id));
    }
    assert_eq!(harness.broker.publish_count(), 8 * 3 * 2);

    settle().await;
    assert_eq!(harness.broker.live_reply_queues(), 0);
}

#[tokio::test]
async fn test_enrichment_is_repeatable() {
    let harness = Harness::new();
    harness
        .spawn_dune_services(Some(json!({ "name": "Dune" })))
        .await;

    let first = harness.enricher.enrich(&dune()).await.unwrap();
    let second = harness.enricher.enrich(&dune()).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_publish_failure_aborts_batch() {
    let harness = Harness::new();
    harness.spawn_echo_services().await;
    harness.broker.fail_publishes_to("genre-service");

    let err = harness
        .enricher
        .enrich_all(&[review(1, "a"), review(2, "b")])
        .await
        .unwrap_err();

    assert!(matches!(err, RequestError::Broker(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn test_wrong_reply_shape_is_an_error() {
    let harness = Harness::new();
    harness.spawn_echo_services().await;
    // Genre replies must be a list.
    harness
        .service("genre-service")
        .reply_with(json!({ "name": "Drama" }))
        .spawn()
        .await
        .unwrap();

    // Two consumers share genre-service round-robin, so one of two requests hits the bad one.
    let results = futures::future::join_all([
        harness.enricher.enrich(&dune()),
        harness.enricher.enrich(&dune()),
    ])
    .await;

    assert!(results.iter().any(|result| matches!(
        result,
        Err(RequestError::Decode { queue, .. }) if queue == "genre-service"
    )));
}

#[tokio::test]
async fn test_custom_queue_names_are_used() {
    let harness = Harness::new();
    let queues = ServiceQueues {
        user: "users.v2".to_string(),
        media: "media.v2".to_string(),
        genre: "genres.v2".to_string(),
    };
    for queue in queues.all() {
        harness.service(queue).spawn().await.unwrap();
    }
    let client = RequestClient::new(Arc::new(harness.broker.clone()) as Arc<dyn Broker>);
    let enricher = ReviewEnricher::with_queues(client, queues.clone());

    enricher.enrich(&dune()).await.unwrap();

    assert_eq!(enricher.queues(), &queues);
    assert_eq!(harness.broker.published_to("users.v2").len(), 1);
    assert!(harness.broker.published_to("user-service").is_empty());
}

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_enriches_matching_reviews() {
    let harness = Harness::new();
    harness
        .spawn_dune_services(Some(json!({ "name": "Dune" })))
        .await;
    let repository = InMemoryReviewRepository::with_reviews([dune(), review(8, "Arrival")]);
    let search = ReviewSearch::new(Arc::new(repository.clone()), harness.enricher.clone());

    let results = search.search_by_title("dune").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].media_name, "Dune");
    assert_eq!(repository.query_count(), 1);
}

#[tokio::test]
async fn test_search_without_matches_contacts_no_service() {
    let harness = Harness::new();
    let repository = InMemoryReviewRepository::with_reviews([dune()]);
    let search = ReviewSearch::new(Arc::new(repository), harness.enricher.clone());

    let results = search.search_by_title("Solaris").await.unwrap();

    assert!(results.is_empty());
    assert_eq!(harness.broker.publish_count(), 0);
}

#[tokio::test]
async fn test_search_reports_repository_failure() {
    let harness = Harness::new();
    let repository = InMemoryReviewRepository::default();
    repository.fail_with(RepositoryError::DatabaseError("connection refused".to_string()));
    let search = ReviewSearch::new(Arc::new(repository), harness.enricher.clone());

    let err = search.search_by_title("Dune").await.unwrap_err();

    assert!(matches!(err, SearchError::Repository(_)));
    assert_eq!(harness.broker.publish_count(), 0);
}

#[tokio::test]
async fn test_search_reports_enrichment_failure() {
    let harness = Harness::new();
    harness.spawn_echo_services().await;
    harness.broker.fail_publishes_to("user-service");
    let repository = InMemoryReviewRepository::with_reviews([dune()]);
    let search = ReviewSearch::new(Arc::new(repository), harness.enricher.clone());

    let err = search.search_by_title("Dune").await.unwrap_err();

    assert!(matches!(err, SearchError::Enrichment(RequestError::Broker(_))));
}

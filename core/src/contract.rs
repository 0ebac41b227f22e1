//! Typed, versioned request/reply contracts per queue.
//!
//! Each queue the service talks to has exactly one [`QueueContract`]. The
//! contract names the default queue, the payload schema version, and the
//! request and reply types. Decoding a reply into `Reply` is the validation
//! step: anything serde rejects is a decode error at the boundary.
//!
//! | contract          | default queue            | request              | reply                      |
//! |-------------------|--------------------------|----------------------|----------------------------|
//! | [`UserLookup`]    | `user-service`           | `{"userId": 3}`      | `{"name": "Alice"}` / null |
//! | [`MediaLookup`]   | `media-service`          | `{"mediaId": 9}`     | `{"name": "Dune"}` / null  |
//! | [`GenreLookup`]   | `genre-service`          | `{"reviewId": 7}`    | `[{"name": "Drama"}]` / null |
//! | [`SearchReviews`] | `search-review-service`  | `{"title": "Dune"}`  | `[EnrichedReview]`         |

use crate::review::EnrichedReview;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A request/reply schema bound to one queue.
pub trait QueueContract: Send + Sync + 'static {
    /// Queue name used unless configuration overrides it.
    const DEFAULT_QUEUE: &'static str;

    /// Schema version sent with every request.
    const SCHEMA_VERSION: u32;

    /// Request payload.
    type Request: Serialize + DeserializeOwned + Send + Sync;

    /// Reply payload.
    type Reply: Serialize + DeserializeOwned + Send;
}

/// A reply record that only matters for its `name`.
///
/// Unknown fields are ignored, and a missing or null `name` decodes as `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRecord {
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
}

impl NamedRecord {
    /// Create a record with a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// The name, if present and non-empty.
    #[must_use]
    pub fn usable_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Owner identity lookup.
#[derive(Debug, Clone, Copy)]
pub struct UserLookup;

/// Request body for [`UserLookup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookupRequest {
    /// Owner of the review
    pub user_id: i64,
}

impl QueueContract for UserLookup {
    const DEFAULT_QUEUE: &'static str = "user-service";
    const SCHEMA_VERSION: u32 = 1;
    type Request = UserLookupRequest;
    type Reply = Option<NamedRecord>;
}

/// Subject metadata lookup.
#[derive(Debug, Clone, Copy)]
pub struct MediaLookup;

/// Request body for [`MediaLookup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaLookupRequest {
    /// Reviewed media item
    pub media_id: i64,
}

impl QueueContract for MediaLookup {
    const DEFAULT_QUEUE: &'static str = "media-service";
    const SCHEMA_VERSION: u32 = 1;
    type Request = MediaLookupRequest;
    type Reply = Option<NamedRecord>;
}

/// Category tags lookup.
#[derive(Debug, Clone, Copy)]
pub struct GenreLookup;

/// Request body for [`GenreLookup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreLookupRequest {
    /// Review whose genres are requested
    pub review_id: i64,
}

impl QueueContract for GenreLookup {
    const DEFAULT_QUEUE: &'static str = "genre-service";
    const SCHEMA_VERSION: u32 = 1;
    type Request = GenreLookupRequest;
    type Reply = Option<Vec<NamedRecord>>;
}

/// Search served by this service on its own queue.
#[derive(Debug, Clone, Copy)]
pub struct SearchReviews;

/// Request body for [`SearchReviews`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReviewsRequest {
    /// Title fragment to match
    pub title: String,
}

impl QueueContract for SearchReviews {
    const DEFAULT_QUEUE: &'static str = "search-review-service";
    const SCHEMA_VERSION: u32 = 1;
    type Request = SearchReviewsRequest;
    type Reply = Vec<EnrichedReview>;
}

//! Review records before and after enrichment.

use crate::contract::NamedRecord;
use serde::{Deserialize, Serialize};

/// Placeholder for a user or media name that could not be resolved.
pub const UNKNOWN: &str = "Unknown";

/// Placeholder for a review with no resolvable genres.
pub const NO_GENRES: &str = "None";

/// A review as stored, matched by title.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review id
    pub id: i64,
    /// Review title
    pub title: String,
    /// Review body
    pub description: String,
    /// Author, owned by the user service
    pub user_fk: i64,
    /// Reviewed media item, owned by the media service
    pub media_fk: i64,
}

/// A review merged with the names resolved from dependent services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedReview {
    /// Review id
    pub id: i64,
    /// Review title
    pub title: String,
    /// Review body
    pub description: String,
    /// Author name, or [`UNKNOWN`]
    pub user_name: String,
    /// Media name, or [`UNKNOWN`]
    pub media_name: String,
    /// Comma-separated genre names, or [`NO_GENRES`]
    pub genre_names: String,
}

impl EnrichedReview {
    /// Merge a review with its dependent lookups.
    ///
    /// Each lookup degrades to its placeholder on its own when it carries no
    /// usable data (absent, null, or empty), leaving the other fields intact.
    #[must_use]
    pub fn assemble(
        review: &Review,
        user: Option<&NamedRecord>,
        media: Option<&NamedRecord>,
        genres: Option<&[NamedRecord]>,
    ) -> Self {
        let name_or_unknown = |record: Option<&NamedRecord>| {
            record
                .and_then(NamedRecord::usable_name)
                .unwrap_or(UNKNOWN)
                .to_string()
        };

        let genre_names = genres
            .map(|genres| {
                genres
                    .iter()
                    .filter_map(NamedRecord::usable_name)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|joined| !joined.is_empty())
            .unwrap_or_else(|| NO_GENRES.to_string());

        Self {
            id: review.id,
            title: review.title.clone(),
            description: review.description.clone(),
            user_name: name_or_unknown(user),
            media_name: name_or_unknown(media),
            genre_names,
        }
    }
}

//! Review search endpoint.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use review_search_core::review::EnrichedReview;

/// Search reviews whose title contains `title` and return them enriched.
///
/// # Endpoint
///
/// ```text
/// GET /review/:title
/// ```
///
/// # Response
///
/// ```json
/// [
///   {
///     "id": 7,
///     "title": "Dune Review",
///     "description": "...",
///     "userName": "Alice",
///     "mediaName": "Dune",
///     "genreNames": "Sci-Fi, Drama"
///   }
/// ]
/// ```
///
/// # Errors
///
/// Any search failure becomes a plain-text 500.
pub async fn search_review(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Json<Vec<EnrichedReview>>, AppError> {
    let reviews = state.search().search_by_title(&title).await?;
    tracing::info!(title = %title, results = reviews.len(), "Review search served");
    Ok(Json(reviews))
}

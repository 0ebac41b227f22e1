//! HTTP error responses.
//!
//! [`AppError`] bridges search and auth failures to HTTP responses. Bodies are
//! plain text; internal details are logged, never sent to the client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use review_search_runtime::SearchError;
use std::fmt;

/// Body returned when a search fails.
pub const SEARCH_FAILED_MESSAGE: &str = "Something went wrong while searching the review by title";

/// Error returned by handlers and middleware.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>) -> Result<Json<Vec<EnrichedReview>>, AppError> {
///     let reviews = state.search().search_by_title("Dune").await?;
///     Ok(Json(reviews))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    /// Sent to the client as the body
    message: String,
    /// Logged only
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Error with `status` and client-facing `message`.
    #[must_use]
    pub const fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            source: None,
        }
    }

    /// Attach the underlying error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// `401` with `message`.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message.into())
    }

    /// `500` with `message`.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// User-facing message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                ),
                None => tracing::error!(
                    status = %self.status,
                    message = %self.message,
                    "Internal server error"
                ),
            }
        }

        (self.status, self.message).into_response()
    }
}

impl From<SearchError> for AppError {
    fn from(err: SearchError) -> Self {
        Self::internal(SEARCH_FAILED_MESSAGE).with_source(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

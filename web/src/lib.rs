//! Axum HTTP surface for the review search service.
//!
//! # Routes
//!
//! | method | path            | auth   | response                               |
//! |--------|-----------------|--------|----------------------------------------|
//! | GET    | `/review/:title`| bearer | `200` JSON array of enriched reviews   |
//! | GET    | `/health`       | none   | `200 ok`                               |
//!
//! Search failures are a plain-text `500`; bad credentials are a `401`.
//!
//! # Request Flow
//!
//! 1. **Correlation id** is taken from `X-Correlation-ID` or generated
//! 2. **Bearer token** is checked on protected routes
//! 3. **Search** runs the title lookup and enrichment
//! 4. **Result** is serialized as JSON, or mapped to [`AppError`]
//!
//! # Example
//!
//! ```ignore
//! use review_search_web::{router, AppState, BearerAuth};
//!
//! let state = AppState::new(search).with_auth(BearerAuth::new(["secret"]));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3003").await?;
//! axum::serve(listener, router(state)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use auth::BearerAuth;
pub use error::AppError;
pub use middleware::{correlation_id_layer, RequestId, CORRELATION_ID_HEADER};
pub use state::AppState;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::trace::TraceLayer;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the service router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/review/:title", get(handlers::search_review))
        .route_layer(from_fn_with_state(state.clone(), auth::require_bearer));

    Router::new()
        .merge(protected)
        .route("/health", get(handlers::health_check))
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}

//! Bearer-token authentication for the search route.
//!
//! Requests must carry `Authorization: Bearer <token>` with one of the
//! configured tokens. With no tokens configured every request is rejected;
//! only [`BearerAuth::disabled`] lets requests through unchecked.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use constant_time_eq::constant_time_eq;
use std::sync::Arc;

/// Accepted bearer tokens.
///
/// The default accepts nothing.
#[derive(Clone, Debug, Default)]
pub struct BearerAuth {
    tokens: Arc<[String]>,
    open: bool,
}

impl BearerAuth {
    /// Accept any of `tokens`. Blank entries are ignored.
    #[must_use]
    pub fn new<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(Into::into)
            .map(|token: String| token.trim().to_string())
            .filter(|token| !token.is_empty())
            .collect();
        Self {
            tokens: tokens.into(),
            open: false,
        }
    }

    /// Accept every request without checking credentials.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            tokens: Arc::from(Vec::new()),
            open: true,
        }
    }

    /// Whether requests are checked at all.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        !self.open
    }

    /// Number of accepted tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Check an `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Returns a 401 [`AppError`] if the header is missing, malformed, or
    /// carries an unknown token.
    pub fn verify(&self, header: Option<&str>) -> Result<(), AppError> {
        if self.open {
            return Ok(());
        }
        let header = header.ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::unauthorized("Expected a bearer token"))?;
        // Compare against every token so timing does not reveal which one matched.
        let matched = self.tokens.iter().fold(false, |matched, known| {
            constant_time_eq(known.as_bytes(), token.as_bytes()) | matched
        });
        if matched {
            Ok(())
        } else {
            Err(AppError::unauthorized("Invalid token"))
        }
    }
}

/// Middleware rejecting requests that fail [`BearerAuth::verify`].
///
/// # Errors
///
/// Returns a 401 [`AppError`] for missing or unknown credentials.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(e) = state.auth().verify(header) {
        tracing::warn!(reason = %e.message(), "Rejected unauthenticated request");
        return Err(e);
    }
    Ok(next.run(request).await)
}

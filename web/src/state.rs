//! Application state for Axum handlers.

use crate::auth::BearerAuth;
use review_search_runtime::ReviewSearch;

/// State shared across all HTTP handlers.
///
/// Cheap to clone; every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    search: ReviewSearch,
    auth: BearerAuth,
}

impl AppState {
    /// Create application state with no accepted tokens.
    ///
    /// Protected routes answer `401` until [`AppState::with_auth`] configures
    /// credentials.
    #[must_use]
    pub fn new(search: ReviewSearch) -> Self {
        Self {
            search,
            auth: BearerAuth::default(),
        }
    }

    /// Set the credentials checked on protected routes.
    #[must_use]
    pub fn with_auth(mut self, auth: BearerAuth) -> Self {
        self.auth = auth;
        self
    }

    /// The review search.
    #[must_use]
    pub const fn search(&self) -> &ReviewSearch {
        &self.search
    }

    /// The accepted credentials.
    #[must_use]
    pub const fn auth(&self) -> &BearerAuth {
        &self.auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_is_clone_send_sync() {
        fn assert_clone<T: Clone + Send + Sync + 'static>() {}
        assert_clone::<AppState>();
    }
}

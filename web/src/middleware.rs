//! Request id propagation.
//!
//! [`RequestIdLayer`] gives every request a [`RequestId`]: the UUID sent in
//! `X-Correlation-ID` when it parses, a fresh v4 otherwise. The id is put in
//! request extensions, attached to an `http_request` span wrapping the inner
//! service, and echoed back on the response.
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/review/:title", get(search_review))
//!     .layer(correlation_id_layer());
//! ```

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    response::Response,
};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request id in both directions.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Id of the current request, stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Reuse a well-formed id from `headers`, or mint a new one.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let inbound = headers
            .get(CORRELATION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok());
        Self(inbound.unwrap_or_else(Uuid::new_v4))
    }

    fn header_value(self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0.hyphenated().to_string()).ok()
    }
}

/// Layer installing [`RequestIdService`].
#[must_use]
pub const fn correlation_id_layer() -> RequestIdLayer {
    RequestIdLayer
}

/// See the module docs.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

/// Service wrapper produced by [`RequestIdLayer`].
#[derive(Clone, Debug)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S> Service<Request> for RequestIdService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = RequestId::from_headers(request.headers());
        let span = tracing::info_span!(
            "http_request",
            correlation_id = %id.0,
            method = %request.method(),
            path = %request.uri().path(),
        );
        request.extensions_mut().insert(id);

        let pending = self.inner.call(request).instrument(span);
        Box::pin(async move {
            let mut response = pending.await?;
            if let Some(value) = id.header_value() {
                response.headers_mut().insert(CORRELATION_ID_HEADER, value);
            }
            Ok(response)
        })
    }
}

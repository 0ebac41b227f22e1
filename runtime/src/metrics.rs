//! Prometheus metrics for the request/reply layer.
//!
//! This module provides metric collection for:
//! - Correlated requests (sent, replied, timed out, cancelled)
//! - Replies ignored because of a foreign correlation id
//! - Searches and the number of reviews they enriched
//!
//! Recording is a no-op until [`MetricsServer::start`] installs a recorder.
//!
//! # Example
//!
//! ```rust,no_run
//! use review_search_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Serve metrics on port 9090
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//!
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics recorder
    #[error("Failed to install metrics recorder: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address to bind to (e.g., `0.0.0.0:9090`)
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the global recorder and spawn the HTTP exporter.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if a recorder is already installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let handle = recorder.handle();
        metrics::set_global_recorder(recorder).map_err(|_| {
            MetricsError::Install("a metrics recorder is already installed".to_string())
        })?;

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(addr = %addr, "Metrics exporter stopped");
            }
        });

        register_metrics();
        self.handle = Some(handle);
        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "broker_requests_sent_total",
        "Total number of correlated requests published"
    );
    describe_counter!(
        "broker_replies_received_total",
        "Total number of matching replies received"
    );
    describe_counter!(
        "broker_request_timeouts_total",
        "Total number of requests whose deadline expired"
    );
    describe_counter!(
        "broker_requests_cancelled_total",
        "Total number of requests cancelled by the caller"
    );
    describe_counter!(
        "broker_replies_mismatched_total",
        "Total number of replies ignored for a foreign correlation id"
    );
    describe_histogram!(
        "broker_request_duration_seconds",
        "Round trip from publish to matching reply"
    );

    describe_counter!("review_searches_total", "Total number of searches");
    describe_counter!(
        "review_search_failures_total",
        "Total number of searches that failed"
    );
    describe_histogram!(
        "review_search_results",
        "Number of enriched reviews returned per search"
    );
}

/// Correlated request metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a published request.
    pub fn record_sent(queue: &str) {
        counter!("broker_requests_sent_total", "queue" => queue.to_string()).increment(1);
    }

    /// Record a matching reply and the round trip.
    pub fn record_reply(queue: &str, duration: Duration) {
        counter!("broker_replies_received_total", "queue" => queue.to_string()).increment(1);
        histogram!("broker_request_duration_seconds", "queue" => queue.to_string())
            .record(duration.as_secs_f64());
    }

    /// Record an expired deadline.
    pub fn record_timeout(queue: &str) {
        counter!("broker_request_timeouts_total", "queue" => queue.to_string()).increment(1);
    }

    /// Record a cancelled request.
    pub fn record_cancelled(queue: &str) {
        counter!("broker_requests_cancelled_total", "queue" => queue.to_string()).increment(1);
    }

    /// Record an ignored reply.
    pub fn record_mismatch(queue: &str) {
        counter!("broker_replies_mismatched_total", "queue" => queue.to_string()).increment(1);
    }
}

/// Search metrics recorder.
pub struct SearchMetrics;

impl SearchMetrics {
    /// Record a completed search.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_search(results: usize) {
        counter!("review_searches_total").increment(1);
        histogram!("review_search_results").record(results as f64);
    }

    /// Record a failed search.
    pub fn record_failure() {
        counter!("review_searches_total").increment(1);
        counter!("review_search_failures_total").increment(1);
    }
}

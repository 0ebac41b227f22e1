//! Service wiring: broker, repository, search, responder, and HTTP server.
//!
//! [`run`] connects the real infrastructure and hands it to [`serve`], which
//! owns the lifecycle:
//!
//! 1. declare every service queue (failures are logged, start-up continues)
//! 2. answer `SearchReviews` requests on the search queue
//! 3. serve HTTP until the shutdown future completes
//! 4. stop the responder and let in-flight searches reply, then close the
//!    broker connection

use crate::config::Config;
use review_search_core::broker::Broker;
use review_search_core::contract::SearchReviews;
use review_search_core::repository::ReviewRepository;
use review_search_postgres::PostgresReviewRepository;
use review_search_rabbitmq::{RabbitMqBroker, declare_service_queues};
use review_search_runtime::metrics::MetricsServer;
use review_search_runtime::{RequestClient, Responder, ReviewEnricher, ReviewSearch};
use review_search_web::{AppState, BearerAuth, router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Name the broker connection reports to the server.
pub const CONNECTION_NAME: &str = "review-search";

/// External dependencies the service runs on.
#[derive(Clone)]
pub struct Services {
    /// Message broker shared by every request and the responder
    pub broker: Arc<dyn Broker>,
    /// Review storage
    pub repository: Arc<dyn ReviewRepository>,
}

/// Build the search over `services` using the configured queues and deadline.
#[must_use]
pub fn build_search(services: &Services, config: &Config) -> ReviewSearch {
    let client = RequestClient::new(Arc::clone(&services.broker))
        .with_timeout(config.broker.request_timeout);
    let enricher = ReviewEnricher::with_queues(client, config.broker.queues.clone());
    ReviewSearch::new(Arc::clone(&services.repository), enricher)
}

/// Answer `SearchReviews` requests on `queue` until `shutdown` fires.
pub fn spawn_search_responder(
    broker: Arc<dyn Broker>,
    queue: String,
    search: ReviewSearch,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let responder = Responder::new(broker, queue);
        let handler = move |request: review_search_core::contract::SearchReviewsRequest| {
            let search = search.clone();
            async move {
                search
                    .search_by_title(&request.title)
                    .await
                    .map_err(|e| e.to_string())
            }
        };
        if let Err(e) = responder.serve::<SearchReviews, _, _>(handler, shutdown).await {
            error!(queue = %responder.queue(), error = %e, "Search responder failed");
        }
    })
}

/// Credentials for the search route.
///
/// Without `AUTH_TOKENS` every search is rejected unless `AUTH_DISABLED` is set.
#[must_use]
pub fn bearer_auth(config: &Config) -> BearerAuth {
    if config.auth_disabled {
        warn!("AUTH_DISABLED is set, search route is unauthenticated");
        return BearerAuth::disabled();
    }
    let auth = BearerAuth::new(config.auth_tokens.clone());
    if auth.token_count() == 0 {
        warn!("No AUTH_TOKENS configured, search route rejects every request");
    }
    auth
}

/// Connect the broker and the review database described by `config`.
///
/// The broker connects lazily on first use.
///
/// # Errors
///
/// Returns an error if the broker URI is invalid, the database is unreachable,
/// or migrations fail.
pub async fn connect(config: &Config) -> anyhow::Result<Services> {
    let broker = RabbitMqBroker::builder()
        .uri(&config.broker.url)
        .connection_name(CONNECTION_NAME)
        .build()?;

    info!("Connecting to review database...");
    let repository =
        PostgresReviewRepository::connect(&config.database.url, config.database.max_connections)
            .await?;
    if config.database.run_migrations {
        repository.migrate().await?;
        info!("Migrations applied");
    }

    Ok(Services {
        broker: Arc::new(broker),
        repository: Arc::new(repository),
    })
}

/// Run the service on `listener` until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the HTTP server fails. Broker close errors are logged.
pub async fn serve<F>(
    config: &Config,
    services: Services,
    listener: TcpListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    declare_service_queues(services.broker.as_ref(), &config.broker.all_queues()).await;

    let search = build_search(&services, config);
    let stop = CancellationToken::new();
    let responder = spawn_search_responder(
        Arc::clone(&services.broker),
        config.broker.search_queue.clone(),
        search.clone(),
        stop.clone(),
    );

    let app = router(AppState::new(search).with_auth(bearer_auth(config)));

    info!(address = %listener.local_addr()?, "Server listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    stop.cancel();
    if let Err(e) = responder.await {
        error!(error = %e, "Search responder task panicked");
    }
    if let Err(e) = services.broker.close().await {
        error!(error = %e, "Failed to close broker connection");
    }

    served?;
    info!("Server stopped");
    Ok(())
}

/// Start metrics, connect, bind, and serve until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if connecting, binding, or serving fails.
pub async fn run<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let _metrics = config.metrics_addr.and_then(|addr| {
        let mut server = MetricsServer::new(addr);
        match server.start() {
            Ok(()) => Some(server),
            Err(e) => {
                warn!(error = %e, "Metrics exporter disabled");
                None
            }
        }
    });

    let services = connect(&config).await?;

    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    serve(&config, services, listener, shutdown).await
}

//! Start-up queue declaration.

use review_search_core::broker::Broker;

/// Declare each named queue, returning how many were declared.
///
/// A queue that cannot be declared is logged and skipped; start-up carries on.
pub async fn declare_service_queues(broker: &dyn Broker, queues: &[&str]) -> usize {
    let mut declared = 0;
    for queue in queues {
        match broker.declare_queue(queue).await {
            Ok(()) => declared += 1,
            Err(e) => tracing::error!(queue = %queue, error = %e, "Error setting up queue"),
        }
    }
    tracing::info!(declared, requested = queues.len(), "Service queues declared");
    declared
}

use chrono::Utc;
use shared::Services;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Starts the order expiry sweep. The handle runs until the process exits.
pub fn start_expiry_worker(services: Services, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        tracing::info!("order expiry worker started, sweeping every {:?}", every);
        loop {
            timer.tick().await;
            match services.orders.expire_overdue(None, Utc::now()).await {
                Ok(report) if report.expired > 0 => {
                    tracing::info!(expired = report.expired, notified = report.notified, "expiry sweep finished");
                }
                Ok(_) => tracing::debug!("expiry sweep found nothing overdue"),
                Err(e) => tracing::error!("expiry sweep failed: {}", e),
            }
        }
    })
}

use std::net::SocketAddr;
use tracing::{info, warn};

pub const CRON_RUNS: &str = "farmstead_cron_runs_total";
pub const NOTIFICATIONS_PROCESSED: &str = "farmstead_notifications_processed_total";
pub const NOTIFICATIONS_SENT: &str = "farmstead_notifications_sent_total";
pub const NOTIFICATIONS_FAILED: &str = "farmstead_notifications_failed_total";
pub const PUSH_DELIVERED: &str = "farmstead_push_delivered_total";
pub const PUSH_FAILED: &str = "farmstead_push_failed_total";
pub const PUSH_PRUNED: &str = "farmstead_push_subscriptions_pruned_total";
pub const CRON_DURATION: &str = "farmstead_cron_duration_seconds";
pub const WRITES: &str = "farmstead_writes_total";

pub fn init_metrics(port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed (possibly already installed): {}", e),
    }
}

/// Counts a successful write against a resource, e.g. `record_write("breeding")`.
pub fn record_write(resource: &'static str) {
    metrics::counter!(WRITES, "resource" => resource).increment(1);
}

//! Prometheus metrics endpoint

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Idempotent; the first call wins.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = HANDLE.set(handle);
            }
            Err(e) => {
                tracing::warn!(error = %e, "metrics recorder already installed");
            }
        }
    }
    HANDLE.get()
}

/// Render current metrics in the Prometheus text format
pub async fn metrics_handler() -> String {
    HANDLE.get().map(|h| h.render()).unwrap_or_default()
}

//! Orchestration metrics
//!
//! Thin wrappers over the `metrics` recorder so counter names stay in one
//! place. Rendered by the server's Prometheus exporter.

pub fn record_inbound(channel: &'static str) {
    metrics::counter!("leadflow_inbound_total", "channel" => channel).increment(1);
}

pub fn record_outbound(channel: &'static str, success: bool) {
    let result = if success { "success" } else { "failure" };
    metrics::counter!("leadflow_outbound_total", "channel" => channel, "result" => result)
        .increment(1);
}

pub fn record_sms_blocked(reason: &'static str) {
    metrics::counter!("leadflow_sms_blocked_total", "reason" => reason).increment(1);
}

pub fn record_opt_out() {
    metrics::counter!("leadflow_opt_out_total").increment(1);
}

pub fn record_handoff(to: &'static str) {
    metrics::counter!("leadflow_handoff_total", "to" => to).increment(1);
}

pub fn record_degraded(collaborator: &'static str) {
    metrics::counter!("leadflow_degraded_total", "collaborator" => collaborator).increment(1);
}

pub fn record_realtime_intervention() {
    metrics::counter!("leadflow_realtime_interventions_total").increment(1);
}

pub fn record_handle_latency(seconds: f64) {
    metrics::histogram!("leadflow_handle_inbound_seconds").record(seconds);
}

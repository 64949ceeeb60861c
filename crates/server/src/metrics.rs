//! Prometheus metrics for observability.
//!
//! This module provides HTTP request metrics and sync service gauges, plus
//! the core sync, upstream and queue metrics registered from
//! `assetsync_core::metrics`.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

use crate::state::AppState;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "assetsync_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("assetsync_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// Push notifications rejected for a wrong channel.
pub static PUSH_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "assetsync_push_rejected_total",
            "Push notifications rejected",
        ),
        &["reason"],
    )
    .unwrap()
});

// =============================================================================
// Sync Service Metrics (collected dynamically)
// =============================================================================

/// Whether a run is executing (1) or not (0).
pub static SYNC_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "assetsync_sync_running",
        "Whether a sync run is executing (1) or idle (0)",
    )
    .unwrap()
});

/// Whether a run waits in the pending slot.
pub static SYNC_PENDING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "assetsync_sync_pending",
        "Whether a sync run is waiting behind the active one",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(PUSH_REJECTED_TOTAL.clone()))
        .unwrap();
    registry.register(Box::new(SYNC_RUNNING.clone())).unwrap();
    registry.register(Box::new(SYNC_PENDING.clone())).unwrap();

    assetsync_core::metrics::register_core_metrics(registry);
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Update gauges from the current service state before encoding.
pub fn collect_dynamic_metrics(state: &AppState) {
    let queue = state.status().queue;
    SYNC_RUNNING.set(i64::from(queue.running));
    SYNC_PENDING.set(i64::from(queue.pending.is_some()));
}

//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sync runs (outcome, duration, delivered assets)
//! - Upstream access (retries, token refreshes)
//! - Execution queue admissions

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

// =============================================================================
// Sync Runs
// =============================================================================

/// Sync runs total by kind and outcome.
pub static SYNC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("assetsync_sync_runs_total", "Total sync runs"),
        &["kind", "outcome"], // kind: "scheduled", "push"; outcome: "completed", "aborted", "failed"
    )
    .unwrap()
});

/// Sync run duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("assetsync_sync_duration_seconds", "Duration of sync runs")
            .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0, 3600.0]),
        &["kind"],
    )
    .unwrap()
});

/// Assets delivered to the target by mode.
pub static ASSETS_DELIVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "assetsync_assets_delivered_total",
            "Assets delivered to the target",
        ),
        &["mode"], // "new", "update", "new_compound", "update_compound"
    )
    .unwrap()
});

/// Metadata elements imported by category.
pub static METADATA_IMPORTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "assetsync_metadata_elements_imported_total",
            "Metadata elements imported into the target",
        ),
        &["category"],
    )
    .unwrap()
});

// =============================================================================
// Upstream Access
// =============================================================================

/// Upstream call retries by operation.
pub static UPSTREAM_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "assetsync_upstream_retries_total",
            "Upstream calls retried after a failure",
        ),
        &["operation"],
    )
    .unwrap()
});

/// Token refresh attempts by result.
pub static TOKEN_REFRESHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("assetsync_token_refreshes_total", "Token refresh attempts"),
        &["result"], // "success", "rejected", "error", "unavailable"
    )
    .unwrap()
});

// =============================================================================
// Execution Queue
// =============================================================================

/// Queue submissions by admission result.
pub static QUEUE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "assetsync_queue_requests_total",
            "Run requests submitted to the execution queue",
        ),
        &["admission"], // "granted", "queued", "coalesced"
    )
    .unwrap()
});

/// Register all core metrics with the given registry.
pub fn register_core_metrics(registry: &Registry) {
    registry.register(Box::new(SYNC_RUNS.clone())).ok();
    registry.register(Box::new(SYNC_DURATION.clone())).ok();
    registry.register(Box::new(ASSETS_DELIVERED.clone())).ok();
    registry.register(Box::new(METADATA_IMPORTED.clone())).ok();
    registry.register(Box::new(UPSTREAM_RETRIES.clone())).ok();
    registry.register(Box::new(TOKEN_REFRESHES.clone())).ok();
    registry.register(Box::new(QUEUE_REQUESTS.clone())).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_core_metrics() {
        let registry = Registry::new();
        register_core_metrics(&registry);

        SYNC_RUNS.with_label_values(&["scheduled", "completed"]).inc();
        QUEUE_REQUESTS.with_label_values(&["granted"]).inc();

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"assetsync_sync_runs_total".to_string()));
        assert!(names.contains(&"assetsync_queue_requests_total".to_string()));
    }

    #[test]
    fn test_register_twice_is_harmless() {
        let registry = Registry::new();
        register_core_metrics(&registry);
        register_core_metrics(&registry);
    }
}

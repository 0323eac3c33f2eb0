//! # Prometheus Metrics
//!
//! Exposes ledger activity for scraping at `/metrics` on the configured
//! metrics port. All metrics live in a dedicated [`prometheus::Registry`]
//! under the `vesting` namespace.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    core::Collector, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Accepted plain transfers.
    pub transfers_total: IntCounter,
    /// Accepted vesting transfers (locks created).
    pub vesting_transfers_total: IntCounter,
    /// Successful unlocks.
    pub unlocks_total: IntCounter,
    /// Rejected operations, labelled by error kind.
    pub rejected_operations_total: IntCounterVec,
    /// Funds still restricted across all locks.
    pub locked_supply: IntGauge,
    /// Locks with funds still restricted.
    pub active_locks: IntGauge,
    /// Total token supply.
    pub total_supply: IntGauge,
    /// Latency of ledger operations in seconds.
    pub operation_latency_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric registration");
    collector
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vesting".into()), None)
            .expect("failed to create prometheus registry");

        let transfers_total = register(
            &registry,
            IntCounter::new("transfers_total", "Accepted plain transfers").expect("metric creation"),
        );
        let vesting_transfers_total = register(
            &registry,
            IntCounter::new(
                "vesting_transfers_total",
                "Accepted transfers that created a vesting lock",
            )
            .expect("metric creation"),
        );
        let unlocks_total = register(
            &registry,
            IntCounter::new("unlocks_total", "Successful vesting releases").expect("metric creation"),
        );
        let rejected_operations_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "rejected_operations_total",
                    "Ledger operations rejected, by error kind",
                ),
                &["kind"],
            )
            .expect("metric creation"),
        );
        let locked_supply = register(
            &registry,
            IntGauge::new("locked_supply", "Funds still restricted by vesting locks")
                .expect("metric creation"),
        );
        let active_locks = register(
            &registry,
            IntGauge::new("active_locks", "Vesting locks with funds still restricted")
                .expect("metric creation"),
        );
        let total_supply = register(
            &registry,
            IntGauge::new("total_supply", "Total token supply").expect("metric creation"),
        );
        let operation_latency_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "operation_latency_seconds",
                    "Ledger operation latency in seconds",
                )
                .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
            )
            .expect("metric creation"),
        );

        Self {
            registry,
            transfers_total,
            vesting_transfers_total,
            unlocks_total,
            rejected_operations_total,
            locked_supply,
            active_locks,
            total_supply,
            operation_latency_seconds,
        }
    }

    /// Counts a rejected operation.
    pub fn record_rejection(&self, kind: &str) {
        self.rejected_operations_total.with_label_values(&[kind]).inc();
    }

    /// Refreshes the supply gauges from ledger totals.
    pub fn observe_supply(&self, total_supply: u64, locked: u64, active_locks: usize) {
        self.total_supply.set(clamp_i64(total_supply));
        self.locked_supply.set(clamp_i64(locked));
        self.active_locks.set(active_locks as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Gauges are `i64`; token amounts above `i64::MAX` are reported as the max.
fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the counters and gauges that describe alert correlation and the RPC surface.

use std::sync::Arc;

use prometheus::{Encoder, Error as PrometheusError, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    alerts_processed_total: IntCounterVec,
    waiters_resolved_total: IntCounterVec,
    handler_failures_total: IntCounterVec,
    rpc_requests_total: IntCounterVec,
    waiters_pending: IntGauge,
    active_torrents: IntGauge,
}

/// Snapshot of selected gauges and counters for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Number of waiters currently registered.
    pub waiters_pending: i64,
    /// Number of torrents known to the engine session.
    pub active_torrents: i64,
    /// Waiters resolved by a matching alert.
    pub waiters_matched_total: u64,
    /// Waiters resolved by expiry.
    pub waiters_expired_total: u64,
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::Metric { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::Metric { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Metric { name, source })
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let alerts_processed_total = counter_vec(
            "alerts_processed_total",
            "Engine alerts drained by the pump, by kind",
            &["kind"],
        )?;
        let waiters_resolved_total = counter_vec(
            "waiters_resolved_total",
            "Waiters removed from the registry, by outcome",
            &["outcome"],
        )?;
        let handler_failures_total = counter_vec(
            "handler_failures_total",
            "Standing alert handler failures, by handler",
            &["handler"],
        )?;
        let rpc_requests_total = counter_vec(
            "rpc_requests_total",
            "RPC requests served, by procedure and status code",
            &["procedure", "code"],
        )?;
        let waiters_pending = gauge("waiters_pending", "Waiters awaiting a matching alert")?;
        let active_torrents = gauge("active_torrents", "Torrents known to the engine session")?;

        register(&registry, "alerts_processed_total", &alerts_processed_total)?;
        register(&registry, "waiters_resolved_total", &waiters_resolved_total)?;
        register(&registry, "handler_failures_total", &handler_failures_total)?;
        register(&registry, "rpc_requests_total", &rpc_requests_total)?;
        register(&registry, "waiters_pending", &waiters_pending)?;
        register(&registry, "active_torrents", &active_torrents)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                alerts_processed_total,
                waiters_resolved_total,
                handler_failures_total,
                rpc_requests_total,
                waiters_pending,
                active_torrents,
            }),
        })
    }

    /// Increment the processed alert counter for the given alert kind.
    pub fn inc_alert(&self, kind: &str) {
        self.inner
            .alerts_processed_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Increment the resolved waiter counter (`matched`, `expired`, or `retracted`).
    pub fn inc_waiter_resolved(&self, outcome: &str) {
        self.inner
            .waiters_resolved_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Increment the failure counter for a standing handler.
    pub fn inc_handler_failure(&self, handler: &str) {
        self.inner
            .handler_failures_total
            .with_label_values(&[handler])
            .inc();
    }

    /// Increment the RPC request counter for the given procedure and status code.
    pub fn inc_rpc_request(&self, procedure: &str, status: u16) {
        self.inner
            .rpc_requests_total
            .with_label_values(&[procedure, &status.to_string()])
            .inc();
    }

    /// Set the pending waiter gauge.
    pub fn set_waiters_pending(&self, count: usize) {
        self.inner
            .waiters_pending
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Set the active torrent gauge.
    pub fn set_active_torrents(&self, count: usize) {
        self.inner
            .active_torrents
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Render { source })?;
        String::from_utf8(buffer).map_err(|err| TelemetryError::Render {
            source: PrometheusError::Msg(err.to_string()),
        })
    }

    /// Take a point-in-time snapshot of the most relevant gauges and counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let resolved = &self.inner.waiters_resolved_total;
        MetricsSnapshot {
            waiters_pending: self.inner.waiters_pending.get(),
            active_torrents: self.inner.active_torrents.get(),
            waiters_matched_total: resolved.with_label_values(&["matched"]).get(),
            waiters_expired_total: resolved.with_label_values(&["expired"]).get(),
        }
    }
}

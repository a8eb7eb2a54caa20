//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Flow counters
    pub flows_started: IntCounterVec,
    pub flows_failed: IntCounterVec,
    pub flows_completed: IntCounterVec,

    // Solana-side counters
    pub nonce_accounts_created: IntCounter,
    pub blockhash_retries: IntCounter,

    // Sui-side counters
    pub threshold_polls: IntCounter,

    // Histograms
    pub service_latency: HistogramVec,
    pub flow_latency: HistogramVec,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let flows_started = IntCounterVec::new(
            Opts::new("bridge_flows_started_total", "Bridge flows started"),
            &["flow"],
        )?;

        let flows_failed = IntCounterVec::new(
            Opts::new(
                "bridge_flows_failed_total",
                "Bridge flows failed, by the phase reached",
            ),
            &["flow", "phase"],
        )?;

        let flows_completed = IntCounterVec::new(
            Opts::new("bridge_flows_completed_total", "Bridge flows completed"),
            &["flow"],
        )?;

        let nonce_accounts_created = IntCounter::with_opts(Opts::new(
            "bridge_nonce_accounts_created_total",
            "Durable nonce accounts created",
        ))?;

        let blockhash_retries = IntCounter::with_opts(Opts::new(
            "bridge_blockhash_retries_total",
            "Transactions rebuilt after a stale blockhash",
        ))?;

        let threshold_polls = IntCounter::with_opts(Opts::new(
            "bridge_threshold_polls_total",
            "Reads of threshold signing objects",
        ))?;

        let service_latency = HistogramVec::new(
            HistogramOpts::new(
                "bridge_service_latency_seconds",
                "Enclave and solver call latency",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["service"],
        )?;

        let flow_latency = HistogramVec::new(
            HistogramOpts::new("bridge_flow_latency_seconds", "End-to-end flow latency")
                .buckets(vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["flow"],
        )?;

        // Register all metrics
        registry.register(Box::new(flows_started.clone()))?;
        registry.register(Box::new(flows_failed.clone()))?;
        registry.register(Box::new(flows_completed.clone()))?;
        registry.register(Box::new(nonce_accounts_created.clone()))?;
        registry.register(Box::new(blockhash_retries.clone()))?;
        registry.register(Box::new(threshold_polls.clone()))?;
        registry.register(Box::new(service_latency.clone()))?;
        registry.register(Box::new(flow_latency.clone()))?;

        Ok(Self {
            registry,
            flows_started,
            flows_failed,
            flows_completed,
            nonce_accounts_created,
            blockhash_retries,
            threshold_polls,
            service_latency,
            flow_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of every registered metric
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

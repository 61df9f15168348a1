//! Metrics collection for quote runs

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub quotes_attempted: IntCounter,
    pub quotes_succeeded: IntCounter,
    pub quotes_failed: IntCounterVec,
    pub result_lines_found: IntCounter,

    // Histograms
    pub rpc_latency: Histogram,
    pub quote_latency: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let quotes_attempted = IntCounter::with_opts(Opts::new(
            "quotes_attempted_total",
            "Quote iterations started",
        ))?;

        let quotes_succeeded = IntCounter::with_opts(Opts::new(
            "quotes_succeeded_total",
            "Quote iterations confirmed on chain",
        ))?;

        let quotes_failed = IntCounterVec::new(
            Opts::new("quotes_failed_total", "Quote iterations that failed"),
            &["category"],
        )?;

        let result_lines_found = IntCounter::with_opts(Opts::new(
            "quote_result_lines_total",
            "Simulations that produced a quote result line",
        ))?;

        let rpc_latency = Histogram::with_opts(
            HistogramOpts::new("rpc_latency_seconds", "RPC round trip latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;

        let quote_latency = Histogram::with_opts(
            HistogramOpts::new("quote_latency_seconds", "Build to confirmation latency per amount")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]),
        )?;

        registry.register(Box::new(quotes_attempted.clone()))?;
        registry.register(Box::new(quotes_succeeded.clone()))?;
        registry.register(Box::new(quotes_failed.clone()))?;
        registry.register(Box::new(result_lines_found.clone()))?;
        registry.register(Box::new(rpc_latency.clone()))?;
        registry.register(Box::new(quote_latency.clone()))?;

        Ok(Self {
            registry,
            quotes_attempted,
            quotes_succeeded,
            quotes_failed,
            result_lines_found,
            rpc_latency,
            quote_latency,
        })
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn record_failure(&self, category: &str) {
        self.quotes_failed.with_label_values(&[category]).inc();
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

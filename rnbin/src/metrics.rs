use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use rnbin_core::{ErrorKind, MetricsCollector};

/// Prometheus metrics of the gateway, registered on their own registry.
///
/// Clones share the underlying counters.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    blobs_stored: IntCounterVec,
    bytes_stored: IntCounter,
    bytes_served: IntCounter,
    meta_served: IntCounter,
    domain_errors: IntCounterVec,
    http_requests: IntCounterVec,
    http_duration: HistogramVec,
}

impl PrometheusMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let blobs_stored = IntCounterVec::new(
            Opts::new("rnbin_blobs_stored_total", "Blobs stored, by shard"),
            &["shard"],
        )?;
        let bytes_stored = IntCounter::new("rnbin_bytes_stored_total", "Bytes of blob content stored")?;
        let bytes_served = IntCounter::new("rnbin_bytes_served_total", "Bytes of blob content served")?;
        let meta_served = IntCounter::new("rnbin_meta_served_total", "Metadata lookups served")?;
        let domain_errors = IntCounterVec::new(
            Opts::new("rnbin_errors_total", "Failed blob operations, by error kind"),
            &["kind"],
        )?;
        let http_requests = IntCounterVec::new(
            Opts::new("rnbin_http_requests_total", "HTTP requests, by route and status"),
            &["route", "status"],
        )?;
        let http_duration = HistogramVec::new(
            HistogramOpts::new("rnbin_http_request_duration_seconds", "HTTP request latency"),
            &["route"],
        )?;

        registry.register(Box::new(blobs_stored.clone()))?;
        registry.register(Box::new(bytes_stored.clone()))?;
        registry.register(Box::new(bytes_served.clone()))?;
        registry.register(Box::new(meta_served.clone()))?;
        registry.register(Box::new(domain_errors.clone()))?;
        registry.register(Box::new(http_requests.clone()))?;
        registry.register(Box::new(http_duration.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            blobs_stored,
            bytes_stored,
            bytes_served,
            meta_served,
            domain_errors,
            http_requests,
            http_duration,
        })
    }

    /// Adapter for the core service's metrics seam.
    pub fn to_core_metrics(&self) -> rnbin_core::SharedMetrics {
        rnbin_core::SharedMetrics::new(std::sync::Arc::new(self.clone()))
    }

    pub fn observe_http(&self, route: &str, status: u16, elapsed: Duration) {
        self.http_requests
            .with_label_values(&[route, &status.to_string()])
            .inc();
        self.http_duration
            .with_label_values(&[route])
            .observe(elapsed.as_secs_f64());
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> prometheus::Result<Vec<u8>> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

impl MetricsCollector for PrometheusMetrics {
    fn blob_stored(&self, shard: usize, bytes: usize) {
        self.blobs_stored
            .with_label_values(&[&shard.to_string()])
            .inc();
        self.bytes_stored.inc_by(bytes as u64);
    }

    fn blob_served(&self, bytes: usize) {
        self.bytes_served.inc_by(bytes as u64);
    }

    fn meta_served(&self) {
        self.meta_served.inc();
    }

    fn request_failed(&self, kind: ErrorKind) {
        self.domain_errors.with_label_values(&[kind.as_str()]).inc();
    }
}

use std::sync::Arc;

use crate::error::ErrorKind;

/// Shared metrics collector interface
///
/// This is a trait object that allows applications to plug in their own
/// metrics implementations (Prometheus, StatsD, etc.)
pub trait MetricsCollector: Send + Sync {
    fn blob_stored(&self, shard: usize, bytes: usize);
    fn blob_served(&self, bytes: usize);
    fn meta_served(&self);
    fn request_failed(&self, kind: ErrorKind);
}

/// No-op metrics collector (default)
#[derive(Debug, Clone, Default)]
pub struct NoOpMetrics;

impl MetricsCollector for NoOpMetrics {
    fn blob_stored(&self, _shard: usize, _bytes: usize) {}
    fn blob_served(&self, _bytes: usize) {}
    fn meta_served(&self) {}
    fn request_failed(&self, _kind: ErrorKind) {}
}

/// Shared reference to metrics collector
#[derive(Clone)]
pub struct SharedMetrics(Arc<dyn MetricsCollector>);

impl SharedMetrics {
    pub fn new(collector: Arc<dyn MetricsCollector>) -> Self {
        Self(collector)
    }

    pub fn blob_stored(&self, shard: usize, bytes: usize) {
        self.0.blob_stored(shard, bytes);
    }

    pub fn blob_served(&self, bytes: usize) {
        self.0.blob_served(bytes);
    }

    pub fn meta_served(&self) {
        self.0.meta_served();
    }

    pub fn request_failed(&self, kind: ErrorKind) {
        self.0.request_failed(kind);
    }
}

impl Default for SharedMetrics {
    fn default() -> Self {
        Self(Arc::new(NoOpMetrics))
    }
}

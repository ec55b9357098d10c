//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus metrics for one scanner screen.
///
/// Handles are cheap to clone and safe to update from either execution
/// context.
#[derive(Clone)]
pub struct ScannerMetrics {
    registry: Registry,

    // Session metrics
    session_running: IntGauge,
    session_starts_total: IntCounter,
    session_stops_total: IntCounter,
    prepare_failures_total: IntCounter,

    // Detection metrics
    detections_forwarded_total: IntCounter,
    detections_dropped_total: IntCounter,

    // Permission metrics
    camera_unavailable_total: IntCounter,
}

impl ScannerMetrics {
    /// Creates a new registry with all scanner metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_running = IntGauge::new(
            "barcode_scanner_session_running",
            "Whether the capture session hardware is running (1=running, 0=stopped)",
        )?;
        let session_starts_total = IntCounter::new(
            "barcode_scanner_session_starts_total",
            "Hardware session starts performed",
        )?;
        let session_stops_total = IntCounter::new(
            "barcode_scanner_session_stops_total",
            "Hardware session stops performed",
        )?;
        let prepare_failures_total = IntCounter::new(
            "barcode_scanner_prepare_failures_total",
            "Capture session constructions that failed (camera unavailable)",
        )?;
        let detections_forwarded_total = IntCounter::new(
            "barcode_scanner_detections_forwarded_total",
            "Detected codes handed to the presentation boundary",
        )?;
        let detections_dropped_total = IntCounter::new(
            "barcode_scanner_detections_dropped_total",
            "Detection batches or results dropped (stopped pipeline or result already shown)",
        )?;
        let camera_unavailable_total = IntCounter::new(
            "barcode_scanner_camera_unavailable_total",
            "Camera-disabled notices shown",
        )?;

        registry.register(Box::new(session_running.clone()))?;
        registry.register(Box::new(session_starts_total.clone()))?;
        registry.register(Box::new(session_stops_total.clone()))?;
        registry.register(Box::new(prepare_failures_total.clone()))?;
        registry.register(Box::new(detections_forwarded_total.clone()))?;
        registry.register(Box::new(detections_dropped_total.clone()))?;
        registry.register(Box::new(camera_unavailable_total.clone()))?;

        Ok(Self {
            registry,
            session_running,
            session_starts_total,
            session_stops_total,
            prepare_failures_total,
            detections_forwarded_total,
            detections_dropped_total,
            camera_unavailable_total,
        })
    }

    pub fn record_session_started(&self) {
        self.session_starts_total.inc();
        self.session_running.set(1);
    }

    pub fn record_session_stopped(&self) {
        self.session_stops_total.inc();
        self.session_running.set(0);
    }

    pub fn record_prepare_failure(&self) {
        self.prepare_failures_total.inc();
    }

    pub fn record_forwarded(&self) {
        self.detections_forwarded_total.inc();
    }

    pub fn record_dropped(&self) {
        self.detections_dropped_total.inc();
    }

    pub fn record_camera_unavailable(&self) {
        self.camera_unavailable_total.inc();
    }

    /// Returns a point-in-time copy of the counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            session_running: self.session_running.get() == 1,
            session_starts: self.session_starts_total.get(),
            session_stops: self.session_stops_total.get(),
            prepare_failures: self.prepare_failures_total.get(),
            detections_forwarded: self.detections_forwarded_total.get(),
            detections_dropped: self.detections_dropped_total.get(),
            camera_unavailable: self.camera_unavailable_total.get(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub session_running: bool,
    pub session_starts: u64,
    pub session_stops: u64,
    pub prepare_failures: u64,
    pub detections_forwarded: u64,
    pub detections_dropped: u64,
    pub camera_unavailable: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let metrics = ScannerMetrics::new();
        assert!(metrics.is_ok());
    }

    #[test]
    fn test_session_gauge_follows_start_stop() {
        let metrics = ScannerMetrics::new().unwrap();

        metrics.record_session_started();
        assert!(metrics.snapshot().session_running);

        metrics.record_session_stopped();
        let snapshot = metrics.snapshot();
        assert!(!snapshot.session_running);
        assert_eq!(snapshot.session_starts, 1);
        assert_eq!(snapshot.session_stops, 1);
    }

    #[test]
    fn test_metrics_encode() {
        let metrics = ScannerMetrics::new().unwrap();
        metrics.record_forwarded();
        metrics.record_dropped();
        metrics.record_dropped();

        let output = metrics.encode().unwrap();
        assert!(output.contains("barcode_scanner_detections_forwarded_total 1"));
        assert!(output.contains("barcode_scanner_detections_dropped_total 2"));
        assert!(output.contains("barcode_scanner_session_running 0"));
    }
}

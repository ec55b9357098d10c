//! Prometheus metrics for the scanner.
//!
//! # Metrics Exposed
//!
//! ## Session Metrics
//! - `barcode_scanner_session_running` - Hardware running (1) or stopped (0)
//! - `barcode_scanner_session_starts_total` - Hardware starts performed
//! - `barcode_scanner_session_stops_total` - Hardware stops performed
//! - `barcode_scanner_prepare_failures_total` - Failed session constructions
//!
//! ## Detection Metrics
//! - `barcode_scanner_detections_forwarded_total` - Results handed to presentation
//! - `barcode_scanner_detections_dropped_total` - Detections suppressed
//!
//! ## Permission Metrics
//! - `barcode_scanner_camera_unavailable_total` - Camera-disabled notices shown
//!
//! # Example
//!
//! ```
//! use barcode_scanner::metrics::ScannerMetrics;
//!
//! let metrics = ScannerMetrics::new().expect("Failed to create registry");
//! metrics.record_session_started();
//! assert!(metrics.snapshot().session_running);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsSnapshot, ScannerMetrics};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};

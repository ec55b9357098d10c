//! Camera session wiring.
//!
//! This module owns the path from a video device to a running detection
//! output: acquiring the device, building the session, and starting or
//! stopping it on the serial background queue.

mod camera;
mod config;
mod pipeline;
mod session;
mod symbology;

pub use camera::{
    BackendCall, CameraBackend, DetectionSink, MetadataOutput, MockCameraBackend, PreviewLayer,
    SessionDriver, VideoDevice,
};
pub use config::{ConfigError, FileConfig, OutputConfig, ScannerConfig, ScreenBounds, VideoGravity};
pub use pipeline::{CapturePipeline, DetectionHandler};
pub use session::{CaptureSession, PipelineError, SessionState};
pub use symbology::{Symbology, SymbologySet, DEFAULT_SYMBOLOGIES};

//! Capture session construction.

use super::camera::{
    CameraBackend, DetectionSink, MetadataOutput, PreviewLayer, SessionDriver, VideoDevice,
};
use super::{ScannerConfig, SymbologySet};
use crate::executor::QueueHandle;
use thiserror::Error;

/// Reasons a capture session could not be built.
///
/// All of them mean "camera unavailable" and are recoverable: the next
/// prepare attempt starts from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("no video device found")]
    NoDeviceFound,
    #[error("session rejected input from device {0}")]
    InputRejected(String),
    #[error("session rejected the metadata output")]
    OutputRejected,
}

/// A camera wired to a detection output.
pub struct CaptureSession {
    device: VideoDevice,
    symbologies: SymbologySet,
    driver: Box<dyn SessionDriver>,
}

impl CaptureSession {
    /// Builds a fully wired session or nothing.
    ///
    /// Input and output are both checked before either is added, so a
    /// failure leaves no partially configured hardware behind.
    pub fn configure(
        backend: &dyn CameraBackend,
        config: &ScannerConfig,
        symbologies: SymbologySet,
        delegate: DetectionSink,
        queue: QueueHandle,
    ) -> Result<Self, PipelineError> {
        let device = backend
            .default_video_device()
            .ok_or(PipelineError::NoDeviceFound)?;

        let mut driver = backend.new_session();
        if !driver.can_add_input(&device) {
            return Err(PipelineError::InputRejected(device.id));
        }

        let output = MetadataOutput {
            symbologies: symbologies.clone(),
        };
        if !driver.can_add_output(&output) {
            return Err(PipelineError::OutputRejected);
        }

        driver.add_input(device.clone());
        driver.add_output(output, delegate, queue);
        driver.attach_preview(PreviewLayer {
            bounds: config.preview_bounds,
            gravity: config.preview_gravity,
        });

        Ok(Self {
            device,
            symbologies,
            driver,
        })
    }

    #[inline]
    pub fn device(&self) -> &VideoDevice {
        &self.device
    }

    #[inline]
    pub fn symbologies(&self) -> &SymbologySet {
        &self.symbologies
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_running()
    }

    /// Starts the hardware. No-op when already running.
    pub fn start_running(&mut self) -> bool {
        if self.driver.is_running() {
            return false;
        }
        self.driver.start_running();
        true
    }

    /// Stops the hardware. No-op when already stopped.
    pub fn stop_running(&mut self) -> bool {
        if !self.driver.is_running() {
            return false;
        }
        self.driver.stop_running();
        true
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureSession")
            .field("device", &self.device)
            .field("symbologies", &self.symbologies.len())
            .field("running", &self.driver.is_running())
            .finish()
    }
}

/// Whether the pipeline currently holds a session.
#[derive(Debug, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Ready(CaptureSession),
}

impl SessionState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready(_))
    }

    pub fn session_mut(&mut self) -> Option<&mut CaptureSession> {
        match self {
            SessionState::Ready(session) => Some(session),
            SessionState::Uninitialized => None,
        }
    }
}

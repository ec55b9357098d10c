//! Presentation boundary.
//!
//! The core never draws anything. It tells a [`Presenter`] what to show, and
//! the host reports back when the user closes a result.

use crate::detection::DetectedCode;

/// Receives user-visible signals on the foreground context.
pub trait Presenter {
    /// Show a modal notice with the code's symbology and value. The host must
    /// call `ScannerScreen::result_dismissed` once the user closes it.
    fn on_barcode_detected(&mut self, code: &DetectedCode);

    /// Show a persistent notice that the camera is disabled, offering a way
    /// to system settings.
    fn on_camera_unavailable(&mut self);
}

/// Presenter that records every signal it receives.
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub results: Vec<DetectedCode>,
    pub unavailable_notices: u32,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_result(&self) -> Option<&DetectedCode> {
        self.results.last()
    }
}

impl Presenter for RecordingPresenter {
    fn on_barcode_detected(&mut self, code: &DetectedCode) {
        self.results.push(code.clone());
    }

    fn on_camera_unavailable(&mut self) {
        self.unavailable_notices += 1;
    }
}

//! Detection dispatch.
//!
//! The background half picks one code per batch, stops the pipeline and
//! posts the code to the foreground. The foreground half enforces that at
//! most one result is on screen.

use super::DetectedCode;
use crate::capture::{CapturePipeline, DetectionHandler};
use crate::detection::DetectionBatch;
use crate::event::ScannerEvent;
use crate::executor::UiSender;
use crate::metrics::ScannerMetrics;
use crate::presentation::Presenter;

/// Background half: runs on the pipeline's serial queue.
pub struct DetectionDispatcher {
    ui: UiSender<ScannerEvent>,
}

impl DetectionDispatcher {
    pub fn new(ui: UiSender<ScannerEvent>) -> Self {
        Self { ui }
    }
}

impl DetectionHandler for DetectionDispatcher {
    fn handle_batch(&self, pipeline: &CapturePipeline, batch: DetectionBatch) {
        let Some(code) = batch.first_code(pipeline.symbologies()) else {
            tracing::trace!(
                frame = batch.frame(),
                candidates = batch.objects().len(),
                "No recognizable code in batch"
            );
            return;
        };

        // Stop first so the same code is not reported again while shown.
        pipeline.stop();

        tracing::debug!(
            frame = batch.frame(),
            symbology = %code.symbology(),
            "Code detected; handing off to foreground"
        );
        if !self.ui.post(ScannerEvent::CodeDetected(code)) {
            tracing::debug!("Foreground context gone; detection discarded");
        }
    }
}

/// Foreground half: whether a result is currently shown.
#[derive(Debug, Default)]
pub struct PresentationState {
    showing: Option<DetectedCode>,
}

impl PresentationState {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_showing(&self) -> bool {
        self.showing.is_some()
    }

    pub fn current(&self) -> Option<&DetectedCode> {
        self.showing.as_ref()
    }

    /// Shows `code` unless another result is already up.
    ///
    /// Returns `true` if the code reached the presenter.
    pub fn present(
        &mut self,
        code: DetectedCode,
        presenter: &mut dyn Presenter,
        metrics: &ScannerMetrics,
    ) -> bool {
        if let Some(current) = &self.showing {
            metrics.record_dropped();
            tracing::debug!(
                showing = %current,
                dropped = %code,
                "Result already presented; detection dropped"
            );
            return false;
        }

        tracing::info!(symbology = %code.symbology(), value = code.value(), "Presenting scan result");
        metrics.record_forwarded();
        presenter.on_barcode_detected(&code);
        self.showing = Some(code);
        true
    }

    /// Clears the shown result and re-arms the pipeline.
    ///
    /// Returns `false` if nothing was shown, in which case the pipeline is
    /// left alone.
    pub fn dismiss(&mut self, pipeline: &CapturePipeline) -> bool {
        match self.showing.take() {
            Some(code) => {
                tracing::debug!(dismissed = %code, "Result dismissed; restarting capture");
                pipeline.start();
                true
            }
            None => {
                tracing::trace!("Dismissal with no result shown ignored");
                false
            }
        }
    }

    /// Clears the shown result without touching the pipeline. Used when the
    /// screen is hidden; the next appearance decides whether to start.
    pub fn clear(&mut self) -> Option<DetectedCode> {
        let cleared = self.showing.take();
        if let Some(code) = &cleared {
            tracing::debug!(dismissed = %code, "Result dismissed while hidden; capture stays stopped");
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{
        BackendCall, MockCameraBackend, ScannerConfig, Symbology, SymbologySet,
    };
    use crate::detection::MetadataObject;
    use crate::executor::{SerialQueue, UiContext};
    use crate::presentation::RecordingPresenter;
    use std::sync::Arc;

    struct Fixture {
        queue: SerialQueue,
        ui: UiContext<ScannerEvent>,
        backend: MockCameraBackend,
        pipeline: CapturePipeline,
    }

    fn fixture() -> Fixture {
        let queue = SerialQueue::new("test.dispatch").unwrap();
        let ui = UiContext::new();
        let backend = MockCameraBackend::new();
        let pipeline = CapturePipeline::new(
            Arc::new(backend.clone()),
            ScannerConfig::default(),
            SymbologySet::default(),
            queue.handle(),
            Arc::new(DetectionDispatcher::new(ui.sender())),
            ScannerMetrics::new().unwrap(),
        );
        Fixture {
            queue,
            ui,
            backend,
            pipeline,
        }
    }

    fn detected(ui: &UiContext<ScannerEvent>) -> Vec<DetectedCode> {
        std::iter::from_fn(|| ui.try_next())
            .filter_map(|event| match event {
                ScannerEvent::CodeDetected(code) => Some(code),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_multi_code_batch_forwards_first_only() {
        let f = fixture();
        f.pipeline.start();
        f.queue.flush().unwrap();

        f.backend.emit(vec![
            MetadataObject::Other("human-body".to_string()),
            MetadataObject::code(Symbology::Code128, "FIRST"),
            MetadataObject::code(Symbology::Ean13, "4006381333931"),
        ]);
        f.queue.wait_idle().unwrap();

        let codes = detected(&f.ui);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[0].value(), "FIRST");
    }

    #[test]
    fn test_detection_stops_pipeline_and_drops_followers() {
        let f = fixture();
        f.pipeline.start();
        f.queue.flush().unwrap();

        // Two frames queued back to back before either is handled.
        f.backend.emit(vec![MetadataObject::code(Symbology::Ean8, "96385074")]);
        f.backend.emit(vec![MetadataObject::code(Symbology::Ean8, "96385074")]);
        f.queue.wait_idle().unwrap();

        assert_eq!(detected(&f.ui).len(), 1);
        assert!(!f.pipeline.is_armed());
        assert!(!f.backend.is_running());
        assert_eq!(f.backend.count(&BackendCall::StopRunning), 1);
    }

    #[test]
    fn test_batch_without_code_keeps_running() {
        let f = fixture();
        f.pipeline.start();
        f.queue.flush().unwrap();

        f.backend.emit(vec![MetadataObject::Face { face_id: 1 }]);
        f.backend.emit(vec![MetadataObject::code(Symbology::Qr, "not allow-listed")]);
        f.queue.wait_idle().unwrap();

        assert!(detected(&f.ui).is_empty());
        assert!(f.pipeline.is_armed());
        assert!(f.backend.is_running());
    }

    #[test]
    fn test_presentation_suppresses_overlap_and_restarts_once() {
        let f = fixture();
        let metrics = f.pipeline.metrics().clone();
        let mut presenter = RecordingPresenter::new();
        let mut state = PresentationState::new();

        let first = DetectedCode::new(Symbology::Ean13, "1");
        let second = DetectedCode::new(Symbology::Ean13, "2");

        assert!(state.present(first, &mut presenter, &metrics));
        assert!(!state.present(second, &mut presenter, &metrics));
        assert_eq!(presenter.results.len(), 1);
        assert_eq!(state.current().map(|c| c.value()), Some("1"));

        assert!(state.dismiss(&f.pipeline));
        assert!(!state.dismiss(&f.pipeline));
        f.queue.flush().unwrap();

        assert!(!state.is_showing());
        assert_eq!(f.backend.count(&BackendCall::StartRunning), 1);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.detections_forwarded, 1);
        assert_eq!(snapshot.detections_dropped, 1);
    }

    #[test]
    fn test_clear_does_not_restart() {
        let f = fixture();
        let metrics = f.pipeline.metrics().clone();
        let mut presenter = RecordingPresenter::new();
        let mut state = PresentationState::new();

        state.present(DetectedCode::new(Symbology::Code93, "X"), &mut presenter, &metrics);
        assert_eq!(state.clear().map(|c| c.value().to_string()), Some("X".to_string()));
        assert!(state.clear().is_none());
        f.queue.flush().unwrap();

        assert!(!state.is_showing());
        assert!(!f.pipeline.is_armed());
        assert_eq!(f.backend.count(&BackendCall::StartRunning), 0);
    }
}

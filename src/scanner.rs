//! The scanner screen: owns both execution contexts and routes every
//! foreground event to the component that handles it.

use crate::capture::{CameraBackend, CapturePipeline, ConfigError, ScannerConfig, SymbologySet};
use crate::detection::{DetectionDispatcher, PresentationState};
use crate::event::ScannerEvent;
use crate::executor::{QueueError, SerialQueue, UiContext, UiSender};
use crate::lifecycle::{AppNotifier, LifecycleCoordinator, LifecycleEvent, ScreenContext};
use crate::metrics::{MetricsError, ScannerMetrics};
use crate::permission::{PermissionGate, PermissionProvider};
use crate::presentation::Presenter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while setting up a scanner screen.
#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("execution context error: {0}")]
    Queue(#[from] QueueError),
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),
}

/// One barcode scanner screen.
///
/// Every method must be called from the thread that owns the screen (the
/// foreground context). Background work reaches it only as queued events,
/// handled by [`ScannerScreen::pump`].
pub struct ScannerScreen<P: Presenter> {
    ui: UiContext<ScannerEvent>,
    pipeline: CapturePipeline,
    coordinator: LifecycleCoordinator,
    presentation: PresentationState,
    presenter: P,
    metrics: ScannerMetrics,
    queue: SerialQueue,
}

impl<P: Presenter> ScannerScreen<P> {
    pub fn new(
        config: ScannerConfig,
        backend: Arc<dyn CameraBackend>,
        permissions: Arc<dyn PermissionProvider>,
        notifier: AppNotifier,
        presenter: P,
    ) -> Result<Self, ScannerError> {
        config.validate()?;

        let metrics = ScannerMetrics::new()?;
        let queue = SerialQueue::new(config.queue_label.clone())?;
        let ui = UiContext::new();

        let pipeline = CapturePipeline::new(
            backend,
            config,
            SymbologySet::default(),
            queue.handle(),
            Arc::new(DetectionDispatcher::new(ui.sender())),
            metrics.clone(),
        );
        let coordinator =
            LifecycleCoordinator::new(PermissionGate::new(permissions), notifier, ui.sender());

        Ok(Self {
            ui,
            pipeline,
            coordinator,
            presentation: PresentationState::new(),
            presenter,
            metrics,
            queue,
        })
    }

    /// The screen is about to become visible.
    pub fn will_appear(&mut self) {
        self.handle_event(ScannerEvent::Lifecycle(LifecycleEvent::ScreenWillAppear));
    }

    /// The screen is about to be hidden.
    pub fn will_disappear(&mut self) {
        self.handle_event(ScannerEvent::Lifecycle(LifecycleEvent::ScreenWillDisappear));
    }

    /// The user closed the result notice.
    pub fn result_dismissed(&mut self) {
        self.handle_event(ScannerEvent::ResultDismissed);
    }

    /// Hands the user off to system settings from the camera-disabled notice.
    pub fn open_system_settings(&self) {
        self.coordinator.gate().open_settings();
    }

    /// Sender for posting events from other threads.
    pub fn sender(&self) -> UiSender<ScannerEvent> {
        self.ui.sender()
    }

    pub fn handle_event(&mut self, event: ScannerEvent) {
        match event {
            ScannerEvent::Lifecycle(event) => {
                let cx = ScreenContext {
                    pipeline: &self.pipeline,
                    presenter: &mut self.presenter,
                    result_showing: self.presentation.is_showing(),
                };
                self.coordinator.handle(event, cx);
            }
            ScannerEvent::AppNotification {
                subscription,
                notification,
            } => {
                let cx = ScreenContext {
                    pipeline: &self.pipeline,
                    presenter: &mut self.presenter,
                    result_showing: self.presentation.is_showing(),
                };
                self.coordinator.app_notification(subscription, notification, cx);
            }
            ScannerEvent::PermissionResolved(status) => {
                let cx = ScreenContext {
                    pipeline: &self.pipeline,
                    presenter: &mut self.presenter,
                    result_showing: self.presentation.is_showing(),
                };
                self.coordinator.permission_resolved(status, cx);
            }
            ScannerEvent::CodeDetected(code) => {
                if !self.coordinator.is_visible() {
                    self.metrics.record_dropped();
                    tracing::debug!(dropped = %code, "Screen hidden; detection dropped");
                    return;
                }
                self.presentation
                    .present(code, &mut self.presenter, &self.metrics);
            }
            ScannerEvent::ResultDismissed => {
                if self.coordinator.is_visible() {
                    self.presentation.dismiss(&self.pipeline);
                } else {
                    self.presentation.clear();
                }
            }
        }
    }

    /// Handles every event already queued. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.ui.try_next() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits up to `timeout` for one event and handles it.
    pub fn pump_timeout(&mut self, timeout: Duration) -> bool {
        match self.ui.next_timeout(timeout) {
            Some(event) => {
                self.handle_event(event);
                true
            }
            None => false,
        }
    }

    /// Alternates between draining the background queue and the foreground
    /// events until neither has work left.
    pub fn run_until_idle(&mut self) -> Result<usize, ScannerError> {
        let mut handled = 0;
        loop {
            self.queue.wait_idle()?;
            let n = self.pump();
            if n == 0 {
                return Ok(handled);
            }
            handled += n;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.coordinator.is_visible()
    }

    pub fn is_showing_result(&self) -> bool {
        self.presentation.is_showing()
    }

    pub fn pipeline(&self) -> &CapturePipeline {
        &self.pipeline
    }

    pub fn metrics(&self) -> &ScannerMetrics {
        &self.metrics
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }
}

impl<P: Presenter> Drop for ScannerScreen<P> {
    fn drop(&mut self) {
        if self.coordinator.is_visible() {
            self.will_disappear();
        }
        self.pipeline.teardown();
        // `queue` drops after this body and runs the teardown before joining.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{BackendCall, MockCameraBackend, Symbology};
    use crate::detection::MetadataObject;
    use crate::lifecycle::AppNotification;
    use crate::permission::{AuthorizationStatus, MockPermissions};
    use crate::presentation::RecordingPresenter;

    struct Harness {
        backend: MockCameraBackend,
        permissions: MockPermissions,
        notifier: AppNotifier,
        screen: ScannerScreen<RecordingPresenter>,
    }

    fn harness(permissions: MockPermissions) -> Harness {
        let backend = MockCameraBackend::new();
        let notifier = AppNotifier::new();
        let screen = ScannerScreen::new(
            ScannerConfig::default(),
            Arc::new(backend.clone()),
            Arc::new(permissions.clone()),
            notifier.clone(),
            RecordingPresenter::new(),
        )
        .unwrap();
        Harness {
            backend,
            permissions,
            notifier,
            screen,
        }
    }

    fn authorized() -> Harness {
        harness(MockPermissions::new(AuthorizationStatus::Authorized))
    }

    fn code(value: &str) -> Vec<MetadataObject> {
        vec![MetadataObject::code(Symbology::Code128, value)]
    }

    impl Harness {
        fn settle(&mut self) {
            self.screen.run_until_idle().unwrap();
        }

        fn count(&self, call: BackendCall) -> usize {
            self.backend.count(&call)
        }
    }

    #[test]
    fn test_authorized_appear_starts_capture() {
        let mut h = authorized();

        h.screen.will_appear();
        h.settle();

        assert!(h.screen.is_visible());
        assert!(h.backend.is_running());
        assert_eq!(h.count(BackendCall::AcquireDevice), 1);
        assert_eq!(h.count(BackendCall::StartRunning), 1);
        assert_eq!(h.notifier.subscriber_count(), 1);
    }

    #[test]
    fn test_undetermined_then_granted_prepares_and_starts_once() {
        let mut h = harness(MockPermissions::new(AuthorizationStatus::Undetermined));

        h.screen.will_appear();
        h.settle();
        assert_eq!(h.permissions.prompt_count(), 1);
        assert_eq!(h.count(BackendCall::AcquireDevice), 0);

        h.permissions.resolve(true);
        h.settle();

        let calls = h.backend.calls();
        let acquire = calls.iter().position(|c| *c == BackendCall::AcquireDevice);
        let start = calls.iter().position(|c| *c == BackendCall::StartRunning);
        assert!(acquire < start);
        assert_eq!(h.count(BackendCall::AcquireDevice), 1);
        assert_eq!(h.count(BackendCall::StartRunning), 1);
    }

    #[test]
    fn test_undetermined_then_denied_shows_notice() {
        let mut h = harness(MockPermissions::answering(false));

        h.screen.will_appear();
        h.settle();

        assert_eq!(h.count(BackendCall::StartRunning), 0);
        assert_eq!(h.screen.presenter().unavailable_notices, 1);
    }

    #[test]
    fn test_denied_never_starts_and_notifies_once_per_appearance() {
        let mut h = harness(MockPermissions::new(AuthorizationStatus::Denied));

        h.screen.will_appear();
        h.settle();
        h.notifier.post(AppNotification::WillResignActive);
        h.notifier.post(AppNotification::DidBecomeActive);
        h.settle();

        assert_eq!(h.count(BackendCall::StartRunning), 0);
        assert_eq!(h.count(BackendCall::AcquireDevice), 0);
        assert_eq!(h.screen.presenter().unavailable_notices, 1);
        assert_eq!(h.screen.metrics().snapshot().camera_unavailable, 1);

        h.screen.will_disappear();
        h.screen.will_appear();
        h.settle();
        assert_eq!(h.screen.presenter().unavailable_notices, 2);
    }

    #[test]
    fn test_restricted_is_treated_as_denied() {
        let mut h = harness(MockPermissions::new(AuthorizationStatus::Restricted));

        h.screen.will_appear();
        h.settle();

        assert_eq!(h.permissions.prompt_count(), 0);
        assert_eq!(h.count(BackendCall::StartRunning), 0);
        assert_eq!(h.screen.presenter().unavailable_notices, 1);

        h.screen.open_system_settings();
        assert_eq!(h.permissions.settings_opened(), 1);
    }

    #[test]
    fn test_granted_in_settings_while_backgrounded() {
        let mut h = harness(MockPermissions::new(AuthorizationStatus::Denied));

        h.screen.will_appear();
        h.settle();
        h.notifier.post(AppNotification::WillResignActive);
        h.settle();

        h.permissions.set_status(AuthorizationStatus::Authorized);
        h.notifier.post(AppNotification::DidBecomeActive);
        h.settle();

        assert!(h.backend.is_running());
        assert_eq!(h.count(BackendCall::StartRunning), 1);
    }

    #[test]
    fn test_revoked_in_settings_while_backgrounded() {
        let mut h = authorized();

        h.screen.will_appear();
        h.settle();
        h.notifier.post(AppNotification::WillResignActive);
        h.settle();
        assert!(!h.backend.is_running());

        h.permissions.set_status(AuthorizationStatus::Denied);
        h.notifier.post(AppNotification::DidBecomeActive);
        h.settle();

        assert!(!h.backend.is_running());
        assert_eq!(h.count(BackendCall::StartRunning), 1);
        assert_eq!(h.screen.presenter().unavailable_notices, 1);
    }

    #[test]
    fn test_detection_presents_one_result_until_dismissed() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();

        h.backend.emit(vec![
            MetadataObject::code(Symbology::Code128, "A"),
            MetadataObject::code(Symbology::Code128, "B"),
        ]);
        h.settle();
        assert!(h.screen.is_showing_result());
        assert_eq!(h.screen.presenter().results.len(), 1);
        assert_eq!(h.screen.presenter().last_result().map(|c| c.value()), Some("A"));
        assert!(!h.backend.is_running());

        // Late frames and late results while the notice is up.
        h.backend.inject(code("C"));
        h.screen
            .sender()
            .post(ScannerEvent::CodeDetected(crate::detection::DetectedCode::new(
                Symbology::Code128,
                "D",
            )));
        h.settle();
        assert_eq!(h.screen.presenter().results.len(), 1);

        h.screen.result_dismissed();
        h.settle();
        assert!(!h.screen.is_showing_result());
        assert!(h.backend.is_running());
        assert_eq!(h.count(BackendCall::StartRunning), 2);

        h.backend.emit(code("E"));
        h.settle();
        assert_eq!(h.screen.presenter().results.len(), 2);
        assert_eq!(h.screen.metrics().snapshot().detections_forwarded, 2);
    }

    #[test]
    fn test_hidden_while_running_stops_once_and_ignores_in_flight() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();
        h.backend.clear_calls();

        h.screen.will_disappear();
        h.backend.inject(code("LATE"));
        h.settle();

        assert_eq!(h.count(BackendCall::StopRunning), 1);
        assert!(h.screen.presenter().results.is_empty());
        assert!(!h.screen.is_visible());
        assert_eq!(h.notifier.subscriber_count(), 0);

        // No longer subscribed: foreground events do not restart capture.
        assert_eq!(h.notifier.post(AppNotification::DidBecomeActive), 0);
        h.settle();
        assert_eq!(h.count(BackendCall::StartRunning), 0);
    }

    #[test]
    fn test_resume_while_result_shown_waits_for_dismissal() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();
        h.backend.emit(code("A"));
        h.settle();

        h.notifier.post(AppNotification::WillResignActive);
        h.notifier.post(AppNotification::DidBecomeActive);
        h.settle();
        assert!(!h.backend.is_running());

        h.screen.result_dismissed();
        h.settle();
        assert!(h.backend.is_running());
    }

    #[test]
    fn test_result_queued_before_hide_is_not_presented() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();

        // Detected on the background queue, not yet handled in the foreground.
        h.backend.emit(code("A"));
        h.screen.queue.wait_idle().unwrap();

        h.screen.will_disappear();
        h.settle();
        assert!(!h.screen.is_showing_result());
        assert!(h.screen.presenter().results.is_empty());
        assert_eq!(h.screen.metrics().snapshot().detections_dropped, 1);

        h.screen.result_dismissed();
        h.settle();
        assert!(!h.backend.is_running());
        assert!(!h.screen.pipeline().is_armed());
    }

    #[test]
    fn test_dismissal_while_hidden_leaves_camera_stopped() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();
        h.backend.emit(code("A"));
        h.settle();
        assert!(h.screen.is_showing_result());

        h.screen.will_disappear();
        h.screen.result_dismissed();
        h.settle();
        assert!(!h.screen.is_showing_result());
        assert!(!h.backend.is_running());

        h.screen.will_appear();
        h.settle();
        assert!(h.backend.is_running());
    }

    #[test]
    fn test_notification_from_previous_appearance_is_ignored() {
        let mut h = authorized();
        h.screen.will_appear();
        h.settle();
        assert_eq!(h.permissions.status_checks(), 1);

        // Queued for the first appearance, handled during the second.
        assert_eq!(h.notifier.post(AppNotification::DidBecomeActive), 1);
        h.screen.will_disappear();
        h.screen.will_appear();
        h.settle();

        assert!(h.backend.is_running());
        assert_eq!(h.permissions.status_checks(), 2);

        assert_eq!(h.notifier.post(AppNotification::DidBecomeActive), 1);
        h.settle();
        assert_eq!(h.permissions.status_checks(), 3);
    }

    #[test]
    fn test_permission_answer_after_hide_does_not_start() {
        let mut h = harness(MockPermissions::new(AuthorizationStatus::Undetermined));

        h.screen.will_appear();
        h.settle();
        h.screen.will_disappear();
        h.permissions.resolve(true);
        h.settle();

        assert_eq!(h.count(BackendCall::StartRunning), 0);
    }

    #[test]
    fn test_missing_camera_degrades_to_not_running() {
        let mut h = authorized();
        h.backend.set_device_available(false);

        h.screen.will_appear();
        h.settle();
        assert!(!h.screen.pipeline().is_prepared());
        assert_eq!(h.screen.metrics().snapshot().prepare_failures, 1);

        h.backend.set_device_available(true);
        h.notifier.post(AppNotification::DidBecomeActive);
        h.settle();
        assert!(h.backend.is_running());
    }

    #[test]
    fn test_drop_tears_down_session() {
        let h = authorized();
        let backend = h.backend.clone();
        let notifier = h.notifier.clone();
        let mut screen = h.screen;

        screen.will_appear();
        screen.run_until_idle().unwrap();
        assert!(backend.is_running());

        drop(screen);
        assert!(!backend.is_running());
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ScannerScreen::new(
            ScannerConfig::with_bounds(0.0, 0.0),
            Arc::new(MockCameraBackend::new()),
            Arc::new(MockPermissions::new(AuthorizationStatus::Authorized)),
            AppNotifier::new(),
            RecordingPresenter::new(),
        );
        assert!(matches!(result, Err(ScannerError::Config(_))));
    }
}

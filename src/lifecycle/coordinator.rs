//! Routes screen and application transitions to the permission gate and the
//! capture pipeline.

use super::{AppNotification, AppNotifier, LifecycleEvent, Subscription, SubscriptionId};
use crate::capture::CapturePipeline;
use crate::event::ScannerEvent;
use crate::executor::UiSender;
use crate::permission::{AuthorizationStatus, PermissionGate};
use crate::presentation::Presenter;

/// What the coordinator acts on while handling one event.
pub struct ScreenContext<'a> {
    pub pipeline: &'a CapturePipeline,
    pub presenter: &'a mut dyn Presenter,
    /// A scan result is on screen; dismissing it restarts capture.
    pub result_showing: bool,
}

/// Foreground-only lifecycle state of one scanner screen.
pub struct LifecycleCoordinator {
    gate: PermissionGate,
    notifier: AppNotifier,
    ui: UiSender<ScannerEvent>,
    /// Present exactly while the screen is visible.
    subscription: Option<Subscription>,
    /// The camera-disabled notice was shown during this visible period.
    notice_shown: bool,
}

impl LifecycleCoordinator {
    pub fn new(gate: PermissionGate, notifier: AppNotifier, ui: UiSender<ScannerEvent>) -> Self {
        Self {
            gate,
            notifier,
            ui,
            subscription: None,
            notice_shown: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn gate(&self) -> &PermissionGate {
        &self.gate
    }

    pub fn handle(&mut self, event: LifecycleEvent, cx: ScreenContext<'_>) {
        tracing::debug!(?event, visible = self.is_visible(), "Lifecycle event");

        match event {
            LifecycleEvent::ScreenWillAppear => {
                if self.is_visible() {
                    tracing::trace!("Screen already visible");
                    return;
                }
                self.subscription = Some(self.notifier.subscribe(self.ui.clone()));
                self.notice_shown = false;
                self.authorize_and_start(cx);
            }
            LifecycleEvent::ScreenWillDisappear => {
                self.subscription = None;
                self.notice_shown = false;
                cx.pipeline.stop();
            }
            LifecycleEvent::AppWillResignActive => {
                cx.pipeline.stop();
            }
            LifecycleEvent::AppDidBecomeActive => {
                if !self.is_visible() {
                    tracing::trace!("Became active while hidden; ignored");
                    return;
                }
                self.authorize_and_start(cx);
            }
        }
    }

    /// Handles an application transition, unless it was delivered through a
    /// subscription that has since been dropped.
    pub fn app_notification(
        &mut self,
        from: SubscriptionId,
        notification: AppNotification,
        cx: ScreenContext<'_>,
    ) {
        if self.subscription.as_ref().map(Subscription::id) != Some(from) {
            tracing::debug!(?notification, ?from, "Notification from a dropped subscription ignored");
            return;
        }
        self.handle(notification.into(), cx);
    }

    /// Applies the answer to a permission prompt started by this coordinator.
    pub fn permission_resolved(&mut self, status: AuthorizationStatus, cx: ScreenContext<'_>) {
        if !self.is_visible() {
            tracing::debug!(%status, "Permission resolved while hidden; not starting");
            return;
        }
        self.apply_status(status, cx);
    }

    fn authorize_and_start(&mut self, cx: ScreenContext<'_>) {
        let status = self.gate.check_status();
        if status == AuthorizationStatus::Undetermined {
            let ui = self.ui.clone();
            self.gate.request_permission(move |status| {
                ui.post(ScannerEvent::PermissionResolved(status));
            });
            return;
        }
        self.apply_status(status, cx);
    }

    fn apply_status(&mut self, status: AuthorizationStatus, cx: ScreenContext<'_>) {
        if status.is_authorized() {
            self.notice_shown = false;
            if cx.result_showing {
                tracing::debug!("Result on screen; capture restarts on dismissal");
                return;
            }
            cx.pipeline.start();
        } else if status.is_blocked() {
            self.show_unavailable(status, cx);
        }
    }

    fn show_unavailable(&mut self, status: AuthorizationStatus, cx: ScreenContext<'_>) {
        // Access may have been revoked in settings while a session was live.
        cx.pipeline.stop();

        if self.notice_shown {
            tracing::trace!(%status, "Camera-disabled notice already shown");
            return;
        }
        self.notice_shown = true;
        cx.pipeline.metrics().record_camera_unavailable();
        tracing::warn!(%status, "Camera access not authorized");
        cx.presenter.on_camera_unavailable();
    }
}

//! Typed events delivered to the foreground context.

use crate::detection::DetectedCode;
use crate::lifecycle::{AppNotification, LifecycleEvent, SubscriptionId};
use crate::permission::AuthorizationStatus;

/// Everything the screen's event loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum ScannerEvent {
    /// Screen transitions reported directly by the host.
    Lifecycle(LifecycleEvent),
    /// Application transitions delivered through a lifecycle subscription.
    AppNotification {
        subscription: SubscriptionId,
        notification: AppNotification,
    },
    PermissionResolved(AuthorizationStatus),
    CodeDetected(DetectedCode),
    ResultDismissed,
}

impl From<LifecycleEvent> for ScannerEvent {
    fn from(event: LifecycleEvent) -> Self {
        ScannerEvent::Lifecycle(event)
    }
}

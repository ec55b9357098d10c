//! Screen and application lifecycle.
//!
//! The screen subscribes to application notifications when it becomes
//! visible and drops the subscription when it is hidden.

mod coordinator;
mod notifier;

pub use coordinator::{LifecycleCoordinator, ScreenContext};
pub use notifier::{AppNotification, AppNotifier, Subscription, SubscriptionId};

/// Transitions the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    ScreenWillAppear,
    ScreenWillDisappear,
    AppDidBecomeActive,
    AppWillResignActive,
}

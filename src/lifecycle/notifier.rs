//! Application lifecycle notifications with scoped subscriptions.

use super::LifecycleEvent;
use crate::event::ScannerEvent;
use crate::executor::UiSender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Application-wide transitions broadcast by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppNotification {
    DidBecomeActive,
    WillResignActive,
}

impl From<AppNotification> for LifecycleEvent {
    fn from(notification: AppNotification) -> Self {
        match notification {
            AppNotification::DidBecomeActive => LifecycleEvent::AppDidBecomeActive,
            AppNotification::WillResignActive => LifecycleEvent::AppWillResignActive,
        }
    }
}

/// Identifies one subscription. Never reused by the same notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: Vec<(SubscriptionId, UiSender<ScannerEvent>)>,
}

/// Broadcasts [`AppNotification`]s to subscribed screens.
#[derive(Clone, Default)]
pub struct AppNotifier {
    subscribers: Arc<Mutex<Subscribers>>,
}

impl AppNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribes `sender` until the returned guard is dropped.
    ///
    /// Every delivered event carries the subscription's id, so events still
    /// queued when the guard drops can be told apart from later ones.
    pub fn subscribe(&self, sender: UiSender<ScannerEvent>) -> Subscription {
        let mut subscribers = self.lock();
        let id = SubscriptionId(subscribers.next_id);
        subscribers.next_id += 1;
        subscribers.entries.push((id, sender));
        tracing::trace!(?id, "Lifecycle subscription added");

        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// Delivers `notification` to every subscriber. Returns how many got it.
    pub fn post(&self, notification: AppNotification) -> usize {
        let subscribers = self.lock();
        subscribers
            .entries
            .iter()
            .filter(|(id, sender)| {
                sender.post(ScannerEvent::AppNotification {
                    subscription: *id,
                    notification,
                })
            })
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Live subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(subscribers) = self.subscribers.upgrade() else {
            return;
        };
        let mut subscribers = subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.entries.retain(|(id, _)| *id != self.id);
        tracing::trace!(id = ?self.id, "Lifecycle subscription removed");
    }
}

//! Foreground (UI) execution context.
//!
//! Background code never touches UI state directly. It posts typed events
//! through a [`UiSender`]; the owner of the [`UiContext`] drains them on its
//! own thread, one at a time.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::time::Duration;

/// Fire-and-forget sender into a [`UiContext`].
#[derive(Debug)]
pub struct UiSender<E> {
    sender: Sender<E>,
}

impl<E> Clone for UiSender<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<E> UiSender<E> {
    /// Posts an event. Returns `false` if the context is gone.
    pub fn post(&self, event: E) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Single-consumer event queue drained by the foreground thread.
#[derive(Debug)]
pub struct UiContext<E> {
    sender: Sender<E>,
    receiver: Receiver<E>,
}

impl<E> UiContext<E> {
    /// Creates an empty context.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Returns a sender for posting events from any thread.
    pub fn sender(&self) -> UiSender<E> {
        UiSender {
            sender: self.sender.clone(),
        }
    }

    /// Takes the next pending event without blocking.
    pub fn try_next(&self) -> Option<E> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next event.
    pub fn next_timeout(&self, timeout: Duration) -> Option<E> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Number of events waiting to be handled.
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl<E> Default for UiContext<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_events_cross_threads_in_order() {
        let ui: UiContext<u32> = UiContext::new();
        let sender = ui.sender();

        thread::spawn(move || {
            for i in 0..5 {
                assert!(sender.post(i));
            }
        })
        .join()
        .unwrap();

        let drained: Vec<u32> = std::iter::from_fn(|| ui.try_next()).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert_eq!(ui.pending(), 0);
    }

    #[test]
    fn test_post_after_context_dropped() {
        let ui: UiContext<&'static str> = UiContext::new();
        let sender = ui.sender();
        drop(ui);

        assert!(!sender.post("late"));
    }
}

//! Execution contexts.
//!
//! Two contexts matter: the foreground context that owns all user-visible
//! state, and one serial background queue that owns the camera session.

mod serial;
mod ui;

pub use serial::{QueueError, QueueHandle, SerialQueue};
pub use ui::{UiContext, UiSender};

//! Detection values and dispatch.
//!
//! Raw batches arrive from the camera on the background queue; at most one
//! [`DetectedCode`] at a time reaches the presentation boundary.

mod code;
mod dispatcher;

pub use code::{DetectedCode, DetectionBatch, MetadataObject};
pub use dispatcher::{DetectionDispatcher, PresentationState};

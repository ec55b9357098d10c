//! Barcode Scanner Library
//!
//! The capture-session lifecycle and permission state machine behind a
//! camera barcode scanner screen. It acquires a camera, wires it into a
//! detection output, starts and stops it around lifecycle and authorization
//! changes, and hands exactly one detected code at a time to a presenter.
//!
//! # Architecture
//!
//! ```text
//! lifecycle → permission → capture → detection → presentation
//!     ↑                                               │
//!     └──────────── dismissal restarts capture ───────┘
//! ```
//!
//! Two execution contexts exist. The foreground context owns the
//! [`ScannerScreen`] and all presentation state. One serial background
//! queue per screen owns the camera session; start, stop and detection
//! callbacks run there in submission order.
//!
//! # Design Principles
//!
//! - **Never blocks the foreground**: start/stop are posted, not awaited
//! - **At most one result on screen**: later detections are dropped
//! - **Nothing is fatal**: every failure degrades to "camera not running"
//! - **Authorization read fresh**: re-checked on every appear/foreground
//!
//! # Example
//!
//! ```
//! use barcode_scanner::{
//!     capture::{MockCameraBackend, ScannerConfig, Symbology},
//!     detection::MetadataObject,
//!     lifecycle::AppNotifier,
//!     permission::{AuthorizationStatus, MockPermissions},
//!     presentation::RecordingPresenter,
//!     ScannerScreen,
//! };
//! use std::sync::Arc;
//!
//! let camera = MockCameraBackend::new();
//! let mut screen = ScannerScreen::new(
//!     ScannerConfig::default(),
//!     Arc::new(camera.clone()),
//!     Arc::new(MockPermissions::new(AuthorizationStatus::Authorized)),
//!     AppNotifier::new(),
//!     RecordingPresenter::new(),
//! )
//! .unwrap();
//!
//! screen.will_appear();
//! screen.run_until_idle().unwrap();
//!
//! camera.emit(vec![MetadataObject::code(Symbology::Ean13, "4006381333931")]);
//! screen.run_until_idle().unwrap();
//!
//! let shown = screen.presenter().last_result().unwrap();
//! assert_eq!(shown.alert_message(), "Type: EAN-13\nValue: 4006381333931");
//!
//! screen.result_dismissed();
//! screen.run_until_idle().unwrap();
//! assert!(camera.is_running());
//! ```

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod detection;
pub mod event;
pub mod executor;
pub mod lifecycle;
pub mod metrics;
pub mod permission;
pub mod presentation;
pub mod scanner;

// Re-export commonly used types at crate root
pub use capture::{CameraBackend, CapturePipeline, ScannerConfig, Symbology};
pub use detection::{DetectedCode, DetectionBatch};
pub use event::ScannerEvent;
pub use lifecycle::{AppNotification, AppNotifier, LifecycleEvent};
pub use permission::{AuthorizationStatus, PermissionGate, PermissionProvider};
pub use presentation::Presenter;
pub use scanner::{ScannerError, ScannerScreen};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

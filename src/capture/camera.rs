//! Camera hardware abstraction.
//!
//! The camera subsystem is an external collaborator. These traits describe
//! what the pipeline needs from it: a default video device, a session that
//! accepts one input and one metadata output, a preview surface, and a
//! detection callback that runs on a caller-supplied queue.

use super::{ScreenBounds, SymbologySet, VideoGravity};
use crate::detection::{DetectionBatch, MetadataObject};
use crate::executor::QueueHandle;
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback receiving detection batches from a running session.
pub type DetectionSink = Arc<dyn Fn(DetectionBatch) + Send + Sync>;

/// A video input device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDevice {
    pub id: String,
    pub name: String,
}

impl VideoDevice {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Metadata output configured with the symbologies it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataOutput {
    pub symbologies: SymbologySet,
}

/// Live preview surface description handed to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewLayer {
    pub bounds: ScreenBounds,
    pub gravity: VideoGravity,
}

/// Entry point into the platform camera subsystem.
pub trait CameraBackend: Send + Sync + 'static {
    /// Acquires the default video device, if one exists.
    fn default_video_device(&self) -> Option<VideoDevice>;

    /// Creates an empty, unconfigured session.
    fn new_session(&self) -> Box<dyn SessionDriver>;
}

/// A hardware capture session.
pub trait SessionDriver: Send {
    fn can_add_input(&self, device: &VideoDevice) -> bool;

    fn add_input(&mut self, device: VideoDevice);

    fn can_add_output(&self, output: &MetadataOutput) -> bool;

    /// Adds the output. Detection batches are delivered to `delegate` as jobs
    /// on `queue`.
    fn add_output(&mut self, output: MetadataOutput, delegate: DetectionSink, queue: QueueHandle);

    fn attach_preview(&mut self, preview: PreviewLayer);

    /// Starts the hardware. Blocks until the camera is running.
    fn start_running(&mut self);

    /// Stops the hardware.
    fn stop_running(&mut self);

    fn is_running(&self) -> bool;
}

/// Calls recorded by [`MockCameraBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    AcquireDevice,
    NewSession,
    AddInput(String),
    AddOutput(Vec<super::Symbology>),
    AttachPreview(PreviewLayer),
    StartRunning,
    StopRunning,
}

#[derive(Default)]
struct MockState {
    device: Option<VideoDevice>,
    reject_input: bool,
    reject_output: bool,
    running: bool,
    frame: u64,
    delegate: Option<(DetectionSink, QueueHandle)>,
    calls: Vec<BackendCall>,
}

/// In-memory camera for tests and the demo binary.
///
/// Clones share state, so a test can keep one handle while the pipeline
/// owns another.
#[derive(Clone)]
pub struct MockCameraBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockCameraBackend {
    /// A backend with one working camera.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                device: Some(VideoDevice::new("mock-0", "Mock Back Camera")),
                ..Default::default()
            })),
        }
    }

    /// A backend with no camera attached.
    pub fn without_device() -> Self {
        let backend = Self::new();
        backend.set_device_available(false);
        backend
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_device_available(&self, available: bool) {
        self.lock().device =
            available.then(|| VideoDevice::new("mock-0", "Mock Back Camera"));
    }

    pub fn set_reject_input(&self, reject: bool) {
        self.lock().reject_input = reject;
    }

    pub fn set_reject_output(&self, reject: bool) {
        self.lock().reject_output = reject;
    }

    /// True while the hardware is running.
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &BackendCall) -> usize {
        self.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Reports one analyzed frame if the hardware is running.
    ///
    /// Returns `false` if nothing was delivered.
    pub fn emit(&self, objects: Vec<MetadataObject>) -> bool {
        if !self.lock().running {
            return false;
        }
        self.inject(objects)
    }

    /// Reports one analyzed frame regardless of the running state, the way a
    /// frame already in flight reaches the delegate after a stop request.
    pub fn inject(&self, objects: Vec<MetadataObject>) -> bool {
        let (delegate, queue, frame) = {
            let mut state = self.lock();
            let Some((delegate, queue)) = state.delegate.clone() else {
                return false;
            };
            state.frame += 1;
            (delegate, queue, state.frame)
        };

        let batch = DetectionBatch::new(objects, frame);
        queue.submit(move || delegate(batch));
        true
    }
}

impl Default for MockCameraBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraBackend for MockCameraBackend {
    fn default_video_device(&self) -> Option<VideoDevice> {
        let mut state = self.lock();
        state.calls.push(BackendCall::AcquireDevice);
        state.device.clone()
    }

    fn new_session(&self) -> Box<dyn SessionDriver> {
        self.lock().calls.push(BackendCall::NewSession);
        Box::new(MockSession {
            backend: self.clone(),
        })
    }
}

struct MockSession {
    backend: MockCameraBackend,
}

impl SessionDriver for MockSession {
    fn can_add_input(&self, _device: &VideoDevice) -> bool {
        !self.backend.lock().reject_input
    }

    fn add_input(&mut self, device: VideoDevice) {
        self.backend.lock().calls.push(BackendCall::AddInput(device.id));
    }

    fn can_add_output(&self, _output: &MetadataOutput) -> bool {
        !self.backend.lock().reject_output
    }

    fn add_output(&mut self, output: MetadataOutput, delegate: DetectionSink, queue: QueueHandle) {
        let mut state = self.backend.lock();
        state
            .calls
            .push(BackendCall::AddOutput(output.symbologies.iter().collect()));
        state.delegate = Some((delegate, queue));
    }

    fn attach_preview(&mut self, preview: PreviewLayer) {
        self.backend
            .lock()
            .calls
            .push(BackendCall::AttachPreview(preview));
    }

    fn start_running(&mut self) {
        let mut state = self.backend.lock();
        state.calls.push(BackendCall::StartRunning);
        state.running = true;
        tracing::info!("MockCamera session running");
    }

    fn stop_running(&mut self) {
        let mut state = self.backend.lock();
        state.calls.push(BackendCall::StopRunning);
        state.running = false;
        tracing::info!("MockCamera session stopped");
    }

    fn is_running(&self) -> bool {
        self.backend.lock().running
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        let mut state = self.backend.lock();
        state.running = false;
        state.delegate = None;
    }
}

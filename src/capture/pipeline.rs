//! Capture pipeline: lazy session construction plus non-blocking start/stop.
//!
//! The session handle belongs to the serial background queue. Callers on
//! the foreground context only post requests; every touch of the hardware
//! happens inside a queued job, in submission order.

use super::camera::{CameraBackend, DetectionSink};
use super::session::{CaptureSession, PipelineError, SessionState};
use super::{ScannerConfig, SymbologySet};
use crate::detection::DetectionBatch;
use crate::executor::QueueHandle;
use crate::metrics::ScannerMetrics;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Receives detection batches from a running pipeline.
///
/// Called on the serial background queue, never concurrently with a start
/// or stop of the same pipeline.
pub trait DetectionHandler: Send + Sync + 'static {
    fn handle_batch(&self, pipeline: &CapturePipeline, batch: DetectionBatch);
}

struct PipelineInner {
    backend: Arc<dyn CameraBackend>,
    config: ScannerConfig,
    symbologies: SymbologySet,
    queue: QueueHandle,
    handler: Arc<dyn DetectionHandler>,
    metrics: ScannerMetrics,
    state: Mutex<SessionState>,
    /// Last requested state. Flipped when start/stop is called, before the
    /// hardware job runs, so batches already in flight see a stop at once.
    armed: AtomicBool,
    /// Foreground view of `state`, published by queue jobs after each
    /// transition. Readers never take the session lock.
    prepared: AtomicBool,
    running: AtomicBool,
}

/// Cloneable handle to the capture pipeline of one screen.
#[derive(Clone)]
pub struct CapturePipeline {
    inner: Arc<PipelineInner>,
}

impl CapturePipeline {
    pub fn new(
        backend: Arc<dyn CameraBackend>,
        config: ScannerConfig,
        symbologies: SymbologySet,
        queue: QueueHandle,
        handler: Arc<dyn DetectionHandler>,
        metrics: ScannerMetrics,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                backend,
                config,
                symbologies,
                queue,
                handler,
                metrics,
                state: Mutex::new(SessionState::Uninitialized),
                armed: AtomicBool::new(false),
                prepared: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Schedules session construction. No-op if a session already exists.
    pub fn prepare(&self) {
        let pipeline = self.clone();
        self.inner.queue.submit(move || {
            if pipeline.prepare_now().is_err() {
                return;
            }
        });
    }

    /// Schedules prepare-then-start on the background queue.
    ///
    /// Returns immediately; camera start-up never blocks the caller.
    pub fn start(&self) {
        self.inner.armed.store(true, Ordering::SeqCst);

        let pipeline = self.clone();
        self.inner.queue.submit(move || {
            if pipeline.prepare_now().is_err() {
                return;
            }
            let mut state = pipeline.lock_state();
            if let Some(session) = state.session_mut() {
                if session.start_running() {
                    pipeline.inner.metrics.record_session_started();
                    tracing::info!(device = %session.device().name, "Capture session started");
                } else {
                    tracing::trace!("Capture session already running");
                }
                pipeline.publish_running(session.is_running());
            }
        });
    }

    /// Schedules a hardware stop. Safe when never started or already stopped.
    pub fn stop(&self) {
        self.inner.armed.store(false, Ordering::SeqCst);

        let pipeline = self.clone();
        self.inner.queue.submit(move || {
            let mut state = pipeline.lock_state();
            let stopped = state.session_mut().map_or(false, CaptureSession::stop_running);
            if stopped {
                pipeline.inner.metrics.record_session_stopped();
                tracing::info!("Capture session stopped");
            } else {
                tracing::trace!("Capture session not running; stop ignored");
            }
            pipeline.publish_running(false);
        });
    }

    /// Stops the hardware and releases the session.
    pub fn teardown(&self) {
        self.stop();

        let pipeline = self.clone();
        self.inner.queue.submit(move || {
            let previous = std::mem::take(&mut *pipeline.lock_state());
            pipeline.inner.prepared.store(false, Ordering::SeqCst);
            pipeline.publish_running(false);
            if previous.is_ready() {
                tracing::debug!("Capture session released");
            }
        });
    }

    /// True if the last request was a start.
    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    /// True once a session has been constructed. Never waits on the
    /// background queue.
    pub fn is_prepared(&self) -> bool {
        self.inner.prepared.load(Ordering::SeqCst)
    }

    /// True while the session hardware is running, as of the last completed
    /// start or stop job. Never waits on the background queue.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn symbologies(&self) -> &SymbologySet {
        &self.inner.symbologies
    }

    pub fn metrics(&self) -> &ScannerMetrics {
        &self.inner.metrics
    }

    fn publish_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    /// Session lock. Taken by queue jobs only.
    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Builds the session if missing. Runs on the background queue only.
    fn prepare_now(&self) -> Result<(), PipelineError> {
        let mut state = self.lock_state();
        if state.is_ready() {
            return Ok(());
        }

        let result = CaptureSession::configure(
            self.inner.backend.as_ref(),
            &self.inner.config,
            self.inner.symbologies.clone(),
            self.detection_sink(),
            self.inner.queue.clone(),
        );

        match result {
            Ok(session) => {
                tracing::info!(
                    device = %session.device().name,
                    symbologies = session.symbologies().len(),
                    "Capture session prepared"
                );
                *state = SessionState::Ready(session);
                self.inner.prepared.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                self.inner.metrics.record_prepare_failure();
                tracing::warn!(error = %e, "Camera unavailable; capture session not constructed");
                Err(e)
            }
        }
    }

    /// The session holds this sink, so it must not keep the pipeline alive.
    fn detection_sink(&self) -> DetectionSink {
        let weak: Weak<PipelineInner> = Arc::downgrade(&self.inner);
        Arc::new(move |batch: DetectionBatch| {
            if let Some(inner) = weak.upgrade() {
                CapturePipeline { inner }.deliver(batch);
            }
        })
    }

    fn deliver(&self, batch: DetectionBatch) {
        if !self.is_armed() {
            self.inner.metrics.record_dropped();
            tracing::debug!(frame = batch.frame(), "Pipeline stopped; detection batch dropped");
            return;
        }
        self.inner.handler.handle_batch(self, batch);
    }
}

impl std::fmt::Debug for CapturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturePipeline")
            .field("queue", &self.inner.queue.label())
            .field("armed", &self.is_armed())
            .finish()
    }
}

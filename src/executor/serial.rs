//! Dedicated serial background queue.
//!
//! Jobs run one at a time on a single worker thread in submission order.
//! Submitting never blocks the caller.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use thiserror::Error;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Shutdown,
}

/// Errors that can occur when creating or using a serial queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to spawn queue worker: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("queue {0} has shut down")]
    ShutDown(String),
}

/// Cloneable submission handle to a [`SerialQueue`].
#[derive(Clone)]
pub struct QueueHandle {
    label: String,
    sender: Sender<Message>,
    pending: Arc<AtomicUsize>,
}

impl QueueHandle {
    /// Posts a job to the queue.
    ///
    /// Jobs submitted after shutdown are discarded.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.sender.send(Message::Run(Box::new(job))).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            tracing::trace!(queue = %self.label, "Dropped job submitted after shutdown");
        }
    }

    /// Returns the queue label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("label", &self.label)
            .finish()
    }
}

/// An owned serial execution context backed by one worker thread.
///
/// Dropping the queue runs every job already submitted, then joins the worker.
pub struct SerialQueue {
    handle: QueueHandle,
    worker: Option<JoinHandle<()>>,
    worker_id: ThreadId,
}

impl SerialQueue {
    /// Spawns the worker thread for a new queue.
    pub fn new(label: impl Into<String>) -> Result<Self, QueueError> {
        let label = label.into();
        let (sender, receiver) = unbounded();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_pending = Arc::clone(&pending);
        let worker = thread::Builder::new()
            .name(label.clone())
            .spawn(move || run_worker(receiver, worker_pending))?;
        let worker_id = worker.thread().id();

        tracing::debug!(queue = %label, "Serial queue started");

        Ok(Self {
            handle: QueueHandle {
                label,
                sender,
                pending,
            },
            worker: Some(worker),
            worker_id,
        })
    }

    /// Returns a cloneable submission handle.
    pub fn handle(&self) -> QueueHandle {
        self.handle.clone()
    }

    /// Posts a job to the queue.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.submit(job);
    }

    /// Blocks until every job submitted before this call has run.
    ///
    /// Jobs submitted by those jobs are not waited for.
    pub fn flush(&self) -> Result<(), QueueError> {
        if thread::current().id() == self.worker_id {
            // Already on the worker: everything earlier has run.
            return Ok(());
        }

        let (done_tx, done_rx) = bounded(1);
        self.handle.submit(move || {
            let _ = done_tx.send(());
        });
        done_rx
            .recv()
            .map_err(|_| QueueError::ShutDown(self.handle.label.clone()))
    }

    /// Blocks until the queue is idle, including follow-up jobs that
    /// queued jobs submit to this same queue.
    pub fn wait_idle(&self) -> Result<(), QueueError> {
        if thread::current().id() == self.worker_id {
            return Ok(());
        }
        loop {
            self.flush()?;
            if self.handle.pending.load(Ordering::SeqCst) == 0 {
                return Ok(());
            }
            thread::yield_now();
        }
    }

    /// Returns the queue label.
    pub fn label(&self) -> &str {
        &self.handle.label
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        let _ = self.handle.sender.send(Message::Shutdown);

        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!(queue = %self.handle.label, "Queue worker panicked");
            }
        }
        tracing::debug!(queue = %self.handle.label, "Serial queue stopped");
    }
}

fn run_worker(receiver: Receiver<Message>, pending: Arc<AtomicUsize>) {
    while let Ok(message) = receiver.recv() {
        match message {
            Message::Run(job) => {
                job();
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            Message::Shutdown => break,
        }
    }
}

//! Single-thread FIFO job executor
//!
//! Every driver call goes through one `WorkerThread`, so the driver never
//! sees two calls at once no matter how many callers submit work.

use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs submitted jobs one at a time, in submission order
pub struct WorkerThread {
    name: String,
    tx: mpsc::UnboundedSender<Job>,
    _handle: JoinHandle<()>,
}

impl WorkerThread {
    /// Spawn the worker thread
    ///
    /// Panics if the OS refuses to create a thread.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                debug!("Worker queue closed");
            })
            .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"));

        debug!(name = %name, "Worker thread started");
        Self {
            name,
            tx,
            _handle: handle,
        }
    }

    /// Queue a job; returns immediately
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            error!(name = %self.name, "Worker thread is gone, job dropped");
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

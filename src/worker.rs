//! Serialized capture worker
//!
//! Exactly one OS thread executes every native device call for both sources,
//! modelling the single physical capture subsystem. Jobs run FIFO in
//! submission order; internal and external starts/stops never overlap.

use crate::errors::BinocamError;
use crossbeam_channel::{unbounded, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct WorkerInner {
    tx: Mutex<Option<Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

/// Cloneable handle to the shared capture worker thread
#[derive(Clone)]
pub struct CaptureWorker {
    inner: Arc<WorkerInner>,
}

impl CaptureWorker {
    pub fn new() -> Result<Self, BinocamError> {
        let (tx, rx) = unbounded::<Job>();
        let handle = std::thread::Builder::new()
            .name("binocam-capture".to_string())
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })
            .map_err(|e| BinocamError::InitializationError(format!("worker spawn failed: {}", e)))?;

        Ok(Self {
            inner: Arc::new(WorkerInner {
                tx: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    /// Enqueue a job behind everything already submitted.
    ///
    /// Silently dropped after shutdown; late stop requests during teardown
    /// have nothing left to stop.
    pub fn execute<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.inner.tx.lock().expect("lock poisoned");
        if let Some(tx) = guard.as_ref() {
            let _ = tx.send(Box::new(job));
        }
    }

    /// Block until every job submitted so far has completed.
    ///
    /// Intended for tests and orderly shutdown paths; the presentation
    /// thread never calls this on the hot path.
    pub fn wait_idle(&self) {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        self.execute(move || {
            let _ = done_tx.send(());
        });
        let _ = done_rx.recv();
    }

    /// Stop accepting jobs and join the thread after the queue drains.
    pub fn shutdown(&self) {
        let tx = self.inner.tx.lock().expect("lock poisoned").take();
        drop(tx);
        if let Some(handle) = self.inner.handle.lock().expect("lock poisoned").take() {
            let _ = handle.join();
        }
    }
}

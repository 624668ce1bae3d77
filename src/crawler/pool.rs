//! Fixed-size worker pool
//!
//! A pool owns `size` long-lived Tokio tasks that pull jobs from one shared
//! queue, so at most `size` jobs of a pool execute at any instant. Both the
//! download dispatcher and the extraction pool are built on it.

use crate::CrawlError;
use futures::future::{BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Most workers a single pool spawns, whatever size was requested
pub const MAX_WORKERS: usize = 1024;

/// A unit of work executed by a pool worker
pub type Job = BoxFuture<'static, ()>;

/// A fixed number of workers draining a shared job queue
///
/// The queue is unbounded: a finishing download enqueues the next pending
/// download of its host from inside a worker and must never wait for room.
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    sender: Mutex<Option<UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WorkerPool {
    /// Creates a pool and spawns its workers
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `name` - Pool name used in log events
    /// * `size` - Requested workers; callers validate that it is non-zero.
    ///   At most `MAX_WORKERS` are spawned.
    pub fn new(name: &'static str, size: usize) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel::<Job>();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        if size > MAX_WORKERS {
            tracing::debug!(
                "{} pool of {} requested, capping at {} workers",
                name,
                size,
                MAX_WORKERS
            );
        }
        let size = size.min(MAX_WORKERS);

        let workers = (0..size)
            .map(|id| tokio::spawn(run_worker(name, id, Arc::clone(&receiver))))
            .collect();

        tracing::debug!("Started {} pool with {} workers", name, size);

        Self {
            name,
            size,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
        }
    }

    /// Queues a job for execution
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The job was queued
    /// * `Err(CrawlError::Closed)` - The pool was shut down; the job is dropped
    pub fn execute(&self, job: Job) -> Result<(), CrawlError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(job).map_err(|_| CrawlError::Closed),
            None => Err(CrawlError::Closed),
        }
    }

    /// Stops the pool
    ///
    /// The queue is closed and the workers are aborted: queued jobs are
    /// dropped and running jobs are cancelled at their next await point.
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let workers =
            std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for worker in workers {
            worker.abort();
        }

        tracing::debug!("Shut down {} pool", self.name);
    }

    /// Number of workers spawned
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns true once `shutdown` was called
    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Worker loop: run jobs until the queue is closed
async fn run_worker(
    name: &'static str,
    id: usize,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<Job>>>,
) {
    loop {
        let job = {
            let mut receiver = receiver.lock().await;
            receiver.recv().await
        };

        let Some(job) = job else {
            break;
        };

        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            tracing::warn!("{} worker {} recovered from a panicking job", name, id);
        }
    }

    tracing::trace!("{} worker {} exiting", name, id);
}

//! Download scheduling: per-host admission on top of the download pool
//!
//! This module handles:
//! - Routing each download to its host by URL
//! - Limiting concurrent downloads per host, buffering the excess
//! - Handing a host's next buffered download to the pool when one finishes
//! - Global download concurrency via the shared worker pool

use crate::crawler::pool::{Job, WorkerPool};
use crate::state::HostState;
use crate::url::host_of;
use dashmap::DashMap;
use futures::future::FutureExt;
use std::sync::{Arc, Mutex, PoisonError};

type SharedHost = Arc<Mutex<HostState<Job>>>;

/// Per-host admission control
///
/// Each host has its own `HostState` behind its own mutex, so admission
/// decisions for different hosts never wait on each other. Host records
/// are created on first use and live as long as the admission controller.
pub(crate) struct HostAdmission {
    /// Pool every admitted download runs on
    pool: WorkerPool,

    /// Host records keyed by lowercase host
    hosts: DashMap<String, SharedHost>,

    /// Maximum concurrent downloads per host
    per_host: usize,
}

impl HostAdmission {
    fn new(pool: WorkerPool, per_host: usize) -> Self {
        Self {
            pool,
            hosts: DashMap::new(),
            per_host,
        }
    }

    /// Admits `job` for `host`, running it now or queueing it
    fn submit(self: &Arc<Self>, host: String, job: Job) {
        let state = self
            .hosts
            .entry(host)
            .or_insert_with(|| Arc::new(Mutex::new(HostState::new())))
            .clone();

        let ready = {
            let mut guard = lock(&state);
            if self.pool.is_shut_down() {
                tracing::debug!("Download pool is shut down, dropping download");
                return;
            }
            guard.admit(job, self.per_host)
        };
        if let Some(job) = ready {
            self.dispatch(state, job);
        }
    }

    /// Shuts the pool down and drops every job still waiting for a host slot
    fn shutdown(&self) {
        self.pool.shutdown();

        let mut dropped = 0;
        for entry in self.hosts.iter() {
            let pending = lock(entry.value()).clear();
            dropped += pending.len();
        }

        if dropped > 0 {
            tracing::debug!("Dropped {} queued downloads on shutdown", dropped);
        }
    }

    /// Sends an admitted job to the pool
    ///
    /// When the job finishes, its host either frees the slot or hands back
    /// the next pending job, which is queued onto the pool as a fresh job.
    fn dispatch(self: &Arc<Self>, state: SharedHost, job: Job) {
        let slot = HostSlot {
            admission: Arc::clone(self),
            state,
        };

        let wrapped = async move {
            // released on drop, so a panicking or aborted job frees its slot too
            let _slot = slot;
            job.await;
        }
        .boxed();

        if self.pool.execute(wrapped).is_err() {
            tracing::debug!("Download pool is shut down, dropping download");
        }
    }

    /// Number of downloads running or queued on the pool for `host`
    #[cfg(test)]
    fn running(&self, host: &str) -> usize {
        self.hosts
            .get(host)
            .map(|state| {
                let guard = lock(state.value());
                guard.running()
            })
            .unwrap_or(0)
    }

    /// Number of downloads waiting for a slot on `host`
    #[cfg(test)]
    fn pending(&self, host: &str) -> usize {
        self.hosts
            .get(host)
            .map(|state| {
                let guard = lock(state.value());
                guard.pending_len()
            })
            .unwrap_or(0)
    }
}

/// An occupied download slot of one host
struct HostSlot {
    admission: Arc<HostAdmission>,
    state: SharedHost,
}

impl Drop for HostSlot {
    fn drop(&mut self) {
        let next = lock(&self.state).complete();
        if let Some(next) = next {
            if self.admission.pool.is_shut_down() {
                // dropping the job releases its barrier party
                return;
            }
            self.admission.dispatch(Arc::clone(&self.state), next);
        }
    }
}

fn lock(state: &SharedHost) -> std::sync::MutexGuard<'_, HostState<Job>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Download dispatcher: a fixed download pool plus per-host admission
///
/// Submitted jobs eventually run on a pool worker, subject to both the pool
/// size and the per-host limit. Jobs report their outcome through their own
/// captured state; the dispatcher returns nothing.
#[derive(Clone)]
pub struct DownloadDispatcher {
    admission: Arc<HostAdmission>,
}

impl DownloadDispatcher {
    /// Creates a dispatcher
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `pool_size` - Number of download workers
    /// * `per_host` - Maximum concurrent downloads per host
    pub fn new(pool_size: usize, per_host: usize) -> Self {
        let pool = WorkerPool::new("download", pool_size);
        Self {
            admission: Arc::new(HostAdmission::new(pool, per_host)),
        }
    }

    /// Submits a download job routed by `url`
    ///
    /// A URL without a parseable host cannot be routed: the job is dropped
    /// without running and nothing is reported.
    pub fn submit(&self, url: &str, job: Job) {
        match host_of(url) {
            Ok(host) => self.admission.submit(host, job),
            Err(e) => {
                tracing::debug!("Dropping download of {}: {}", url, e);
            }
        }
    }

    /// Stops the download pool; queued and in-flight downloads are abandoned
    pub fn shutdown(&self) {
        self.admission.shutdown();
    }

    /// Returns true once the download pool was shut down
    pub fn is_shut_down(&self) -> bool {
        self.admission.pool.is_shut_down()
    }

    /// Number of distinct hosts seen so far
    #[cfg(test)]
    fn host_count(&self) -> usize {
        self.admission.hosts.len()
    }

    /// Number of admitted, unfinished downloads for `host`
    #[cfg(test)]
    fn running(&self, host: &str) -> usize {
        self.admission.running(host)
    }

    /// Number of downloads waiting for a slot on `host`
    #[cfg(test)]
    fn pending(&self, host: &str) -> usize {
        self.admission.pending(host)
    }

    /// Size of the download pool
    #[cfg(test)]
    fn pool_size(&self) -> usize {
        self.admission.pool.size()
    }

    /// Per-host download limit
    #[cfg(test)]
    fn per_host(&self) -> usize {
        self.admission.per_host
    }
}

//! Layer barrier
//!
//! Counts the outstanding work of one crawl layer. Every download registers
//! a party when it is submitted and every extraction registers one when it
//! is spawned; the coordinator holds one more party until it waits. The wait
//! resolves when every party has arrived.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug)]
struct BarrierInner {
    pending: AtomicUsize,
    released: Notify,
}

impl BarrierInner {
    fn arrive(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.released.notify_one();
        }
    }
}

/// Barrier for one layer, owned by the coordinator
///
/// Creating the barrier registers the coordinator's own party.
#[derive(Debug)]
pub struct LayerBarrier {
    inner: Arc<BarrierInner>,
}

/// A registered party; dropping it arrives at the barrier
///
/// Because arrival happens on drop, a job that is discarded before it runs
/// still releases its party.
#[derive(Debug)]
#[must_use = "dropping a party arrives at the barrier immediately"]
pub struct Party {
    inner: Arc<BarrierInner>,
}

impl LayerBarrier {
    /// Creates a barrier holding the coordinator's party
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BarrierInner {
                pending: AtomicUsize::new(1),
                released: Notify::new(),
            }),
        }
    }

    /// Registers a new party
    pub fn register(&self) -> Party {
        register(&self.inner)
    }

    /// Number of parties that have not arrived yet
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Arrives with the coordinator's party and waits for all others
    pub async fn arrive_and_wait(self) {
        self.inner.arrive();

        loop {
            let released = self.inner.released.notified();
            if self.inner.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            released.await;
        }
    }
}

impl Default for LayerBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl Party {
    /// Registers another party on the same barrier
    ///
    /// Used by a running download to account for the extraction it spawns
    /// while its own party is still outstanding.
    pub fn register(&self) -> Party {
        register(&self.inner)
    }
}

impl Drop for Party {
    fn drop(&mut self) {
        self.inner.arrive();
    }
}

fn register(inner: &Arc<BarrierInner>) -> Party {
    inner.pending.fetch_add(1, Ordering::AcqRel);
    Party {
        inner: Arc::clone(inner),
    }
}

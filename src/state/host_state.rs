use std::collections::VecDeque;

/// Tracks the downloads of a single host
///
/// `running` counts admitted tasks that have not finished yet; tasks beyond
/// the per-host limit wait in `pending` in submission order. The record is
/// generic over the task type so the admission rules can be exercised
/// without a runtime.
#[derive(Debug)]
pub struct HostState<T> {
    /// Number of admitted, unfinished tasks for this host
    running: usize,

    /// Tasks waiting for a free slot
    pending: VecDeque<T>,
}

impl<T> HostState<T> {
    /// Creates an idle host record
    pub fn new() -> Self {
        Self {
            running: 0,
            pending: VecDeque::new(),
        }
    }

    /// Offers a task to this host
    ///
    /// # Arguments
    ///
    /// * `task` - The task to admit
    /// * `limit` - Maximum number of concurrently running tasks
    ///
    /// # Returns
    ///
    /// * `Some(task)` - The task may run now; it has been counted as running
    /// * `None` - The host is at its limit; the task was queued
    pub fn admit(&mut self, task: T, limit: usize) -> Option<T> {
        if self.running < limit {
            self.running += 1;
            Some(task)
        } else {
            self.pending.push_back(task);
            None
        }
    }

    /// Records that a running task finished
    ///
    /// When a task is pending it is handed over and takes the finished
    /// task's slot, so `running` is unchanged. Otherwise the slot is freed.
    pub fn complete(&mut self) -> Option<T> {
        match self.pending.pop_front() {
            Some(next) => Some(next),
            None => {
                self.running = self.running.saturating_sub(1);
                None
            }
        }
    }

    /// Forgets every task, running or queued
    ///
    /// Returns the queued tasks so the caller decides when they are dropped.
    pub fn clear(&mut self) -> Vec<T> {
        self.running = 0;
        self.pending.drain(..).collect()
    }

    /// Number of admitted, unfinished tasks
    pub fn running(&self) -> usize {
        self.running
    }

    /// Number of queued tasks
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true when nothing runs or waits for this host
    #[cfg(test)]
    fn is_idle(&self) -> bool {
        self.running == 0 && self.pending.is_empty()
    }
}

impl<T> Default for HostState<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Bounded in-memory frontier queue with disk overflow
//!
//! The frontier holds pending jobs in a `VecDeque` up to a configured
//! ceiling. Once the ceiling is hit, enqueues spill to the
//! [`OverflowStore`] and keep spilling while `overflow_active` is set,
//! even if in-memory capacity frees up in the meantime; interleaving the
//! two paths would scramble ordering. The worker whose dequeue empties
//! the in-memory queue drains a bounded batch back, and `overflow_active`
//! clears only when the spool reaches zero.
//!
//! Delivery is exactly-once: a job enters either the deque or the spool,
//! and leaves through a single `dequeue` call. Both structures live under
//! one mutex (never held across an await); parked consumers wait on a
//! `Notify` with the create-future-then-check pattern.

use crate::scheduler::overflow::{OverflowError, OverflowStore};
use crate::scheduler::Job;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Occupancy snapshot for progress reporting
#[derive(Debug, Clone, Copy)]
pub struct QueueSnapshot {
    pub in_memory: usize,
    pub overflow: usize,
    pub overflow_active: bool,
}

struct FrontierInner {
    ready: VecDeque<Job>,
    overflow: OverflowStore,
    overflow_active: bool,
    closed: bool,
}

/// Shared work queue feeding the worker pool
pub struct FrontierQueue {
    inner: Mutex<FrontierInner>,
    available: Notify,
    ceiling: usize,
}

impl FrontierQueue {
    pub fn new(ceiling: usize) -> std::io::Result<Self> {
        Ok(Self {
            inner: Mutex::new(FrontierInner {
                ready: VecDeque::new(),
                overflow: OverflowStore::new()?,
                overflow_active: false,
                closed: false,
            }),
            available: Notify::new(),
            ceiling,
        })
    }

    /// Accepts a job for eventual delivery to exactly one `dequeue`
    ///
    /// Returns `Ok(false)` if the queue is closed (the job was not
    /// accepted); `Err` if the overflow spool rejected the record.
    pub fn enqueue(&self, job: Job) -> Result<bool, OverflowError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Ok(false);
        }

        if inner.overflow_active || inner.ready.len() >= self.ceiling {
            if !inner.overflow_active {
                tracing::warn!(
                    ceiling = self.ceiling,
                    "frontier at ceiling, spilling to overflow store"
                );
            }
            inner.overflow.push(&job)?;
            inner.overflow_active = true;
            if inner.ready.is_empty() {
                // a parked consumer must wake to run the drain pass
                self.available.notify_one();
            }
        } else {
            inner.ready.push_back(job);
            self.available.notify_one();
        }
        Ok(true)
    }

    /// Waits for a job, or returns None once the queue is closed
    pub async fn dequeue(&self) -> Option<Job> {
        loop {
            let available = self.available.notified();
            {
                let mut inner = self.inner.lock().unwrap();
                if inner.closed {
                    return None;
                }

                if inner.ready.is_empty() && inner.overflow_active {
                    self.drain_locked(&mut inner);
                    if inner.closed {
                        return None;
                    }
                }

                if let Some(job) = inner.ready.pop_front() {
                    if inner.ready.is_empty() && inner.overflow_active {
                        // this dequeue emptied the queue: move the next
                        // bounded batch back into memory before releasing
                        // the lock, so only one drain pass ever runs
                        self.drain_locked(&mut inner);
                    }
                    if !inner.ready.is_empty() {
                        // chain wakeups so one stored permit cannot strand
                        // other parked consumers behind a non-empty queue
                        self.available.notify_one();
                    }
                    return Some(job);
                }
            }
            available.await;
        }
    }

    /// Moves `min(ceiling, overflow len)` records back into memory
    fn drain_locked(&self, inner: &mut FrontierInner) {
        let batch = self.ceiling.min(inner.overflow.len());
        match inner.overflow.pop_batch(batch) {
            Ok(jobs) => {
                let moved = jobs.len();
                inner.ready.extend(jobs);
                if inner.overflow.is_empty() {
                    inner.overflow_active = false;
                    tracing::info!(moved, "overflow store fully drained");
                } else {
                    tracing::debug!(
                        moved,
                        remaining = inner.overflow.len(),
                        "partial overflow drain"
                    );
                }
            }
            Err(e) => {
                // a broken spool cannot be recovered mid-run; close the
                // queue so the run terminates with partial results instead
                // of hanging on jobs that can no longer be delivered
                tracing::error!(error = %e, "overflow drain failed, closing frontier");
                inner.closed = true;
                self.available.notify_waiters();
            }
        }
    }

    /// Closes the queue; parked and future dequeues return None
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.closed {
            inner.closed = true;
            self.available.notify_waiters();
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let inner = self.inner.lock().unwrap();
        QueueSnapshot {
            in_memory: inner.ready.len(),
            overflow: inner.overflow.len(),
            overflow_active: inner.overflow_active,
        }
    }
}

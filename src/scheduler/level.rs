//! BFS level coordination
//!
//! The coordinator tracks how many jobs the current level is expected to
//! deliver, how many have finished (or failed, or been discarded as
//! duplicates), and how many jobs the next level has accumulated. A
//! worker holding a job from a deeper level parks at [`LevelCoordinator::gate`]
//! until the current level's outstanding work reaches zero; the first
//! such worker to observe the drained level performs the transition under
//! the state lock, and every later observer sees the bumped level and
//! falls through. There are no sleeps anywhere in the protocol.

use crate::scheduler::Shutdown;
use std::sync::Mutex;
use tokio::sync::Notify;

/// Totals recorded for one completed (or interrupted) level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelReport {
    pub level: u32,
    /// Jobs enqueued for this level
    pub expected: u64,
    /// Jobs consumed at this level, failures and duplicates included
    pub finished: u64,
    pub failed: u64,
    pub duplicates: u64,
}

/// Non-blocking snapshot of the current level's counters
#[derive(Debug, Clone, Copy)]
pub struct LevelSnapshot {
    pub level: u32,
    pub expected_this_level: u64,
    pub finished_this_level: u64,
    pub failed_this_level: u64,
    pub discovered_next_level: u64,
}

struct LevelState {
    level: u32,
    expected: u64,
    finished: u64,
    failed: u64,
    duplicates: u64,
    discovered_next: u64,
    completed: Vec<LevelReport>,
}

impl LevelState {
    fn advance(&mut self) {
        self.completed.push(LevelReport {
            level: self.level,
            expected: self.expected,
            finished: self.finished,
            failed: self.failed,
            duplicates: self.duplicates,
        });
        self.expected = self.discovered_next;
        self.discovered_next = 0;
        self.finished = 0;
        self.failed = 0;
        self.duplicates = 0;
        self.level += 1;
    }
}

/// Tracks the crawl's current BFS depth and performs level transitions
pub struct LevelCoordinator {
    state: Mutex<LevelState>,
    barrier: Notify,
}

impl LevelCoordinator {
    /// Starts at level 1 expecting exactly the seed job
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LevelState {
                level: 1,
                expected: 1,
                finished: 0,
                failed: 0,
                duplicates: 0,
                discovered_next: 0,
                completed: Vec::new(),
            }),
            barrier: Notify::new(),
        }
    }

    /// Holds a worker carrying a depth-`depth` job until that depth is
    /// current
    ///
    /// Returns false if the run was cancelled while waiting; the caller
    /// must not process the job in that case.
    pub(crate) async fn gate(&self, depth: u32, shutdown: &Shutdown) -> bool {
        loop {
            let barrier = self.barrier.notified();
            let cancelled = shutdown.cancelled();
            if shutdown.is_cancelled() {
                return false;
            }

            {
                let mut s = self.state.lock().unwrap();
                if depth <= s.level {
                    return true;
                }
                if s.finished >= s.expected {
                    // double-checked transition: exactly one worker gets
                    // here with the level still behind its job's depth
                    tracing::info!(
                        level = s.level,
                        finished = s.finished,
                        failed = s.failed,
                        next_expected = s.discovered_next,
                        "level complete, advancing"
                    );
                    s.advance();
                    self.barrier.notify_waiters();
                    continue;
                }
            }

            tokio::select! {
                _ = barrier => {}
                _ = cancelled => {}
            }
        }
    }

    /// Accounts for jobs enqueued for the next level
    pub fn record_discovered(&self, n: u64) {
        self.state.lock().unwrap().discovered_next += n;
    }

    /// Accounts for one consumed job at the current level
    pub fn job_finished(&self, failed: bool) {
        let mut s = self.state.lock().unwrap();
        s.finished += 1;
        if failed {
            s.failed += 1;
        }
        if s.finished > s.expected {
            // unreachable when the barrier invariant holds; surfacing it
            // beats silently corrupting the per-level totals
            tracing::error!(
                level = s.level,
                finished = s.finished,
                expected = s.expected,
                "level accounting exceeded expected job count"
            );
        }
        if s.finished >= s.expected {
            self.barrier.notify_waiters();
        }
    }

    /// Accounts for a job discarded by the dedup gate
    ///
    /// The duplicate still occupied an expected slot at this level, so it
    /// counts as finished for barrier purposes.
    pub fn job_duplicate(&self) {
        let mut s = self.state.lock().unwrap();
        s.finished += 1;
        s.duplicates += 1;
        if s.finished >= s.expected {
            self.barrier.notify_waiters();
        }
    }

    pub fn snapshot(&self) -> LevelSnapshot {
        let s = self.state.lock().unwrap();
        LevelSnapshot {
            level: s.level,
            expected_this_level: s.expected,
            finished_this_level: s.finished,
            failed_this_level: s.failed,
            discovered_next_level: s.discovered_next,
        }
    }

    /// Returns all per-level totals, including the in-progress level
    ///
    /// Called once when the run settles; the trailing level is included
    /// whenever it saw any activity, so cancelled runs report partial
    /// counts instead of dropping them.
    pub fn flush_reports(&self) -> Vec<LevelReport> {
        let s = self.state.lock().unwrap();
        let mut reports = s.completed.clone();
        if s.expected > 0 || s.finished > 0 {
            reports.push(LevelReport {
                level: s.level,
                expected: s.expected,
                finished: s.finished,
                failed: s.failed,
                duplicates: s.duplicates,
            });
        }
        reports
    }
}

impl Default for LevelCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

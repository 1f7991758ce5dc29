//! Level-synchronized crawl scheduling core
//!
//! This module contains the concurrent machinery of the crawl:
//! - The bounded frontier queue and its disk overflow store
//! - The atomic visited set used for deduplication
//! - The level coordinator that advances BFS depth exactly once per level
//! - The worker loop that ties them together
//!
//! There is no dedicated coordinator task; workers cooperate through
//! shared state. The worker whose dequeue empties the in-memory queue
//! drains the overflow store, the worker that observes a drained level
//! performs the level transition, and the worker that completes the last
//! pending job closes the queue.

mod frontier;
mod level;
mod overflow;
mod visited;
mod worker;

pub use frontier::{FrontierQueue, QueueSnapshot};
pub use level::{LevelCoordinator, LevelReport, LevelSnapshot};
pub use overflow::{OverflowError, OverflowStore};
pub use visited::VisitedSet;

use crate::crawler::CrawlStep;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// A pending unit of work: a target URL and its BFS depth
///
/// Jobs are immutable once created. The seed job sits at depth 1; a job
/// discovered while processing depth `d` sits at depth `d + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub target: String,
    pub depth: u32,
}

impl Job {
    pub fn new(target: impl Into<String>, depth: u32) -> Self {
        Self {
            target: target.into(),
            depth,
        }
    }
}

/// Traversal filter applied before a discovered link becomes a Job
pub type AcceptFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Cooperative cancellation signal shared by all workers
///
/// `cancel` is idempotent; waiters registered through `cancelled` are
/// woken exactly once, and late subscribers observe the flag directly.
pub(crate) struct Shutdown {
    flag: AtomicBool,
    notify: Notify,
}

impl Shutdown {
    pub(crate) fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub(crate) fn cancel(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            tracing::info!("cancellation requested");
            self.notify.notify_waiters();
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Future that resolves once `cancel` has been called
    ///
    /// Create the future before checking `is_cancelled` so the wakeup
    /// from `notify_waiters` cannot be missed.
    pub(crate) fn cancelled(&self) -> Notified<'_> {
        self.notify.notified()
    }
}

/// Shared state of one crawl run
pub(crate) struct RunState {
    pub(crate) frontier: FrontierQueue,
    pub(crate) visited: VisitedSet,
    pub(crate) levels: LevelCoordinator,
    pub(crate) shutdown: Shutdown,
    /// Jobs enqueued but not yet fully accounted; zero closes the queue
    pub(crate) pending: AtomicU64,
    pub(crate) total_enqueued: AtomicU64,
    pub(crate) max_depth: u32,
    pub(crate) step: CrawlStep,
    pub(crate) accept: AcceptFn,
    pub(crate) started: Instant,
}

impl RunState {
    /// Signals one unit of "job done" after a job's accounting is complete
    ///
    /// The worker that retires the last pending job closes the frontier,
    /// which terminates the whole pool.
    pub(crate) fn complete_job(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            tracing::info!("all pending work complete, closing frontier");
            self.frontier.close();
        }
    }
}

/// Final accounting for a completed or cancelled run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Jobs enqueued over the whole run, seed included
    pub total_discovered: u64,

    /// Jobs consumed by workers (successes, failures and duplicates)
    pub total_finished: u64,

    /// Jobs whose crawl step failed
    pub total_failed: u64,

    /// Jobs discarded by the worker-side dedup gate
    pub total_duplicates: u64,

    /// Per-level breakdown in depth order
    pub levels: Vec<LevelReport>,

    /// Whether the run was cancelled before the frontier drained
    pub cancelled: bool,

    pub elapsed: Duration,
}

/// Entry point for starting crawl runs
///
/// A `Scheduler` bundles the crawl step with an optional traversal
/// filter; `start` seeds the frontier and spawns the worker pool.
pub struct Scheduler {
    step: CrawlStep,
    accept: AcceptFn,
}

impl Scheduler {
    pub fn new(step: CrawlStep) -> Self {
        Self {
            step,
            accept: Arc::new(|_| true),
        }
    }

    /// Replaces the traversal filter
    ///
    /// Links rejected by the predicate never become jobs. The seed is
    /// not filtered.
    pub fn with_accept(mut self, accept: AcceptFn) -> Self {
        self.accept = accept;
        self
    }

    /// Seeds the frontier and spawns `workers` concurrent workers
    ///
    /// # Arguments
    ///
    /// * `seed_target` - The URL the crawl starts from (depth 1)
    /// * `max_depth` - Jobs at this depth are processed but not expanded;
    ///   0 means only the seed is processed
    /// * `workers` - Size of the worker pool
    /// * `queue_ceiling` - Pending-job ceiling of the in-memory queue
    ///   before enqueues spill to the disk overflow store
    pub fn start(
        self,
        seed_target: &str,
        max_depth: u32,
        workers: usize,
        queue_ceiling: usize,
    ) -> crate::Result<RunHandle> {
        let state = Arc::new(RunState {
            frontier: FrontierQueue::new(queue_ceiling)?,
            visited: VisitedSet::new(),
            levels: LevelCoordinator::new(),
            shutdown: Shutdown::new(),
            pending: AtomicU64::new(1),
            total_enqueued: AtomicU64::new(1),
            max_depth,
            step: self.step,
            accept: self.accept,
            started: Instant::now(),
        });

        state.frontier.enqueue(Job::new(seed_target, 1))?;

        let handles = (0..workers)
            .map(|worker_id| {
                let state = Arc::clone(&state);
                tokio::spawn(worker::run_worker(state, worker_id))
            })
            .collect();

        tracing::info!(
            seed = seed_target,
            max_depth,
            workers,
            queue_ceiling,
            "crawl started"
        );

        Ok(RunHandle {
            state,
            workers: handles,
        })
    }
}

/// Handle to a running crawl
pub struct RunHandle {
    state: Arc<RunState>,
    workers: Vec<JoinHandle<()>>,
}

impl RunHandle {
    /// Blocks until the run is done and returns the final report
    ///
    /// After `cancel`, this returns once in-flight jobs have settled;
    /// the report then carries partial counts with `cancelled` set.
    pub async fn wait(self) -> RunReport {
        let RunHandle { state, workers } = self;

        for (worker_id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                tracing::error!(worker_id, error = %e, "worker task failed");
            }
        }

        let levels = state.levels.flush_reports();
        RunReport {
            total_discovered: state.total_enqueued.load(Ordering::SeqCst),
            total_finished: levels.iter().map(|l| l.finished).sum(),
            total_failed: levels.iter().map(|l| l.failed).sum(),
            total_duplicates: levels.iter().map(|l| l.duplicates).sum(),
            levels,
            cancelled: state.shutdown.is_cancelled(),
            elapsed: state.started.elapsed(),
        }
    }

    /// Requests graceful shutdown; idempotent
    ///
    /// Workers stop dequeuing immediately; in-flight crawl steps run to
    /// completion and their counts land in the final report.
    pub fn cancel(&self) {
        self.state.shutdown.cancel();
        self.state.frontier.close();
    }

    /// Non-blocking snapshot of the current level's counters
    pub fn stats(&self) -> LevelSnapshot {
        self.state.levels.snapshot()
    }

    /// Non-blocking snapshot of queue occupancy
    pub fn queue_stats(&self) -> QueueSnapshot {
        self.state.frontier.snapshot()
    }

    /// Cloneable probe for progress reporting and out-of-band cancellation
    pub fn probe(&self) -> SchedulerProbe {
        SchedulerProbe {
            state: Arc::clone(&self.state),
        }
    }
}

/// Cloneable, read-mostly view of a running crawl
#[derive(Clone)]
pub struct SchedulerProbe {
    state: Arc<RunState>,
}

impl SchedulerProbe {
    pub fn cancel(&self) {
        self.state.shutdown.cancel();
        self.state.frontier.close();
    }

    pub fn stats(&self) -> LevelSnapshot {
        self.state.levels.snapshot()
    }

    pub fn queue_stats(&self) -> QueueSnapshot {
        self.state.frontier.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{FetchError, Fetcher, LinkExtractor};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Fetcher over a fixed site map; "content" is a space-joined link
    /// list that `ListExtractor` splits back apart
    struct MapFetcher {
        pages: HashMap<String, String>,
        failing: HashSet<String>,
        delivered: Arc<Mutex<Vec<String>>>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch(&self, target: &str) -> Result<String, FetchError> {
            self.delivered.lock().unwrap().push(target.to_string());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing.contains(target) {
                return Err(FetchError::Timeout);
            }
            Ok(self.pages.get(target).cloned().unwrap_or_default())
        }
    }

    struct ListExtractor;

    impl LinkExtractor for ListExtractor {
        fn extract_links(&self, content: &str) -> HashSet<String> {
            content.split_whitespace().map(str::to_string).collect()
        }
    }

    fn step_for(
        pages: &[(&str, &str)],
        failing: &[&str],
        delay: Option<Duration>,
    ) -> (CrawlStep, Arc<Mutex<Vec<String>>>) {
        let delivered = Arc::new(Mutex::new(Vec::new()));
        let fetcher = MapFetcher {
            pages: pages
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
            delivered: Arc::clone(&delivered),
            delay,
        };
        let step = CrawlStep::new(Arc::new(fetcher), Arc::new(ListExtractor));
        (step, delivered)
    }

    fn level(report: &RunReport, n: u32) -> &LevelReport {
        report
            .levels
            .iter()
            .find(|l| l.level == n)
            .unwrap_or_else(|| panic!("no report for level {}", n))
    }

    #[tokio::test]
    async fn test_two_level_bfs_accounting() {
        let (step, _) = step_for(&[("A", "B C D")], &[], None);
        let handle = Scheduler::new(step).start("A", 2, 4, 1000).unwrap();
        let report = handle.wait().await;

        assert!(!report.cancelled);
        assert_eq!(report.total_discovered, 4);
        assert_eq!(report.total_finished, 4);
        assert_eq!(report.total_failed, 0);

        assert_eq!(level(&report, 1).expected, 1);
        assert_eq!(level(&report, 1).finished, 1);
        assert_eq!(level(&report, 2).expected, 3);
        assert_eq!(level(&report, 2).finished, 3);
    }

    #[tokio::test]
    async fn test_failed_seed_counts_as_finished_attempt() {
        let (step, _) = step_for(&[], &["A"], None);
        let handle = Scheduler::new(step).start("A", 1, 2, 1000).unwrap();
        let report = handle.wait().await;

        assert_eq!(report.levels.len(), 1);
        assert_eq!(level(&report, 1).finished, 1);
        assert_eq!(level(&report, 1).failed, 1);
        assert_eq!(report.total_finished, 1);
        assert_eq!(report.total_failed, 1);
    }

    #[tokio::test]
    async fn test_zero_max_depth_processes_only_seed() {
        let (step, delivered) = step_for(&[("A", "B C")], &[], None);
        let handle = Scheduler::new(step).start("A", 0, 2, 1000).unwrap();
        let report = handle.wait().await;

        assert_eq!(report.total_finished, 1);
        assert_eq!(*delivered.lock().unwrap(), vec!["A".to_string()]);
    }

    #[tokio::test]
    async fn test_terminal_depth_jobs_are_not_expanded() {
        let (step, delivered) = step_for(&[("A", "B"), ("B", "C")], &[], None);
        let handle = Scheduler::new(step).start("A", 2, 2, 1000).unwrap();
        let report = handle.wait().await;

        // B sits at max_depth, so C must never become a job
        assert_eq!(report.total_finished, 2);
        assert!(!delivered.lock().unwrap().contains(&"C".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dedup_invariant_diamond() {
        // A links to B and C, which both link to D; D must reach the
        // crawl step exactly once no matter how workers interleave
        let (step, delivered) =
            step_for(&[("A", "B C"), ("B", "D"), ("C", "D")], &[], Some(Duration::from_millis(5)));
        let handle = Scheduler::new(step).start("A", 3, 4, 1000).unwrap();
        let report = handle.wait().await;

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.iter().filter(|t| *t == "D").count(), 1);

        let unique: HashSet<_> = delivered.iter().collect();
        assert_eq!(unique.len(), delivered.len(), "a target was crawled twice");
        assert!(!report.cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_level_order_invariant() {
        let (step, delivered) = step_for(
            &[("A", "B C"), ("B", "D"), ("C", "E")],
            &[],
            Some(Duration::from_millis(10)),
        );
        let handle = Scheduler::new(step).start("A", 3, 4, 1000).unwrap();
        handle.wait().await;

        let delivered = delivered.lock().unwrap();
        let pos = |t: &str| delivered.iter().position(|x| x == t).unwrap();

        // every depth-2 target is crawled strictly before any depth-3 one
        for second in ["B", "C"] {
            for third in ["D", "E"] {
                assert!(
                    pos(second) < pos(third),
                    "{} crawled after {}",
                    second,
                    third
                );
            }
        }
    }

    #[tokio::test]
    async fn test_overflow_path_delivers_everything() {
        // ceiling 2 with five depth-2 links forces the overflow store on
        let (step, delivered) = step_for(&[("A", "B C D E F")], &[], None);
        let handle = Scheduler::new(step).start("A", 2, 2, 2).unwrap();
        let report = handle.wait().await;

        assert_eq!(level(&report, 2).expected, 5);
        assert_eq!(level(&report, 2).finished, 5);
        assert_eq!(report.total_finished, 6);

        let delivered = delivered.lock().unwrap();
        let unique: HashSet<_> = delivered.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[tokio::test]
    async fn test_failures_do_not_stall_level_transition() {
        let (step, _) = step_for(&[("A", "B C"), ("B", "D")], &["C"], None);
        let handle = Scheduler::new(step).start("A", 3, 3, 1000).unwrap();
        let report = handle.wait().await;

        assert_eq!(level(&report, 2).finished, 2);
        assert_eq!(level(&report, 2).failed, 1);
        assert_eq!(level(&report, 3).finished, 1);
    }

    #[tokio::test]
    async fn test_accept_predicate_filters_traversal() {
        let (step, delivered) = step_for(&[("A", "B skip-me C")], &[], None);
        let handle = Scheduler::new(step)
            .with_accept(Arc::new(|target: &str| !target.starts_with("skip")))
            .start("A", 2, 2, 1000)
            .unwrap();
        let report = handle.wait().await;

        assert_eq!(level(&report, 2).expected, 2);
        assert!(!delivered.lock().unwrap().contains(&"skip-me".to_string()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cancellation_is_idempotent_and_partial() {
        // a wide slow level so cancellation lands mid-flight
        let links: Vec<String> = (0..50).map(|i| format!("p{}", i)).collect();
        let pages = links.join(" ");
        let (step, _) = step_for(&[("A", pages.as_str())], &[], Some(Duration::from_millis(30)));

        let handle = Scheduler::new(step).start("A", 2, 2, 1000).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        handle.cancel();
        handle.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), handle.wait())
            .await
            .expect("cancelled run did not settle");

        assert!(report.cancelled);
        assert!(report.total_finished < 51);
        assert!(report.total_finished <= report.total_discovered);
    }

    #[tokio::test]
    async fn test_stats_snapshot_is_nonblocking() {
        let (step, _) = step_for(&[("A", "B C")], &[], Some(Duration::from_millis(20)));
        let handle = Scheduler::new(step).start("A", 2, 2, 1000).unwrap();

        let snap = handle.stats();
        assert!(snap.level >= 1);

        let probe = handle.probe();
        let _ = probe.queue_stats();

        handle.wait().await;
    }
}

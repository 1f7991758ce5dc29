//! Periodic progress reporting
//!
//! A detached task samples the scheduler's non-blocking snapshots on a
//! fixed interval and logs one line per tick. The caller aborts the task
//! once the run settles.

use crate::scheduler::SchedulerProbe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub fn spawn_progress_reporter(probe: SchedulerProbe, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let levels = probe.stats();
            let queue = probe.queue_stats();

            let percent = if levels.expected_this_level > 0 {
                levels.finished_this_level as f64 / levels.expected_this_level as f64 * 100.0
            } else {
                0.0
            };

            tracing::info!(
                level = levels.level,
                finished = levels.finished_this_level,
                expected = levels.expected_this_level,
                failed = levels.failed_this_level,
                next_level = levels.discovered_next_level,
                queued = queue.in_memory,
                overflow = queue.overflow,
                "progress: {:.1}%",
                percent
            );
        }
    })
}

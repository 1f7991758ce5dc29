//! Worker loop
//!
//! Each worker repeats: dequeue, wait at the level gate if the job is
//! from a deeper level, pass the dedup gate, run the crawl step, enqueue
//! the unvisited links it produced, account the attempt, and signal
//! completion. Jobs are read-only after creation; nothing mutable is
//! shared between workers beyond the injected scheduler components.

use crate::scheduler::{Job, RunState};
use std::collections::HashSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;

pub(crate) async fn run_worker(state: Arc<RunState>, worker_id: usize) {
    tracing::debug!(worker_id, "worker started");

    loop {
        let Some(job) = state.frontier.dequeue().await else {
            break;
        };

        if !state.levels.gate(job.depth, &state.shutdown).await {
            tracing::debug!(worker_id, "cancelled while waiting at level gate");
            break;
        }
        if state.shutdown.is_cancelled() {
            break;
        }

        if !state.visited.try_mark(&job.target) {
            state.levels.job_duplicate();
            state.complete_job();
            continue;
        }

        tracing::debug!(worker_id, url = %job.target, depth = job.depth, "crawling");

        match state.step.run(&job.target).await {
            Ok(links) => {
                // expansion must complete before this job is counted as
                // finished, or a level transition could run with the next
                // level's discoveries only partially recorded
                if job.depth < state.max_depth {
                    expand(&state, &job, links);
                }
                state.levels.job_finished(false);
            }
            Err(e) => {
                tracing::warn!(worker_id, url = %job.target, error = %e, "crawl step failed");
                state.levels.job_finished(true);
            }
        }

        state.complete_job();
    }

    tracing::debug!(worker_id, "worker exiting");
}

/// Turns extracted links into next-level jobs
fn expand(state: &RunState, job: &Job, links: HashSet<String>) {
    for link in links {
        // cheap filter; the authoritative check is try_mark at dequeue
        if state.visited.contains(&link) {
            continue;
        }
        if !(state.accept)(&link) {
            continue;
        }

        let child = Job::new(link, job.depth + 1);

        // pending rises before the job becomes visible to consumers, so
        // the completion count can never momentarily hit zero under us
        state.pending.fetch_add(1, Ordering::SeqCst);
        match state.frontier.enqueue(child) {
            Ok(true) => {
                state.levels.record_discovered(1);
                state.total_enqueued.fetch_add(1, Ordering::SeqCst);
            }
            Ok(false) => {
                // queue closed by cancellation; the link is dropped
                state.pending.fetch_sub(1, Ordering::SeqCst);
            }
            Err(e) => {
                state.pending.fetch_sub(1, Ordering::SeqCst);
                tracing::error!(url = %job.target, error = %e, "overflow store rejected job, dropping link");
            }
        }
    }
}

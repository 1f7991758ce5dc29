//! Disk-backed overflow FIFO for the frontier queue
//!
//! The overflow store absorbs jobs while the in-memory queue sits at its
//! ceiling. It is an append-only spool of newline-delimited JSON
//! `(target, depth)` records in an unlinked temporary file, so the spool
//! lives exactly as long as the process and never needs explicit cleanup.
//!
//! Access is coarse-grained: the store is owned by the frontier queue and
//! only ever touched under its lock, since overflow is the exceptional
//! path.

use crate::scheduler::Job;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use thiserror::Error;

/// Errors from the overflow spool
#[derive(Debug, Error)]
pub enum OverflowError {
    #[error("overflow spool I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt overflow record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Process-lifetime disk FIFO of serialized jobs
pub struct OverflowStore {
    spool: File,
    read_pos: u64,
    write_pos: u64,
    len: usize,
}

impl OverflowStore {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            spool: tempfile::tempfile()?,
            read_pos: 0,
            write_pos: 0,
            len: 0,
        })
    }

    /// Appends a job to the tail of the FIFO
    pub fn push(&mut self, job: &Job) -> Result<(), OverflowError> {
        let mut line = serde_json::to_string(job)?;
        line.push('\n');
        self.spool.seek(SeekFrom::Start(self.write_pos))?;
        self.spool.write_all(line.as_bytes())?;
        self.write_pos += line.len() as u64;
        self.len += 1;
        Ok(())
    }

    /// Removes and returns up to `n` of the oldest records, FIFO order
    pub fn pop_batch(&mut self, n: usize) -> Result<Vec<Job>, OverflowError> {
        let take = n.min(self.len);
        let mut jobs = Vec::with_capacity(take);
        if take == 0 {
            return Ok(jobs);
        }

        self.spool.seek(SeekFrom::Start(self.read_pos))?;
        let mut reader = BufReader::new(&mut self.spool);
        let mut consumed = 0u64;
        let mut line = String::new();

        for _ in 0..take {
            line.clear();
            let bytes = reader.read_line(&mut line)?;
            if bytes == 0 {
                break;
            }
            consumed += bytes as u64;
            jobs.push(serde_json::from_str(line.trim_end())?);
        }

        self.read_pos += consumed;
        self.len -= jobs.len();

        if self.len == 0 {
            // fully drained: truncate so a saturated run doesn't leave the
            // spool growing without bound
            self.spool.set_len(0)?;
            self.read_pos = 0;
            self.write_pos = 0;
        }

        Ok(jobs)
    }

    /// Record count, tracked without deserializing the spool
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

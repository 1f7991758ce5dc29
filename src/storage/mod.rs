//! Page content persistence
//!
//! Persistence is an optional collaborator of the crawl step. Store
//! failures are reported as typed errors but never fail a job; the
//! scheduler's accounting is independent of whether content landed on
//! disk.

mod sqlite;

pub use sqlite::SqlitePageStore;

use thiserror::Error;

/// Errors from the page store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("cannot derive table name from seed: {0}")]
    InvalidSeed(String),
}

/// Content persistence interface
pub trait PageStore: Send + Sync {
    /// Stores the fetched content for a target
    fn persist(&self, target: &str, content: &str) -> Result<(), StoreError>;
}

//! Spindle: a level-synchronized concurrent web crawler
//!
//! This crate implements a breadth-first crawl core: a pool of concurrent
//! workers drains a bounded frontier queue (spilling to a disk-backed
//! overflow store under load), deduplicates targets through an atomic
//! visited set, and advances through BFS levels via a peer-to-peer barrier
//! with no dedicated coordinator thread.

pub mod config;
pub mod crawler;
pub mod output;
pub mod scheduler;
pub mod storage;

use thiserror::Error;

/// Main error type for Spindle operations
#[derive(Debug, Error)]
pub enum SpindleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Store(#[from] storage::StoreError),

    #[error("Overflow store error: {0}")]
    Overflow(#[from] scheduler::OverflowError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Seed URL has no host: {0}")]
    SeedWithoutHost(String),

    #[error("Worker task panicked: {0}")]
    WorkerPanic(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),
}

/// Result type alias for Spindle operations
pub type Result<T> = std::result::Result<T, SpindleError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlStep, FetchError, Fetcher, LinkExtractor};
pub use scheduler::{Job, LevelSnapshot, RunHandle, RunReport, Scheduler};

//! Configuration loading and validation
//!
//! Configuration can come from a TOML file, from CLI flags, or a mix of
//! both (flags win). The structures here are plain serde types; loading
//! and validation live in `parser`.

mod parser;
mod types;

pub use parser::{load_config, validate_config};
pub use types::{Config, CrawlConfig, FetchConfig, StorageConfig};

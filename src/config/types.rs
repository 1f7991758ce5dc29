use serde::Deserialize;

/// Main configuration structure for Spindle
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// The URL the crawl starts from (depth 1)
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Maximum BFS depth from the seed; 0 means "seed only"
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Pending-job ceiling of the in-memory frontier queue; beyond this,
    /// jobs spill to the disk overflow store
    #[serde(rename = "queue-ceiling", default = "default_queue_ceiling")]
    pub queue_ceiling: usize,

    /// Only persist pages whose body contains this keyword; traversal is
    /// unaffected
    #[serde(default)]
    pub keyword: Option<String>,

    /// Restrict traversal to the seed URL's host
    #[serde(rename = "same-host", default)]
    pub same_host: bool,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Page content storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file; empty disables persistence
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_max_depth() -> u32 {
    3
}

fn default_workers() -> usize {
    10
}

fn default_queue_ceiling() -> usize {
    500_000
}

fn default_timeout_secs() -> u64 {
    2
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/49.0.2623.87 Safari/537.36"
        .to_string()
}

fn default_database_path() -> String {
    "spindle.db".to_string()
}

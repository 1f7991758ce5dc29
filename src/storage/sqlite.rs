//! SQLite-backed page store
//!
//! Each run writes into a table named after the seed's host, with dots
//! mapped to underscores and a leading underscore (`https://news.example.com`
//! becomes `_news_example_com`), so several crawls can share one database
//! file. The connection sits behind a mutex; writes are short and the
//! store is off the hot path.

use crate::storage::{PageStore, StoreError};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use url::Url;

/// Persists fetched pages into a per-seed SQLite table
pub struct SqlitePageStore {
    conn: Mutex<Connection>,
    table: String,
    keyword: Option<String>,
}

impl SqlitePageStore {
    /// Opens (or creates) the database and the seed's table
    pub fn new(
        path: &Path,
        seed_url: &str,
        keyword: Option<String>,
    ) -> Result<Self, StoreError> {
        let table = table_name_for_seed(seed_url)?;
        let conn = Connection::open(path)?;

        // table name is derived and sanitized above, not user SQL
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY,
                    url TEXT NOT NULL,
                    key TEXT,
                    content TEXT,
                    fetched_at TEXT NOT NULL
                )",
                table
            ),
            [],
        )?;

        tracing::info!(database = %path.display(), table = %table, "page store ready");

        Ok(Self {
            conn: Mutex::new(conn),
            table,
            keyword,
        })
    }

    #[cfg(test)]
    fn row_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: u64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

impl PageStore for SqlitePageStore {
    fn persist(&self, target: &str, content: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (url, key, content, fetched_at) VALUES (?1, ?2, ?3, ?4)",
                self.table
            ),
            params![
                target,
                self.keyword.as_deref(),
                content,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tracing::debug!(url = %target, table = %self.table, "page content saved");
        Ok(())
    }
}

/// Derives a safe table name from the seed URL's host
fn table_name_for_seed(seed_url: &str) -> Result<String, StoreError> {
    let url =
        Url::parse(seed_url).map_err(|e| StoreError::InvalidSeed(format!("{}: {}", seed_url, e)))?;
    let host = url
        .host_str()
        .ok_or_else(|| StoreError::InvalidSeed(format!("{}: missing host", seed_url)))?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let mut name = String::with_capacity(host.len() + 1);
    name.push('_');
    for c in host.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else {
            name.push('_');
        }
    }
    Ok(name)
}

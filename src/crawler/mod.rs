//! Crawl step and its collaborator seams
//!
//! The crawl step is the boundary between the scheduling core and the
//! outside world: given a target it fetches content, optionally persists
//! it, and returns the extracted outgoing links. All collaborators are
//! injected trait objects so the core runs unchanged against mocks.

mod fetcher;
mod parser;

pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use parser::{HtmlLinkExtractor, LinkExtractor};

use crate::storage::PageStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Per-job orchestration: fetch, persist, extract
pub struct CrawlStep {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn LinkExtractor>,
    store: Option<Arc<dyn PageStore>>,
    keyword: Option<String>,
}

impl CrawlStep {
    pub fn new(fetcher: Arc<dyn Fetcher>, extractor: Arc<dyn LinkExtractor>) -> Self {
        Self {
            fetcher,
            extractor,
            store: None,
            keyword: None,
        }
    }

    /// Enables content persistence
    ///
    /// With a keyword set, only pages whose body contains it are stored;
    /// the keyword never affects traversal.
    pub fn with_store(mut self, store: Arc<dyn PageStore>, keyword: Option<String>) -> Self {
        self.store = Some(store);
        self.keyword = keyword;
        self
    }

    /// Runs one crawl step and returns the links discovered
    ///
    /// Fetch failures propagate as typed errors; store failures are
    /// logged and never fail the job; extraction cannot fail.
    pub async fn run(&self, target: &str) -> Result<HashSet<String>, FetchError> {
        let content = self.fetcher.fetch(target).await?;

        if let Some(store) = &self.store {
            let wanted = self
                .keyword
                .as_deref()
                .map_or(true, |key| content.contains(key));
            if wanted {
                if let Err(e) = store.persist(target, &content) {
                    tracing::warn!(url = %target, error = %e, "failed to persist page content");
                }
            }
        }

        Ok(self.extractor.extract_links(&content))
    }
}

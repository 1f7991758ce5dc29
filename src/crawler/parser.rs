//! Link extraction collaborator
//!
//! Extraction never fails: malformed HTML or unparseable selectors yield
//! an empty set, which the scheduler treats as "zero links discovered".

use scraper::{Html, Selector};
use std::collections::HashSet;

/// Link extraction interface
pub trait LinkExtractor: Send + Sync {
    /// Returns the set of outgoing targets found in the content
    fn extract_links(&self, content: &str) -> HashSet<String>;
}

/// Scraper-backed extractor over `<a href>` elements
///
/// Only absolute `http://` / `https://` hrefs and bare `www.` hrefs are
/// kept; the latter get an `http://` scheme prepended so they are
/// fetchable. Returning a set deduplicates repeated links within one
/// page.
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, content: &str) -> HashSet<String> {
        let document = Html::parse_document(content);
        let mut links = HashSet::new();

        let selector = match Selector::parse("a[href]") {
            Ok(s) => s,
            Err(_) => return links,
        };

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            if let Some(target) = normalize_href(href) {
                links.insert(target);
            }
        }

        links
    }
}

fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        Some(href.to_string())
    } else if href.starts_with("www.") {
        Some(format!("http://{}", href))
    } else {
        None
    }
}

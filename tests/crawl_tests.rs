//! End-to-end crawl tests against a mock HTTP server
//!
//! These exercise the real fetcher, extractor and store wired into the
//! scheduler, the same shape as a production run.

use spindle::config::FetchConfig;
use spindle::crawler::{CrawlStep, HttpFetcher, HtmlLinkExtractor};
use spindle::scheduler::Scheduler;
use spindle::storage::SqlitePageStore;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html_step() -> (Arc<HttpFetcher>, Arc<HtmlLinkExtractor>) {
    let fetcher = HttpFetcher::new(&FetchConfig::default()).expect("client build failed");
    (Arc::new(fetcher), Arc::new(HtmlLinkExtractor))
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_crawl_two_levels() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{base}/page1">Page 1</a>
            <a href="{base}/page2">Page 2</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/page1", "<html><body>leaf one</body></html>".to_string()).await;
    mount_page(&server, "/page2", "<html><body>leaf two</body></html>".to_string()).await;

    let (fetcher, extractor) = html_step();
    let step = CrawlStep::new(fetcher, extractor);

    let handle = Scheduler::new(step)
        .start(&format!("{base}/"), 2, 4, 1000)
        .expect("start failed");
    let report = handle.wait().await;

    assert!(!report.cancelled);
    assert_eq!(report.total_discovered, 3);
    assert_eq!(report.total_finished, 3);
    assert_eq!(report.total_failed, 0);
    assert_eq!(report.levels.len(), 2);
    assert_eq!(report.levels[0].finished, 1);
    assert_eq!(report.levels[1].finished, 2);
}

#[tokio::test]
async fn test_http_error_counts_as_failed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(r#"<html><body><a href="{base}/gone">gone</a></body></html>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (fetcher, extractor) = html_step();
    let handle = Scheduler::new(CrawlStep::new(fetcher, extractor))
        .start(&format!("{base}/"), 2, 2, 1000)
        .expect("start failed");
    let report = handle.wait().await;

    assert_eq!(report.total_finished, 2);
    assert_eq!(report.total_failed, 1);
    assert_eq!(report.levels[1].failed, 1);
}

#[tokio::test]
async fn test_slow_server_times_out_and_is_counted() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html></html>")
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = FetchConfig {
        timeout_secs: 1,
        ..FetchConfig::default()
    };
    let fetcher = Arc::new(HttpFetcher::new(&config).expect("client build failed"));
    let handle = Scheduler::new(CrawlStep::new(fetcher, Arc::new(HtmlLinkExtractor)))
        .start(&format!("{base}/"), 1, 1, 100)
        .expect("start failed");
    let report = handle.wait().await;

    assert_eq!(report.total_finished, 1);
    assert_eq!(report.total_failed, 1);
}

#[tokio::test]
async fn test_keyword_filters_persistence_not_traversal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>ferris was here
            <a href="{base}/other">other</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/other", "<html><body>nothing relevant</body></html>".to_string()).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("crawl.db");

    let seed = format!("{base}/");
    let store = Arc::new(
        SqlitePageStore::new(Path::new(&db_path), &seed, Some("ferris".to_string()))
            .expect("store open failed"),
    );

    let (fetcher, extractor) = html_step();
    let step = CrawlStep::new(fetcher, extractor).with_store(store, Some("ferris".to_string()));

    let handle = Scheduler::new(step)
        .start(&seed, 2, 2, 1000)
        .expect("start failed");
    let report = handle.wait().await;

    // both pages were crawled, but only the keyword match was persisted
    assert_eq!(report.total_finished, 2);

    let conn = rusqlite::Connection::open(&db_path).expect("open db");
    let table: String = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table'",
            [],
            |row| row.get(0),
        )
        .expect("no table created");
    let rows: u64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .expect("count failed");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_same_host_restriction_via_accept() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/",
        format!(
            r#"<html><body>
            <a href="{base}/inside">in</a>
            <a href="https://elsewhere.invalid/out">out</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(&server, "/inside", "<html><body>in</body></html>".to_string()).await;

    let seed = format!("{base}/");
    let seed_host = url::Url::parse(&seed)
        .unwrap()
        .host_str()
        .unwrap()
        .to_string();

    let (fetcher, extractor) = html_step();
    let handle = Scheduler::new(CrawlStep::new(fetcher, extractor))
        .with_accept(Arc::new(move |target: &str| {
            url::Url::parse(target)
                .ok()
                .and_then(|u| u.host_str().map(|h| h == seed_host))
                .unwrap_or(false)
        }))
        .start(&seed, 2, 2, 1000)
        .expect("start failed");
    let report = handle.wait().await;

    // the off-host link never became a job, so nothing could fail
    assert_eq!(report.total_discovered, 2);
    assert_eq!(report.total_failed, 0);
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use cache_crawler::config::{Config, CrawlerConfig, SiteConfig, StorageConfig, UserAgentConfig};
use cache_crawler::crawler::{build_driver, Driver};
use cache_crawler::storage::{PageIndex, QueueStore};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration storing everything under `dir`
fn create_test_config(dir: &Path, site: SiteConfig, min_interval_ms: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            min_request_interval_ms: min_interval_ms,
            cycle_interval_secs: 1,
            request_timeout_secs: 5,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            data_dir: dir.join("data"),
            queue_database: dir.join("db").join("fetch_queue.db"),
            cache_database: dir.join("db").join("crawler.db"),
        },
        site,
    }
}

fn same_host(server: &MockServer, seed: &str) -> SiteConfig {
    SiteConfig::SameHost {
        seeds: vec![format!("{}{}", server.uri(), seed)],
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

/// Mounts the index → {a, b} site, each page expected to be fetched once
async fn mount_index_a_b(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(html(r#"<a href="/a">A</a> <a href="/b">B</a>"#))
        .expect(1)
        .mount(server)
        .await;

    for page in ["/a", "/b"] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html(&format!(r#"Page {} <a href="/index">home</a>"#, page)))
            .expect(1)
            .mount(server)
            .await;
    }
}

fn blob_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            files.extend(blob_files(&path));
        } else {
            files.push(path);
        }
    }
    files
}

#[tokio::test]
async fn test_full_crawl_index_a_b() {
    let mock_server = MockServer::start().await;
    mount_index_a_b(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), same_host(&mock_server, "/index"), 0);
    let mut driver = build_driver(&config).expect("Failed to create driver");

    let report = driver.run_cycle(false).await.expect("Crawl failed");

    assert_eq!(report.seeded, 1);
    assert_eq!(report.visited, 3);
    assert_eq!(report.fetched, 3);

    assert_eq!(driver.queue().count_total().unwrap(), 3);
    assert!(!driver.queue().has_any_pending().unwrap());
    for page in ["/index", "/a", "/b"] {
        let url = format!("{}{}", mock_server.uri(), page);
        let entry = driver.queue().get(&url).unwrap().expect("entry exists");
        assert!(entry.completed_at.is_some(), "{} not completed", url);

        let cached = driver
            .store()
            .index()
            .latest_for_url(&url)
            .unwrap()
            .expect("page cached");
        let blob = std::fs::read(driver.store().blob_path(&cached)).unwrap();
        assert_eq!(blob.len() as u64, cached.byte_size);
    }

    assert_eq!(driver.store().index().count_pages().unwrap(), 3);
    assert_eq!(blob_files(&config.storage.data_dir).len(), 3);
}

#[tokio::test]
async fn test_second_cycle_is_served_from_cache() {
    let mock_server = MockServer::start().await;
    mount_index_a_b(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), same_host(&mock_server, "/index"), 0);
    let mut driver = build_driver(&config).unwrap();

    driver.run_cycle(false).await.unwrap();
    let second = driver.run_cycle(false).await.unwrap();

    assert_eq!(second.visited, 3);
    assert_eq!(second.cache_hits, 3);
    assert_eq!(second.fetched, 0);
    // Request counts are verified when the mock server drops
}

#[tokio::test]
async fn test_resume_after_restart() {
    let mock_server = MockServer::start().await;
    mount_index_a_b(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), same_host(&mock_server, "/index"), 0);

    {
        let mut driver = build_driver(&config).unwrap();
        driver.seed().await.unwrap();
        let visit = driver.step().await.unwrap().expect("one entry processed");
        assert_eq!(visit.newly_enqueued, 2);
    }

    // A new process over the same databases
    let mut driver = build_driver(&config).unwrap();
    assert_eq!(driver.queue().count_pending().unwrap(), 2);

    let report = driver.run_cycle(false).await.unwrap();

    assert!(report.resumed);
    assert_eq!(report.visited, 2);
    assert_eq!(driver.queue().count_total().unwrap(), 3);
    assert!(!driver.queue().has_any_pending().unwrap());
}

#[tokio::test]
async fn test_dead_link_yields_placeholder() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/index"))
        .respond_with(html(r#"<a href="/missing">gone</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), same_host(&mock_server, "/index"), 0);
    let mut driver = build_driver(&config).unwrap();

    let report = driver.run_cycle(false).await.unwrap();

    assert_eq!(report.visited, 2);
    assert_eq!(report.placeholders, 1);

    let missing = format!("{}/missing", mock_server.uri());
    assert!(driver.queue().get(&missing).unwrap().unwrap().completed_at.is_some());
    assert!(driver.store().index().latest_for_url(&missing).unwrap().is_none());
    assert_eq!(driver.store().index().count_pages().unwrap(), 1);
}

#[tokio::test]
async fn test_ptt_site_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bbs/hotboards.html"))
        .and(header("cookie", "over18=1"))
        .respond_with(html(
            r#"<a class="board" href="/bbs/Test/index.html">Test</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bbs/Test/index.html"))
        .and(header("cookie", "over18=1"))
        .respond_with(html(
            r#"<div class="btn-group btn-group-paging">
                   <a class="btn wide" href="/bbs/Test/index.html">最新</a>
               </div>
               <div class="r-ent"><div class="title">
                   <a href="/bbs/Test/M.1700000000.A.001.html">post</a>
               </div></div>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bbs/Test/M.1700000000.A.001.html"))
        .and(header("cookie", "over18=1"))
        .respond_with(html(r#"<a href="/bbs/Test/index2.html">not followed</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let site = SiteConfig::Ptt {
        base_url: mock_server.uri(),
    };
    let config = create_test_config(dir.path(), site, 0);
    let mut driver = build_driver(&config).unwrap();

    let report = driver.run_cycle(false).await.unwrap();

    assert_eq!(report.seeded, 1);
    assert_eq!(report.visited, 2);
    assert_eq!(driver.queue().count_total().unwrap(), 2);

    // Board pages are grouped by board, the hot-boards page is not
    let data_dir = &config.storage.data_dir;
    assert_eq!(blob_files(&data_dir.join("Test")).len(), 2);
    assert_eq!(blob_files(&data_dir.join("common")).len(), 1);
}

#[tokio::test]
async fn test_unreachable_hot_boards_page_is_idle() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let site = SiteConfig::Ptt {
        base_url: mock_server.uri(),
    };
    let config = create_test_config(dir.path(), site, 0);
    let mut driver = build_driver(&config).unwrap();

    let report = driver.run_cycle(false).await.unwrap();

    assert!(report.idle);
    assert_eq!(driver.queue().count_total().unwrap(), 0);
}

#[tokio::test]
async fn test_requests_are_spaced() {
    let mock_server = MockServer::start().await;
    mount_index_a_b(&mock_server).await;

    let dir = TempDir::new().unwrap();
    let interval = Duration::from_millis(150);
    let config = create_test_config(
        dir.path(),
        same_host(&mock_server, "/index"),
        interval.as_millis() as u64,
    );
    let mut driver: Driver = build_driver(&config).unwrap();

    let start = Instant::now();
    let report = driver.run_cycle(false).await.unwrap();

    assert_eq!(report.fetched, 3);
    assert!(
        start.elapsed() >= interval * 2,
        "3 requests finished in {:?}",
        start.elapsed()
    );
}

//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and drive the
//! coordinator and scheduler through full crawl cycles against a real
//! SQLite database in a temporary directory.

use async_trait::async_trait;
use frontier_crawl::config::{
    Config, CrawlerConfig, ExtractionConfig, IdlePolicy, PolitenessConfig, RateLimitAction,
    StorageConfig, UserAgentConfig,
};
use frontier_crawl::crawler::{Coordinator, EntryOutcome, FetchError, PolicyBlock, Scheduler};
use frontier_crawl::output::{
    load_statistics, OutputError, OutputResult, PageDocument, PageNotifier, PageSink,
    SqlitePageStore,
};
use frontier_crawl::state::{EntryState, VisitOutcome};
use frontier_crawl::storage::{FrontierEntry, FrontierStore, VisitedIndex};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling `seeds` into the database at `db_path`
fn create_test_config(seeds: Vec<String>, db_path: &Path) -> Config {
    Config {
        seeds,
        crawler: CrawlerConfig {
            concurrency: 2,
            max_depth: 10,
            cross_domain_depth: 1,
            fetch_timeout_ms: 5_000,
            dequeue_timeout_ms: 200,
            worker_delay_ms: 0,
            reseed_interval_ms: 50,
            idle_policy: IdlePolicy::Stop,
            progress_interval: 1,
            ..CrawlerConfig::default()
        },
        politeness: PolitenessConfig {
            default_interval_ms: 0,
            robots_timeout_ms: 2_000,
            ..PolitenessConfig::default()
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        extraction: ExtractionConfig::default(),
        storage: StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        notify: None,
    }
}

/// A coordinator plus the page store it writes to
struct Crawl {
    coordinator: Coordinator,
    pages: Arc<SqlitePageStore>,
}

fn open_crawl(config: Config) -> Crawl {
    let db = Path::new(&config.storage.database_path).to_path_buf();
    let frontier = Arc::new(FrontierStore::open(&db, config.crawler.frontier_capacity).unwrap());
    let visited = Arc::new(VisitedIndex::open(&db, 1_000).unwrap());
    let pages = Arc::new(SqlitePageStore::open(&db).unwrap());
    let coordinator = Coordinator::new(config, frontier, visited, pages.clone()).unwrap();
    Crawl { coordinator, pages }
}

fn at(server: &MockServer, route: &str) -> String {
    format!("{}{}", server.uri(), route)
}

fn html(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{} body</p>{}</body></html>",
        title, title, anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/plain"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_pass_queues_children_and_marks_visited() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &["/a", "/b"])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        Some(EntryOutcome::Completed {
            accepted: 2,
            rejected: 0
        })
    );

    let frontier = crawl.coordinator.frontier().snapshot().unwrap();
    assert_eq!(
        frontier,
        vec![
            FrontierEntry::new(at(&server, "/a"), 1),
            FrontierEntry::new(at(&server, "/b"), 1),
        ]
    );

    let record = crawl
        .coordinator
        .visited()
        .get(&at(&server, "/"))
        .unwrap()
        .unwrap();
    assert_eq!(record.outcome, VisitOutcome::Completed);

    let page = crawl.pages.get_page(&at(&server, "/")).unwrap().unwrap();
    assert_eq!(page.title, "Home");
    assert!(page.text.starts_with("Home body"));
}

#[tokio::test]
async fn test_robots_disallow_skips_without_fetching() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("Secret", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(
        vec![at(&server, "/private/page")],
        &dir.path().join("crawl.db"),
    );
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        Some(EntryOutcome::Skipped(PolicyBlock::RobotsDisallowed))
    );

    let record = crawl
        .coordinator
        .visited()
        .get(&at(&server, "/private/page"))
        .unwrap()
        .unwrap();
    assert_eq!(record.outcome, VisitOutcome::SkippedByPolicy);
    assert!(crawl.coordinator.frontier().is_empty().unwrap());
}

#[tokio::test]
async fn test_http_error_is_recorded_as_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![at(&server, "/missing")], &dir.path().join("crawl.db"));
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(outcome, Some(EntryOutcome::Failed(FetchError::Http(404))));

    let record = crawl
        .coordinator
        .visited()
        .get(&at(&server, "/missing"))
        .unwrap()
        .unwrap();
    assert_eq!(record.outcome, VisitOutcome::Failed);
    assert_eq!(record.detail.as_deref(), Some("HTTP 404"));

    // No retry within the run
    assert!(crawl.coordinator.frontier().is_empty().unwrap());
    assert_eq!(crawl.coordinator.seed().unwrap(), 0);
}

#[tokio::test]
async fn test_cross_domain_link_resets_depth() {
    let server = MockServer::start().await;
    let port = server.address().port();
    let external = format!("http://localhost:{}/other", port);
    mount_page(&server, "/deep", html("Deep", &["/next", &external])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![], &dir.path().join("crawl.db"));
    let crawl = open_crawl(config);
    crawl.coordinator.offer(&at(&server, "/deep"), 5).unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        Some(EntryOutcome::Completed {
            accepted: 2,
            rejected: 0
        })
    );

    let frontier = crawl.coordinator.frontier();
    let (same_site, state) = frontier.get(&at(&server, "/next")).unwrap().unwrap();
    assert_eq!(same_site.depth, 6);
    assert_eq!(state, EntryState::Pending);

    let (cross_site, _) = frontier.get(&external).unwrap().unwrap();
    assert_eq!(cross_site.depth, 1);
}

#[tokio::test]
async fn test_external_links_dropped_when_not_followed() {
    let server = MockServer::start().await;
    let external = format!("http://localhost:{}/other", server.address().port());
    mount_page(&server, "/", html("Home", &["/inside", &external])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    config.crawler.follow_external_links = false;
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        Some(EntryOutcome::Completed {
            accepted: 1,
            rejected: 1
        })
    );
    assert!(crawl.coordinator.frontier().get(&external).unwrap().is_none());
}

#[tokio::test]
async fn test_blacklisted_hosts_never_reach_frontier() {
    let server = MockServer::start().await;
    let blocked = format!("http://localhost:{}/x", server.address().port());
    mount_page(&server, "/", html("Home", &[&blocked, "/ok"])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    config.extraction.blacklist = vec!["localhost".to_string()];
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;

    let frontier = crawl.coordinator.frontier().snapshot().unwrap();
    assert_eq!(frontier, vec![FrontierEntry::new(at(&server, "/ok"), 1)]);
}

#[tokio::test]
async fn test_depth_limit_stops_children() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &["/child"])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    config.crawler.max_depth = 0;
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert_eq!(
        outcome,
        Some(EntryOutcome::Completed {
            accepted: 0,
            rejected: 1
        })
    );
    assert!(crawl.coordinator.frontier().is_empty().unwrap());
}

/// Forwards every notification into a channel
struct ChannelNotifier(mpsc::UnboundedSender<PageDocument>);

#[async_trait]
impl PageNotifier for ChannelNotifier {
    async fn notify(&self, page: &PageDocument) -> OutputResult<()> {
        self.0
            .send(page.clone())
            .map_err(|e| OutputError::Delivery(e.to_string()))
    }
}

/// Rejects every delivery
struct BrokenNotifier;

#[async_trait]
impl PageNotifier for BrokenNotifier {
    async fn notify(&self, _page: &PageDocument) -> OutputResult<()> {
        Err(OutputError::Delivery("endpoint unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_notifier_receives_processed_page() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    let (tx, mut rx) = mpsc::unbounded_channel();
    let crawl = open_crawl(config);
    let coordinator = crawl
        .coordinator
        .with_notifier(Arc::new(ChannelNotifier(tx)));
    coordinator.seed().unwrap();

    coordinator.process_next(&CancellationToken::new()).await;

    let delivered = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.url, at(&server, "/"));
    assert_eq!(delivered.title, "Home");
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_crawl() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    let crawl = open_crawl(config);
    let coordinator = crawl.coordinator.with_notifier(Arc::new(BrokenNotifier));
    coordinator.seed().unwrap();

    let outcome = coordinator.process_next(&CancellationToken::new()).await;
    assert!(matches!(outcome, Some(EntryOutcome::Completed { .. })));
    assert!(coordinator.visited().contains(&at(&server, "/")).unwrap());
}

/// Page sink whose storage is always unavailable
struct FailingSink;

impl PageSink for FailingSink {
    fn upsert_page(&self, _page: &PageDocument) -> OutputResult<()> {
        Err(OutputError::Delivery("disk full".to_string()))
    }
}

#[tokio::test]
async fn test_sink_failure_leaves_url_unvisited() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &["/a"])).await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("crawl.db");
    let config = create_test_config(vec![at(&server, "/")], &db);
    let frontier = Arc::new(FrontierStore::open(&db, 100).unwrap());
    let visited = Arc::new(VisitedIndex::open(&db, 100).unwrap());
    let coordinator = Coordinator::new(config, frontier, visited, Arc::new(FailingSink)).unwrap();
    coordinator.seed().unwrap();

    let outcome = coordinator.process_next(&CancellationToken::new()).await;
    assert!(matches!(outcome, Some(EntryOutcome::PersistenceFailed(_))));
    assert!(!coordinator.visited().contains(&at(&server, "/")).unwrap());

    // Delivery is at-least-once: a reseed offers the page again
    assert_eq!(coordinator.seed().unwrap(), 1);
}

#[tokio::test]
async fn test_rate_limit_drop_policy() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &[])).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html("A", &[]), "text/html"))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    config.politeness.default_interval_ms = 60_000;
    config.crawler.rate_limit_action = RateLimitAction::Drop;
    let crawl = open_crawl(config);
    crawl.coordinator.seed().unwrap();
    crawl.coordinator.offer(&at(&server, "/a"), 1).unwrap();

    let cancel = CancellationToken::new();
    let first = crawl.coordinator.process_next(&cancel).await;
    assert!(matches!(first, Some(EntryOutcome::Completed { .. })));

    let second = crawl.coordinator.process_next(&cancel).await;
    assert!(matches!(
        second,
        Some(EntryOutcome::Skipped(PolicyBlock::RateLimited { .. }))
    ));

    // Dropped, not recorded: a later rediscovery may still fetch it
    assert!(!crawl.coordinator.visited().contains(&at(&server, "/a")).unwrap());
    assert!(crawl.coordinator.frontier().is_empty().unwrap());
}

#[tokio::test]
async fn test_resume_after_restart() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", html("A", &[])).await;

    let dir = TempDir::new().unwrap();
    let db = dir.path().join("crawl.db");
    let config = create_test_config(vec![at(&server, "/")], &db);

    {
        let crawl = open_crawl(config.clone());
        crawl.coordinator.seed().unwrap();
        crawl
            .coordinator
            .process_next(&CancellationToken::new())
            .await;
        assert_eq!(crawl.coordinator.frontier().size().unwrap(), 2);
    }

    let crawl = open_crawl(config);
    // The root was visited in the first run and is not re-queued
    assert_eq!(crawl.coordinator.seed().unwrap(), 0);
    assert_eq!(crawl.coordinator.frontier().size().unwrap(), 2);

    let outcome = crawl
        .coordinator
        .process_next(&CancellationToken::new())
        .await;
    assert!(matches!(outcome, Some(EntryOutcome::Completed { .. })));
    assert!(crawl.coordinator.visited().contains(&at(&server, "/a")).unwrap());
    assert_eq!(
        crawl.coordinator.frontier().snapshot().unwrap(),
        vec![FrontierEntry::new(at(&server, "/b"), 1)]
    );
}

#[tokio::test]
async fn test_in_flight_entries_dropped_on_restart() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("crawl.db");

    {
        let frontier = FrontierStore::open(&db, 10).unwrap();
        frontier.try_enqueue("https://example.com/a", 1).unwrap();
        frontier.try_enqueue("https://example.com/b", 1).unwrap();
        frontier.try_dequeue().unwrap();
    }

    let mut config = create_test_config(vec!["https://example.com/".to_string()], &db);
    config.crawler.frontier_capacity = 10;
    let coordinator = Coordinator::open(config).unwrap();
    let frontier = coordinator.frontier();
    assert_eq!(
        frontier.snapshot().unwrap(),
        vec![FrontierEntry::new("https://example.com/b", 1)]
    );
    assert!(frontier.get("https://example.com/a").unwrap().is_none());
}

#[tokio::test]
async fn test_stats_reader_keeps_live_claims() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("crawl.db");
    let config = create_test_config(vec!["https://example.com/".to_string()], &db);
    let coordinator = Coordinator::open(config).unwrap();
    coordinator.frontier().try_enqueue("https://example.com/a", 1).unwrap();
    coordinator.frontier().try_enqueue("https://example.com/b", 1).unwrap();
    coordinator.frontier().try_dequeue().unwrap().unwrap();

    let frontier = FrontierStore::open(&db, 10).unwrap();
    let visited = VisitedIndex::open(&db, 10).unwrap();
    let pages = SqlitePageStore::open(&db).unwrap();
    let stats = load_statistics(&frontier, &visited, &pages).unwrap();
    assert_eq!(stats.frontier_pending, 1);
    assert_eq!(stats.frontier_in_flight, 1);

    assert!(!coordinator.frontier().try_enqueue("https://example.com/a", 1).unwrap());
    assert!(coordinator.frontier().complete("https://example.com/a").unwrap());
}

#[tokio::test]
async fn test_scheduler_drains_site_and_stops() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &["/a", "/b"])).await;
    mount_page(&server, "/a", html("A", &["/", "/c"])).await;
    mount_page(&server, "/b", html("B", &["/"])).await;
    mount_page(&server, "/c", html("C", &["/a"])).await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    let crawl = open_crawl(config);
    let pages = crawl.pages.clone();
    let scheduler = Scheduler::new(Arc::new(crawl.coordinator));

    let report = tokio::time::timeout(
        Duration::from_secs(30),
        scheduler.run(CancellationToken::new()),
    )
    .await
    .expect("scheduler should stop once the frontier drains")
    .unwrap();

    assert_eq!(report.processed, 4);
    let coordinator = scheduler.coordinator();
    assert!(coordinator.frontier().is_empty().unwrap());
    assert_eq!(coordinator.visited().len().unwrap(), 4);
    assert_eq!(pages.count().unwrap(), 4);

    let counts = coordinator.visited().count_by_outcome().unwrap();
    assert_eq!(counts.get(&VisitOutcome::Completed), Some(&4));
}

#[tokio::test]
async fn test_scheduler_exits_on_cancel() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html("Home", &[])).await;

    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(vec![at(&server, "/")], &dir.path().join("crawl.db"));
    config.crawler.idle_policy = IdlePolicy::Reseed;
    let crawl = open_crawl(config);
    let scheduler = Scheduler::new(Arc::new(crawl.coordinator));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), scheduler.run(cancel))
        .await
        .expect("workers should exit after cancellation")
        .unwrap();
    assert_eq!(report.processed, 1);
}

//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and drive discovery,
//! queue processing and direct mode end-to-end against in-memory SQLite.

use chrono::Utc;
use qa_harvest::config::{
    BackoffConfig, Config, ContentType, CrawlerConfig, DirectConfig, JsonApiConfig, OutputConfig,
    PlatformConfig, PolitenessBudget, QualityConfig, SelectorSet,
};
use qa_harvest::crawler::Coordinator;
use qa_harvest::storage::{SqliteStorage, Storage};
use qa_harvest::{HarvestError, TargetStatus};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COOLDOWN_MS: u64 = 300;

/// Creates a platform served by the mock server
fn create_test_platform(server: &MockServer) -> PlatformConfig {
    PlatformConfig {
        name: "mock-forum".to_string(),
        base_url: server.uri(),
        domains: vec!["127.0.0.1".to_string()],
        source: Some("Mock Forum".to_string()),
        content_type: ContentType::Community,
        category: Some("hosting".to_string()),
        language: Some("en".to_string()),
        priority: 7,
        thread_pattern: Some(r"^/t/[^/]+/(?P<id>\d+)$".to_string()),
        target_type: "thread".to_string(),
        listing_urls: vec![format!("{}/c/hosting", server.uri())],
        foreign_title_markers: vec![],
        politeness: PolitenessBudget {
            burst: 1000,
            interval_ms: 10,
        },
        headers: BTreeMap::new(),
        selectors: SelectorSet {
            title: vec!["h1".to_string()],
            body: vec![".post-body".to_string()],
            author: vec![".author".to_string()],
            post_container: vec![".post".to_string()],
            fallback_title: vec!["title".to_string()],
            fallback_body: vec!["main".to_string()],
            ..SelectorSet::default()
        },
        api: None,
    }
}

/// Creates a test configuration with short timings
fn create_test_config(platform: PlatformConfig) -> Config {
    Config {
        crawler: CrawlerConfig {
            batch_size: 10,
            max_retries: 3,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            rate_limit_cooldown_ms: COOLDOWN_MS,
            preflight: false,
            ..CrawlerConfig::default()
        },
        backoff: BackoffConfig {
            base_ms: 1,
            multiplier: 1.0,
            cap_ms: 1,
        },
        quality: QualityConfig::default(),
        output: OutputConfig {
            database_path: ":memory:".to_string(),
        },
        embedding: None,
        direct: DirectConfig::default(),
        platforms: vec![platform],
    }
}

fn coordinator(config: Config) -> Coordinator<SqliteStorage> {
    let storage = SqliteStorage::new_in_memory().expect("Failed to open in-memory storage");
    Coordinator::new(config, storage).expect("Failed to create coordinator")
}

fn thread_html(title: &str, question: &str, answer: &str) -> String {
    format!(
        r#"<html lang="en"><head><title>{title} - Mock Forum</title></head><body>
        <h1>{title}</h1>
        <div class="post"><span class="author">host_amy</span><div class="post-body"><p>{question}</p></div></div>
        <div class="post"><span class="author">superhost_bo</span><div class="post-body"><p>{answer}</p></div></div>
        </body></html>"#
    )
}

const QUESTION: &str =
    "Guests keep asking about early check-in. How do other hosts handle requests before the official time?";
const ANSWER: &str =
    "I allow luggage drop-off from noon and only confirm early access the evening before arrival.";

async fn mount_thread(server: &MockServer, thread_path: &str, title: &str) {
    Mock::given(method("GET"))
        .and(path(thread_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(thread_html(title, QUESTION, ANSWER))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_discovery_skips_known_urls() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/c/hosting"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><body>
                    <a href="/t/early-check-in/1">One</a>
                    <a href="/t/cleaning-fees/2?utm_source=feed">Two</a>
                    <a href="/t/smart-locks/3#latest">Three</a>
                    <a href="/t/old-thread/4">Already done</a>
                    <a href="/t/early-check-in/1/">Duplicate link</a>
                    <a href="/c/hosting?page=2">Next page</a>
                    <a href="https://elsewhere.example.org/t/x/9">External</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&server)
        .await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));

    let done = format!("{}/t/old-thread/4", base);
    assert_eq!(c.enqueue_urls(&[done.clone()]).unwrap(), 1);
    c.storage_mut().mark_processing(&done, Utc::now()).unwrap();
    c.storage_mut().mark_completed(&done, Utc::now()).unwrap();

    let report = c.discover().await.expect("Discovery failed");

    assert_eq!(report.listings_fetched, 1);
    assert_eq!(report.enqueued, 3);
    assert_eq!(report.already_known, 1);

    let storage = c.storage();
    assert_eq!(storage.count_targets_by_status(TargetStatus::Pending).unwrap(), 3);
    assert_eq!(storage.count_targets_by_status(TargetStatus::Completed).unwrap(), 1);

    let target = storage
        .get_target(&format!("{}/t/cleaning-fees/2", base))
        .unwrap()
        .expect("normalized link should be queued");
    assert_eq!(target.priority, 7);
    assert_eq!(target.platform, "mock-forum");
    assert_eq!(target.retry_count, 0);
}

#[tokio::test]
async fn test_process_batch_stores_thread() {
    let server = MockServer::start().await;
    mount_thread(&server, "/t/early-check-in/1", "Early check-in requests").await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let url = format!("{}/t/early-check-in/1", server.uri());
    c.enqueue_urls(&[url.clone()]).unwrap();

    let report = c.process_batch().await.expect("Batch failed");

    assert_eq!(report.attempted, 1);
    assert_eq!(report.completed, 1);

    let storage = c.storage();
    let target = storage.get_target(&url).unwrap().unwrap();
    assert_eq!(target.status, TargetStatus::Completed);
    assert!(target.error.is_none());

    let record = storage.get_content_by_url(&url).unwrap().expect("record stored");
    assert_eq!(record.title, "Early check-in requests");
    assert_eq!(record.body, format!("{}\n\n{}", QUESTION, ANSWER));
    assert_eq!(record.author.as_deref(), Some("host_amy"));
    assert_eq!(record.original_posts, 1);
    assert_eq!(record.replies, 1);
    assert_eq!(record.slug, "early-check-in-requests");
    assert_eq!(record.language, "en");
    assert_eq!(record.source, "Mock Forum");
    assert_eq!(storage.get_chunks(record.id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_json_api_preferred_over_html() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/deposit/5.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "title": "Security deposit timing",
            "post_stream": {"posts": [
                {"cooked": format!("<p>{}</p>", QUESTION), "username": "amy", "score": 11},
                {"cooked": format!("<p>{}</p>", ANSWER), "username": "bo"}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/t/deposit/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .expect(0)
        .mount(&server)
        .await;

    let mut platform = create_test_platform(&server);
    platform.api = Some(JsonApiConfig {
        url_template: "{url}.json".to_string(),
        title_pointer: "/title".to_string(),
        posts_pointer: "/post_stream/posts".to_string(),
        body_field: "cooked".to_string(),
        author_field: Some("username".to_string()),
        votes_field: Some("score".to_string()),
        body_is_html: true,
    });
    let mut c = coordinator(create_test_config(platform));

    let url = format!("{}/t/deposit/5", server.uri());
    let processed = c.process_url(&url).await.expect("JSON processing failed");

    assert_eq!(processed.strategy, "json-api");
    let record = c.storage().get_content_by_url(&url).unwrap().unwrap();
    assert_eq!(record.title, "Security deposit timing");
    assert_eq!(record.votes, Some(11));
    assert!(record.is_verified);
}

#[tokio::test]
async fn test_json_api_failure_falls_back_to_html() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/deposit/5.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_thread(&server, "/t/deposit/5", "Security deposit timing").await;

    let mut platform = create_test_platform(&server);
    platform.api = Some(JsonApiConfig {
        url_template: "{url}.json".to_string(),
        title_pointer: "/title".to_string(),
        posts_pointer: "/posts".to_string(),
        body_field: "text".to_string(),
        author_field: None,
        votes_field: None,
        body_is_html: false,
    });
    let mut c = coordinator(create_test_config(platform));

    let url = format!("{}/t/deposit/5", server.uri());
    let processed = c.process_url(&url).await.expect("HTML fallback failed");
    assert_eq!(processed.strategy, "primary-selectors");
}

#[tokio::test]
async fn test_rate_limit_single_retry_and_cooldown() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/limited/1"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;
    mount_thread(&server, "/t/other/2", "Another question").await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let limited = format!("{}/t/limited/1", server.uri());
    c.enqueue_urls(&[limited.clone()]).unwrap();

    let report = c.process_batch().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.will_retry, 1);

    let target = c.storage().get_target(&limited).unwrap().unwrap();
    assert_eq!(target.status, TargetStatus::Failed);
    assert_eq!(target.retry_count, 1);
    assert!(target.error.unwrap().starts_with("rate_limited"));

    assert!(c
        .politeness()
        .throttle_state("mock-forum")
        .unwrap()
        .is_cooling_down(Instant::now()));

    // The next request to the platform waits out the cool-down
    let start = Instant::now();
    c.process_url(&format!("{}/t/other/2", server.uri()))
        .await
        .unwrap();
    assert!(start.elapsed() >= Duration::from_millis(COOLDOWN_MS - 50));
}

#[tokio::test]
async fn test_not_found_never_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/gone/1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let url = format!("{}/t/gone/1", server.uri());
    c.enqueue_urls(&[url.clone()]).unwrap();

    let first = c.process_batch().await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.will_retry, 0);

    let target = c.storage().get_target(&url).unwrap().unwrap();
    assert_eq!(target.retry_count, 1);
    assert!(target.permanent);

    let second = c.process_batch().await.unwrap();
    assert_eq!(second.attempted, 0);
}

#[tokio::test]
async fn test_retry_ceiling() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/flaky/1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let url = format!("{}/t/flaky/1", server.uri());
    c.enqueue_urls(&[url.clone()]).unwrap();

    for expected in 1..=3 {
        let report = c.process_batch().await.unwrap();
        assert_eq!(report.attempted, 1);
        let target = c.storage().get_target(&url).unwrap().unwrap();
        assert_eq!(target.retry_count, expected);
        // Let the 1ms backoff elapse
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let target = c.storage().get_target(&url).unwrap().unwrap();
    assert_eq!(target.status, TargetStatus::Failed);
    assert_eq!(c.process_batch().await.unwrap().attempted, 0);
}

#[tokio::test]
async fn test_preflight_head_short_circuits() {
    let server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/t/blocked/1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/t/blocked/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config(create_test_platform(&server));
    config.crawler.preflight = true;
    let mut c = coordinator(config);

    let err = c
        .process_url(&format!("{}/t/blocked/1", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "blocked");
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_preflight_head_is_spaced_from_get() {
    let server = MockServer::start().await;
    let interval_ms = 400;

    Mock::given(method("HEAD"))
        .and(path("/t/early-check-in/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_thread(&server, "/t/early-check-in/1", "Early check-in requests").await;

    let mut platform = create_test_platform(&server);
    platform.politeness.interval_ms = interval_ms;
    let mut config = create_test_config(platform);
    config.crawler.preflight = true;
    let mut c = coordinator(config);

    // The first request to a platform is immediate, so the run time is the
    // HEAD-to-GET gap plus local work
    let start = Instant::now();
    c.process_url(&format!("{}/t/early-check-in/1", server.uri()))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    let methods: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.method.to_string())
        .collect();
    assert_eq!(methods, vec!["HEAD", "GET"]);
    assert!(
        elapsed >= Duration::from_millis(interval_ms * 7 / 10),
        "HEAD and GET only {:?} apart",
        elapsed
    );
    assert_eq!(
        c.politeness()
            .throttle_state("mock-forum")
            .unwrap()
            .request_count,
        2
    );
}

#[tokio::test]
async fn test_recrawl_is_idempotent() {
    let server = MockServer::start().await;
    mount_thread(&server, "/t/early-check-in/1", "Early check-in requests").await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let url = format!("{}/t/early-check-in/1", server.uri());

    let first = c.process_url(&url).await.unwrap();
    let created = c.storage().get_content_by_url(&url).unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = c.process_url(&url).await.unwrap();

    assert!(first.persisted.inserted);
    assert!(!second.persisted.inserted);
    assert_eq!(first.persisted.id, second.persisted.id);

    let storage = c.storage();
    assert_eq!(storage.count_content().unwrap(), 1);
    let updated = storage.get_content_by_url(&url).unwrap().unwrap();
    assert_eq!(updated.content_hash, created.content_hash);
    assert_eq!(updated.slug, created.slug);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.last_updated > created.last_updated);
}

#[tokio::test]
async fn test_thin_content_rejected_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/t/welcome/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h1>Welcome!</h1><div class="post-body">Welcome to the community! Sign up to join the conversation.</div></body></html>"#,
        ))
        .mount(&server)
        .await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let url = format!("{}/t/welcome/1", server.uri());
    c.enqueue_urls(&[url.clone()]).unwrap();

    let report = c.process_batch().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.will_retry, 0);

    let target = c.storage().get_target(&url).unwrap().unwrap();
    assert!(target.error.unwrap().starts_with("validation_failed"));
    assert!(!c.storage().content_url_exists(&url).unwrap());
}

#[tokio::test]
async fn test_direct_mode_bypasses_queue() {
    let server = MockServer::start().await;
    mount_thread(&server, "/t/early-check-in/1", "Early check-in requests").await;

    let mut c = coordinator(create_test_config(create_test_platform(&server)));
    let urls = vec![
        format!("{}/t/early-check-in/1", server.uri()),
        format!("{}/c/hosting", server.uri()),
    ];

    let report = c.run_direct(&urls).await.expect("Direct run failed");

    assert_eq!(report.attempted, 2);
    assert_eq!(report.stored, 1);
    assert_eq!(report.failed, 1);

    let storage = c.storage();
    assert_eq!(storage.count_content().unwrap(), 1);
    for status in TargetStatus::all() {
        assert_eq!(storage.count_targets_by_status(status).unwrap(), 0);
    }
}

#[tokio::test]
async fn test_unsupported_url_error() {
    let server = MockServer::start().await;
    let mut c = coordinator(create_test_config(create_test_platform(&server)));

    let err = c
        .process_url("https://unknown.example.net/t/a/1")
        .await
        .unwrap_err();
    assert!(matches!(err, HarvestError::UnsupportedUrl { .. }));
}

//! Full-cycle audit pipeline tests

use sitegauge::cache::ArtifactKind;
use sitegauge::config::Config;
use sitegauge::jobs::{AuditOptions, AuditReport, JobStatus, Worker};
use sitegauge::store::{SharedStore, SqliteStore};
use sitegauge::{AuditError, AuditService, SubmitOutcome};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A config tuned for tests: no throttling, quick fetch timeouts
fn test_config() -> Config {
    let mut config = Config::default();
    config.crawler.throttle_ms = 0;
    config.crawler.max_crawl_seconds = 30;
    config.fetcher.timeout_secs = 5;
    config.service.poll_interval_ms = 10;
    config
}

fn test_options() -> AuditOptions {
    AuditOptions {
        max_pages: 10,
        max_depth: 2,
        concurrency: 1,
        throttle_ms: 0,
        respect_robots: true,
        include_subdomains: false,
    }
}

/// Builds a service and worker sharing one in-memory store
fn build_pipeline(config: Config) -> (AuditService, Worker) {
    let config = Arc::new(config);
    let store: SharedStore = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
    let service = AuditService::new(Arc::clone(&store), Arc::clone(&config));
    let worker = Worker::new(store, config).unwrap();
    (service, worker)
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/html"),
        )
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

fn page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{}">link</a>"#, l))
        .collect();
    format!(
        r#"<html><head><title>{title} page title for tests</title>
        <meta name="description" content="A long enough description of the {title} page to pass the length checks comfortably.">
        </head><body><h1>{title}</h1><p>body text</p>{anchors}</body></html>"#
    )
}

fn submit_expecting_job(service: &AuditService, url: &str, kind: ArtifactKind) -> Uuid {
    match service.submit(url, kind, Some(test_options())).unwrap() {
        SubmitOutcome::Enqueued(id) => id,
        other => panic!("expected a queued job, got {:?}", other),
    }
}

#[tokio::test]
async fn test_page_audit_full_cycle() {
    let server = MockServer::start().await;
    mount_html(&server, "/", page("Home", &[])).await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::PageAudit);

    assert_eq!(service.job_status(&id).unwrap().status, JobStatus::Queued);

    let processed = worker.run_batch(5).await.unwrap();
    assert_eq!(processed, 1);

    let status = service.job_status(&id).unwrap();
    assert_eq!(status.status, JobStatus::Completed);
    assert_eq!(status.progress, 100);
    assert!(status.completed_at.is_some());

    match service.job_results(&id).unwrap() {
        AuditReport::Page(report) => {
            assert!(report.analysis.score > 0);
            assert!(report.fetched_bytes > 0);
        }
        AuditReport::Site(_) => panic!("expected a page report"),
    }
}

/// Scenario: maxPages caps the crawl even when more links were discovered
#[tokio::test]
async fn test_site_audit_stops_at_max_pages() {
    let server = MockServer::start().await;
    // Three interconnected pages
    mount_html(&server, "/", page("Home", &["/a", "/b"])).await;
    mount_html(&server, "/a", page("A", &["/", "/b"])).await;
    mount_html(&server, "/b", page("B", &["/", "/a"])).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (service, worker) = build_pipeline(test_config());
    let mut options = test_options();
    options.max_pages = 2;

    let id = match service
        .submit(&server.uri(), ArtifactKind::SiteAudit, Some(options))
        .unwrap()
    {
        SubmitOutcome::Enqueued(id) => id,
        other => panic!("expected a queued job, got {:?}", other),
    };

    worker.run_batch(1).await.unwrap();

    assert_eq!(service.job_status(&id).unwrap().status, JobStatus::Completed);
    match service.job_results(&id).unwrap() {
        AuditReport::Site(report) => {
            assert_eq!(report.pages.len(), 2);
            assert_eq!(report.pages_crawled, 2);
        }
        AuditReport::Page(_) => panic!("expected a site report"),
    }
}

/// Scenario: a robots-disallowed link never enters the crawl at all
#[tokio::test]
async fn test_robots_disallowed_url_excluded_from_results() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private").await;
    mount_html(&server, "/", page("Home", &["/private", "/public"])).await;
    mount_html(&server, "/public", page("Public", &[])).await;
    mount_html(&server, "/private", page("Private", &[])).await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::SiteAudit);

    worker.run_batch(1).await.unwrap();

    match service.job_results(&id).unwrap() {
        AuditReport::Site(report) => {
            assert_eq!(report.pages.len(), 2);
            // The disallowed URL is neither crawled nor failed
            assert!(report.pages.iter().all(|p| !p.url.contains("/private")));
        }
        AuditReport::Page(_) => panic!("expected a site report"),
    }
}

/// Scenario: one linked page fails to fetch; the job still completes with
/// the failed URL listed in the aggregate
#[tokio::test]
async fn test_failed_page_does_not_abort_site_audit() {
    let server = MockServer::start().await;
    mount_html(&server, "/", page("Home", &["/broken", "/fine"])).await;
    mount_html(&server, "/fine", page("Fine", &[])).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::SiteAudit);

    worker.run_batch(1).await.unwrap();

    assert_eq!(service.job_status(&id).unwrap().status, JobStatus::Completed);
    match service.job_results(&id).unwrap() {
        AuditReport::Site(report) => {
            assert_eq!(report.pages_crawled, 2);
            assert_eq!(report.pages_failed, 1);

            let failed: Vec<_> = report
                .pages
                .iter()
                .filter(|p| p.analysis.is_none())
                .collect();
            assert_eq!(failed.len(), 1);
            assert!(failed[0].url.contains("/broken"));
            assert!(failed[0].error.is_some());
        }
        AuditReport::Page(_) => panic!("expected a site report"),
    }
}

/// Scenario: a second submission within the TTL is served from cache,
/// produces no new job, and carries the first job's completion time
#[tokio::test]
async fn test_repeat_submission_served_from_cache() {
    let server = MockServer::start().await;
    mount_html(&server, "/", page("Home", &[])).await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::PageAudit);
    worker.run_batch(1).await.unwrap();

    let first_completed_at = service
        .job_status(&id)
        .unwrap()
        .completed_at
        .expect("first job should be completed");

    let outcome = service
        .submit(&server.uri(), ArtifactKind::PageAudit, Some(test_options()))
        .unwrap();

    match outcome {
        SubmitOutcome::Cached(artifact) => {
            assert!(artifact.cached);
            assert_eq!(artifact.cached_at, first_completed_at);
        }
        other => panic!("expected a cache hit, got {:?}", other),
    }

    // No new job was created
    assert_eq!(service.queue_len().unwrap(), 0);
}

/// Different options fingerprint differently, so they bypass each other's
/// cache entries
#[tokio::test]
async fn test_different_options_miss_the_cache() {
    let server = MockServer::start().await;
    mount_html(&server, "/", page("Home", &[])).await;

    let (service, worker) = build_pipeline(test_config());
    submit_expecting_job(&service, &server.uri(), ArtifactKind::PageAudit);
    worker.run_batch(1).await.unwrap();

    let mut other_options = test_options();
    other_options.max_pages = 99;

    let outcome = service
        .submit(&server.uri(), ArtifactKind::PageAudit, Some(other_options))
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Enqueued(_)));
}

/// Equivalent spellings of the same target hit the same cache entry
#[tokio::test]
async fn test_cache_key_uses_normalized_target() {
    let server = MockServer::start().await;
    mount_html(&server, "/x", page("X", &[])).await;

    let (service, worker) = build_pipeline(test_config());
    let url_with_slash = format!("{}/x/", server.uri());
    let url_with_fragment = format!("{}/x#section", server.uri());

    submit_expecting_job(&service, &url_with_slash, ArtifactKind::PageAudit);
    worker.run_batch(1).await.unwrap();

    let outcome = service
        .submit(&url_with_fragment, ArtifactKind::PageAudit, Some(test_options()))
        .unwrap();
    assert!(matches!(outcome, SubmitOutcome::Cached(_)));
}

/// A page audit whose fetch fails ends up Failed with its error recorded,
/// and the worker loop keeps processing other jobs
#[tokio::test]
async fn test_failed_job_isolated_from_the_batch() {
    let server = MockServer::start().await;
    mount_html(&server, "/good", page("Good", &[])).await;
    Mock::given(method("GET"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (service, worker) = build_pipeline(test_config());
    let bad = submit_expecting_job(
        &service,
        &format!("{}/bad", server.uri()),
        ArtifactKind::PageAudit,
    );
    let good = submit_expecting_job(
        &service,
        &format!("{}/good", server.uri()),
        ArtifactKind::PageAudit,
    );

    let processed = worker.run_batch(5).await.unwrap();
    assert_eq!(processed, 2);

    let bad_status = service.job_status(&bad).unwrap();
    assert_eq!(bad_status.status, JobStatus::Failed);
    assert!(bad_status.error.is_some());
    assert!(matches!(
        service.job_results(&bad),
        Err(AuditError::JobFailed { .. })
    ));

    assert_eq!(service.job_status(&good).unwrap().status, JobStatus::Completed);
}

/// A crawl cut short by the wall-clock ceiling is a completed job with
/// the pages finished so far, not a failure
#[tokio::test]
async fn test_crawl_ceiling_yields_partial_completed_job() {
    let server = MockServer::start().await;
    let slow_page = |title: &str, links: &[&str]| {
        ResponseTemplate::new(200)
            .set_body_raw(page(title, links), "text/html")
            .set_delay(std::time::Duration::from_millis(400))
    };
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(slow_page("Home", &["/a", "/b", "/c"]))
        .mount(&server)
        .await;
    for route in ["/a", "/b", "/c"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(slow_page(route, &[]))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut config = test_config();
    config.crawler.max_crawl_seconds = 1;
    let (service, worker) = build_pipeline(config);
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::SiteAudit);

    worker.run_batch(1).await.unwrap();

    let status = service.job_status(&id).unwrap();
    assert_eq!(status.status, JobStatus::Completed);

    match service.job_results(&id).unwrap() {
        AuditReport::Site(report) => {
            // With 400ms per fetch and a 1s ceiling, the fourth page can
            // never be reached; at least the seed always is
            assert!(report.pages_crawled >= 1);
            assert!(report.pages.len() < 4);
        }
        AuditReport::Page(_) => panic!("expected a site report"),
    }
}

/// A site audit where nothing can be fetched fails rather than completing
/// empty
#[tokio::test]
async fn test_site_audit_with_unreachable_seed_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::SiteAudit);

    worker.run_batch(1).await.unwrap();
    assert_eq!(service.job_status(&id).unwrap().status, JobStatus::Failed);
}

/// Crawl results never include URLs from other hosts
#[tokio::test]
async fn test_site_audit_stays_on_host() {
    let server = MockServer::start().await;
    let other = MockServer::start().await;
    mount_html(
        &server,
        "/",
        page("Home", &[&format!("{}/elsewhere", other.uri()), "/local"]),
    )
    .await;
    mount_html(&server, "/local", page("Local", &[])).await;
    mount_html(&other, "/elsewhere", page("Elsewhere", &[])).await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (service, worker) = build_pipeline(test_config());
    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::SiteAudit);

    worker.run_batch(1).await.unwrap();

    match service.job_results(&id).unwrap() {
        AuditReport::Site(report) => {
            assert_eq!(report.pages.len(), 2);
            assert!(report
                .pages
                .iter()
                .all(|p| !p.url.contains("/elsewhere")));
        }
        AuditReport::Page(_) => panic!("expected a site report"),
    }
}

/// The long-lived loop picks up jobs submitted while it runs, then honors
/// shutdown
#[tokio::test]
async fn test_worker_loop_processes_and_shuts_down() {
    let server = MockServer::start().await;
    mount_html(&server, "/", page("Home", &[])).await;

    let config = Arc::new(test_config());
    let store: SharedStore = Arc::new(Mutex::new(SqliteStore::new_in_memory().unwrap()));
    let service = AuditService::new(Arc::clone(&store), Arc::clone(&config));
    let worker = Worker::new(store, config).unwrap();
    let shutdown = worker.shutdown_handle();

    let handle = tokio::spawn(async move { worker.run().await });

    let id = submit_expecting_job(&service, &server.uri(), ArtifactKind::PageAudit);

    // Poll until the worker finishes the job
    let mut done = false;
    for _ in 0..200 {
        let status = service.job_status(&id).unwrap().status;
        if status == JobStatus::Completed {
            done = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(done, "worker loop did not complete the job in time");

    shutdown.store(true, std::sync::atomic::Ordering::SeqCst);
    handle.await.unwrap();
}

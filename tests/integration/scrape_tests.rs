//! End-to-end scrape runs against a mock backend
//!
//! These tests exercise the whole pipeline: resume filtering, the retry
//! driver, the second pass, manifest and error-log writes, and the
//! artifact files. The backend never runs; wiremock answers in its
//! place and verifies how many requests each run actually made.

use marksmith::config::Config;
use marksmith::manifest::{ManifestStore, ERRORS_FILENAME, MANIFEST_FILENAME};
use marksmith::{run_scrape, RunPlan, ServerPolicy};

use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration pointed at the mock backend with retry
/// delays short enough for tests
fn create_test_config(api_url: &str, workspace: &Path) -> Config {
    let mut config = Config::default();
    config.backend.api_url = api_url.to_string();
    config.backend.poll_interval_secs = 0;
    config.retry.base_delay_secs = 0.001;
    config.retry.max_backoff_secs = 0.002;
    config.server.install_dir = workspace.join("no-backend-here");
    config
}

/// Builds a run plan that never touches docker and never sleeps
fn create_test_plan(urls: &[&str], out_dir: &Path, config: &Config) -> RunPlan {
    let urls = urls.iter().map(|u| u.to_string()).collect();
    let mut plan = RunPlan::new(urls, out_dir.to_path_buf(), config);
    plan.server_policy = ServerPolicy::Never;
    plan.delay = Duration::ZERO;
    plan.cooldown = Duration::ZERO;
    plan
}

/// The per-page payload the backend produces for `url`
fn page_data(url: &str, markdown: &str) -> Value {
    json!({
        "markdown": markdown,
        "metadata": {
            "title": "Test Page",
            "sourceURL": url,
            "statusCode": 200
        }
    })
}

/// A successful scrape envelope for `url`
fn page_body(url: &str, markdown: &str) -> Value {
    json!({
        "success": true,
        "data": page_data(url, markdown)
    })
}

async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v0/health/liveness"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Parses every line of the run's manifest, in file order
fn manifest_lines(out_dir: &Path) -> Vec<Value> {
    let text = std::fs::read_to_string(out_dir.join(MANIFEST_FILENAME)).unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Parses the permanent-error log; a log that was never created reads
/// as empty
fn error_lines(out_dir: &Path) -> Vec<Value> {
    let log = out_dir.join(ERRORS_FILENAME);
    if !log.exists() {
        return Vec::new();
    }
    let text = std::fs::read_to_string(log).unwrap();
    text.lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Markdown artifact filenames in `out_dir`, sorted
fn markdown_files(out_dir: &Path) -> Vec<String> {
    let mut files: Vec<String> = std::fs::read_dir(out_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".md"))
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_run_scrapes_every_url_and_writes_artifacts() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body("https://example.com/a", "# Page")),
        )
        .expect(3)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let plan = create_test_plan(
        &[
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
        ],
        &out_dir,
        &config,
    );

    let summary = run_scrape(plan, &config).await.unwrap();

    assert_eq!(summary.ok, 3);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.exit_code(), 0);

    // Manifest lines follow dispatch order and name the artifact files
    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["url"], "https://example.com/a");
    assert_eq!(lines[1]["url"], "https://example.com/b");
    assert_eq!(lines[2]["url"], "https://example.com/c");
    for line in &lines {
        assert_eq!(line["status"], "ok");
        assert_eq!(line["http_status"], 200);
    }

    // Artifacts carry the 1-based run index in their filenames
    let files = markdown_files(&out_dir);
    assert_eq!(files.len(), 3);
    for (i, file) in files.iter().enumerate() {
        assert!(file.starts_with(&format!("{:04}", i + 1)));
        assert_eq!(lines[i]["file"], file.as_str());
    }

    assert!(error_lines(&out_dir).is_empty());
}

#[tokio::test]
async fn test_permanent_failure_is_logged_without_retrying() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    // A 404 must be taken at its word: exactly one request
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let plan = create_test_plan(&["https://example.com/gone"], &out_dir, &config);

    let summary = run_scrape(plan, &config).await.unwrap();

    assert_eq!(summary.ok, 0);
    assert_eq!(summary.permanent, 1);
    assert_eq!(summary.exit_code(), 2);

    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "error");
    assert_eq!(lines[0]["http_status"], 404);
    assert_eq!(lines[0]["file"], "");

    // Permanent failures are mirrored to the error log
    let errors = error_lines(&out_dir);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["url"], "https://example.com/gone");

    assert!(markdown_files(&out_dir).is_empty());
}

#[tokio::test]
async fn test_transient_failures_retry_within_the_run() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    // Two 503s, then the page comes through
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://example.com/flaky", "# Flaky")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let plan = create_test_plan(&["https://example.com/flaky"], &out_dir, &config);

    let summary = run_scrape(plan, &config).await.unwrap();

    // Recovery happened inside the main pass, not the second one
    assert_eq!(summary.ok, 1);
    assert_eq!(summary.exhausted, 0);
    assert_eq!(summary.exit_code(), 0);

    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "ok");
    assert!(error_lines(&out_dir).is_empty());
}

#[tokio::test]
async fn test_exhausted_url_gets_one_second_pass_then_a_manifest_entry() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    // Always 429: two attempts in the main pass plus two in the second
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(429))
        .expect(4)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let mut config = create_test_config(&server.uri(), dir.path());
    config.retry.max_retries = 1;
    let plan = create_test_plan(&["https://example.com/limited"], &out_dir, &config);

    let summary = run_scrape(plan, &config).await.unwrap();

    assert_eq!(summary.ok, 0);
    assert_eq!(summary.exhausted, 1);
    assert_eq!(summary.exit_code(), 2);

    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["status"], "exhausted");
    assert_eq!(lines[0]["http_status"], 429);
    assert!(lines[0]["error"]
        .as_str()
        .unwrap()
        .contains("retries exhausted"));

    // Exhausted is not a permanent failure: no error-log line, and the
    // URL stays eligible for the next run
    assert!(error_lines(&out_dir).is_empty());
    let store = ManifestStore::open(&out_dir).unwrap();
    assert!(!store.is_done("https://example.com/limited").await);
}

#[tokio::test]
async fn test_exhausted_url_is_picked_up_again_by_the_next_run() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    // First run: one attempt per pass, both 503. Second run: success.
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://example.com/later", "# Later")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let mut config = create_test_config(&server.uri(), dir.path());
    config.retry.max_retries = 0;

    let plan = create_test_plan(&["https://example.com/later"], &out_dir, &config);
    let first = run_scrape(plan, &config).await.unwrap();
    assert_eq!(first.exhausted, 1);

    let plan = create_test_plan(&["https://example.com/later"], &out_dir, &config);
    let second = run_scrape(plan, &config).await.unwrap();
    assert_eq!(second.ok, 1);
    assert_eq!(second.skipped, 0);

    // The manifest keeps both entries; the last one wins on resume
    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["status"], "exhausted");
    assert_eq!(lines[1]["status"], "ok");

    let store = ManifestStore::open(&out_dir).unwrap();
    assert!(store.is_done("https://example.com/later").await);
}

#[tokio::test]
async fn test_second_run_skips_completed_urls() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body("https://example.com/a", "# A")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());

    let plan = create_test_plan(&["https://example.com/a"], &out_dir, &config);
    let first = run_scrape(plan, &config).await.unwrap();
    assert_eq!(first.ok, 1);

    // Same output directory: the URL is already done, so no request
    let plan = create_test_plan(&["https://example.com/a"], &out_dir, &config);
    let second = run_scrape(plan, &config).await.unwrap();

    assert_eq!(second.ok, 0);
    assert_eq!(second.skipped, 1);
    assert_eq!(second.exit_code(), 0);
    assert_eq!(manifest_lines(&out_dir).len(), 1);
}

#[tokio::test]
async fn test_overwrite_scrapes_completed_urls_again() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body("https://example.com/a", "# A")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());

    let plan = create_test_plan(&["https://example.com/a"], &out_dir, &config);
    run_scrape(plan, &config).await.unwrap();

    let mut plan = create_test_plan(&["https://example.com/a"], &out_dir, &config);
    plan.overwrite = true;
    let second = run_scrape(plan, &config).await.unwrap();

    assert_eq!(second.ok, 1);
    assert_eq!(second.skipped, 0);

    // Appended, never rewritten: two lines, one artifact
    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["file"], lines[1]["file"]);
    assert_eq!(markdown_files(&out_dir).len(), 1);
}

#[tokio::test]
async fn test_front_matter_is_prepended_when_requested() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_body("https://example.com/doc", "# Doc\n\nBody text.")),
        )
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let mut plan = create_test_plan(&["https://example.com/doc"], &out_dir, &config);
    plan.front_matter = true;

    let summary = run_scrape(plan, &config).await.unwrap();
    assert_eq!(summary.ok, 1);

    let files = markdown_files(&out_dir);
    assert_eq!(files.len(), 1);
    let content = std::fs::read_to_string(out_dir.join(&files[0])).unwrap();

    assert!(content.starts_with("---\n"));
    assert!(content.contains("url: https://example.com/doc"));
    assert!(content.contains("title: \"Test Page\""));
    assert!(content.contains("status_code: 200"));
    assert!(content.contains("---\n\n# Doc"));
}

#[tokio::test]
async fn test_batch_mode_uses_the_batch_endpoints() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/batch/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "id": "job-1"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/batch/scrape/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "data": [
                page_data("https://example.com/a", "# A"),
                page_data("https://example.com/b", "# B"),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The per-URL endpoint must stay silent in batch mode
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let mut plan = create_test_plan(
        &["https://example.com/a", "https://example.com/b"],
        &out_dir,
        &config,
    );
    plan.batch = true;

    let summary = run_scrape(plan, &config).await.unwrap();

    assert_eq!(summary.ok, 2);
    assert_eq!(summary.failed(), 0);

    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["url"], "https://example.com/a");
    assert_eq!(lines[1]["url"], "https://example.com/b");
    assert_eq!(markdown_files(&out_dir).len(), 2);
}

#[tokio::test]
async fn test_batch_shortfalls_finish_on_the_second_pass() {
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/batch/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "id": "job-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    // The job reports a success for /a, a server error for /b, and
    // nothing at all for /c
    Mock::given(method("GET"))
        .and(path("/v1/batch/scrape/job-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "data": [
                page_data("https://example.com/a", "# A"),
                {
                    "markdown": null,
                    "metadata": {
                        "sourceURL": "https://example.com/b",
                        "statusCode": 500
                    }
                },
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Both shortfalls come back through the per-URL endpoint
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(page_body("https://example.com/b", "# Redo")),
        )
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let config = create_test_config(&server.uri(), dir.path());
    let mut plan = create_test_plan(
        &[
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c",
        ],
        &out_dir,
        &config,
    );
    plan.batch = true;

    let summary = run_scrape(plan, &config).await.unwrap();

    assert_eq!(summary.ok, 3);
    assert_eq!(summary.exhausted, 0);

    let lines = manifest_lines(&out_dir);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["url"], "https://example.com/a");
    assert_eq!(lines[1]["url"], "https://example.com/b");
    assert_eq!(lines[2]["url"], "https://example.com/c");
    for line in &lines {
        assert_eq!(line["status"], "ok");
    }
}

//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve the generated work items and run the
//! full fetch/extract cycle over real HTTP.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::config::{load_config, Category, CategoryType, Config, DataField, FieldSelector};
use sumi_harvest::harvest::{
    AttemptError, ContentFetcher, FetchError, FetchPolicy, Harvester, HttpTransport, RateLimiter,
};
use sumi_harvest::output::MemorySink;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration harvesting `link_count` items from `base_url`
fn create_test_config(base_url: &str, link_count: usize) -> Config {
    Config {
        link_count,
        fetch_worker_count: 5,
        process_worker_count: 3,
        max_retries: 3,
        rate_limit_per_second: 100.0,
        burst_limit: 10,
        base_url: base_url.to_string(),
        categories: vec![
            Category {
                id: "entityDetails".to_string(),
                name: "entity".to_string(),
                path: "/entity-{slug}-{uuid}.json".to_string(),
                kind: CategoryType::Json,
                data_fields: vec![DataField {
                    field_name: "title".to_string(),
                    selector: FieldSelector::JsonPath("title".to_string()),
                }],
            },
            Category {
                id: "productPage".to_string(),
                name: "product".to_string(),
                path: "/product-{slug}.html".to_string(),
                kind: CategoryType::Html,
                data_fields: vec![DataField {
                    field_name: "dataId".to_string(),
                    selector: FieldSelector::Css {
                        selector: "div[data-id]".to_string(),
                        attribute: Some("data-id".to_string()),
                    },
                }],
            },
        ],
    }
}

/// Standard timings with a short backoff so retries do not slow the suite
fn fast_policy(max_retries: u32) -> FetchPolicy {
    FetchPolicy {
        backoff_base: Duration::from_millis(10),
        ..FetchPolicy::new(max_retries)
    }
}

fn fetcher(policy: FetchPolicy) -> ContentFetcher<HttpTransport> {
    let limiter = Arc::new(RateLimiter::new(100.0, 10).expect("Failed to build limiter"));
    ContentFetcher::new(
        HttpTransport::new().expect("Failed to build client"),
        limiter,
        policy,
    )
    .expect("Failed to build fetcher")
}

/// Mounts product pages and entity documents for ten work items, except
/// entity 9 which is forbidden on every attempt
async fn mount_site(mock_server: &MockServer) {
    for i in (0..10).step_by(2) {
        Mock::given(method("GET"))
            .and(path(format!("/product-{}.html", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(
                        r#"<div data-id="product-{}-id">Product {} Content</div>"#,
                        i, i
                    ))
                    .insert_header("content-type", "text/html"),
            )
            .mount(mock_server)
            .await;
    }

    for i in [1, 3, 5, 7] {
        Mock::given(method("GET"))
            .and(path(format!("/entity-{}-{}.json", i, i + 10)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"{{"title": "Entity {} Title"}}"#, i))
                    .insert_header("content-type", "application/json"),
            )
            .mount(mock_server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/entity-9-19.json"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(mock_server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_harvest_records_single_failure() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    mount_site(&mock_server).await;

    let sink = Arc::new(MemorySink::new());
    let harvester = Harvester::with_transport(
        create_test_config(&base_url, 10),
        HttpTransport::new().expect("Failed to build client"),
        fast_policy(3),
    )
    .expect("Failed to create harvester")
    .with_sink(sink.clone());

    let report = harvester.run().await.expect("Harvest failed");

    let failed_url = format!("{}/entity-9-19.json", base_url);
    assert_eq!(report.failed_urls, vec![failed_url.clone()]);
    assert_eq!(report.delivered, 9);
    assert!(report.is_consistent());

    let values: HashMap<String, String> = sink
        .records()
        .into_iter()
        .map(|record| (record.url, record.value))
        .collect();
    assert_eq!(values.len(), 9);
    assert!(!values.contains_key(&failed_url));
    assert_eq!(
        values[&format!("{}/product-4.html", base_url)],
        "product-4-id"
    );
    assert_eq!(
        values[&format!("{}/entity-7-17.json", base_url)],
        "Entity 7 Title"
    );
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mock_server = MockServer::start().await;

    // First two attempts fail, the third succeeds
    Mock::given(method("GET"))
        .and(path("/product-0.html"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/product-0.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>finally</p>"))
        .mount(&mock_server)
        .await;

    let fetcher = fetcher(fast_policy(3));
    let body = fetcher
        .fetch(&format!("{}/product-0.html", mock_server.uri()))
        .await
        .expect("Fetch should succeed on the third attempt");

    assert_eq!(body, b"<p>finally</p>".to_vec());
    let requests = mock_server
        .received_requests()
        .await
        .expect("Request recording is enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_unknown_path_fails_with_status() {
    let mock_server = MockServer::start().await;
    let url = format!("{}/missing.html", mock_server.uri());

    let err = fetcher(fast_policy(2))
        .fetch(&url)
        .await
        .expect_err("Unmatched path should fail");

    assert_eq!(
        err,
        FetchError::RetriesExhausted {
            url,
            attempts: 2,
            last: AttemptError::Status(404),
        }
    );
}

#[tokio::test]
async fn test_slow_response_hits_attempt_timeout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let policy = FetchPolicy {
        attempt_timeout: Duration::from_millis(100),
        ..fast_policy(2)
    };
    let err = fetcher(policy)
        .fetch(&format!("{}/slow.json", mock_server.uri()))
        .await
        .expect_err("Slow response should time out");

    assert!(matches!(
        err,
        FetchError::RetriesExhausted {
            attempts: 2,
            last: AttemptError::Timeout(_),
            ..
        }
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_harvest_from_config_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"title": "ok"}"#))
        .mount(&mock_server)
        .await;

    let config_content = format!(
        r#"{{
            "numLinks": 4,
            "numFetchWorkers": 2,
            "numProcessWorkers": 2,
            "maxRetries": 1,
            "rateLimit": 50.0,
            "burstLimit": 4,
            "baseUrl": "{}",
            "categories": [
                {{
                    "id": "entityDetails",
                    "name": "entity",
                    "path": "/entity-{{slug}}-{{uuid}}.json",
                    "type": "json",
                    "dataFields": [{{ "fieldName": "title", "jsonPath": "title" }}]
                }}
            ]
        }}"#,
        mock_server.uri()
    );
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp file");
    file.write_all(config_content.as_bytes())
        .expect("Failed to write config");
    file.flush().expect("Failed to flush config");

    let config = load_config(file.path()).expect("Failed to load config");
    let sink = Arc::new(MemorySink::new());
    let harvester = Harvester::new(config)
        .expect("Failed to create harvester")
        .with_sink(sink.clone());

    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.delivered, 4);
    assert!(report.failed_urls.is_empty());
    // Only the two entity documents match the json category
    assert_eq!(report.fields_extracted, 2);
    assert!(sink.records().iter().all(|record| record.value == "ok"));
}

//! End-to-end sweeps against a mock OpenShift API.

use std::time::Duration;

use build_canceller::{run_sweep, CancellerError, ErrorKind, SweepConfig};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LIST_PATH: &str = "/oapi/v1/namespaces/demo/builds";

fn build(name: &str, phase: &str) -> Value {
    json!({
        "kind": "Build",
        "apiVersion": "v1",
        "metadata": {"name": name, "namespace": "demo", "resourceVersion": "1001"},
        "spec": {"strategy": {"type": "Source"}},
        "status": {"phase": phase, "config": {"name": "frontend"}},
    })
}

fn cancelled(mut document: Value) -> Value {
    document["status"]["cancelled"] = json!(true);
    document
}

async fn mount_build(server: &MockServer, document: &Value, expected_puts: u64) {
    let name = document["metadata"]["name"].as_str().unwrap();
    let build_path = format!("{LIST_PATH}/{name}");

    Mock::given(method("GET"))
        .and(path(build_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .expect(expected_puts)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path(build_path))
        .and(body_json(cancelled(document.clone())))
        .respond_with(ResponseTemplate::new(200).set_body_json(cancelled(document.clone())))
        .expect(expected_puts)
        .mount(server)
        .await;
}

fn config(server: &MockServer) -> SweepConfig {
    SweepConfig::new(server.uri(), "demo").with_token("test-token")
}

#[tokio::test]
async fn test_sweep_cancels_running_and_new_builds() {
    let server = MockServer::start().await;
    let (b1, b2, b3) = (
        build("b1", "Running"),
        build("b2", "Complete"),
        build("b3", "New"),
    );

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "BuildList",
            "items": [b1, b2, b3],
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_build(&server, &b1, 1).await;
    mount_build(&server, &b2, 0).await;
    mount_build(&server, &b3, 1).await;

    let outcome = run_sweep(&config(&server)).await;
    assert!(outcome.success, "{:?}", outcome.failure);
    assert_eq!(outcome.cancelled, ["b1", "b3"]);

    let requests = server.received_requests().await.unwrap();
    let calls: Vec<String> = requests
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect();
    assert_eq!(
        calls,
        [
            format!("GET {LIST_PATH}"),
            format!("GET {LIST_PATH}/b1"),
            format!("PUT {LIST_PATH}/b1"),
            format!("GET {LIST_PATH}/b3"),
            format!("PUT {LIST_PATH}/b3"),
        ]
    );
    for request in &requests {
        assert_eq!(
            request.headers.get("authorization").unwrap(),
            "Bearer test-token"
        );
    }
}

#[tokio::test]
async fn test_write_back_preserves_document_bytes() {
    let server = MockServer::start().await;
    let raw = r#"{"status":{"phase":"Running","startTimestamp":"2024-01-01T00:00:00Z"},"metadata":{"name":"b1","annotations":{"z":"1","a":"2"}},"spec":{"revision":null}}"#;

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"{{"items":[{raw}]}}"#)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{LIST_PATH}/b1")))
        .respond_with(ResponseTemplate::new(200).set_body_string(raw))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{LIST_PATH}/b1")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = run_sweep(&config(&server)).await;
    assert!(outcome.success, "{:?}", outcome.failure);

    let requests = server.received_requests().await.unwrap();
    let put = requests.iter().find(|r| r.method.as_str() == "PUT").unwrap();
    assert_eq!(
        String::from_utf8(put.body.clone()).unwrap(),
        r#"{"status":{"phase":"Running","startTimestamp":"2024-01-01T00:00:00Z","cancelled":true},"metadata":{"name":"b1","annotations":{"z":"1","a":"2"}},"spec":{"revision":null}}"#
    );
}

#[tokio::test]
async fn test_empty_namespace_succeeds_without_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = run_sweep(&config(&server)).await;
    assert!(outcome.success);
    assert!(outcome.cancelled.is_empty());
}

#[tokio::test]
async fn test_listing_timeout_fails_without_writes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"items": [build("b1", "Running")]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.timeout = Duration::from_millis(500);
    let outcome = run_sweep(&config).await;

    assert!(!outcome.success);
    let failure = outcome.failure.unwrap();
    assert_eq!(failure.kind(), ErrorKind::Transport);
    assert!(matches!(failure, CancellerError::Timeout { .. }));
}

#[tokio::test]
async fn test_rejected_listing_is_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let outcome = run_sweep(&config(&server)).await;
    assert!(!outcome.success);
    match outcome.failure.unwrap() {
        CancellerError::Api { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "forbidden");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_write_back_stops_sweep() {
    let server = MockServer::start().await;
    let (b1, b2, b3) = (
        build("b1", "Running"),
        build("b2", "Running"),
        build("b3", "Running"),
    );
    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [b1, b2, b3]})))
        .mount(&server)
        .await;
    mount_build(&server, &b1, 1).await;

    Mock::given(method("GET"))
        .and(path(format!("{LIST_PATH}/b2")))
        .respond_with(ResponseTemplate::new(200).set_body_json(&b2))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("{LIST_PATH}/b2")))
        .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
        .expect(1)
        .mount(&server)
        .await;

    mount_build(&server, &b3, 0).await;

    let outcome = run_sweep(&config(&server)).await;
    assert!(!outcome.success);
    assert_eq!(outcome.cancelled, ["b1"]);
    assert_eq!(outcome.failure.unwrap().kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_falls_back_to_service_account_token() {
    let server = MockServer::start().await;
    let token_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(token_file.path(), "sa-token\n").unwrap();

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(header("Authorization", "Bearer sa-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = SweepConfig::new(server.uri(), "demo").verbose();
    config.token_path = token_file.path().to_path_buf();
    let outcome = run_sweep(&config).await;

    assert!(outcome.success, "{:?}", outcome.failure);
    assert!(outcome
        .trace
        .iter()
        .any(|line| line.contains("service account token")));
}

#[tokio::test]
async fn test_explicit_token_beats_service_account_token() {
    let server = MockServer::start().await;
    let token_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(token_file.path(), "sa-token").unwrap();

    Mock::given(method("GET"))
        .and(path(LIST_PATH))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.token_path = token_file.path().to_path_buf();
    assert!(run_sweep(&config).await.success);
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = SweepConfig::new(format!("http://127.0.0.1:{port}"), "demo").with_token("t");
    let outcome = run_sweep(&config).await;
    assert!(!outcome.success);
    assert_eq!(outcome.failure.unwrap().kind(), ErrorKind::Transport);
}

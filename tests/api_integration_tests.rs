//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint, plus a live socket
//! test of the event stream.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use ez_cache::{
    api::create_router, cache::CacheStore, events::EventStream, spawn_event_producer, AppState,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

const BOUNDARY: &str = "ez-cache-test-boundary";

fn create_test_state(max_entries: usize) -> AppState {
    AppState::new(
        CacheStore::new(max_entries, Duration::from_secs(600)),
        EventStream::new(),
    )
}

fn create_test_app() -> Router {
    create_router(create_test_state(100))
}

/// Builds a multipart/form-data body by hand.
#[derive(Default)]
struct Form {
    body: Vec<u8>,
}

impl Form {
    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, file_name: &str, content: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"content\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(content);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("PUT")
            .uri("/cache")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

fn upload(key: &str, content: &[u8]) -> Request<Body> {
    Form::default()
        .text("fileName", key)
        .file("upload.bin", content)
        .into_request()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX).await.unwrap().to_vec()
}

async fn body_to_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).unwrap()
}

// == Upload / Fetch ==

#[tokio::test]
async fn test_put_then_get_roundtrip() {
    let app = create_test_app();

    let put_response = app
        .clone()
        .oneshot(upload("hello.txt", b"hello world"))
        .await
        .unwrap();
    assert_eq!(put_response.status(), StatusCode::OK);

    let json = body_to_json(put_response.into_body()).await;
    assert_eq!(json["action"], "put");
    assert_eq!(json["size"], 11);
    assert!(json["ts"].as_i64().unwrap() > 0);

    let get_response = app.oneshot(get("/cache?fileName=hello.txt")).await.unwrap();
    assert_eq!(get_response.status(), StatusCode::OK);
    assert_eq!(get_response.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_bytes(get_response.into_body()).await, b"hello world");
}

#[tokio::test]
async fn test_binary_content_is_preserved() {
    let app = create_test_app();
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    let response = app
        .clone()
        .oneshot(upload("blob.png", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/cache?fileName=blob.png")).await.unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(body_bytes(response.into_body()).await, payload);
}

#[tokio::test]
async fn test_overwrite_last_value_wins() {
    let app = create_test_app();

    for content in [&b"first"[..], &b"second"[..]] {
        let response = app.clone().oneshot(upload("k", content)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.oneshot(get("/cache?fileName=k")).await.unwrap();
    assert_eq!(body_bytes(response.into_body()).await, b"second");
}

#[tokio::test]
async fn test_get_not_found() {
    let app = create_test_app();

    let response = app.oneshot(get("/cache?fileName=missing.txt")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("missing.txt"));
}

#[tokio::test]
async fn test_get_missing_parameter() {
    let app = create_test_app();

    let response = app.oneshot(get("/cache")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Upload Validation ==

#[tokio::test]
async fn test_upload_at_ceiling_succeeds() {
    let app = create_test_app();

    let response = app
        .oneshot(upload("exact.bin", &vec![1u8; 10_000]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["size"], 10_000);
}

#[tokio::test]
async fn test_upload_one_byte_over_ceiling_fails() {
    let app = create_test_app();

    let response = app
        .clone()
        .oneshot(upload("over.bin", &vec![1u8; 10_001]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = app.oneshot(get("/ts?fileName=over.bin")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["over.bin"], -1);
}

#[tokio::test]
async fn test_upload_far_over_body_limit_fails() {
    let app = create_test_app();

    let response = app
        .oneshot(upload("huge.bin", &vec![1u8; 200_000]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upload_missing_file_name() {
    let app = create_test_app();

    let request = Form::default().file("a.txt", b"data").into_request();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_missing_content() {
    let app = create_test_app();

    let request = Form::default().text("fileName", "a.txt").into_request();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_unknown_field() {
    let app = create_test_app();

    let request = Form::default()
        .text("fileName", "a.txt")
        .text("colour", "blue")
        .file("a.txt", b"data")
        .into_request();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("colour"));
}

#[tokio::test]
async fn test_upload_without_multipart_body() {
    let app = create_test_app();

    let request = Request::builder()
        .method("PUT")
        .uri("/cache")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("not a form"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_get_repeated_parameter_is_json_error() {
    let app = create_test_app();

    let response = app
        .oneshot(get("/cache?fileName=a.txt&fileName=b.txt"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].is_string());
}

// == Timestamps ==

#[tokio::test]
async fn test_timestamps_batch() {
    let app = create_test_app();

    let put_response = app.clone().oneshot(upload("a.txt", b"a")).await.unwrap();
    let written = body_to_json(put_response.into_body()).await["ts"]
        .as_i64()
        .unwrap();

    let response = app
        .oneshot(get("/ts?fileName=a.txt&fileName=b.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["a.txt"], written);
    assert_eq!(json["b.txt"], -1);
}

#[tokio::test]
async fn test_timestamps_answers_empty_key() {
    let app = create_test_app();

    let response = app.oneshot(get("/ts?fileName=")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json, serde_json::json!({ "": -1 }));
}

#[tokio::test]
async fn test_timestamps_requires_a_key() {
    let app = create_test_app();

    let response = app.oneshot(get("/ts")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Eviction ==

#[tokio::test]
async fn test_lru_eviction_over_http() {
    let app = create_router(create_test_state(2));

    for key in ["a", "b"] {
        app.clone().oneshot(upload(key, key.as_bytes())).await.unwrap();
    }
    let response = app.clone().oneshot(get("/cache?fileName=a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    app.clone().oneshot(upload("c", b"c")).await.unwrap();

    for (key, expected) in [
        ("a", StatusCode::OK),
        ("c", StatusCode::OK),
        ("b", StatusCode::NOT_FOUND),
    ] {
        let response = app
            .clone()
            .oneshot(get(&format!("/cache?fileName={key}")))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "key {key}");
    }

    let response = app.oneshot(get("/stats")).await.unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["evictions"], 1);
    assert_eq!(json["total_entries"], 2);
}

// == Misc ==

#[tokio::test]
async fn test_index_page() {
    let app = create_test_app();

    let response = app.oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let page = String::from_utf8(body_bytes(response.into_body()).await).unwrap();
    assert!(page.contains("EZ Cache"));
}

#[tokio::test]
async fn test_cors_headers_present() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

// == Live Event Stream ==

async fn wait_for_subscribers(events: &EventStream, expected: usize) {
    for _ in 0..100 {
        if events.subscriber_count() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "expected {} subscribers, found {}",
        expected,
        events.subscriber_count()
    );
}

#[tokio::test]
async fn test_sse_over_socket() {
    let state = create_test_state(100);
    let events = state.events.clone();
    let producer = spawn_event_producer(events.clone(), Duration::from_millis(20));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let client = reqwest::Client::new();
    let mut response = client
        .get(format!("http://{addr}/sse"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response.headers()[reqwest::header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(response.headers()[reqwest::header::CACHE_CONTROL], "no-cache");
    assert_eq!(response.headers()["x-accel-buffering"], "no");

    let mut received = String::new();
    while !received.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(2), response.chunk())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(std::str::from_utf8(&chunk).unwrap());
    }

    let frame = received.split("\n\n").next().unwrap();
    let lines: Vec<&str> = frame.lines().collect();
    assert_eq!(lines.len(), 3, "unexpected frame: {frame:?}");
    assert!(lines[0].starts_with("id: id_"));
    assert_eq!(lines[1], "event: update");
    assert!(lines[2].starts_with("data: demo data "));

    drop(response);
    wait_for_subscribers(&events, 0).await;

    producer.abort();
    server.abort();
}

#[tokio::test]
async fn test_timestamps_over_socket() {
    let state = create_test_state(100);
    state.cache.put("x.json", &b"{}"[..]).unwrap();
    let expected = state.cache.timestamp("x.json");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let map: BTreeMap<String, i64> = reqwest::get(format!(
        "http://{addr}/ts?fileName=x.json&fileName=y.json"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();

    assert_eq!(map["x.json"], expected);
    assert_eq!(map["y.json"], -1);

    server.abort();
}

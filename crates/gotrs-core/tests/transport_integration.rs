//! End-to-end tests for the HTTP client against a mock GOTRS server

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gotrs_core::{
    ApiKeyAuth, ClientConfig, Error, FileUpload, HttpClient, JwtAuth, NoAuth, OAuth2Auth,
    RequestOptions, TokenRefresh,
};
use serde::Deserialize;
use serde_json::{json, Value};
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Ticket {
    id: u64,
    title: String,
}

fn test_config(server: &MockServer) -> ClientConfig {
    ClientConfig::new(server.uri()).with_retry_base_delay(Duration::from_millis(10))
}

fn api_key_client(server: &MockServer) -> HttpClient {
    HttpClient::new(test_config(server), Arc::new(ApiKeyAuth::new("secret"))).unwrap()
}

#[tokio::test]
async fn test_get_unwraps_envelope_and_sends_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets/1"))
        .and(header("X-API-Key", "secret"))
        .and(header("Accept", "application/json"))
        .and(header("Content-Type", "application/json"))
        .and(header_regex("User-Agent", "^gotrs-rust-sdk/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 1, "title": "Printer on fire"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let ticket: Ticket = client.get("/api/v1/tickets/1").await.unwrap();
    assert_eq!(ticket.title, "Printer on fire");
}

#[tokio::test]
async fn test_list_hydrates_each_element() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tickets"))
        .and(query_param("status", "open"))
        .and(query_param("tags", "network,urgent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let options = RequestOptions::new()
        .param("status", "open")
        .param("tags", vec!["network", "urgent"])
        .param("assignee", Value::Null);
    let tickets: Vec<Ticket> = client.get_with("api/v1/tickets", options).await.unwrap();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[1].id, 2);
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tickets"))
        .and(body_json(json!({"title": "New", "queue_id": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": 9, "title": "New"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let ticket: Ticket = client
        .post("/api/v1/tickets", &json!({"title": "New", "queue_id": 3}))
        .await
        .unwrap();
    assert_eq!(ticket.id, 9);
}

#[tokio::test]
async fn test_put_patch_delete_verbs() {
    let server = MockServer::start().await;
    for verb in ["PUT", "PATCH", "DELETE"] {
        Mock::given(method(verb))
            .and(path("/api/v1/tickets/4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = api_key_client(&server);
    let _: Value = client.put("/api/v1/tickets/4", &json!({"title": "x"})).await.unwrap();
    let _: Value = client.patch("/api/v1/tickets/4", &json!({"title": "y"})).await.unwrap();
    let deleted: Value = client.delete("/api/v1/tickets/4").await.unwrap();
    assert_eq!(deleted, json!({"success": true}));
}

#[tokio::test]
async fn test_failed_envelope_on_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Queue is locked"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let err = client.get::<Value>("/api/v1/queues/1").await.unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(err.message(), "Queue is locked");
    assert_eq!(err.status_code(), Some(200));
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let value: u32 = client.get("/api/v1/stats").await.unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn test_retries_exhausted_returns_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({
            "message": "Maintenance",
            "code": "MAINTENANCE"
        })))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(&server).with_max_retries(2);
    let client = HttpClient::new(config, Arc::new(NoAuth)).unwrap();
    let err = client.get::<Value>("/api/v1/stats").await.unwrap_err();
    assert!(matches!(err, Error::Server(_)));
    assert_eq!(err.status_code(), Some(503));
    assert_eq!(err.code(), Some("MAINTENANCE"));
    assert_eq!(err.message(), "Maintenance");
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "title is required",
            "details": "field: title"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let err = client
        .post::<Value, _>("/api/v1/tickets", &json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api(_)));
    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.message(), "title is required");
    assert_eq!(err.details(), Some("field: title"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_status_classification() {
    let server = MockServer::start().await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such thing"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/unauthorized"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "bad key"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);

    let err = client.get::<Value>("/missing").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.message(), "no such thing");
    assert_eq!(err.code(), Some("NOT_FOUND"));

    let err = client.get::<Value>("/unauthorized").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)));
    assert!(err.is_authentication_error());
    assert_eq!(err.message(), "bad key");

    let err = client.get::<Value>("/forbidden").await.unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert_eq!(err.message(), "Unknown error");
}

#[tokio::test]
async fn test_rate_limit_retry_after() {
    let server = MockServer::start().await;
    Mock::given(path("/numeric"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "30")
                .set_body_json(json!({"error": "slow down"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/garbage"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "abc"))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server).with_max_retries(0);
    let client = HttpClient::new(config, Arc::new(NoAuth)).unwrap();

    let err = client.get::<Value>("/numeric").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(30));
    assert_eq!(err.status_code(), Some(429));

    let err = client.get::<Value>("/garbage").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after: None, .. }));
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let value: Value = client.get("/api/v1/tickets").await.unwrap();
    assert_eq!(value, json!({"ok": true}));
}

#[tokio::test]
async fn test_auth_headers_win_over_caller_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("X-API-Key", "secret"))
        .and(header("X-Request-Id", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let options = RequestOptions::new()
        .header("X-API-Key", "caller")
        .header("X-Request-Id", "abc");
    let _: Value = client.get_with("/api/v1/me", options).await.unwrap();
}

#[tokio::test]
async fn test_expired_jwt_is_refreshed_before_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "ok"})))
        .expect(2)
        .mount(&server)
        .await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let auth = JwtAuth::new("old-token")
        .with_refresh_token("r1")
        .with_expires_at(Utc::now() - chrono::Duration::hours(1))
        .with_refresher(move |refresh_token: String| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                assert_eq!(refresh_token, "r1");
                Ok::<_, Error>(
                    TokenRefresh::new("new-token")
                        .with_expires_at(Utc::now() + chrono::Duration::hours(1)),
                )
            }
        });

    let client = HttpClient::new(test_config(&server), Arc::new(auth)).unwrap();
    let first: String = client.get("/api/v1/me").await.unwrap();
    let second: String = client.get("/api/v1/me").await.unwrap();
    assert_eq!(first, "ok");
    assert_eq!(second, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_failure_aborts_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // Expired but no refresh token configured.
    let auth = OAuth2Auth::new("stale").with_expires_at(Utc::now() - chrono::Duration::minutes(5));
    let client = HttpClient::new(test_config(&server), Arc::new(auth)).unwrap();

    let err = client.get::<Value>("/api/v1/me").await.unwrap_err();
    assert!(matches!(err, Error::Authentication(_)));
}

#[tokio::test]
async fn test_upload_file_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tickets/7/attachments"))
        .and(header("X-API-Key", "secret"))
        .and(header_regex("Content-Type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"file\"; filename=\"notes.txt\""))
        .and(body_string_contains("Content-Type: text/plain"))
        .and(body_string_contains("hello attachment"))
        .and(body_string_contains("name=\"description\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "data": {"id": 11, "title": "notes.txt"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let upload = FileUpload::new(b"hello attachment".to_vec(), "notes.txt")
        .with_content_type("text/plain")
        .fields(HashMap::from([("description".to_string(), "Router logs".to_string())]));
    let attachment: Ticket = client
        .upload_file("/api/v1/tickets/7/attachments", upload)
        .await
        .unwrap();
    assert_eq!(attachment.id, 11);
}

#[tokio::test]
async fn test_upload_is_retried_with_fresh_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("payload-bytes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let _: Value = client
        .upload_file("/upload", FileUpload::new(b"payload-bytes".to_vec(), "a.bin"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_download_returns_raw_bytes() {
    let server = MockServer::start().await;
    let raw = br#"{"success": false, "error": "not unwrapped"}"#.to_vec();
    Mock::given(method("GET"))
        .and(path("/api/v1/attachments/3/download"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(raw.clone()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/api/v1/attachments/4/download"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "gone"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let bytes = client
        .download_file("/api/v1/attachments/3/download")
        .await
        .unwrap();
    assert_eq!(bytes, raw);

    let err = client
        .download_file("/api/v1/attachments/4/download")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(err.message(), "gone");
}

#[tokio::test]
async fn test_non_json_success_body_is_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let value: Value = client.get("/plain").await.unwrap();
    assert_eq!(value, Value::String("pong".to_string()));
}

#[tokio::test]
async fn test_shape_mismatch_is_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": "not-a-number"}
        })))
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    let err = client.get::<Ticket>("/api/v1/tickets/1").await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_ping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = api_key_client(&server);
    client.ping().await.unwrap();
}

#[tokio::test]
async fn test_ping_failure_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/health"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "db down"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server).with_max_retries(0);
    let client = HttpClient::new(config, Arc::new(NoAuth)).unwrap();
    let err = client.ping().await.unwrap_err();
    assert!(matches!(err, Error::Server(_)));
    assert_eq!(err.message(), "Health check failed");
    assert_eq!(err.details(), Some("db down"));
}

#[tokio::test]
async fn test_timeout_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = test_config(&server)
        .with_timeout(Duration::from_millis(100))
        .with_max_retries(0);
    let client = HttpClient::new(config, Arc::new(NoAuth)).unwrap();
    let err = client.get::<Value>("/slow").await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_connection_failure_is_network_error() {
    let config = ClientConfig::new("http://127.0.0.1:1")
        .with_max_retries(1)
        .with_retry_base_delay(Duration::from_millis(1));
    let client = HttpClient::new(config, Arc::new(NoAuth)).unwrap();

    let err = client.get::<Value>("/api/v1/health").await.unwrap_err();
    match err {
        Error::Network { operation, url, .. } => {
            assert_eq!(operation, "GET");
            assert_eq!(url, "http://127.0.0.1:1/api/v1/health");
        }
        other => panic!("expected network error, got {:?}", other),
    }
}

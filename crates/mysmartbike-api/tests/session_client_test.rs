#![allow(clippy::unwrap_used)]
// Integration tests for `SessionClient` using wiremock.

use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mysmartbike_api::{ApiConfig, Credentials, Error, SessionClient};

// ── Helpers ─────────────────────────────────────────────────────────

fn config_for(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_uri: Url::parse(&server.uri()).unwrap(),
        timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    }
}

async fn setup() -> (MockServer, SessionClient) {
    let server = MockServer::start().await;
    let client = SessionClient::with_client(
        reqwest::Client::new(),
        config_for(&server),
        Credentials::new("rider@example.com", "s3cret"),
    )
    .unwrap();
    (server, client)
}

fn bike(serial: &str, date: &str) -> serde_json::Value {
    json!({
        "serial": serial,
        "odometry": 120,
        "object_model": { "brand": { "alias": "Acme" }, "model_name": "X1" },
        "longitude": 7.1,
        "latitude": 50.2,
        "last_position_date": date,
        "object_tree": [{ "state_of_charge": 80 }, { "remaining_capacity": 410 }]
    })
}

async fn mount_login(server: &MockServer, token: &str) {
    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "data": { "token": token } })),
        )
        .mount(server)
        .await;
}

// ── Login ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_success_stores_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .and(body_string(
            "password=s3cret&contents_id=&email=rider%40example.com",
        ))
        .and(header(
            "content-type",
            "application/x-www-form-urlencoded; charset=utf-8",
        ))
        .and(header("accept", "application/json"))
        .and(header("accept-language", "de-DE"))
        .and(header("x-app", "mysmartbike"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "data": { "token": "tok-123" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    assert!(!client.is_initialized());
    assert!(client.login().await.unwrap());
    assert_eq!(client.token().unwrap().expose_secret(), "tok-123");
    assert!(client.is_initialized());
}

#[tokio::test]
async fn test_login_overwrites_previous_token() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "data": { "token": "first" } })),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_login(&server, "second").await;

    client.login().await.unwrap();
    client.login().await.unwrap();

    assert_eq!(client.token().unwrap().expose_secret(), "second");
}

#[tokio::test]
async fn test_login_rejected_status_raises_with_response() {
    let (server, client) = setup().await;

    let body = json!({ "status": 401, "message": "invalid credentials" });
    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let result = client.login().await;

    match result {
        Err(Error::Authentication { response, .. }) => assert_eq!(response, Some(body)),
        other => panic!("expected Authentication error, got: {other:?}"),
    }
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_login_success_status_without_token_is_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": 200, "data": {} })),
        )
        .mount(&server)
        .await;

    let result = client.login().await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_login_without_status_returns_false() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
        .mount(&server)
        .await;

    assert!(!client.login().await.unwrap());
    assert!(!client.has_token());
}

#[tokio::test]
async fn test_login_empty_body_returns_false() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    assert!(!client.login().await.unwrap());
}

#[tokio::test]
async fn test_login_http_error_is_authentication() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let err = client.login().await.unwrap_err();

    assert!(err.is_auth_error(), "got: {err:?}");
    assert_eq!(err.http_status(), Some(403));
}

#[tokio::test]
async fn test_login_accepts_mislabelled_json() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"status":200,"data":{"token":"tok-html"}}"#,
            "text/html; charset=utf-8",
        ))
        .mount(&server)
        .await;

    assert!(client.login().await.unwrap());
    assert_eq!(client.token().unwrap().expose_secret(), "tok-html");
}

#[tokio::test]
async fn test_login_connection_refused_is_transport() {
    // Nothing listens on port 1.
    let config = ApiConfig {
        base_uri: Url::parse("http://127.0.0.1:1").unwrap(),
        timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    };

    let client = SessionClient::with_client(
        reqwest::Client::new(),
        config,
        Credentials::new("rider@example.com", "s3cret"),
    )
    .unwrap();

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_login_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "data": { "token": "late" } }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let config = ApiConfig {
        timeout: Duration::from_millis(200),
        ..config_for(&server)
    };
    let client =
        SessionClient::new(config, Credentials::new("rider@example.com", "s3cret")).unwrap();

    let err = client.login().await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got: {err:?}");
    assert!(err.is_transient());
}

// ── Bike list ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_device_list_maps_bikes() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-123").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .and(query_param("limit", "5"))
        .and(header("authorization", "Bearer tok-123"))
        .and(header("content-type", "application/json"))
        .and(header("x-platform", "android"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": [bike("BK1", "2024-01-01 10:00:00"), bike("BK2", "2024-02-03 04:05:06")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.login().await.unwrap();
    let devices = client.get_device_list().await.unwrap();

    assert_eq!(devices.len(), 2);
    let bk1 = &devices["BK1"];
    assert_eq!(bk1.brand, "Acme");
    assert_eq!(bk1.model, "X1");
    assert_eq!(bk1.state_of_charge, Some(80));
    assert_eq!(bk1.remaining_capacity, Some(410));
    assert_eq!(
        devices["BK2"].last_position_timestamp.to_string(),
        "2024-02-03 04:05:06"
    );
}

#[tokio::test]
async fn test_get_device_list_uses_configured_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .and(query_param("limit", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": 200, "data": [] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ApiConfig {
        device_limit: 2,
        ..config_for(&server)
    };
    let client = SessionClient::with_client(
        reqwest::Client::new(),
        config,
        Credentials::new("rider@example.com", "s3cret"),
    )
    .unwrap();

    assert!(client.get_device_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_device_list_non_success_status_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 401, "message": "token expired" })),
        )
        .mount(&server)
        .await;

    assert!(client.get_device_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_device_list_http_error_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    assert!(client.get_device_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_device_list_undecodable_body_is_empty() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    assert!(client.get_device_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_device_list_transport_failure_is_empty() {
    // Nothing listens on port 1.
    let config = ApiConfig {
        base_uri: Url::parse("http://127.0.0.1:1").unwrap(),
        timeout: Duration::from_secs(5),
        ..ApiConfig::default()
    };

    let client = SessionClient::with_client(
        reqwest::Client::new(),
        config,
        Credentials::new("rider@example.com", "s3cret"),
    )
    .unwrap();

    assert!(client.get_device_list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_device_list_bad_date_fails_whole_call() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": [bike("BK1", "2024-01-01 10:00:00"), bike("BK2", "01/01/2024")]
        })))
        .mount(&server)
        .await;

    let err = client.get_device_list().await.unwrap_err();
    assert!(matches!(err, Error::InvalidTimestamp { .. }), "got: {err:?}");
}

#[tokio::test]
async fn test_get_device_list_cancelled() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/objects/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": 200, "data": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client.get_device_list_with(cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled), "got: {err:?}");
}

#[tokio::test]
async fn test_session_is_reopened_after_close() {
    let (server, client) = setup().await;
    mount_login(&server, "tok-123").await;

    client.close_session();
    assert!(client.executor().sessions().is_closed());

    assert!(client.login().await.unwrap());
    assert!(!client.executor().sessions().is_closed());
}

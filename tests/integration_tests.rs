//! Integration tests for the demo server.
//!
//! Each test starts a fake Keystone, serves the full router (auth layer,
//! CORS, tracing) on an ephemeral port and talks to it over real HTTP.
//!
//! Run with: `cargo test --test integration_tests`
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use keystone_auth::{AppState, Config, KeystoneClient, build_router};
use reqwest::Client;
use serde_json::{Value, json};

use common::{FakeKeystone, Reply, project_token_body};

/// A running demo server plus the fake identity service behind it.
struct TestFixture {
    base_url: String,
    client: Client,
    keystone: FakeKeystone,
    state: AppState,
}

impl TestFixture {
    async fn start(reply: Reply) -> Self {
        Self::start_with(reply, |_| {}).await
    }

    async fn start_with(reply: Reply, configure: impl FnOnce(&mut Config)) -> Self {
        let keystone = FakeKeystone::start(reply).await;

        let mut config = Config {
            keystone_url: keystone.endpoint.clone(),
            keystone_timeout: Duration::from_secs(2),
            ..Config::default()
        };
        configure(&mut config);
        config.validate().expect("Test config should be valid");

        let validator = KeystoneClient::new(config.keystone_options()).unwrap();
        let state = AppState::new(Arc::new(validator), config);
        let app = build_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            client: Client::new(),
            keystone,
            state,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn whoami(&self, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url("/whoami"));
        if let Some(token) = token {
            request = request.header("X-Auth-Token", token);
        }
        request.send().await.unwrap()
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    let resp = fixture.client.get(fixture.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache_enabled"], true);
    assert_eq!(body["cache_entries"], 0);
    assert!(body["timestamp"].is_string());

    // Health never consults the identity service
    assert_eq!(fixture.keystone.calls(), 0);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_whoami_without_token_is_unauthorized() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    let resp = fixture.whoami(None).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(fixture.keystone.calls(), 0);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_whoami_ignores_forged_confirmation() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    let resp = fixture
        .client
        .get(fixture.url("/whoami"))
        .header("X-Identity-Status", "Confirmed")
        .header("X-User-Id", "admin")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_whoami_with_valid_token() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    let resp = fixture.whoami(Some("valid-token")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["identity_status"], "Confirmed");
    assert_eq!(body["user_id"], "u42");
    assert_eq!(body["user_name"], "alice");
    assert_eq!(body["project_id"], "p7");
    assert_eq!(body["project_name"], "demo");
    assert_eq!(body["roles"], json!(["member", "reader"]));
    assert_eq!(body["expires_at"], "2030-01-01T00:00:00.000000Z");
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_whoami_with_rejected_token() {
    let body = json!({"error": {"code": 401, "message": "token expired", "title": "Unauthorized"}});
    let fixture = TestFixture::start(Reply::Json(StatusCode::UNAUTHORIZED, body)).await;

    let resp = fixture.whoami(Some("expired-token")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(fixture.keystone.calls(), 1);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_cached_identity_skips_identity_service() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    for _ in 0..3 {
        let resp = fixture.whoami(Some("valid-token")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(fixture.keystone.calls(), 1);
    assert_eq!(fixture.state.cache_entries().await, 1);

    let health: Value = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["cache_entries"], 1);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_cache_disabled_validates_every_request() {
    let fixture = TestFixture::start_with(
        Reply::Json(StatusCode::OK, project_token_body()),
        |config| config.token_cache_enabled = false,
    )
    .await;

    for _ in 0..3 {
        let resp = fixture.whoami(Some("valid-token")).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(fixture.keystone.calls(), 3);
    fixture.state.shutdown().await;
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let fixture = TestFixture::start(Reply::Json(StatusCode::OK, project_token_body())).await;

    let resp = fixture
        .client
        .get(fixture.url("/nonexistent"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    fixture.state.shutdown().await;
}

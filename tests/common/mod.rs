//! Shared fixtures: a fake Keystone, an echoing downstream and a log capture.
#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use keystone_auth::{IdentityRecord, TokenCache};
use serde_json::Value;
use tower::ServiceExt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

// ============================================================================
// Fake identity service
// ============================================================================

/// What the fake Keystone answers to every validation request.
#[derive(Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, &'static str),
    /// Sleep before answering 200 with the given body
    Slow(Duration, Value),
}

#[derive(Clone)]
struct FakeState {
    reply: Arc<Reply>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(Option<String>, HeaderMap)>>>,
}

/// A Keystone stand-in served on an ephemeral localhost port.
pub struct FakeKeystone {
    /// Base URL to configure the client with, ending in `/v3`
    pub endpoint: String,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<(Option<String>, HeaderMap)>>>,
}

impl FakeKeystone {
    pub async fn start(reply: Reply) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Keystone");
        let addr = listener.local_addr().unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            reply: Arc::new(reply),
            calls: calls.clone(),
            seen: seen.clone(),
        };

        let app = Router::new()
            .route("/v3/auth/tokens", get(validate_token))
            .with_state(state);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{addr}/v3"),
            calls,
            seen,
        }
    }

    /// Number of validation requests received so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Query string and headers of each validation request.
    pub fn requests(&self) -> Vec<(Option<String>, HeaderMap)> {
        self.seen.lock().unwrap().clone()
    }
}

async fn validate_token(
    State(state): State<FakeState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    state.calls.fetch_add(1, Ordering::SeqCst);
    state.seen.lock().unwrap().push((query, headers));

    match state.reply.as_ref() {
        Reply::Json(status, body) => (*status, axum::Json(body.clone())).into_response(),
        Reply::Raw(status, body) => (*status, *body).into_response(),
        Reply::Slow(delay, body) => {
            tokio::time::sleep(*delay).await;
            (StatusCode::OK, axum::Json(body.clone())).into_response()
        }
    }
}

/// An endpoint nothing listens on.
pub async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v3")
}

/// A user-only, unscoped token.
pub fn user_token_body() -> Value {
    serde_json::json!({
        "token": {
            "user": {"id": "u1", "domain_id": "d1", "domain": {"name": "Default"}}
        }
    })
}

/// A project-scoped token with roles, shaped like real Keystone v3 output.
pub fn project_token_body() -> Value {
    serde_json::json!({
        "token": {
            "expires_at": "2030-01-01T00:00:00.000000Z",
            "issued_at": "2029-12-31T23:00:00.000000Z",
            "methods": ["password"],
            "user": {
                "id": "u42",
                "name": "alice",
                "domain": {"id": "default", "name": "Default"}
            },
            "project": {
                "id": "p7",
                "name": "demo",
                "domain": {"id": "default", "name": "Default"}
            },
            "roles": [
                {"id": "r1", "name": "member"},
                {"id": "r2", "name": "reader"}
            ]
        }
    })
}

// ============================================================================
// Downstream service
// ============================================================================

/// Downstream router that counts its invocations and echoes request headers
/// back as a JSON object.
#[derive(Clone, Default)]
pub struct Downstream {
    pub calls: Arc<AtomicUsize>,
}

impl Downstream {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(echo_headers))
            .with_state(self.calls.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn echo_headers(
    State(calls): State<Arc<AtomicUsize>>,
    headers: HeaderMap,
) -> axum::Json<BTreeMap<String, String>> {
    calls.fetch_add(1, Ordering::SeqCst);
    axum::Json(
        headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
    )
}

/// Send `GET /` through `app` and return the headers the downstream saw.
pub async fn send(
    app: &Router,
    token: Option<&str>,
    extra: &[(&str, &str)],
) -> BTreeMap<String, String> {
    let mut builder = Request::builder().uri("/");
    if let Some(token) = token {
        builder = builder.header("X-Auth-Token", token);
    }
    for (name, value) in extra {
        builder = builder.header(*name, *value);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// ============================================================================
// Recording cache
// ============================================================================

/// Cache that remembers every write, backed by a plain map with no expiry.
#[derive(Default)]
pub struct RecordingCache {
    entries: Mutex<BTreeMap<String, IdentityRecord>>,
    pub writes: Mutex<Vec<(String, Duration)>>,
    pub reads: AtomicUsize,
}

impl RecordingCache {
    pub fn writes(&self) -> Vec<(String, Duration)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenCache for RecordingCache {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn get(&self, token: &str) -> Option<IdentityRecord> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().get(token).cloned()
    }

    async fn set(&self, token: &str, identity: IdentityRecord, ttl: Duration) {
        self.entries
            .lock()
            .unwrap()
            .insert(token.to_string(), identity);
        self.writes.lock().unwrap().push((token.to_string(), ttl));
    }
}

// ============================================================================
// Log capture
// ============================================================================

/// Tracing layer that renders every event's fields into a string.
#[derive(Clone, Default)]
pub struct CapturedEvents(Arc<Mutex<Vec<String>>>);

impl CapturedEvents {
    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn any_contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.contains(needle))
    }
}

struct FieldWriter(String);

impl Visit for FieldWriter {
    fn record_str(&mut self, field: &Field, value: &str) {
        let _ = write!(self.0, "{}={} ", field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut writer = FieldWriter(format!("{} ", event.metadata().level()));
        event.record(&mut writer);
        self.0.lock().unwrap().push(writer.0);
    }
}

/// Capture events on the current thread until the guard is dropped.
pub fn capture_events() -> (CapturedEvents, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let captured = CapturedEvents::default();
    let guard = tracing_subscriber::registry()
        .with(captured.clone())
        .set_default();
    (captured, guard)
}

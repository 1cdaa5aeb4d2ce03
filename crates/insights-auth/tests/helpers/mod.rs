//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::sync::{Notify, broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use insights_auth::{
    AuthError, AuthSessionManager, Authenticator, CredentialStore, Credentials, LoginResponse,
    MemoryStore, PromptResponse, RenewalPrompt, RenewalRequest, TimeSource,
};
use insights_core::config::{ApiConfig, SessionConfig};
use insights_core::events::{DomainEvent, EventBus, EventPayload, SessionEvent};
use insights_core::result::AppResult;
use insights_core::traits::{Navigator, Notice, Notifier};

// ── Tokens ──────────────────────────────────────────────────────────

/// Mint a signed token with the claims the dashboard expects.
pub fn mint_token(subject: &str, name: &str, roles: &[&str], expires_at: DateTime<Utc>) -> String {
    let claims = json!({
        "personal_number": subject,
        "name": name,
        "roles": roles,
        "exp": expires_at.timestamp(),
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"integration-test-secret"),
    )
    .expect("Failed to mint token")
}

/// A token for operator 1001 valid for an hour.
pub fn valid_token() -> String {
    mint_token(
        "1001",
        "Jana Novak",
        &["ROLE_USER"],
        Utc::now() + Duration::hours(1),
    )
}

/// A token for operator 1001 that expired an hour ago.
pub fn expired_token() -> String {
    mint_token(
        "1001",
        "Jana Novak",
        &["ROLE_USER"],
        Utc::now() - Duration::hours(1),
    )
}

// ── Clock ───────────────────────────────────────────────────────────

/// Manually advanced time source.
#[derive(Debug)]
pub struct ManualTime(Mutex<DateTime<Utc>>);

impl ManualTime {
    pub fn new() -> Self {
        Self(Mutex::new(Utc::now()))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().expect("lock") += by;
    }
}

impl TimeSource for ManualTime {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("lock")
    }
}

// ── Navigation / notices ────────────────────────────────────────────

/// A navigation performed by the code under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Nav {
    Push(String),
    Replace(String),
}

/// Navigator that records every navigation.
#[derive(Debug)]
pub struct RecordingNavigator {
    current: Mutex<String>,
    history: Mutex<Vec<Nav>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            current: Mutex::new(path.to_string()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<Nav> {
        self.history.lock().expect("lock").clone()
    }

    pub fn last(&self) -> Option<Nav> {
        self.history().last().cloned()
    }

    /// Move without recording, as if the user clicked a link.
    pub fn visit(&self, path: &str) {
        *self.current.lock().expect("lock") = path.to_string();
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.current.lock().expect("lock").clone()
    }

    fn push(&self, path: &str) {
        self.visit(path);
        self.history.lock().expect("lock").push(Nav::Push(path.to_string()));
    }

    fn replace(&self, path: &str) {
        self.visit(path);
        self.history
            .lock()
            .expect("lock")
            .push(Nav::Replace(path.to_string()));
    }
}

/// Notifier that records every notice.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("lock").clone()
    }

    pub fn titles(&self) -> Vec<String> {
        self.notices().into_iter().map(|n| n.title).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().expect("lock").push(notice);
    }
}

// ── Renewal prompt ──────────────────────────────────────────────────

/// Renewal prompt answered from a channel. A closed channel dismisses.
#[derive(Debug)]
pub struct ScriptedPrompt {
    responses: tokio::sync::Mutex<mpsc::UnboundedReceiver<PromptResponse>>,
    pub requests: AtomicUsize,
    pub errors: Mutex<Vec<String>>,
    pub last_request: Mutex<Option<RenewalRequest>>,
}

impl ScriptedPrompt {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<PromptResponse>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let prompt = Arc::new(Self {
            responses: tokio::sync::Mutex::new(rx),
            requests: AtomicUsize::new(0),
            errors: Mutex::new(Vec::new()),
            last_request: Mutex::new(None),
        });
        (prompt, tx)
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenewalPrompt for ScriptedPrompt {
    async fn request_password(&self, request: &RenewalRequest) -> PromptResponse {
        self.requests.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().expect("lock") = Some(request.clone());
        self.responses
            .lock()
            .await
            .recv()
            .await
            .unwrap_or(PromptResponse::Dismiss)
    }

    fn show_error(&self, _request: &RenewalRequest, message: &str) {
        self.errors.lock().expect("lock").push(message.to_string());
    }
}

// ── Authenticators ──────────────────────────────────────────────────

/// In-process authenticator with queued replies.
#[derive(Debug, Default)]
pub struct StubAuthenticator {
    replies: Mutex<VecDeque<Result<String, AuthError>>>,
    pub calls: AtomicUsize,
    pub usernames: Mutex<Vec<String>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl StubAuthenticator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply_token(&self, token: impl Into<String>) {
        self.replies.lock().expect("lock").push_back(Ok(token.into()));
    }

    pub fn reply_error(&self, err: AuthError) {
        self.replies.lock().expect("lock").push_back(Err(err));
    }

    /// Hold every reply until the returned gate is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().expect("lock") = Some(Arc::clone(&gate));
        gate
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for StubAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.usernames
            .lock()
            .expect("lock")
            .push(credentials.username.clone());

        let gate = self.gate.lock().expect("lock").clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let reply = self.replies.lock().expect("lock").pop_front();
        match reply {
            Some(Ok(token)) => Ok(LoginResponse { token }),
            Some(Err(e)) => Err(e),
            None => Err(AuthError::CredentialRejected {
                status: Some(401),
                message: None,
            }),
        }
    }
}

// ── Mock HTTP server ────────────────────────────────────────────────

/// What the mock authentication endpoint answers.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 `{"token": ...}`
    Token(String),
    /// Status with a plain-text body.
    Text(u16, String),
    /// Status with a JSON body.
    Json(u16, Value),
}

#[derive(Debug)]
pub struct MockState {
    pub reply: Mutex<MockReply>,
    pub auth_hits: AtomicUsize,
    pub last_body: Mutex<Option<Value>>,
    /// Token the `/api/problems` resource accepts.
    pub api_token: Mutex<Option<String>>,
}

/// Mock REST server bound to an ephemeral loopback port.
pub struct MockServer {
    pub base_url: String,
    pub state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(reply: MockReply) -> Self {
        let state = Arc::new(MockState {
            reply: Mutex::new(reply),
            auth_hits: AtomicUsize::new(0),
            last_body: Mutex::new(None),
            api_token: Mutex::new(None),
        });

        let router = Router::new()
            .route("/auth", post(auth_handler))
            .route("/api/problems", get(problems_handler))
            .route("/api/empty", get(empty_handler))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("local addr");
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            task,
        }
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            auth_path: "/auth".to_string(),
            request_timeout_seconds: 5,
            connect_timeout_seconds: 2,
        }
    }

    pub fn set_reply(&self, reply: MockReply) {
        *self.state.reply.lock().expect("lock") = reply;
    }

    pub fn accept_api_token(&self, token: &str) {
        *self.state.api_token.lock().expect("lock") = Some(token.to_string());
    }

    pub fn auth_hits(&self) -> usize {
        self.state.auth_hits.load(Ordering::SeqCst)
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn auth_handler(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.auth_hits.fetch_add(1, Ordering::SeqCst);
    *state.last_body.lock().expect("lock") = Some(body);
    let reply = state.reply.lock().expect("lock").clone();
    match reply {
        MockReply::Token(token) => Json(json!({ "token": token })).into_response(),
        MockReply::Text(code, text) => (status(code), text).into_response(),
        MockReply::Json(code, value) => (status(code), Json(value)).into_response(),
    }
}

async fn problems_handler(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    let expected = state.api_token.lock().expect("lock").clone();
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    if expected.is_some() && presented == expected {
        Json(json!({ "member": [{ "id": 1, "title": "Conveyor jam" }] })).into_response()
    } else {
        StatusCode::UNAUTHORIZED.into_response()
    }
}

async fn empty_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("valid status")
}

// ── Session harness ─────────────────────────────────────────────────

/// A session manager wired to recording collaborators.
pub struct Harness {
    pub manager: AuthSessionManager,
    pub backend: MemoryStore,
    pub store: CredentialStore,
    pub navigator: Arc<RecordingNavigator>,
    pub notifier: Arc<RecordingNotifier>,
    pub prompt: Arc<ScriptedPrompt>,
    pub answers: mpsc::UnboundedSender<PromptResponse>,
    pub time: Arc<ManualTime>,
    pub events: broadcast::Receiver<DomainEvent>,
}

impl Harness {
    pub fn new(authenticator: Arc<dyn Authenticator>, path: &str) -> Self {
        Self::with_backend(MemoryStore::new(), authenticator, path)
    }

    pub fn with_backend(
        backend: MemoryStore,
        authenticator: Arc<dyn Authenticator>,
        path: &str,
    ) -> Self {
        let store = CredentialStore::with_backend(Arc::new(backend.clone()));
        let navigator = Arc::new(RecordingNavigator::at(path));
        let notifier = Arc::new(RecordingNotifier::default());
        let (prompt, answers) = ScriptedPrompt::new();
        let time = Arc::new(ManualTime::new());
        let bus = EventBus::default();
        let events = bus.subscribe();

        let manager = AuthSessionManager::new(
            &SessionConfig::default(),
            store.clone(),
            authenticator,
            navigator.clone(),
            notifier.clone(),
            prompt.clone(),
            time.clone(),
            bus,
        );

        Self {
            manager,
            backend,
            store,
            navigator,
            notifier,
            prompt,
            answers,
            time,
            events,
        }
    }

    /// Spawn the manager's event loop.
    pub fn spawn_loop(&self) -> (watch::Sender<bool>, JoinHandle<AppResult<()>>) {
        let (tx, rx) = watch::channel(false);
        let manager = self.manager.clone();
        let task = tokio::spawn(async move { manager.run(rx).await });
        (tx, task)
    }

    /// Session events published so far.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            let EventPayload::Session(event) = event.payload;
            out.push(event);
        }
        out
    }

    /// Wait until the session satisfies `f`.
    pub async fn wait_for<F>(&self, f: F)
    where
        F: FnMut(&insights_auth::SessionSnapshot) -> bool,
    {
        let mut rx = self.manager.subscribe();
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("session did not reach the expected state")
            .expect("session manager dropped");
    }
}

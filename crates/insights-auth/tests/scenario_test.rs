//! End-to-end session lifecycle scenarios.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use helpers::{Harness, MockReply, MockServer, Nav, StubAuthenticator};
use insights_auth::{
    AuthErrorCategory, AuthPhase, Credentials, GuardDecision, HttpAuthenticator, PromptResponse,
    RouteGuard,
};
use insights_core::events::SessionEvent;

#[tokio::test]
async fn test_startup_without_token_settles_unauthenticated() {
    let auth = StubAuthenticator::new();
    let mut harness = Harness::new(auth.clone(), "/products");

    let snapshot = harness.manager.startup();

    assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
    assert!(!snapshot.is_authenticated);
    assert!(!snapshot.is_loading);
    assert!(snapshot.user.is_none());
    assert_eq!(auth.call_count(), 0, "startup must not authenticate");
    assert!(harness.drain_events().is_empty());
}

#[tokio::test]
async fn test_startup_discards_expired_token() {
    let auth = StubAuthenticator::new();
    let mut harness = Harness::new(auth.clone(), "/products");
    harness
        .store
        .write_token(&helpers::expired_token())
        .expect("seed token");

    let snapshot = harness.manager.startup();

    assert_eq!(snapshot.phase, AuthPhase::Unauthenticated);
    assert!(!snapshot.is_authenticated);
    assert_eq!(harness.store.read_token().expect("read"), None);
    assert_eq!(auth.call_count(), 0);
    assert!(matches!(
        harness.drain_events().as_slice(),
        [SessionEvent::Discarded { .. }]
    ));
}

#[tokio::test]
async fn test_startup_resumes_valid_token() {
    let auth = StubAuthenticator::new();
    let harness = Harness::new(auth, "/products");
    let token = helpers::valid_token();
    harness.store.write_token(&token).expect("seed token");

    let snapshot = harness.manager.startup();

    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert!(snapshot.is_authenticated);
    assert_eq!(snapshot.token.as_deref(), Some(token.as_str()));
    let user = snapshot.user.expect("user");
    assert_eq!(user.personal_number, "1001");
    assert_eq!(user.display_name, "Jana Novak");
    assert!(harness.navigator.history().is_empty());
}

#[tokio::test]
async fn test_login_consumes_intended_destination() {
    let token = helpers::valid_token();
    let server = MockServer::start(MockReply::Token(token.clone())).await;
    let auth = Arc::new(HttpAuthenticator::new(&server.api_config()).expect("client"));
    let harness = Harness::new(auth, "/login");
    harness.manager.startup();
    harness
        .store
        .write_destination("/problems")
        .expect("seed destination");

    let snapshot = harness
        .manager
        .login(Credentials::new("1001", "secret"))
        .await
        .expect("login");

    assert_eq!(snapshot.phase, AuthPhase::Authenticated);
    assert!(snapshot.is_authenticated);
    assert_eq!(harness.store.read_token().expect("read"), Some(token));
    assert_eq!(harness.store.read_destination().expect("read"), None);
    assert_eq!(harness.navigator.last(), Some(Nav::Push("/problems".to_string())));
    assert_eq!(server.auth_hits(), 1);

    let body = server.state.last_body.lock().expect("lock").clone();
    assert_eq!(
        body,
        Some(serde_json::json!({ "username": "1001", "password": "secret" }))
    );
    assert_eq!(harness.notifier.titles(), vec!["Login successful"]);
}

#[tokio::test]
async fn test_login_rejected_uses_server_text() {
    let server = MockServer::start(MockReply::Text(401, "bad credentials".to_string())).await;
    let auth = Arc::new(HttpAuthenticator::new(&server.api_config()).expect("client"));
    let harness = Harness::new(auth, "/login");
    harness.manager.startup();

    let err = harness
        .manager
        .login(Credentials::new("1001", "wrong"))
        .await
        .expect_err("rejected");

    assert_eq!(err.category(), AuthErrorCategory::CredentialRejected);
    assert_eq!(err.user_message(), "bad credentials");

    let snapshot = harness.manager.snapshot();
    assert!(!snapshot.is_authenticated);
    assert!(!snapshot.is_loading);
    assert!(snapshot.user.is_none());
    assert_eq!(harness.store.read_token().expect("read"), None);
    assert!(harness.navigator.history().is_empty());

    let notices = harness.notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].title, "Login failed");
    assert_eq!(notices[0].description, "bad credentials");
}

#[tokio::test(start_paused = true)]
async fn test_expiry_opens_renewal_once_across_ticks() {
    let auth = StubAuthenticator::new();
    let harness = Harness::new(auth.clone(), "/products");
    harness
        .store
        .write_token(&helpers::valid_token())
        .expect("seed token");
    harness.manager.startup();
    let (shutdown, task) = harness.spawn_loop();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(harness.prompt.request_count(), 0);

    harness.time.advance(ChronoDuration::hours(2));
    tokio::time::sleep(Duration::from_secs(31)).await;
    harness.wait_for(|s| s.renewal.is_open).await;

    // Two more ticks while the prompt is still unanswered.
    tokio::time::sleep(Duration::from_secs(61)).await;
    harness.manager.focus_regained();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(harness.prompt.request_count(), 1);
    let snapshot = harness.manager.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::RenewalPending);
    assert_eq!(snapshot.renewal.subject_hint.as_deref(), Some("Jana Novak"));
    assert!(!snapshot.is_authenticated);
    assert_eq!(auth.call_count(), 0);

    shutdown.send_replace(true);
    task.await.expect("join").expect("run");
}

#[tokio::test(start_paused = true)]
async fn test_expiry_on_login_page_prompts_after_leaving_it() {
    let auth = StubAuthenticator::new();
    let harness = Harness::new(auth, "/login");
    harness
        .store
        .write_token(&helpers::valid_token())
        .expect("seed token");
    harness.manager.startup();
    let (shutdown, task) = harness.spawn_loop();

    harness.time.advance(ChronoDuration::hours(2));
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(harness.prompt.request_count(), 0);
    assert_eq!(harness.manager.snapshot().phase, AuthPhase::Authenticated);

    harness.navigator.visit("/products");
    tokio::time::sleep(Duration::from_secs(31)).await;
    harness.wait_for(|s| s.renewal.is_open).await;
    while harness.prompt.request_count() == 0 {
        tokio::task::yield_now().await;
    }

    let snapshot = harness.manager.snapshot();
    assert_eq!(snapshot.phase, AuthPhase::RenewalPending);
    assert!(!snapshot.is_authenticated);
    assert_eq!(
        RouteGuard::decide(harness.manager.paths(), &snapshot, "/products"),
        GuardDecision::Placeholder
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(harness.prompt.request_count(), 1);

    shutdown.send_replace(true);
    task.await.expect("join").expect("run");
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_renewal_logs_out_and_remembers_path() {
    let auth = StubAuthenticator::new();
    let mut harness = Harness::new(auth, "/products");
    harness
        .store
        .write_token(&helpers::valid_token())
        .expect("seed token");
    harness.manager.startup();
    let (shutdown, task) = harness.spawn_loop();

    harness.time.advance(ChronoDuration::hours(2));
    tokio::time::sleep(Duration::from_secs(31)).await;
    harness.wait_for(|s| s.renewal.is_open).await;

    harness.answers.send(PromptResponse::Dismiss).expect("answer");
    harness
        .wait_for(|s| s.phase == AuthPhase::Unauthenticated && !s.is_loading)
        .await;

    let snapshot = harness.manager.snapshot();
    assert!(!snapshot.is_authenticated);
    assert!(snapshot.user.is_none());
    assert!(!snapshot.renewal.is_open);
    assert_eq!(harness.store.read_token().expect("read"), None);
    assert_eq!(
        harness.store.read_destination().expect("read").as_deref(),
        Some("/products")
    );
    assert_eq!(harness.navigator.last(), Some(Nav::Push("/login".to_string())));

    let events = harness.drain_events();
    assert!(events.contains(&SessionEvent::RenewalCancelled));
    assert!(events.contains(&SessionEvent::LoggedOut {
        reason: "renewal_cancelled".to_string()
    }));

    shutdown.send_replace(true);
    task.await.expect("join").expect("run");
}

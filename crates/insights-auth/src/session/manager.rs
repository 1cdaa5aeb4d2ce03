//! Session lifecycle manager: resume, login, logout, expiry and renewal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use insights_core::config::SessionConfig;
use insights_core::error::AppError;
use insights_core::events::{DomainEvent, EventBus, SessionEvent};
use insights_core::result::AppResult;
use insights_core::traits::{Navigator, Notice, Notifier, StoreChange};
use insights_core::types::PathPolicy;

use super::clock::{ExpiryNotifier, ExpirySource, SessionClock, TimeSource};
use super::profile::{RolePolicy, UserProfile};
use super::state::{AuthPhase, ManagerState, RenewalPromptState, SessionSnapshot};
use crate::client::{Authenticator, Credentials};
use crate::error::AuthError;
use crate::jwt::{Claims, TokenCodec};
use crate::renewal::{RenewalDriver, RenewalOutcome, RenewalPrompt, RenewalRequest};
use crate::store::CredentialStore;

/// Capacity of the expiry signal queue.
const EXPIRY_QUEUE: usize = 8;

struct Inner {
    /// Token / destination persistence.
    store: CredentialStore,
    /// Authentication endpoint.
    authenticator: Arc<dyn Authenticator>,
    /// Route surface.
    navigator: Arc<dyn Navigator>,
    /// User-facing notices.
    notifier: Arc<dyn Notifier>,
    /// Renewal UI.
    prompt: Arc<dyn RenewalPrompt>,
    /// Wall clock.
    time: Arc<dyn TimeSource>,
    codec: TokenCodec,
    roles: RolePolicy,
    paths: PathPolicy,
    check_interval: Duration,
    events: EventBus,
    state: Mutex<ManagerState>,
    snapshots: watch::Sender<SessionSnapshot>,
    focus: Arc<Notify>,
    /// Hands a declined expiry signal back to the clock.
    rearm: Arc<Notify>,
    expiry_tx: mpsc::Sender<ExpirySource>,
    expiry_rx: Mutex<Option<mpsc::Receiver<ExpirySource>>>,
    renewal_task: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the client session and every transition of it.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct AuthSessionManager {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuthSessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionManager")
            .field("session", &*self.inner.snapshots.borrow())
            .field("paths", &self.inner.paths)
            .field("check_interval", &self.inner.check_interval)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl AuthSessionManager {
    /// Creates a manager in the `Uninitialized` phase.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &SessionConfig,
        store: CredentialStore,
        authenticator: Arc<dyn Authenticator>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        prompt: Arc<dyn RenewalPrompt>,
        time: Arc<dyn TimeSource>,
        events: EventBus,
    ) -> Self {
        let state = ManagerState::new();
        let (snapshots, _) = watch::channel(state.snapshot());
        let (expiry_tx, expiry_rx) = mpsc::channel(EXPIRY_QUEUE);
        Self {
            inner: Arc::new(Inner {
                store,
                authenticator,
                navigator,
                notifier,
                prompt,
                time,
                codec: TokenCodec::new(),
                roles: RolePolicy::from_config(config),
                paths: PathPolicy::from_config(config),
                check_interval: Duration::from_secs(config.check_interval_seconds.max(1)),
                events,
                state: Mutex::new(state),
                snapshots,
                focus: Arc::new(Notify::new()),
                rearm: Arc::new(Notify::new()),
                expiry_tx,
                expiry_rx: Mutex::new(Some(expiry_rx)),
                renewal_task: Mutex::new(None),
            }),
        }
    }

    // ── Observation ─────────────────────────────────────────────────

    /// The current session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Receives a new snapshot after every transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshots.subscribe()
    }

    /// Handle for raising the global "session expired" notification.
    pub fn expiry_notifier(&self) -> ExpiryNotifier {
        ExpiryNotifier::new(self.inner.expiry_tx.clone())
    }

    /// Session domain events.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// The credential store this manager persists to.
    pub fn store(&self) -> &CredentialStore {
        &self.inner.store
    }

    /// Route policy.
    pub fn paths(&self) -> &PathPolicy {
        &self.inner.paths
    }

    /// Route surface.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    /// Asks the session clock for an immediate check.
    pub fn focus_regained(&self) {
        self.inner.focus.notify_one();
    }

    // ── Startup / resume ────────────────────────────────────────────

    /// Resumes the persisted session, if any. Makes no network call.
    pub fn startup(&self) -> SessionSnapshot {
        self.update(|s| {
            s.phase = AuthPhase::Resuming;
            s.is_loading = true;
        });
        debug!("Resuming session from the credential store");
        self.resume(false);
        self.update(|s| s.is_loading = false);
        self.snapshot()
    }

    /// Reads, decodes and validates the stored token, installing it or
    /// discarding it. When `supersede` is set, clearing the session also
    /// invalidates in-flight login and renewal attempts.
    fn resume(&self, supersede: bool) {
        let stored = self.inner.store.read_token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read the stored token");
            None
        });

        let Some(token) = stored else {
            debug!("No stored token");
            self.update(|s| {
                s.clear();
                if supersede {
                    s.generation += 1;
                }
            });
            return;
        };

        match self.validate(&token) {
            Ok((claims, user)) => {
                info!(user_id = %user.id, expires_at = %claims.expires_at, "Session resumed");
                let display_name = user.display_name.clone();
                self.update(|s| s.install(token, claims, user));
                self.emit(SessionEvent::Resumed { display_name });
            }
            Err(e) => {
                warn!(error = %e, "Discarding stored token");
                if let Err(e) = self.inner.store.clear_token() {
                    warn!(error = %e, "Failed to clear the discarded token");
                }
                self.update(|s| {
                    s.clear();
                    if supersede {
                        s.generation += 1;
                    }
                });
                self.emit(SessionEvent::Discarded {
                    reason: e.to_string(),
                });
            }
        }
    }

    /// Re-runs the resume path after another context changed the token.
    pub fn handle_external_change(&self, change: &StoreChange) {
        info!(origin = %change.origin, cleared = change.new_value.is_none(), "Token changed in another context");
        self.emit(SessionEvent::ExternalChange);

        if self.snapshot().token.as_deref() == change.new_value.as_deref()
            && change.new_value.is_some()
        {
            return;
        }

        self.resume(true);
        let snapshot = self.snapshot();
        if snapshot.token.is_none() || snapshot.phase == AuthPhase::Authenticated {
            // The other context either ended the session or renewed it.
            self.cancel_renewal_task();
        }
    }

    // ── Login / logout ──────────────────────────────────────────────

    /// Authenticates with credentials and installs the issued token.
    ///
    /// On failure the session is left empty, nothing is persisted, and the
    /// error is returned so the caller can keep the user's input.
    pub async fn login(&self, credentials: Credentials) -> Result<SessionSnapshot, AuthError> {
        let generation = self.update(|s| {
            s.is_loading = true;
            s.generation
        });
        info!(username = %credentials.username, "Attempting login");

        match self.authenticate_and_commit(&credentials, generation).await {
            Ok(user) => {
                self.update(|s| s.is_loading = false);
                info!(user_id = %user.id, role = %user.role, "Login successful");
                self.inner.notifier.notify(Notice::info(
                    "Login successful",
                    "Redirecting to the dashboard.",
                ));
                self.emit(SessionEvent::LoggedIn {
                    display_name: user.display_name,
                });
                self.redirect_after_auth(true);
                Ok(self.snapshot())
            }
            Err(AuthError::Superseded) => {
                warn!(username = %credentials.username, "Login superseded by a newer session change");
                self.update(|s| s.is_loading = false);
                Err(AuthError::Superseded)
            }
            Err(e) => {
                warn!(
                    username = %credentials.username,
                    category = ?e.category(),
                    error = %e,
                    "Login failed"
                );
                self.update(|s| {
                    s.clear();
                    s.is_loading = false;
                });
                self.inner
                    .notifier
                    .notify(Notice::destructive("Login failed", e.user_message()));
                Err(e)
            }
        }
    }

    async fn authenticate_and_commit(
        &self,
        credentials: &Credentials,
        generation: u64,
    ) -> Result<UserProfile, AuthError> {
        let response = self.inner.authenticator.authenticate(credentials).await?;
        let (claims, user) = self.validate(&response.token).inspect_err(|e| {
            error!(error = %e, "Authentication service issued an unusable token");
        })?;
        self.commit(generation, response.token, claims, user.clone())?;
        Ok(user)
    }

    /// Ends the session locally. Never fails.
    pub fn logout(&self) {
        self.end_session("logout", false);
    }

    fn end_session(&self, reason: &str, remember_current: bool) {
        info!(reason, "Logging out");
        self.cancel_renewal_task();
        let actor = self.snapshot().user.map(|u| u.id);
        self.update(|s| {
            s.phase = AuthPhase::LoggingOut;
            s.is_loading = true;
            s.generation += 1;
        });

        if let Err(e) = self.inner.store.clear_token() {
            warn!(error = %e, "Failed to clear the stored token");
        }
        if let Err(e) = self.inner.store.clear_destination() {
            warn!(error = %e, "Failed to clear the intended destination");
        }
        if remember_current {
            self.remember_destination(&self.inner.navigator.current_path());
        }

        self.update(|s| {
            s.clear();
            s.is_loading = false;
        });
        self.inner.notifier.notify(Notice::info(
            "Logged out",
            "You have been logged out.",
        ));
        self.inner.events.publish(DomainEvent::session(
            actor,
            SessionEvent::LoggedOut {
                reason: reason.to_string(),
            },
        ));
        self.inner.navigator.push(self.inner.paths.login_path());
    }

    /// Records `path` as the intended destination unless it is public.
    pub fn remember_destination(&self, path: &str) {
        if self.inner.paths.is_public(path) {
            return;
        }
        debug!(path, "Storing intended destination");
        if let Err(e) = self.inner.store.write_destination(path) {
            warn!(error = %e, "Failed to store the intended destination");
        }
    }

    /// Consumes the intended destination and navigates there. Without a
    /// usable destination, goes to the landing page when `fallback` is set.
    fn redirect_after_auth(&self, fallback: bool) {
        let intended = self.inner.store.take_destination().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read the intended destination");
            None
        });
        let target = if fallback {
            self.inner.paths.resolve_destination(intended.as_deref())
        } else {
            match self.inner.paths.valid_destination(intended.as_deref()) {
                Some(path) => path,
                None => return,
            }
        };
        info!(path = %target, "Redirecting");
        self.inner.navigator.push(&target);
    }

    // ── Profile ─────────────────────────────────────────────────────

    /// Re-derives the profile from the current token.
    pub fn refresh_profile(&self) -> SessionSnapshot {
        let snapshot = self.snapshot();
        let token = snapshot.token.clone().or_else(|| {
            self.inner.store.read_token().unwrap_or_else(|e| {
                warn!(error = %e, "Failed to read the stored token");
                None
            })
        });

        let Some(token) = token else {
            debug!("Profile refresh requested without a token");
            if snapshot.is_authenticated {
                self.update(|s| s.clear());
            }
            return self.snapshot();
        };

        match self.inner.codec.decode(&token) {
            Ok(claims) if claims.is_expired(self.inner.time.now()) => {
                debug!("Profile refresh found an expired token");
                self.prompt_session_renewal();
            }
            Ok(claims) => {
                let user = UserProfile::from_claims(&claims, &self.inner.roles, self.inner.time.now());
                debug!(user_id = %user.id, "Profile refreshed");
                self.update(|s| s.install(token, claims, user));
            }
            Err(e) => {
                let err = AuthError::from(e);
                warn!(error = %err, "Profile refresh found an undecodable token");
                self.inner.notifier.notify(Notice::destructive(
                    "Session refresh failed",
                    err.user_message(),
                ));
                self.cancel_renewal_task();
                if let Err(e) = self.inner.store.clear_token() {
                    warn!(error = %e, "Failed to clear the stored token");
                }
                self.update(|s| {
                    s.clear();
                    s.generation += 1;
                });
                self.remember_destination(&self.inner.navigator.current_path());
                self.inner.navigator.replace(self.inner.paths.login_path());
            }
        }
        self.snapshot()
    }

    // ── Expiry / renewal ────────────────────────────────────────────

    /// Reacts to an expiry signal from the clock or another component.
    pub fn handle_expiry(&self, source: ExpirySource) -> bool {
        debug!(?source, "Session expiry signalled");
        self.prompt_session_renewal()
    }

    /// Opens the renewal prompt. Returns false when ignored: on a public
    /// page, with a prompt already open, or with no session to renew.
    ///
    /// An expiry ignored on a public page is handed back to the clock, so it
    /// is raised again once the user reaches a protected view.
    pub fn prompt_session_renewal(&self) -> bool {
        let current = self.inner.navigator.current_path();
        if self.inner.paths.is_public(&current) {
            debug!(path = %current, "Expiry deferred on a public page");
            self.inner.rearm.notify_one();
            return false;
        }

        let stored = self.inner.store.read_token().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read the stored token");
            None
        });

        let mut task = lock(&self.inner.renewal_task);
        let opened = {
            let mut state = lock(&self.inner.state);
            if state.renewal.is_open || (state.user.is_none() && stored.is_none()) {
                None
            } else {
                let request = self.renewal_request(&state, stored.as_deref());
                state.renewal = RenewalPromptState {
                    is_open: true,
                    subject_hint: request.display_name.clone(),
                };
                state.phase = AuthPhase::RenewalPending;
                self.publish(&state);
                Some((request, state.generation))
            }
        };

        let Some((request, generation)) = opened else {
            debug!("Renewal prompt already open or nothing to renew");
            return false;
        };

        info!(path = %current, "Prompting for session renewal");
        self.emit(SessionEvent::Expired);
        self.emit(SessionEvent::RenewalOpened);

        let manager = self.clone();
        *task = Some(tokio::spawn(async move {
            manager.run_renewal(request, generation).await;
        }));
        true
    }

    fn renewal_request(&self, state: &ManagerState, stored: Option<&str>) -> RenewalRequest {
        if let Some(user) = &state.user {
            return RenewalRequest {
                subject_id: Some(user.personal_number.clone()),
                display_name: Some(user.display_name.clone()),
            };
        }
        let claims = state
            .token
            .as_deref()
            .or(stored)
            .and_then(|t| self.inner.codec.decode(t).ok());
        RenewalRequest {
            subject_id: claims.as_ref().map(|c| c.subject_id.clone()),
            display_name: claims.map(|c| c.display_name),
        }
    }

    async fn run_renewal(self, request: RenewalRequest, generation: u64) {
        let driver = RenewalDriver::new(
            Arc::clone(&self.inner.prompt),
            Arc::clone(&self.inner.authenticator),
        );
        let outcome = driver.run(&request).await;
        // Detach before any transition so logout does not abort this task.
        lock(&self.inner.renewal_task).take();

        if !self.is_current(generation) {
            debug!(?outcome, "Renewal outcome superseded");
            return;
        }

        match outcome {
            RenewalOutcome::Cancelled => {
                self.emit(SessionEvent::RenewalCancelled);
                self.end_session("renewal_cancelled", true);
            }
            RenewalOutcome::Renewed(token) => self.finish_renewal(token, generation),
        }
    }

    fn finish_renewal(&self, token: String, generation: u64) {
        let result = self.validate(&token).and_then(|(claims, user)| {
            let display_name = user.display_name.clone();
            self.commit(generation, token, claims, user)
                .map(|()| display_name)
        });

        match result {
            Ok(display_name) => {
                info!("Session renewed");
                self.inner.notifier.notify(Notice::info(
                    "Session refreshed",
                    "Your session has been renewed.",
                ));
                self.emit(SessionEvent::Renewed { display_name });
                self.redirect_after_auth(false);
            }
            Err(AuthError::Superseded) => debug!("Renewal superseded by logout"),
            Err(e) => {
                error!(error = %e, "Renewal produced an unusable token");
                self.inner.notifier.notify(Notice::destructive(
                    "Session refresh failed",
                    e.user_message(),
                ));
                self.end_session("renewal_failed", true);
            }
        }
    }

    fn cancel_renewal_task(&self) {
        if let Some(task) = lock(&self.inner.renewal_task).take() {
            debug!("Cancelling open renewal prompt");
            task.abort();
        }
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Runs the session clock and reacts to expiry signals and external
    /// token changes until `shutdown` turns true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> AppResult<()> {
        let mut expiry_rx = lock(&self.inner.expiry_rx)
            .take()
            .ok_or_else(|| AppError::internal("Session manager is already running"))?;

        let clock = SessionClock::new(self.inner.check_interval, Arc::clone(&self.inner.time))
            .with_focus(Arc::clone(&self.inner.focus))
            .with_rearm(Arc::clone(&self.inner.rearm))
            .spawn(self.subscribe(), self.expiry_notifier());
        let mut external = self.inner.store.external_changes();
        info!(interval = ?self.inner.check_interval, "Session manager running");

        loop {
            tokio::select! {
                Some(source) = expiry_rx.recv() => {
                    self.handle_expiry(source);
                }
                change = external.recv() => match change {
                    Some(change) => self.handle_external_change(&change),
                    None => break,
                },
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        clock.stop();
        self.cancel_renewal_task();
        *lock(&self.inner.expiry_rx) = Some(expiry_rx);
        info!("Session manager stopped");
        Ok(())
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Decodes a token and rejects it if already expired.
    fn validate(&self, token: &str) -> Result<(Claims, UserProfile), AuthError> {
        let claims = self.inner.codec.decode(token)?;
        let now = self.inner.time.now();
        if claims.is_expired(now) {
            return Err(AuthError::ExpiredToken);
        }
        let user = UserProfile::from_claims(&claims, &self.inner.roles, now);
        Ok((claims, user))
    }

    /// Persists and installs a token unless the attempt has been superseded.
    fn commit(
        &self,
        generation: u64,
        token: String,
        claims: Claims,
        user: UserProfile,
    ) -> Result<(), AuthError> {
        let mut state = lock(&self.inner.state);
        if state.generation != generation {
            return Err(AuthError::Superseded);
        }
        self.inner.store.write_token(&token)?;
        state.install(token, claims, user);
        self.publish(&state);
        Ok(())
    }

    fn is_current(&self, generation: u64) -> bool {
        lock(&self.inner.state).generation == generation
    }

    fn update<R>(&self, f: impl FnOnce(&mut ManagerState) -> R) -> R {
        let mut state = lock(&self.inner.state);
        let result = f(&mut state);
        self.publish(&state);
        result
    }

    fn publish(&self, state: &ManagerState) {
        self.inner.snapshots.send_replace(state.snapshot());
    }

    fn emit(&self, event: SessionEvent) {
        let actor = lock(&self.inner.state).user.as_ref().map(|u| u.id.clone());
        self.inner.events.publish(DomainEvent::session(actor, event));
    }
}

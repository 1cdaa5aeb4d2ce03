//! Expiry polling for the installed token.
//!
//! Interval ticks, focus regain, and token changes all funnel into
//! [`ExpiryWatch::evaluate`], which fires at most once per token. A signal
//! the manager declines is handed back through the rearm notification and
//! re-checked on the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use super::state::SessionSnapshot;

/// Wall-clock source.
pub trait TimeSource: Send + Sync + std::fmt::Debug + 'static {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`TimeSource`] backed by the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Where an expiry signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirySource {
    /// The session clock saw the token pass its expiry.
    Clock,
    /// Some other component (e.g. a 401 from the API) reported expiry.
    Remote,
}

/// Clonable handle for raising the global "session expired" notification.
#[derive(Debug, Clone)]
pub struct ExpiryNotifier {
    tx: mpsc::Sender<ExpirySource>,
}

impl ExpiryNotifier {
    pub(crate) fn new(tx: mpsc::Sender<ExpirySource>) -> Self {
        Self { tx }
    }

    /// Requests renewal of the current session.
    pub fn notify(&self, source: ExpirySource) {
        // A full queue already holds a pending signal.
        if self.tx.try_send(source).is_err() {
            debug!(?source, "Expiry signal dropped");
        }
    }
}

/// Once-per-token expiry latch.
#[derive(Debug, Default)]
pub struct ExpiryWatch {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    signaled: bool,
}

impl ExpiryWatch {
    /// Creates an unarmed watch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the watch at the live token. A different token resets the latch.
    pub fn arm(&mut self, token: Option<&str>, expires_at: Option<DateTime<Utc>>) {
        if self.token.as_deref() != token {
            self.token = token.map(str::to_string);
            self.signaled = false;
        }
        self.expires_at = if self.token.is_some() { expires_at } else { None };
    }

    /// Whether a token is being watched.
    pub fn is_armed(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Re-opens the latch for the current token after a declined signal.
    pub fn release(&mut self) {
        self.signaled = false;
    }

    /// Returns true exactly once when `now` reaches the expiry.
    pub fn evaluate(&mut self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) if !self.signaled && now >= expires_at => {
                self.signaled = true;
                true
            }
            _ => false,
        }
    }
}

/// Periodic expiry check over the manager's session snapshots.
#[derive(Debug, Clone)]
pub struct SessionClock {
    interval: Duration,
    time: Arc<dyn TimeSource>,
    focus: Arc<Notify>,
    rearm: Arc<Notify>,
}

impl SessionClock {
    /// Creates a clock checking every `interval`.
    pub fn new(interval: Duration, time: Arc<dyn TimeSource>) -> Self {
        Self {
            interval,
            time,
            focus: Arc::new(Notify::new()),
            rearm: Arc::new(Notify::new()),
        }
    }

    /// Uses an externally owned focus signal.
    #[must_use]
    pub fn with_focus(mut self, focus: Arc<Notify>) -> Self {
        self.focus = focus;
        self
    }

    /// Uses an externally owned rearm signal.
    #[must_use]
    pub fn with_rearm(mut self, rearm: Arc<Notify>) -> Self {
        self.rearm = rearm;
        self
    }

    /// Spawns the polling task. The clock is inert while the session has no
    /// token and while the renewal prompt is open.
    pub fn spawn(
        self,
        mut session: watch::Receiver<SessionSnapshot>,
        expired: ExpiryNotifier,
    ) -> ClockHandle {
        let focus = Arc::clone(&self.focus);
        let focus_signal = Arc::clone(&self.focus);
        let rearm = Arc::clone(&self.rearm);
        let rearm_signal = Arc::clone(&self.rearm);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            let mut watch = ExpiryWatch::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = focus_signal.notified() => debug!("Focus regained"),
                    _ = rearm_signal.notified() => {
                        // Re-checked on the next tick, not now.
                        debug!("Expiry signal handed back");
                        watch.release();
                        continue;
                    }
                    changed = session.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }

                let suppressed = {
                    let snapshot = session.borrow_and_update();
                    watch.arm(snapshot.token.as_deref(), snapshot.expires_at);
                    snapshot.renewal.is_open
                };
                if suppressed || !watch.is_armed() {
                    continue;
                }

                if watch.evaluate(self.time.now()) {
                    debug!("Token expired");
                    expired.notify(ExpirySource::Clock);
                }
            }
            debug!("Session clock stopped");
        });

        ClockHandle { focus, rearm, task }
    }
}

/// Handle to a running [`SessionClock`].
#[derive(Debug)]
pub struct ClockHandle {
    focus: Arc<Notify>,
    rearm: Arc<Notify>,
    task: JoinHandle<()>,
}

impl ClockHandle {
    /// Triggers an immediate check, as on window focus regain.
    pub fn focus_regained(&self) {
        self.focus.notify_one();
    }

    /// Hands the last expiry signal back so the next tick can raise it again.
    pub fn rearm(&self) {
        self.rearm.notify_one();
    }

    /// Stops the clock.
    pub fn stop(self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration as ChronoDuration;

    use super::*;
    use crate::session::state::{AuthPhase, RenewalPromptState};

    #[derive(Debug)]
    struct ManualTime(Mutex<DateTime<Utc>>);

    impl ManualTime {
        fn advance(&self, by: ChronoDuration) {
            let mut now = self.0.lock().expect("lock");
            *now += by;
        }
    }

    impl TimeSource for ManualTime {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().expect("lock")
        }
    }

    fn snapshot(token: Option<&str>, expires_at: Option<DateTime<Utc>>, open: bool) -> SessionSnapshot {
        SessionSnapshot {
            phase: AuthPhase::Authenticated,
            user: None,
            token: token.map(str::to_string),
            is_authenticated: token.is_some(),
            is_loading: false,
            expires_at,
            renewal: RenewalPromptState {
                is_open: open,
                subject_hint: None,
            },
        }
    }

    #[test]
    fn test_watch_fires_once_per_token() {
        let now = Utc::now();
        let mut watch = ExpiryWatch::new();
        watch.arm(Some("a"), Some(now));
        assert!(!watch.evaluate(now - ChronoDuration::seconds(1)));
        assert!(watch.evaluate(now));
        assert!(!watch.evaluate(now + ChronoDuration::seconds(30)));
        assert!(!watch.evaluate(now + ChronoDuration::seconds(60)));

        watch.arm(Some("a"), Some(now));
        assert!(!watch.evaluate(now + ChronoDuration::seconds(90)));

        watch.arm(Some("b"), Some(now));
        assert!(watch.evaluate(now + ChronoDuration::seconds(90)));
    }

    #[test]
    fn test_released_watch_fires_again() {
        let now = Utc::now();
        let mut watch = ExpiryWatch::new();
        watch.arm(Some("a"), Some(now));
        assert!(watch.evaluate(now));
        watch.release();
        assert!(watch.evaluate(now + ChronoDuration::seconds(30)));
        assert!(!watch.evaluate(now + ChronoDuration::seconds(60)));
    }

    #[test]
    fn test_unarmed_watch_never_fires() {
        let mut watch = ExpiryWatch::new();
        assert!(!watch.evaluate(Utc::now()));
        watch.arm(None, Some(Utc::now()));
        assert!(!watch.is_armed());
        assert!(!watch.evaluate(Utc::now()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_signals_once_across_ticks() {
        let start = Utc::now();
        let time = Arc::new(ManualTime(Mutex::new(start)));
        let (session_tx, session_rx) =
            watch::channel(snapshot(Some("a"), Some(start + ChronoDuration::seconds(45)), false));
        let (tx, mut rx) = mpsc::channel(8);

        let handle = SessionClock::new(Duration::from_secs(30), time.clone())
            .spawn(session_rx, ExpiryNotifier::new(tx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        time.advance(ChronoDuration::seconds(60));
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        tokio::time::sleep(Duration::from_secs(90)).await;
        handle.focus_regained();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        session_tx.send_replace(snapshot(Some("b"), Some(start), false));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_is_suppressed_while_prompt_open() {
        let start = Utc::now();
        let time = Arc::new(ManualTime(Mutex::new(start)));
        let (session_tx, session_rx) =
            watch::channel(snapshot(Some("a"), Some(start - ChronoDuration::seconds(5)), true));
        let (tx, mut rx) = mpsc::channel(8);

        let handle = SessionClock::new(Duration::from_secs(30), time)
            .spawn(session_rx, ExpiryNotifier::new(tx));

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert!(rx.try_recv().is_err());

        session_tx.send_replace(snapshot(Some("a"), Some(start - ChronoDuration::seconds(5)), false));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_triggers_immediate_check() {
        let start = Utc::now();
        let time = Arc::new(ManualTime(Mutex::new(start)));
        let (_session_tx, session_rx) =
            watch::channel(snapshot(Some("a"), Some(start + ChronoDuration::seconds(10)), false));
        let (tx, mut rx) = mpsc::channel(8);

        let handle = SessionClock::new(Duration::from_secs(3600), time.clone())
            .spawn(session_rx, ExpiryNotifier::new(tx));
        tokio::time::sleep(Duration::from_secs(1)).await;

        time.advance(ChronoDuration::seconds(20));
        handle.focus_regained();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_resignals_on_next_tick() {
        let start = Utc::now();
        let time = Arc::new(ManualTime(Mutex::new(start)));
        let (_session_tx, session_rx) =
            watch::channel(snapshot(Some("a"), Some(start - ChronoDuration::seconds(5)), false));
        let (tx, mut rx) = mpsc::channel(8);

        let handle = SessionClock::new(Duration::from_secs(30), time)
            .spawn(session_rx, ExpiryNotifier::new(tx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        handle.rearm();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(rx.try_recv().ok(), Some(ExpirySource::Clock));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());

        handle.stop();
    }
}

//! Wait-for-condition polling.
//!
//! The first check runs immediately, then once per interval until the check
//! reports done, an error, or a configured limit is hit. With default
//! settings there is no limit at all.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::errors::ActivityFailure;

/// Default delay between two backup status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Cooperative cancellation for a running wait.
///
/// Clones share the same flag. Cancelling wakes a wait that is asleep.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Limits for a wait. The default waits forever, checking every five seconds.
#[derive(Debug, Clone)]
pub struct PollSettings {
    interval: Duration,
    timeout: Option<Duration>,
    max_attempts: Option<u32>,
    cancel: Option<CancelToken>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
            max_attempts: None,
            cancel: None,
        }
    }
}

impl PollSettings {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Cap the number of checks, including the first one.
    ///
    /// The first check always runs, so `0` behaves like `1`.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }
}

async fn cancelled(token: Option<&CancelToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(wake: Option<Instant>) {
    match wake {
        Some(wake) => tokio::time::sleep_until(wake).await,
        None => std::future::pending().await,
    }
}

/// Poll `check` until it yields `Some`.
///
/// `what` names the awaited condition in failure messages. Errors from
/// `check` end the wait and are returned unchanged.
pub async fn wait_until<T, F, Fut>(
    settings: &PollSettings,
    what: &str,
    mut check: F,
) -> Result<T, ActivityFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ActivityFailure>>,
{
    let started = Instant::now();
    // A deadline or wake time past what `Instant` can hold is never reached.
    let deadline = settings.timeout.and_then(|t| started.checked_add(t));
    let token = settings.cancel.as_ref();
    let mut attempts: u32 = 0;

    loop {
        if token.is_some_and(CancelToken::is_cancelled) {
            return Err(ActivityFailure::new(format!(
                "cancelled while waiting for {what}"
            )));
        }

        attempts += 1;
        if let Some(done) = check().await? {
            tracing::debug!(what, attempts, "wait finished");
            return Ok(done);
        }

        if settings.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(ActivityFailure::new(format!(
                "gave up waiting for {what} after {attempts} attempts"
            )));
        }

        let now = Instant::now();
        if deadline.is_some_and(|deadline| now >= deadline) {
            return Err(ActivityFailure::new(format!(
                "timed out after {:?} waiting for {what}",
                started.elapsed()
            )));
        }
        let wake = match (now.checked_add(settings.interval), deadline) {
            (Some(wake), Some(deadline)) => Some(wake.min(deadline)),
            (wake, deadline) => wake.or(deadline),
        };

        tracing::info!(what, attempts, interval = ?settings.interval, "still waiting");
        tokio::select! {
            _ = sleep_until(wake) => {}
            _ = cancelled(token) => {
                return Err(ActivityFailure::new(format!(
                    "cancelled while waiting for {what}"
                )));
            }
        }
    }
}

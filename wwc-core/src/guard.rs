//! Single-flight executor for remote operations.
//!
//! An [`AsyncGuard`] allows at most one in-flight call at a time. A call made
//! while another is running is rejected without ever polling its operation.
//! The busy flag is released by a drop guard, so it clears on success,
//! failure, panic, or when the invoking future is dropped mid-flight.

use std::future::Future;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::sync::lock;

/// Result of a guarded invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome<T> {
    /// The operation ran and succeeded.
    Completed(T),
    /// The operation ran and failed; the error is also kept as the guard's last error.
    Failed(RemoteError),
    /// Another call was in flight; nothing was issued.
    Rejected,
}

impl<T> GuardOutcome<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            GuardOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, GuardOutcome::Completed(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, GuardOutcome::Rejected)
    }
}

/// A failure recorded by a guard, tagged with its occurrence number.
///
/// Two failures with identical messages are still distinct occurrences.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardFailure {
    pub occurrence: u64,
    pub error: RemoteError,
}

#[derive(Debug, Default)]
struct GuardState {
    busy: bool,
    last_error: Option<GuardFailure>,
    failures: u64,
}

#[derive(Debug)]
pub struct AsyncGuard {
    name: &'static str,
    state: Mutex<GuardState>,
}

/// Clears the busy flag when dropped.
struct BusyRelease<'a> {
    state: &'a Mutex<GuardState>,
}

impl Drop for BusyRelease<'_> {
    fn drop(&mut self) {
        lock(self.state).busy = false;
    }
}

impl AsyncGuard {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(GuardState::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.state).busy
    }

    pub fn last_error(&self) -> Option<RemoteError> {
        lock(&self.state).last_error.as_ref().map(|f| f.error.clone())
    }

    /// Last failure together with its occurrence number.
    pub fn last_failure(&self) -> Option<GuardFailure> {
        lock(&self.state).last_error.clone()
    }

    /// Run `operation` unless a call is already in flight.
    ///
    /// `operation` is only constructed and polled when the guard is idle.
    pub async fn invoke<F, Fut, T>(&self, operation: F) -> GuardOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, RemoteError>>,
    {
        {
            let mut state = lock(&self.state);
            if state.busy {
                debug!(guard = self.name, "Call rejected, another is in flight");
                return GuardOutcome::Rejected;
            }
            state.busy = true;
            state.last_error = None;
        }
        let _release = BusyRelease { state: &self.state };

        match operation().await {
            Ok(value) => GuardOutcome::Completed(value),
            Err(error) => {
                warn!(guard = self.name, error = %error, "Guarded call failed");
                let mut state = lock(&self.state);
                state.failures += 1;
                state.last_error = Some(GuardFailure {
                    occurrence: state.failures,
                    error: error.clone(),
                });
                GuardOutcome::Failed(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn rejected(message: &str) -> RemoteError {
        RemoteError::Rejected {
            message: message.into(),
        }
    }

    #[tokio::test]
    async fn test_success_returns_value_and_clears_busy() {
        let guard = AsyncGuard::new("test");
        let outcome = guard.invoke(|| async { Ok::<_, RemoteError>(7) }).await;
        assert_eq!(outcome, GuardOutcome::Completed(7));
        assert!(!guard.is_busy());
        assert!(guard.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failure_records_error_and_allows_retry() {
        let guard = AsyncGuard::new("test");
        let outcome: GuardOutcome<()> = guard.invoke(|| async { Err(rejected("boom")) }).await;
        assert_eq!(outcome, GuardOutcome::Failed(rejected("boom")));
        assert!(!guard.is_busy());
        assert_eq!(guard.last_error(), Some(rejected("boom")));

        let outcome = guard.invoke(|| async { Ok::<_, RemoteError>(1) }).await;
        assert!(outcome.is_completed());
        assert!(guard.last_error().is_none());
    }

    #[tokio::test]
    async fn test_second_call_while_busy_is_rejected() {
        let guard = AsyncGuard::new("test");
        let started = AtomicUsize::new(0);

        let slow = guard.invoke(|| async {
            started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, RemoteError>("first")
        });
        let fast = guard.invoke(|| async {
            started.fetch_add(1, Ordering::SeqCst);
            Ok::<_, RemoteError>("second")
        });

        let (a, b) = tokio::join!(slow, fast);
        assert_eq!(a, GuardOutcome::Completed("first"));
        assert_eq!(b, GuardOutcome::Rejected);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropped_call_releases_busy() {
        let guard = AsyncGuard::new("test");
        let pending = guard.invoke(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, RemoteError>(())
        });
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());
        assert!(!guard.is_busy());
    }

    #[tokio::test]
    async fn test_identical_failures_are_distinct_occurrences() {
        let guard = AsyncGuard::new("test");
        let _: GuardOutcome<()> = guard.invoke(|| async { Err(rejected("same")) }).await;
        let first = guard.last_failure().unwrap();
        let _: GuardOutcome<()> = guard.invoke(|| async { Err(rejected("same")) }).await;
        let second = guard.last_failure().unwrap();
        assert_eq!(first.error, second.error);
        assert_ne!(first.occurrence, second.occurrence);
    }
}

//! Surfacing remote failures to the user exactly once.

use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use crate::error::RemoteError;
use crate::guard::AsyncGuard;
use crate::sync::lock;

/// Blocking acknowledgment dialog supplied by the host.
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, error: &RemoteError);
}

/// Notifier that only logs. Used when the host has no dialog surface.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, title: &str, error: &RemoteError) {
        warn!(title, error = %error, "Remote operation failed");
    }
}

/// Remembers which guard failures were already shown.
///
/// Keyed by guard name so one latch can watch several guards.
#[derive(Debug, Default)]
pub struct AlertLatch {
    shown: Mutex<HashMap<&'static str, u64>>,
}

impl AlertLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alert on the guard's latest failure if it has not been shown yet.
    /// Returns whether an alert was raised.
    pub fn surface(&self, guard: &AsyncGuard, title: &str, notifier: &dyn Notifier) -> bool {
        let Some(failure) = guard.last_failure() else {
            return false;
        };
        {
            let mut shown = lock(&self.shown);
            if shown.get(guard.name()) == Some(&failure.occurrence) {
                return false;
            }
            shown.insert(guard.name(), failure.occurrence);
        }
        notifier.alert(title, &failure.error);
        true
    }
}

/// Notifier that records every alert it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<(String, RemoteError)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<(String, RemoteError)> {
        lock(&self.alerts).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, title: &str, error: &RemoteError) {
        lock(&self.alerts).push((title.to_string(), error.clone()));
    }
}

//! Event debouncing for live reload.
//!
//! A build touches many files in quick succession. The [`Debouncer`]
//! collapses such a burst into a single settle signal once no qualifying
//! event has arrived for the configured delay.

use std::path::PathBuf;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use super::watcher::ChangeEvent;

/// Cancellable single-shot timer.
///
/// Holds at most one deadline. Arming replaces any pending deadline.
#[derive(Debug, Default)]
pub(crate) struct SingleShotTimer {
    deadline: Option<Instant>,
}

impl SingleShotTimer {
    /// Arm the timer to fire `delay` from now, replacing any pending deadline.
    pub(crate) fn arm(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    /// Cancel the pending deadline. Returns `true` if one was pending.
    pub(crate) fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait until the timer fires, then disarm it.
    ///
    /// Never completes while the timer is disarmed. Cancel-safe: dropping the
    /// future before it completes leaves the deadline in place.
    pub(crate) async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

/// Summary of a burst that has settled.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Settled {
    /// Number of events coalesced into this signal.
    pub events: usize,
    /// Last changed path in the burst.
    pub last_path: Option<PathBuf>,
}

/// Collapses bursts of change events into one settle signal.
pub(crate) struct Debouncer {
    delay: Duration,
    timer: SingleShotTimer,
    events: usize,
    last_path: Option<PathBuf>,
}

impl Debouncer {
    /// Create a new debouncer with the specified quiet period.
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: SingleShotTimer::default(),
            events: 0,
            last_path: None,
        }
    }

    /// Record a qualifying event, restarting the quiet period.
    pub(crate) fn record(&mut self, event: &ChangeEvent) {
        self.timer.arm(self.delay);
        self.events += 1;
        self.last_path = Some(event.path.clone());
        tracing::trace!(
            path = %event.path.display(),
            kind = ?event.kind,
            events = self.events,
            "Debounce window restarted"
        );
    }

    /// Whether a burst is waiting to settle.
    pub(crate) fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    /// Drop the pending burst without signalling.
    pub(crate) fn cancel(&mut self) {
        if self.timer.cancel() {
            tracing::debug!(events = self.events, "Cancelled pending debounce window");
        }
        self.events = 0;
        self.last_path = None;
    }

    /// Wait for the pending burst to settle.
    ///
    /// Completes once per burst and resets state so the next event starts a
    /// fresh window. Never completes while nothing is pending.
    pub(crate) async fn settled(&mut self) -> Settled {
        self.timer.fired().await;
        Settled {
            events: std::mem::take(&mut self.events),
            last_path: self.last_path.take(),
        }
    }
}

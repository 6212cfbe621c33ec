//! Keepalive Scheduling
//!
//! While the connection is open the client periodically probes the liveness
//! endpoint, so an expired credential is noticed even though the socket
//! still looks healthy. The next keepalive is armed only after the previous
//! probe completes and only while the same connection is still open; a
//! dropped connection therefore never leaves a keepalive timer behind.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// Configuration for keepalive behavior.
#[derive(Debug, Clone)]
pub struct KeepaliveConfig {
    /// Interval between the end of one probe and the start of the next.
    pub interval: Duration,
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

impl KeepaliveConfig {
    /// Create a new configuration with a custom interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            interval: settings.keepalive_interval,
        }
    }
}

/// A single-shot timer carrying a tag (e.g. the connection generation).
///
/// At most one deadline is armed at a time; arming again replaces it.
/// Waiting on an unarmed timer never completes, which lets it sit in a
/// `tokio::select!` next to other branches.
#[derive(Debug)]
pub struct TaggedTimer<T> {
    armed: Option<(T, Pin<Box<Sleep>>)>,
}

impl<T: Copy> TaggedTimer<T> {
    /// Create an unarmed timer.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Arm the timer to fire after `delay`, replacing any earlier deadline.
    pub fn arm(&mut self, tag: T, delay: Duration) {
        let deadline = Instant::now() + delay;
        self.armed = Some((tag, Box::pin(tokio::time::sleep_until(deadline))));
    }

    /// Disarm the timer. Idempotent.
    pub fn cancel(&mut self) {
        self.armed = None;
    }

    /// Check if a deadline is armed.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Wait for the armed deadline and disarm, yielding its tag.
    ///
    /// Pends forever when nothing is armed.
    pub async fn fired(&mut self) -> T {
        match self.armed.as_mut() {
            Some((tag, sleep)) => {
                let tag = *tag;
                sleep.as_mut().await;
                self.armed = None;
                tag
            }
            None => std::future::pending().await,
        }
    }
}

impl<T> TaggedTimer<T> {
    /// Remaining time until the deadline, if armed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.armed
            .as_ref()
            .map(|(_, sleep)| sleep.deadline().saturating_duration_since(Instant::now()))
    }
}

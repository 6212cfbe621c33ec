//! Feed Status
//!
//! Connection status shared between the feed client (writer) and the health
//! endpoint (reader).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::connection::{ConnectionState, Liveness};

/// Shared, thread-safe view of the feed's health.
#[derive(Debug, Default)]
pub struct FeedStatus {
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    last_probe: RwLock<Option<(DateTime<Utc>, Liveness)>>,
    reconnect_attempts: AtomicU32,
    frames_received: AtomicU64,
    decode_failures: AtomicU64,
    item_count: AtomicUsize,
}

/// Shared handle to feed status.
pub type SharedFeedStatus = Arc<FeedStatus>;

impl FeedStatus {
    /// Create status for a feed that has not connected yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection state. Opening resets the reconnect counter.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Open {
            *self.last_connected_at.write() = Some(Utc::now());
            self.reconnect_attempts.store(0, Ordering::Relaxed);
        }
    }

    /// Record a scheduled reconnect attempt.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a received text frame.
    pub fn increment_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame that failed to decode.
    pub fn increment_decode_failures(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a probe outcome.
    pub fn record_probe(&self, liveness: Liveness) {
        *self.last_probe.write() = Some((Utc::now(), liveness));
    }

    /// Update the item count.
    pub fn set_item_count(&self, count: usize) {
        self.item_count.store(count, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// When the connection last opened.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Time and outcome of the last probe.
    #[must_use]
    pub fn last_probe(&self) -> Option<(DateTime<Utc>, Liveness)> {
        *self.last_probe.read()
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Text frames received.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Frames dropped because they did not decode.
    #[must_use]
    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    /// Items currently in the gallery.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }
}

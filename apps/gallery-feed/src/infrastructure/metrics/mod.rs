//! Prometheus Metrics Module
//!
//! Exposes feed metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: text frames received and frames dropped by the decoder
//! - **Items**: deltas applied and the current item count
//! - **Connection**: connection state, reconnects, probe outcomes, terminations
//! - **Latency**: delta application time
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::connection::{ConnectionState, Liveness};
use crate::domain::gallery::DeltaOutcome;
use crate::infrastructure::backend::session::ProbePurpose;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Later calls return the handle installed by the first.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    // Frame counters
    describe_counter!(
        "gallery_feed_frames_received_total",
        "Total text frames received from the backend"
    );
    describe_counter!(
        "gallery_feed_decode_failures_total",
        "Total frames dropped because they did not decode"
    );

    // Item metrics
    describe_counter!(
        "gallery_feed_deltas_applied_total",
        "Total deltas applied to the item collection"
    );
    describe_counter!(
        "gallery_feed_item_changes_total",
        "Item insertions, replacements and removals by kind"
    );
    describe_gauge!("gallery_feed_items", "Items currently in the gallery");

    // Connection metrics
    describe_gauge!(
        "gallery_feed_connection_state",
        "Connection state (0 = closed, 1 = connecting, 2 = open)"
    );
    describe_counter!(
        "gallery_feed_reconnects_total",
        "Total reconnection attempts scheduled"
    );
    describe_counter!(
        "gallery_feed_probes_issued_total",
        "Liveness probes issued by purpose"
    );
    describe_counter!(
        "gallery_feed_probes_total",
        "Liveness probe outcomes"
    );
    describe_counter!(
        "gallery_feed_session_terminations_total",
        "Sessions ended because the credential was rejected"
    );

    // Latency histograms
    describe_histogram!(
        "gallery_feed_delta_apply_seconds",
        "Time to decode and apply one frame"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a text frame received from the backend.
pub fn record_frame_received() {
    counter!("gallery_feed_frames_received_total").increment(1);
}

/// Record a frame dropped by the decoder.
pub fn record_decode_failure() {
    counter!("gallery_feed_decode_failures_total").increment(1);
}

/// Record one applied delta.
pub fn record_delta_applied(outcome: DeltaOutcome) {
    counter!("gallery_feed_deltas_applied_total").increment(1);

    for (kind, count) in [
        ("inserted", outcome.inserted),
        ("replaced", outcome.replaced),
        ("removed", outcome.removed),
    ] {
        if count > 0 {
            counter!("gallery_feed_item_changes_total", "kind" => kind)
                .increment(u64::try_from(count).unwrap_or(u64::MAX));
        }
    }
}

/// Update the item count.
#[allow(clippy::cast_precision_loss)]
pub fn set_items(count: usize) {
    gauge!("gallery_feed_items").set(count as f64);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    let value = match state {
        ConnectionState::Closed => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Open => 2.0,
    };
    gauge!("gallery_feed_connection_state").set(value);
}

/// Record a scheduled reconnection attempt.
pub fn record_reconnect() {
    counter!("gallery_feed_reconnects_total").increment(1);
}

/// Record a liveness probe outcome.
pub fn record_probe(liveness: Liveness) {
    counter!(
        "gallery_feed_probes_total",
        "outcome" => liveness.as_str()
    )
    .increment(1);
}

/// Record a probe issued for a purpose.
pub fn record_probe_issued(purpose: ProbePurpose) {
    counter!(
        "gallery_feed_probes_issued_total",
        "purpose" => purpose.as_str()
    )
    .increment(1);
}

/// Record a session termination.
pub fn record_session_terminated() {
    counter!("gallery_feed_session_terminations_total").increment(1);
}

/// Record delta processing duration.
pub fn record_apply_duration(duration: Duration) {
    histogram!("gallery_feed_delta_apply_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        // The metrics facade drops values when no recorder is installed.
        record_frame_received();
        record_decode_failure();
        record_delta_applied(DeltaOutcome {
            inserted: 2,
            replaced: 1,
            removed: 0,
        });
        set_items(3);
        set_connection_state(ConnectionState::Open);
        record_reconnect();
        record_probe(Liveness::Authorized);
        record_probe_issued(ProbePurpose::Keepalive);
        record_session_terminated();
        record_apply_duration(Duration::from_micros(10));
    }
}

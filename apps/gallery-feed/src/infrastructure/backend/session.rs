//! Feed Session State Machine
//!
//! Owns the connection lifecycle for one feed as a plain struct. Every event
//! (connection opened or closed, frame received, timer fired, probe
//! finished) goes through [`FeedSession::handle`], which updates the state
//! and returns the commands the driver must execute. The session itself
//! performs no I/O and never sleeps.
//!
//! # Lifecycle
//!
//! ```text
//!            Start / ReconnectDue
//!   Closed ───────────────────────▶ Connecting ──Opened──▶ Open
//!     ▲                                  │                  │
//!     └────────── Closed ◀───────────────┴──────────────────┘
//!        (probe → reconnect after backoff, or terminate)
//! ```
//!
//! Each connection attempt gets a fresh generation. Events tagged with an
//! older generation come from a detached connection and are ignored.

use std::time::Duration;

use crate::domain::connection::{ConnectionState, Liveness};
use crate::domain::gallery::{DeltaOutcome, ItemCollection};
use crate::infrastructure::backend::codec::DeltaCodec;
use crate::infrastructure::backend::keepalive::KeepaliveConfig;
use crate::infrastructure::backend::reconnect::{ReconnectConfig, ReconnectPolicy};

/// Connection attempt counter.
pub type Generation = u64;

/// Why a liveness probe was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbePurpose {
    /// The connection dropped; decides between reconnect and termination.
    Disconnect,
    /// Periodic check while the connection is open.
    Keepalive,
}

impl ProbePurpose {
    /// Label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::Keepalive => "keepalive",
        }
    }
}

/// Events fed into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedInput {
    /// Open the first connection.
    Start,
    /// The connection for `generation` is established.
    Opened {
        /// Connection attempt.
        generation: Generation,
    },
    /// A text frame arrived.
    Frame {
        /// Connection attempt.
        generation: Generation,
        /// Raw frame payload.
        text: String,
    },
    /// The connection closed, failed, or could not be opened.
    Closed {
        /// Connection attempt.
        generation: Generation,
        /// Close reason or error, if any.
        reason: Option<String>,
    },
    /// A liveness probe finished.
    ProbeCompleted {
        /// Why it was issued.
        purpose: ProbePurpose,
        /// Connection attempt it was issued for.
        generation: Generation,
        /// Outcome.
        liveness: Liveness,
    },
    /// The reconnect delay elapsed.
    ReconnectDue,
    /// The keepalive interval elapsed.
    KeepaliveDue {
        /// Connection attempt the timer was armed for.
        generation: Generation,
    },
    /// The build fingerprint request finished.
    FingerprintFetched {
        /// Connection attempt it was issued for.
        generation: Generation,
        /// Fingerprint, or `None` if the request failed.
        fingerprint: Option<String>,
    },
    /// Tear the session down.
    Stop,
}

/// Side effects requested by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    /// Open a new connection tagged with `generation`.
    Connect {
        /// Connection attempt.
        generation: Generation,
    },
    /// Issue a liveness probe.
    Probe {
        /// Why.
        purpose: ProbePurpose,
        /// Connection attempt it belongs to.
        generation: Generation,
    },
    /// Arm the reconnect timer.
    ScheduleReconnect {
        /// Backoff delay.
        delay: Duration,
    },
    /// Arm the keepalive timer.
    ScheduleKeepalive {
        /// Connection attempt the timer belongs to.
        generation: Generation,
        /// Keepalive interval.
        delay: Duration,
    },
    /// Disarm the reconnect timer.
    CancelReconnect,
    /// Disarm the keepalive timer.
    CancelKeepalive,
    /// Fetch the build fingerprint.
    FetchFingerprint {
        /// Connection attempt it belongs to.
        generation: Generation,
    },
    /// Detach and drop the current connection.
    Release,
    /// A delta was applied; publish the item snapshot.
    PublishItems {
        /// What the delta changed.
        outcome: DeltaOutcome,
    },
    /// Publish a connection state change.
    PublishState(ConnectionState),
    /// A frame could not be decoded and was dropped.
    FrameRejected {
        /// Decode error.
        reason: String,
    },
    /// The credential is no longer valid.
    TerminateSession,
    /// The backend build changed since the first open.
    NotifyBackendChanged {
        /// Fingerprint remembered so far.
        previous: String,
        /// Fingerprint just fetched.
        current: String,
    },
}

/// Connection manager for one gallery feed.
#[derive(Debug)]
pub struct FeedSession {
    state: ConnectionState,
    generation: Generation,
    pending_reconnect: bool,
    awaiting_probe: bool,
    terminated: bool,
    stopped: bool,
    reconnect: ReconnectPolicy,
    keepalive: KeepaliveConfig,
    codec: DeltaCodec,
    items: ItemCollection,
    fingerprint: Option<String>,
}

impl FeedSession {
    /// Create a closed session.
    #[must_use]
    pub fn new(reconnect: ReconnectConfig, keepalive: KeepaliveConfig) -> Self {
        Self {
            state: ConnectionState::Closed,
            generation: 0,
            pending_reconnect: false,
            awaiting_probe: false,
            terminated: false,
            stopped: false,
            reconnect: ReconnectPolicy::new(reconnect),
            keepalive,
            codec: DeltaCodec::new(),
            items: ItemCollection::new(),
            fingerprint: None,
        }
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Generation of the current (or last) connection attempt.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether a reconnect is scheduled.
    #[must_use]
    pub const fn pending_reconnect(&self) -> bool {
        self.pending_reconnect
    }

    /// Whether the session ended because the credential was rejected.
    #[must_use]
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Whether the session was stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the session will never connect again.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.terminated || self.stopped
    }

    /// Current items, newest first.
    #[must_use]
    pub const fn items(&self) -> &ItemCollection {
        &self.items
    }

    /// Build fingerprint remembered from earlier opens.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&str> {
        self.fingerprint.as_deref()
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.reconnect.attempt_count()
    }

    /// Handle one event and return the commands to execute, in order.
    pub fn handle(&mut self, input: FeedInput) -> Vec<FeedCommand> {
        if self.is_finished() && input != FeedInput::Stop {
            return Vec::new();
        }

        match input {
            FeedInput::Start => self.on_start(),
            FeedInput::Opened { generation } => self.on_opened(generation),
            FeedInput::Frame { generation, text } => self.on_frame(generation, &text),
            FeedInput::Closed { generation, reason } => self.on_closed(generation, reason),
            FeedInput::ProbeCompleted {
                purpose: ProbePurpose::Disconnect,
                generation,
                liveness,
            } => self.on_disconnect_probe(generation, liveness),
            FeedInput::ProbeCompleted {
                purpose: ProbePurpose::Keepalive,
                generation,
                liveness,
            } => self.on_keepalive_probe(generation, liveness),
            FeedInput::ReconnectDue => self.on_reconnect_due(),
            FeedInput::KeepaliveDue { generation } => self.on_keepalive_due(generation),
            FeedInput::FingerprintFetched {
                generation,
                fingerprint,
            } => self.on_fingerprint(generation, fingerprint),
            FeedInput::Stop => self.on_stop(),
        }
    }

    fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    fn connect(&mut self) -> Vec<FeedCommand> {
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        vec![
            FeedCommand::PublishState(ConnectionState::Connecting),
            FeedCommand::Connect {
                generation: self.generation,
            },
        ]
    }

    fn on_start(&mut self) -> Vec<FeedCommand> {
        let idle = self.state == ConnectionState::Closed
            && !self.pending_reconnect
            && !self.awaiting_probe;
        if !idle {
            return Vec::new();
        }
        self.connect()
    }

    fn on_opened(&mut self, generation: Generation) -> Vec<FeedCommand> {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            return Vec::new();
        }

        self.state = ConnectionState::Open;
        self.reconnect.reset();

        vec![
            FeedCommand::PublishState(ConnectionState::Open),
            FeedCommand::FetchFingerprint { generation },
            FeedCommand::ScheduleKeepalive {
                generation,
                delay: self.keepalive.interval,
            },
        ]
    }

    fn on_frame(&mut self, generation: Generation, text: &str) -> Vec<FeedCommand> {
        if !self.is_current(generation) || self.state != ConnectionState::Open {
            return Vec::new();
        }

        match self.codec.decode(text) {
            Ok(delta) => {
                let outcome = self.items.apply(&delta);
                vec![FeedCommand::PublishItems { outcome }]
            }
            Err(e) => vec![FeedCommand::FrameRejected {
                reason: e.to_string(),
            }],
        }
    }

    fn on_closed(&mut self, generation: Generation, reason: Option<String>) -> Vec<FeedCommand> {
        if !self.is_current(generation) || self.state == ConnectionState::Closed {
            return Vec::new();
        }

        tracing::debug!(generation, reason = reason.as_deref(), "Connection closed");

        self.state = ConnectionState::Closed;
        self.awaiting_probe = true;

        vec![
            FeedCommand::CancelKeepalive,
            FeedCommand::Release,
            FeedCommand::PublishState(ConnectionState::Closed),
            FeedCommand::Probe {
                purpose: ProbePurpose::Disconnect,
                generation,
            },
        ]
    }

    fn on_disconnect_probe(
        &mut self,
        generation: Generation,
        liveness: Liveness,
    ) -> Vec<FeedCommand> {
        if !self.is_current(generation) || !self.awaiting_probe {
            return Vec::new();
        }
        self.awaiting_probe = false;

        if liveness.is_unauthorized() {
            return self.terminate();
        }

        if self.pending_reconnect {
            return Vec::new();
        }
        self.pending_reconnect = true;

        vec![FeedCommand::ScheduleReconnect {
            delay: self.reconnect.next_delay(),
        }]
    }

    fn on_keepalive_probe(
        &mut self,
        generation: Generation,
        liveness: Liveness,
    ) -> Vec<FeedCommand> {
        // A dead credential ends the session whichever connection asked.
        if liveness.is_unauthorized() {
            return self.terminate();
        }

        if !self.is_current(generation) || self.state != ConnectionState::Open {
            return Vec::new();
        }

        vec![FeedCommand::ScheduleKeepalive {
            generation,
            delay: self.keepalive.interval,
        }]
    }

    fn on_reconnect_due(&mut self) -> Vec<FeedCommand> {
        if !self.pending_reconnect {
            return Vec::new();
        }
        self.pending_reconnect = false;
        self.connect()
    }

    fn on_keepalive_due(&self, generation: Generation) -> Vec<FeedCommand> {
        if !self.is_current(generation) || self.state != ConnectionState::Open {
            return Vec::new();
        }

        vec![FeedCommand::Probe {
            purpose: ProbePurpose::Keepalive,
            generation,
        }]
    }

    // The fingerprint describes the backend, not the connection, so a result
    // that arrives after its connection dropped still counts.
    fn on_fingerprint(
        &mut self,
        generation: Generation,
        fingerprint: Option<String>,
    ) -> Vec<FeedCommand> {
        let Some(current) = fingerprint else {
            tracing::debug!(generation, "Fingerprint unavailable");
            return Vec::new();
        };

        match self.fingerprint.as_deref() {
            None => {
                self.fingerprint = Some(current);
                Vec::new()
            }
            Some(previous) if previous != current => {
                let previous = previous.to_string();
                self.fingerprint = Some(current.clone());
                vec![FeedCommand::NotifyBackendChanged { previous, current }]
            }
            Some(_) => Vec::new(),
        }
    }

    fn terminate(&mut self) -> Vec<FeedCommand> {
        self.terminated = true;
        self.pending_reconnect = false;
        self.awaiting_probe = false;

        let mut commands = vec![
            FeedCommand::CancelReconnect,
            FeedCommand::CancelKeepalive,
            FeedCommand::Release,
        ];
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Closed;
            commands.push(FeedCommand::PublishState(ConnectionState::Closed));
        }
        commands.push(FeedCommand::TerminateSession);
        commands
    }

    fn on_stop(&mut self) -> Vec<FeedCommand> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;
        self.pending_reconnect = false;
        self.awaiting_probe = false;

        let mut commands = vec![
            FeedCommand::CancelReconnect,
            FeedCommand::CancelKeepalive,
            FeedCommand::Release,
        ];
        if self.state != ConnectionState::Closed {
            self.state = ConnectionState::Closed;
            commands.push(FeedCommand::PublishState(ConnectionState::Closed));
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> FeedSession {
        FeedSession::new(ReconnectConfig::default(), KeepaliveConfig::default())
    }

    fn scheduled_reconnects(commands: &[FeedCommand]) -> Vec<Duration> {
        commands
            .iter()
            .filter_map(|c| match c {
                FeedCommand::ScheduleReconnect { delay } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    fn connects(commands: &[FeedCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, FeedCommand::Connect { .. }))
            .count()
    }

    fn closed(generation: Generation) -> FeedInput {
        FeedInput::Closed {
            generation,
            reason: None,
        }
    }

    fn disconnect_probe(generation: Generation, liveness: Liveness) -> FeedInput {
        FeedInput::ProbeCompleted {
            purpose: ProbePurpose::Disconnect,
            generation,
            liveness,
        }
    }

    fn keepalive_probe(generation: Generation, liveness: Liveness) -> FeedInput {
        FeedInput::ProbeCompleted {
            purpose: ProbePurpose::Keepalive,
            generation,
            liveness,
        }
    }

    /// Start and open the first connection; returns its generation.
    fn open(session: &mut FeedSession) -> Generation {
        session.handle(FeedInput::Start);
        let generation = session.generation();
        session.handle(FeedInput::Opened { generation });
        generation
    }

    #[test]
    fn start_connects_once() {
        let mut session = session();

        let commands = session.handle(FeedInput::Start);
        assert_eq!(
            commands,
            vec![
                FeedCommand::PublishState(ConnectionState::Connecting),
                FeedCommand::Connect { generation: 1 },
            ]
        );
        assert_eq!(session.state(), ConnectionState::Connecting);

        assert!(session.handle(FeedInput::Start).is_empty());
    }

    #[test]
    fn open_starts_keepalive_and_integrity_check() {
        let mut session = session();
        session.handle(FeedInput::Start);

        let commands = session.handle(FeedInput::Opened { generation: 1 });
        assert_eq!(
            commands,
            vec![
                FeedCommand::PublishState(ConnectionState::Open),
                FeedCommand::FetchFingerprint { generation: 1 },
                FeedCommand::ScheduleKeepalive {
                    generation: 1,
                    delay: Duration::from_secs(60),
                },
            ]
        );
        assert!(session.state().is_open());
    }

    #[test]
    fn frames_apply_deltas() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(FeedInput::Frame {
            generation,
            text: r#"{"added":[["b.jpg",1],["a.jpg",3]]}"#.to_string(),
        });

        assert_eq!(commands.len(), 1);
        assert!(matches!(commands[0], FeedCommand::PublishItems { .. }));
        let names: Vec<_> = session.items().names().collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn malformed_frame_is_dropped() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(FeedInput::Frame {
            generation,
            text: "not json".to_string(),
        });

        assert!(matches!(
            commands.as_slice(),
            [FeedCommand::FrameRejected { .. }]
        ));
        assert!(session.state().is_open());
        assert!(session.items().is_empty());
    }

    #[test]
    fn close_probes_then_reconnects() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(closed(generation));
        assert_eq!(
            commands,
            vec![
                FeedCommand::CancelKeepalive,
                FeedCommand::Release,
                FeedCommand::PublishState(ConnectionState::Closed),
                FeedCommand::Probe {
                    purpose: ProbePurpose::Disconnect,
                    generation,
                },
            ]
        );

        let commands = session.handle(disconnect_probe(generation, Liveness::Authorized));
        assert_eq!(
            commands,
            vec![FeedCommand::ScheduleReconnect {
                delay: Duration::from_millis(500)
            }]
        );
        assert!(session.pending_reconnect());

        let commands = session.handle(FeedInput::ReconnectDue);
        assert_eq!(connects(&commands), 1);
        assert_eq!(session.generation(), generation + 1);
        assert!(!session.pending_reconnect());
    }

    #[test]
    fn backoff_grows_across_failed_attempts() {
        let mut session = session();
        let mut generation = open(&mut session);
        let mut delays = Vec::new();

        for _ in 0..5 {
            session.handle(closed(generation));
            let commands = session.handle(disconnect_probe(generation, Liveness::Unknown));
            delays.extend(scheduled_reconnects(&commands));
            session.handle(FeedInput::ReconnectDue);
            generation = session.generation();
        }

        let millis: Vec<u128> = delays.iter().map(Duration::as_millis).collect();
        assert_eq!(millis, vec![500, 1000, 2000, 3000, 3000]);
    }

    #[test]
    fn successful_open_resets_backoff() {
        let mut session = session();
        let mut generation = open(&mut session);

        for _ in 0..3 {
            session.handle(closed(generation));
            session.handle(disconnect_probe(generation, Liveness::Unknown));
            session.handle(FeedInput::ReconnectDue);
            generation = session.generation();
        }
        session.handle(FeedInput::Opened { generation });
        assert_eq!(session.reconnect_attempts(), 0);

        session.handle(closed(generation));
        let commands = session.handle(disconnect_probe(generation, Liveness::Unknown));
        assert_eq!(
            scheduled_reconnects(&commands),
            vec![Duration::from_millis(500)]
        );
    }

    #[test]
    fn duplicate_close_schedules_one_reconnect() {
        let mut session = session();
        let generation = open(&mut session);

        let first = session.handle(closed(generation));
        let second = session.handle(FeedInput::Closed {
            generation,
            reason: Some("error after close".to_string()),
        });
        assert_eq!(first.len(), 4);
        assert!(second.is_empty());

        let mut commands = session.handle(disconnect_probe(generation, Liveness::Unknown));
        // A late second probe result must not schedule again.
        commands.extend(session.handle(disconnect_probe(generation, Liveness::Unknown)));
        commands.extend(session.handle(closed(generation)));
        assert_eq!(scheduled_reconnects(&commands).len(), 1);

        let commands = session.handle(FeedInput::ReconnectDue);
        let repeated = session.handle(FeedInput::ReconnectDue);
        assert_eq!(connects(&commands) + connects(&repeated), 1);
    }

    #[test]
    fn unauthorized_after_disconnect_terminates_without_reconnect() {
        let mut session = session();
        let generation = open(&mut session);
        session.handle(closed(generation));

        let commands = session.handle(disconnect_probe(generation, Liveness::Unauthorized));

        assert!(scheduled_reconnects(&commands).is_empty());
        assert_eq!(
            commands
                .iter()
                .filter(|c| **c == FeedCommand::TerminateSession)
                .count(),
            1
        );
        assert!(session.is_terminated());

        // Nothing revives a terminated session.
        assert!(session.handle(FeedInput::ReconnectDue).is_empty());
        assert!(session.handle(FeedInput::Start).is_empty());
        assert!(
            session
                .handle(disconnect_probe(generation, Liveness::Unauthorized))
                .is_empty()
        );
    }

    #[test]
    fn keepalive_cycle_rearms_while_open() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(FeedInput::KeepaliveDue { generation });
        assert_eq!(
            commands,
            vec![FeedCommand::Probe {
                purpose: ProbePurpose::Keepalive,
                generation,
            }]
        );

        let commands = session.handle(keepalive_probe(generation, Liveness::Unknown));
        assert_eq!(
            commands,
            vec![FeedCommand::ScheduleKeepalive {
                generation,
                delay: Duration::from_secs(60),
            }]
        );
    }

    #[test]
    fn keepalive_not_rearmed_after_close() {
        let mut session = session();
        let generation = open(&mut session);

        session.handle(FeedInput::KeepaliveDue { generation });
        session.handle(closed(generation));

        let commands = session.handle(keepalive_probe(generation, Liveness::Authorized));
        assert!(commands.is_empty());
        assert!(
            session
                .handle(FeedInput::KeepaliveDue { generation })
                .is_empty()
        );
    }

    #[test]
    fn keepalive_unauthorized_terminates_open_session() {
        let mut session = session();
        let generation = open(&mut session);
        session.handle(FeedInput::KeepaliveDue { generation });

        let commands = session.handle(keepalive_probe(generation, Liveness::Unauthorized));

        assert_eq!(
            commands,
            vec![
                FeedCommand::CancelReconnect,
                FeedCommand::CancelKeepalive,
                FeedCommand::Release,
                FeedCommand::PublishState(ConnectionState::Closed),
                FeedCommand::TerminateSession,
            ]
        );
        assert_eq!(session.state(), ConnectionState::Closed);
    }

    #[test]
    fn stale_generation_events_are_ignored() {
        let mut session = session();
        let old = open(&mut session);
        session.handle(closed(old));
        session.handle(disconnect_probe(old, Liveness::Unknown));
        session.handle(FeedInput::ReconnectDue);
        let current = session.generation();
        session.handle(FeedInput::Opened { generation: current });

        let stale = [
            FeedInput::Frame {
                generation: old,
                text: r#"{"added":[["x.jpg",1]]}"#.to_string(),
            },
            closed(old),
            FeedInput::Opened { generation: old },
            FeedInput::KeepaliveDue { generation: old },
            keepalive_probe(old, Liveness::Authorized),
        ];
        for input in stale {
            assert!(session.handle(input).is_empty());
        }

        assert!(session.items().is_empty());
        assert!(session.state().is_open());
    }

    #[test]
    fn late_fingerprint_still_counts() {
        let mut session = session();
        let first = open(&mut session);
        session.handle(closed(first));

        session.handle(FeedInput::FingerprintFetched {
            generation: first,
            fingerprint: Some("v1".to_string()),
        });
        assert_eq!(session.fingerprint(), Some("v1"));
    }

    #[test]
    fn stop_is_idempotent() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(FeedInput::Stop);
        assert_eq!(
            commands,
            vec![
                FeedCommand::CancelReconnect,
                FeedCommand::CancelKeepalive,
                FeedCommand::Release,
                FeedCommand::PublishState(ConnectionState::Closed),
            ]
        );
        assert!(session.handle(FeedInput::Stop).is_empty());

        // Events from the released connection no longer matter.
        assert!(session.handle(closed(generation)).is_empty());
        assert!(
            session
                .handle(FeedInput::KeepaliveDue { generation })
                .is_empty()
        );
    }

    #[test]
    fn stop_during_backoff_cancels_reconnect() {
        let mut session = session();
        let generation = open(&mut session);
        session.handle(closed(generation));
        session.handle(disconnect_probe(generation, Liveness::Unknown));

        let commands = session.handle(FeedInput::Stop);
        assert!(commands.contains(&FeedCommand::CancelReconnect));
        assert!(session.handle(FeedInput::ReconnectDue).is_empty());
    }

    #[test]
    fn fingerprint_change_notifies() {
        let mut session = session();
        let first = open(&mut session);

        let commands = session.handle(FeedInput::FingerprintFetched {
            generation: first,
            fingerprint: Some("v1".to_string()),
        });
        assert!(commands.is_empty());
        assert_eq!(session.fingerprint(), Some("v1"));

        session.handle(closed(first));
        session.handle(disconnect_probe(first, Liveness::Authorized));
        session.handle(FeedInput::ReconnectDue);
        let second = session.generation();
        session.handle(FeedInput::Opened { generation: second });

        let commands = session.handle(FeedInput::FingerprintFetched {
            generation: second,
            fingerprint: Some("v2".to_string()),
        });
        assert_eq!(
            commands,
            vec![FeedCommand::NotifyBackendChanged {
                previous: "v1".to_string(),
                current: "v2".to_string(),
            }]
        );
    }

    #[test]
    fn failed_fingerprint_is_ignored() {
        let mut session = session();
        let generation = open(&mut session);

        let commands = session.handle(FeedInput::FingerprintFetched {
            generation,
            fingerprint: None,
        });
        assert!(commands.is_empty());
        assert!(session.fingerprint().is_none());
    }

    #[test]
    fn failed_connect_goes_through_probe() {
        let mut session = session();
        session.handle(FeedInput::Start);
        let generation = session.generation();

        let commands = session.handle(FeedInput::Closed {
            generation,
            reason: Some("connection refused".to_string()),
        });
        assert!(commands.contains(&FeedCommand::Probe {
            purpose: ProbePurpose::Disconnect,
            generation,
        }));
    }
}

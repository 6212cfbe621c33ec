//! Gallery Feed Client
//!
//! Runs a [`FeedSession`] on one tokio task. The session decides; this
//! driver carries out its commands:
//!
//! - one connection task per generation, forwarding frames as inputs
//! - probe and fingerprint requests spawned into a `JoinSet`
//! - the reconnect and keepalive timers as [`TaggedTimer`]s
//! - item snapshots and connection state published on `watch` channels
//!
//! Cancelling the token stops the session, aborts the connection task
//! (dropping the socket), disarms both timers and aborts in-flight requests.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::application::ports::{
    FeedConnector, FingerprintSource, InboundFrame, LivenessProbe, SessionHandler,
};
use crate::domain::connection::{ConnectionState, Credential};
use crate::domain::gallery::ItemCollection;
use crate::infrastructure::backend::keepalive::{KeepaliveConfig, TaggedTimer};
use crate::infrastructure::backend::reconnect::ReconnectConfig;
use crate::infrastructure::backend::session::{
    FeedCommand, FeedInput, FeedSession, Generation, ProbePurpose,
};
use crate::infrastructure::backend::status::{FeedStatus, SharedFeedStatus};
use crate::infrastructure::metrics;

const INPUT_BUFFER: usize = 256;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur building the feed client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// The credential is empty.
    #[error("credential is empty")]
    EmptyCredential,
}

// =============================================================================
// Configuration
// =============================================================================

/// Timing configuration for the feed client.
#[derive(Debug, Clone, Default)]
pub struct FeedClientConfig {
    /// Reconnection backoff.
    pub reconnect: ReconnectConfig,
    /// Keepalive interval.
    pub keepalive: KeepaliveConfig,
}

impl FeedClientConfig {
    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            reconnect: ReconnectConfig::from_feed_settings(settings),
            keepalive: KeepaliveConfig::from_feed_settings(settings),
        }
    }
}

/// Adapters the client talks to.
#[derive(Clone)]
pub struct FeedPorts {
    /// Opens the persistent connection.
    pub connector: Arc<dyn FeedConnector>,
    /// Checks the credential out of band.
    pub probe: Arc<dyn LivenessProbe>,
    /// Fetches the backend build fingerprint.
    pub fingerprint: Arc<dyn FingerprintSource>,
    /// Receives termination and backend-change notifications.
    pub handler: Arc<dyn SessionHandler>,
}

impl std::fmt::Debug for FeedPorts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedPorts").finish_non_exhaustive()
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The cancellation token fired.
    Stopped,
    /// The credential was rejected; the session handler was notified.
    Terminated,
}

// =============================================================================
// Gallery Feed Client
// =============================================================================

/// Live gallery feed for one credential.
#[derive(Debug)]
pub struct GalleryFeedClient {
    ports: FeedPorts,
    credential: Credential,
    config: FeedClientConfig,
    status: SharedFeedStatus,
    items_tx: watch::Sender<ItemCollection>,
    state_tx: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
}

impl GalleryFeedClient {
    /// Create a feed client.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is empty.
    pub fn new(
        ports: FeedPorts,
        credential: Credential,
        config: FeedClientConfig,
        cancel: CancellationToken,
    ) -> Result<Self, FeedClientError> {
        if credential.is_empty() {
            return Err(FeedClientError::EmptyCredential);
        }

        let (items_tx, _) = watch::channel(ItemCollection::new());
        let (state_tx, _) = watch::channel(ConnectionState::Closed);

        Ok(Self {
            ports,
            credential,
            config,
            status: Arc::new(FeedStatus::new()),
            items_tx,
            state_tx,
            cancel,
        })
    }

    /// Share an existing status handle (e.g. with the health server).
    #[must_use]
    pub fn with_status(mut self, status: SharedFeedStatus) -> Self {
        self.status = status;
        self
    }

    /// Status handle updated by this client.
    #[must_use]
    pub fn status(&self) -> SharedFeedStatus {
        Arc::clone(&self.status)
    }

    /// Subscribe to item snapshots; one update per applied delta.
    #[must_use]
    pub fn subscribe_items(&self) -> watch::Receiver<ItemCollection> {
        self.items_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Run the feed until cancelled or the session terminates.
    pub async fn run(&self) -> FeedOutcome {
        let (inputs_tx, mut inputs) = mpsc::channel::<FeedInput>(INPUT_BUFFER);
        let mut session = FeedSession::new(
            self.config.reconnect.clone(),
            self.config.keepalive.clone(),
        );
        let mut effects = Effects {
            client: self,
            inputs: inputs_tx,
            connection: None,
            connections: JoinSet::new(),
            reconnect: TaggedTimer::new(),
            keepalive: TaggedTimer::new(),
            requests: JoinSet::new(),
        };

        tracing::info!("Gallery feed starting");
        let commands = session.handle(FeedInput::Start);
        effects.execute(&session, commands);

        let outcome = loop {
            let input = tokio::select! {
                biased;
                () = self.cancel.cancelled() => FeedInput::Stop,
                () = effects.reconnect.fired() => FeedInput::ReconnectDue,
                generation = effects.keepalive.fired() => FeedInput::KeepaliveDue { generation },
                Some(input) = inputs.recv() => input,
                Some(_) = effects.requests.join_next(), if !effects.requests.is_empty() => continue,
                Some(_) = effects.connections.join_next(), if !effects.connections.is_empty() => {
                    continue;
                }
            };

            let is_frame = matches!(input, FeedInput::Frame { .. });
            let started = Instant::now();
            let commands = session.handle(input);
            if is_frame {
                metrics::record_apply_duration(started.elapsed());
            }
            effects.execute(&session, commands);

            if session.is_stopped() {
                tracing::info!("Gallery feed stopped");
                break FeedOutcome::Stopped;
            }
            if session.is_terminated() {
                break FeedOutcome::Terminated;
            }
        };

        effects.teardown().await;
        outcome
    }
}

// =============================================================================
// Command Execution
// =============================================================================

struct Effects<'a> {
    client: &'a GalleryFeedClient,
    inputs: mpsc::Sender<FeedInput>,
    connection: Option<AbortHandle>,
    connections: JoinSet<()>,
    reconnect: TaggedTimer<()>,
    keepalive: TaggedTimer<Generation>,
    requests: JoinSet<()>,
}

impl Effects<'_> {
    fn execute(&mut self, session: &FeedSession, commands: Vec<FeedCommand>) {
        for command in commands {
            match command {
                FeedCommand::Connect { generation } => self.connect(generation),
                FeedCommand::Probe {
                    purpose,
                    generation,
                } => self.probe(purpose, generation),
                FeedCommand::ScheduleReconnect { delay } => {
                    self.client.status.increment_reconnect_attempts();
                    metrics::record_reconnect();
                    tracing::info!(
                        attempt = session.reconnect_attempts(),
                        delay_ms = delay.as_millis(),
                        "Reconnecting to gallery feed"
                    );
                    self.reconnect.arm((), delay);
                }
                FeedCommand::ScheduleKeepalive { generation, delay } => {
                    self.keepalive.arm(generation, delay);
                }
                FeedCommand::CancelReconnect => self.reconnect.cancel(),
                FeedCommand::CancelKeepalive => self.keepalive.cancel(),
                FeedCommand::FetchFingerprint { generation } => self.fetch_fingerprint(generation),
                FeedCommand::Release => self.release(),
                FeedCommand::PublishItems { outcome } => {
                    let items = session.items();
                    tracing::debug!(
                        inserted = outcome.inserted,
                        replaced = outcome.replaced,
                        removed = outcome.removed,
                        total = items.len(),
                        "Delta applied"
                    );
                    metrics::record_delta_applied(outcome);
                    metrics::set_items(items.len());
                    self.client.status.set_item_count(items.len());
                    self.client.items_tx.send_replace(items.clone());
                }
                FeedCommand::PublishState(state) => {
                    tracing::debug!(state = state.as_str(), "Connection state changed");
                    metrics::set_connection_state(state);
                    self.client.status.set_state(state);
                    self.client.state_tx.send_replace(state);
                }
                FeedCommand::FrameRejected { reason } => {
                    tracing::warn!(error = %reason, "Dropping undecodable frame");
                    metrics::record_decode_failure();
                    self.client.status.increment_decode_failures();
                }
                FeedCommand::TerminateSession => {
                    tracing::warn!("Credential rejected, terminating session");
                    metrics::record_session_terminated();
                    self.client.ports.handler.session_terminated();
                }
                FeedCommand::NotifyBackendChanged { previous, current } => {
                    tracing::info!(%previous, %current, "Backend build changed");
                    self.client.ports.handler.backend_changed(&previous, &current);
                }
            }
        }
    }

    fn connect(&mut self, generation: Generation) {
        self.release();

        let attempt = Uuid::new_v4();
        let span = tracing::info_span!("feed_connection", %attempt, generation);
        let task = run_connection(
            Arc::clone(&self.client.ports.connector),
            self.client.credential.clone(),
            generation,
            self.inputs.clone(),
            Arc::clone(&self.client.status),
        );
        self.connection = Some(self.connections.spawn(task.instrument(span)));
    }

    fn release(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.abort();
        }
    }

    fn probe(&mut self, purpose: ProbePurpose, generation: Generation) {
        metrics::record_probe_issued(purpose);
        tracing::debug!(purpose = purpose.as_str(), generation, "Probing credential");

        let probe = Arc::clone(&self.client.ports.probe);
        let credential = self.client.credential.clone();
        let status = Arc::clone(&self.client.status);
        let inputs = self.inputs.clone();

        self.requests.spawn(async move {
            let liveness = probe.probe(&credential).await;
            status.record_probe(liveness);
            tracing::debug!(
                purpose = purpose.as_str(),
                liveness = liveness.as_str(),
                "Probe completed"
            );
            let _ = inputs
                .send(FeedInput::ProbeCompleted {
                    purpose,
                    generation,
                    liveness,
                })
                .await;
        });
    }

    fn fetch_fingerprint(&mut self, generation: Generation) {
        let source = Arc::clone(&self.client.ports.fingerprint);
        let inputs = self.inputs.clone();

        self.requests.spawn(async move {
            let fingerprint = source.fingerprint().await;
            let _ = inputs
                .send(FeedInput::FingerprintFetched {
                    generation,
                    fingerprint,
                })
                .await;
        });
    }

    async fn teardown(mut self) {
        self.release();
        self.reconnect.cancel();
        self.keepalive.cancel();
        self.requests.shutdown().await;
        // Waits until released sockets are actually dropped.
        self.connections.shutdown().await;
    }
}

/// Open one connection and forward its frames until it ends.
async fn run_connection(
    connector: Arc<dyn FeedConnector>,
    credential: Credential,
    generation: Generation,
    inputs: mpsc::Sender<FeedInput>,
    status: Arc<FeedStatus>,
) {
    let mut frames = match connector.connect(&credential).await {
        Ok(frames) => frames,
        Err(e) => {
            tracing::warn!(error = %e, "Feed connection failed");
            let _ = inputs
                .send(FeedInput::Closed {
                    generation,
                    reason: Some(e.to_string()),
                })
                .await;
            return;
        }
    };

    tracing::info!("Feed connection open");
    if inputs.send(FeedInput::Opened { generation }).await.is_err() {
        return;
    }

    let reason = loop {
        match frames.next().await {
            Some(Ok(InboundFrame::Text(text))) => {
                status.increment_frames();
                metrics::record_frame_received();
                if inputs
                    .send(FeedInput::Frame { generation, text })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Some(Ok(InboundFrame::Close(reason))) => break reason,
            Some(Err(e)) => break Some(e.to_string()),
            None => break None,
        }
    };

    tracing::info!(reason = reason.as_deref(), "Feed connection closed");
    let _ = inputs.send(FeedInput::Closed { generation, reason }).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures_util::stream;

    use super::*;
    use crate::application::ports::{
        FrameStream, MockFingerprintSource, MockLivenessProbe, MockSessionHandler, TransportError,
    };
    use crate::domain::connection::Liveness;

    /// Serves one text frame per connection, then drops it.
    struct FlakyConnector {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl FeedConnector for FlakyConnector {
        async fn connect(&self, _credential: &Credential) -> Result<FrameStream, TransportError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let frame = Ok(InboundFrame::Text(r#"{"added":[["a.jpg",1]]}"#.to_string()));
            Ok(stream::iter(vec![frame]).boxed())
        }
    }

    fn config() -> FeedClientConfig {
        FeedClientConfig {
            reconnect: ReconnectConfig::new(
                Duration::from_millis(10),
                Duration::from_millis(20),
                2.0,
                0.0,
            ),
            keepalive: KeepaliveConfig::new(Duration::from_secs(60)),
        }
    }

    fn fingerprints(values: Vec<&'static str>) -> MockFingerprintSource {
        let mut source = MockFingerprintSource::new();
        let mut values = values.into_iter();
        source
            .expect_fingerprint()
            .returning(move || values.next().map(str::to_string));
        source
    }

    #[test]
    fn empty_credential_rejected() {
        let ports = FeedPorts {
            connector: Arc::new(FlakyConnector {
                connects: AtomicUsize::new(0),
            }),
            probe: Arc::new(MockLivenessProbe::new()),
            fingerprint: Arc::new(MockFingerprintSource::new()),
            handler: Arc::new(MockSessionHandler::new()),
        };

        let result = GalleryFeedClient::new(
            ports,
            Credential::new("  "),
            config(),
            CancellationToken::new(),
        );
        assert!(matches!(result, Err(FeedClientError::EmptyCredential)));
    }

    #[tokio::test]
    async fn unauthorized_probe_terminates_once() {
        let mut probe = MockLivenessProbe::new();
        probe
            .expect_probe()
            .times(1)
            .returning(|_| Liveness::Unauthorized);

        let mut handler = MockSessionHandler::new();
        handler.expect_session_terminated().times(1).return_const(());

        let connector = Arc::new(FlakyConnector {
            connects: AtomicUsize::new(0),
        });
        let ports = FeedPorts {
            connector: connector.clone(),
            probe: Arc::new(probe),
            fingerprint: Arc::new(fingerprints(vec!["v1"])),
            handler: Arc::new(handler),
        };

        let client =
            GalleryFeedClient::new(ports, Credential::new("t"), config(), CancellationToken::new())
                .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(5), client.run())
            .await
            .unwrap();

        assert_eq!(outcome, FeedOutcome::Terminated);
        assert_eq!(connector.connects.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn changed_fingerprint_notifies_handler() {
        let mut probe = MockLivenessProbe::new();
        probe.expect_probe().returning(|_| Liveness::Unknown);

        let mut handler = MockSessionHandler::new();
        handler
            .expect_backend_changed()
            .withf(|previous, current| previous == "v1" && current == "v2")
            .times(1)
            .return_const(());
        handler.expect_session_terminated().never();

        let connector = Arc::new(FlakyConnector {
            connects: AtomicUsize::new(0),
        });
        let ports = FeedPorts {
            connector: connector.clone(),
            probe: Arc::new(probe),
            fingerprint: Arc::new(fingerprints(vec!["v1", "v2", "v2", "v2", "v2"])),
            handler: Arc::new(handler),
        };

        let cancel = CancellationToken::new();
        let client =
            GalleryFeedClient::new(ports, Credential::new("t"), config(), cancel.clone()).unwrap();

        let run = client.run();
        let wait = async {
            while connector.connects.load(Ordering::SeqCst) < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            cancel.cancel();
        };

        let (outcome, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(run, wait)
        })
        .await
        .unwrap();

        assert_eq!(outcome, FeedOutcome::Stopped);
    }
}

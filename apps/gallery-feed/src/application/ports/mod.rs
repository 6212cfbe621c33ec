//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `FeedConnector`: opens the persistent connection to the backend
//! - `LivenessProbe`: stateless credential check, distinct from the socket
//! - `FingerprintSource`: backend build fingerprint for the integrity check
//! - `Authenticator`: login/logout against the backend
//! - `CredentialStore`: persistence of the bearer token
//!
//! ## Driver Ports (Inbound)
//!
//! - `SessionHandler`: notified when the session ends or the backend changes

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::connection::{Credential, Liveness};

// =============================================================================
// Feed Connection
// =============================================================================

/// A frame received on the persistent connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// JSON text frame carrying a gallery delta.
    Text(String),
    /// Peer closed the connection, with an optional reason.
    Close(Option<String>),
}

/// Errors raised by the connection transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The endpoint URL could not be built.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Opening the connection failed.
    #[error("connection failed: {0}")]
    ConnectFailed(String),
    /// The established connection failed.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Stream of frames from one connection; it ends when the connection drops.
pub type FrameStream = BoxStream<'static, Result<InboundFrame, TransportError>>;

/// Opens the persistent connection, scoped to one credential.
#[async_trait]
pub trait FeedConnector: Send + Sync {
    /// Open a new connection and return its inbound frames.
    async fn connect(&self, credential: &Credential) -> Result<FrameStream, TransportError>;
}

// =============================================================================
// Liveness and Integrity
// =============================================================================

/// Answers "is this credential still valid?" without touching the socket.
///
/// Implementations never fail: every error resolves to a [`Liveness`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Probe the backend with the credential.
    async fn probe(&self, credential: &Credential) -> Liveness;
}

/// Fetches the backend's build fingerprint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    /// Current fingerprint, or `None` when it could not be fetched.
    async fn fingerprint(&self) -> Option<String>;
}

// =============================================================================
// Session Notifications
// =============================================================================

/// Receives session-level notifications from the feed client.
#[cfg_attr(test, mockall::automock)]
pub trait SessionHandler: Send + Sync {
    /// The credential was rejected; stored credentials must be cleared.
    fn session_terminated(&self);

    /// The backend reported a different build fingerprint than before.
    fn backend_changed(&self, previous: &str, current: &str) {
        let _ = (previous, current);
    }
}

// =============================================================================
// Authentication
// =============================================================================

/// Errors raised while logging in or out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The backend rejected the username/password.
    #[error("invalid credentials")]
    InvalidCredentials,
    /// The backend is restarting.
    #[error("service unavailable")]
    Unavailable,
    /// Unexpected response status.
    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Request(String),
    /// No username/password configured for login.
    #[error("no login configured")]
    NotConfigured,
}

impl AuthError {
    /// Whether retrying the same request later can succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Request(_))
    }
}

/// Exchanges a username/password for a bearer credential.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Log in and obtain a credential.
    async fn login(&self, username: &str, password: &str) -> Result<Credential, AuthError>;

    /// Revoke a credential.
    async fn logout(&self, credential: &Credential) -> Result<(), AuthError>;
}

// =============================================================================
// Credential Persistence
// =============================================================================

/// Errors raised by a credential store.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Underlying I/O failed.
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Simple key/value persistence for the bearer credential.
#[cfg_attr(test, mockall::automock)]
pub trait CredentialStore: Send + Sync {
    /// Load the stored credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load(&self) -> Result<Option<Credential>, CredentialStoreError>;

    /// Persist a credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn store(&self, credential: &Credential) -> Result<(), CredentialStoreError>;

    /// Remove the stored credential. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

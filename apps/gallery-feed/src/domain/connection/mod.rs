//! Connection Vocabulary
//!
//! States of the persistent connection, outcomes of a liveness probe, and
//! the bearer credential that scopes both.

use std::fmt;

/// Lifecycle state of the persistent connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is established and delivering frames.
    Open,
    /// No connection (initial state, after a drop, or after teardown).
    #[default]
    Closed,
}

impl ConnectionState {
    /// Check if the connection is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Lowercase name for logs and health output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Credential accepted; reconnecting is worthwhile.
    Authorized,
    /// Credential explicitly rejected; the session is over.
    Unauthorized,
    /// No usable answer; treated as a transient failure.
    Unknown,
}

impl Liveness {
    /// Map an HTTP status code to a liveness outcome.
    ///
    /// Only `200` authorizes and only `401` rejects; everything else is
    /// inconclusive.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            200 => Self::Authorized,
            401 => Self::Unauthorized,
            _ => Self::Unknown,
        }
    }

    /// Check if the probe rejected the credential.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Lowercase name for logs and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authorized => "authorized",
            Self::Unauthorized => "unauthorized",
            Self::Unknown => "unknown",
        }
    }
}

/// Bearer token identifying an authenticated session.
///
/// The `Debug` implementation redacts the token for safe logging.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw token. Surrounding whitespace is trimmed.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self(token.trim().to_string())
    }

    /// The raw token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    #[must_use]
    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Check if the token is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"[REDACTED]").finish()
    }
}

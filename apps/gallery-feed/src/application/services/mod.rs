//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `CredentialSession`: obtains the bearer credential (stored token or
//!   login) and clears it when the feed reports the session terminated

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    AuthError, Authenticator, CredentialStore, CredentialStoreError, SessionHandler,
};
use crate::domain::connection::Credential;

/// Errors raised while obtaining or releasing a credential.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Login or logout failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// The credential store failed.
    #[error(transparent)]
    Store(#[from] CredentialStoreError),
}

impl SessionError {
    /// Whether retrying later can succeed (backend restarting, network down).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Auth(e) => e.is_transient(),
            Self::Store(_) => false,
        }
    }
}

/// Username/password pair used to log in.
#[derive(Clone)]
pub struct Login {
    username: String,
    password: String,
}

impl Login {
    /// Create a login pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Owns the credential lifecycle around the feed.
pub struct CredentialSession {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn CredentialStore>,
    login: Option<Login>,
    terminations: AtomicU64,
    backend_changes: AtomicU64,
}

impl std::fmt::Debug for CredentialSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSession")
            .field("login", &self.login)
            .field("terminations", &self.terminations)
            .field("backend_changes", &self.backend_changes)
            .finish_non_exhaustive()
    }
}

impl CredentialSession {
    /// Create a session service.
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn CredentialStore>,
        login: Option<Login>,
    ) -> Self {
        Self {
            authenticator,
            store,
            login,
            terminations: AtomicU64::new(0),
            backend_changes: AtomicU64::new(0),
        }
    }

    /// Return the stored credential, or log in and store a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written, if no login
    /// is configured and nothing is stored, or if login fails.
    pub async fn credential(&self) -> Result<Credential, SessionError> {
        if let Some(credential) = self.store.load()? {
            tracing::debug!("Using stored credential");
            return Ok(credential);
        }

        let login = self.login.as_ref().ok_or(AuthError::NotConfigured)?;
        let credential = self
            .authenticator
            .login(&login.username, &login.password)
            .await?;
        self.store.store(&credential)?;
        Ok(credential)
    }

    /// Like [`credential`](Self::credential), but waits out transient login
    /// failures, sleeping `next_delay()` between attempts.
    ///
    /// Returns `Ok(None)` if `cancel` fires first.
    ///
    /// # Errors
    ///
    /// Returns the first non-transient error.
    pub async fn credential_with_retry(
        &self,
        mut next_delay: impl FnMut() -> Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<Credential>, SessionError> {
        loop {
            let result = tokio::select! {
                () = cancel.cancelled() => return Ok(None),
                result = self.credential() => result,
            };
            match result {
                Ok(credential) => return Ok(Some(credential)),
                Err(e) if e.is_transient() => {
                    let delay = next_delay();
                    tracing::warn!(
                        error = %e,
                        delay_ms = delay.as_millis(),
                        "Login failed, retrying"
                    );
                    tokio::select! {
                        () = cancel.cancelled() => return Ok(None),
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Revoke the stored credential and remove it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or the backend rejects the logout.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let Some(credential) = self.store.load()? else {
            return Ok(());
        };
        self.store.clear()?;
        self.authenticator.logout(&credential).await?;
        Ok(())
    }

    /// Whether a fresh login is possible without user input.
    #[must_use]
    pub const fn can_login(&self) -> bool {
        self.login.is_some()
    }

    /// Sessions terminated so far.
    #[must_use]
    pub fn terminations(&self) -> u64 {
        self.terminations.load(Ordering::Relaxed)
    }

    /// Backend build changes observed so far.
    #[must_use]
    pub fn backend_changes(&self) -> u64 {
        self.backend_changes.load(Ordering::Relaxed)
    }
}

impl SessionHandler for CredentialSession {
    fn session_terminated(&self) {
        self.terminations.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = self.store.clear() {
            tracing::error!(error = %e, "Failed to clear stored credential");
        }
    }

    fn backend_changed(&self, previous: &str, current: &str) {
        self.backend_changes.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(%previous, %current, "Backend was redeployed during the session");
    }
}

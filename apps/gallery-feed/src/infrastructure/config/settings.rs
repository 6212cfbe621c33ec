//! Feed Configuration Settings
//!
//! Configuration types for the gallery feed, loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::infrastructure::backend::endpoints::{BackendEndpoints, EndpointError};

/// Username/password used to obtain a bearer token.
#[derive(Clone)]
pub struct LoginSettings {
    username: String,
    password: String,
}

impl LoginSettings {
    /// Create new login settings.
    #[must_use]
    pub const fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    /// Get the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for LoginSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginSettings")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Feed connection timing.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Delay before the first reconnection attempt.
    pub reconnect_delay_base: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Jitter factor applied to reconnection delays (0 = none).
    pub reconnect_jitter: f64,
    /// Keepalive probe interval while connected.
    pub keepalive_interval: Duration,
    /// Request timeout for probe, fingerprint and login calls.
    pub probe_timeout: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_base: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_millis(3000),
            reconnect_delay_multiplier: 2.0,
            reconnect_jitter: 0.0,
            keepalive_interval: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    /// Backend routes.
    pub endpoints: BackendEndpoints,
    /// Login used when no stored token exists.
    pub login: Option<LoginSettings>,
    /// File holding the bearer token between runs.
    pub token_file: PathBuf,
    /// Log in again after the session is terminated.
    pub relogin: bool,
    /// Revoke the token and delete the token file on shutdown.
    pub logout_on_exit: bool,
    /// Feed connection timing.
    pub feed: FeedSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl GalleryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or invalid, or if only one
    /// of user and password is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup("GALLERY_BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("GALLERY_BASE_URL".to_string()))?;
        if base_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue("GALLERY_BASE_URL".to_string()));
        }
        let endpoints = BackendEndpoints::new(&base_url)?;

        let username = lookup("GALLERY_USER").filter(|v| !v.is_empty());
        let password = lookup("GALLERY_PASSWORD").filter(|v| !v.is_empty());
        let login = match (username, password) {
            (Some(username), Some(password)) => Some(LoginSettings::new(username, password)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar("GALLERY_PASSWORD".to_string()));
            }
            (None, Some(_)) => return Err(ConfigError::MissingEnvVar("GALLERY_USER".to_string())),
        };

        let token_file = lookup("GALLERY_TOKEN_FILE")
            .filter(|v| !v.is_empty())
            .map_or_else(|| PathBuf::from(".gallery-token"), PathBuf::from);

        let relogin = parse_bool(lookup("GALLERY_RELOGIN"), true);
        let logout_on_exit = parse_bool(lookup("GALLERY_LOGOUT_ON_EXIT"), false);

        let defaults = FeedSettings::default();
        let feed = FeedSettings {
            reconnect_delay_base: parse_duration_millis(
                lookup("GALLERY_RECONNECT_DELAY_BASE_MS"),
                defaults.reconnect_delay_base,
            ),
            reconnect_delay_max: parse_duration_millis(
                lookup("GALLERY_RECONNECT_DELAY_MAX_MS"),
                defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_f64(
                lookup("GALLERY_RECONNECT_DELAY_MULTIPLIER"),
                defaults.reconnect_delay_multiplier,
            )
            .max(1.0),
            reconnect_jitter: parse_f64(
                lookup("GALLERY_RECONNECT_JITTER"),
                defaults.reconnect_jitter,
            )
            .clamp(0.0, 1.0),
            keepalive_interval: parse_duration_millis(
                lookup("GALLERY_KEEPALIVE_INTERVAL_MS"),
                defaults.keepalive_interval,
            ),
            probe_timeout: parse_duration_millis(
                lookup("GALLERY_PROBE_TIMEOUT_MS"),
                defaults.probe_timeout,
            ),
        };

        let server = ServerSettings {
            health_port: parse_u16(
                lookup("GALLERY_HEALTH_PORT"),
                ServerSettings::default().health_port,
            ),
        };

        Ok(Self {
            endpoints,
            login,
            token_file,
            relogin,
            logout_on_exit,
            feed,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// The base URL is not usable.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

fn parse_u16(value: Option<String>, default: u16) -> u16 {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_f64(value: Option<String>, default: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn parse_duration_millis(value: Option<String>, default: Duration) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map_or(default, Duration::from_millis)
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("1" | "true" | "TRUE" | "True" | "yes") => true,
        Some("0" | "false" | "FALSE" | "False" | "no") => false,
        _ => default,
    }
}

//! Backend Endpoints
//!
//! Every backend route lives under `/backend` on the gallery host:
//!
//! | Route | Use |
//! |---|---|
//! | `/backend/ws` | persistent change feed (`ws`/`wss`) |
//! | `/backend/checkauth` | liveness probe |
//! | `/backend/login` | exchange username/password for a token |
//! | `/backend/logout` | revoke a token |
//! | `/backend/frontend_hash` | build fingerprint |
//! | `/backend/data/<name>` | image bytes |
//!
//! A base URL with a path prefix (`https://host/gallery/`) keeps the prefix.

use reqwest::Url;

const WS_PATH: &str = "/backend/ws";
const KEEPALIVE_PATH: &str = "/backend/checkauth";
const LOGIN_PATH: &str = "/backend/login";
const LOGOUT_PATH: &str = "/backend/logout";
const FINGERPRINT_PATH: &str = "/backend/frontend_hash";
const DATA_PATH: &str = "/backend/data";

/// Errors building backend URLs.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EndpointError {
    /// The base URL did not parse.
    #[error("invalid base URL {0:?}: {1}")]
    InvalidUrl(String, String),
    /// Only `http` and `https` base URLs are accepted.
    #[error("unsupported scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
}

/// Resolves backend routes against one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoints {
    base: Url,
}

impl BackendEndpoints {
    /// Parse and validate a base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or is not `http`/`https`.
    pub fn new(base: &str) -> Result<Self, EndpointError> {
        let base = Url::parse(base.trim())
            .map_err(|e| EndpointError::InvalidUrl(base.to_string(), e.to_string()))?;

        match base.scheme() {
            "http" | "https" => Ok(Self { base }),
            other => Err(EndpointError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Base URL as configured.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Persistent connection URL, with `http→ws` and `https→wss`.
    #[must_use]
    pub fn websocket(&self) -> Url {
        let mut url = self.route(WS_PATH);
        let scheme = if self.base.scheme() == "https" {
            "wss"
        } else {
            "ws"
        };
        // http(s) -> ws(s) stays within the special schemes, which always succeeds.
        let _ = url.set_scheme(scheme);
        url
    }

    /// Liveness probe URL.
    #[must_use]
    pub fn keepalive(&self) -> Url {
        self.route(KEEPALIVE_PATH)
    }

    /// Login URL.
    #[must_use]
    pub fn login(&self) -> Url {
        self.route(LOGIN_PATH)
    }

    /// Logout URL.
    #[must_use]
    pub fn logout(&self) -> Url {
        self.route(LOGOUT_PATH)
    }

    /// Build fingerprint URL.
    #[must_use]
    pub fn fingerprint(&self) -> Url {
        self.route(FINGERPRINT_PATH)
    }

    /// Image URL for an item name; each path component is percent-encoded.
    #[must_use]
    pub fn item(&self, name: &str) -> Url {
        let mut url = self.route(DATA_PATH);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(name.split('/').filter(|part| !part.is_empty()));
        }
        url
    }

    fn route(&self, path: &str) -> Url {
        let prefix = self.base.path().trim_end_matches('/');
        let mut url = self.base.clone();
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(None);
        url.set_fragment(None);
        url
    }
}

//! HTTP Liveness Probe
//!
//! Checks a credential with `GET /backend/checkauth` and the header
//! `Authorization: Bearer <token>`. The request is independent of the
//! persistent connection, so it can tell an expired session apart from a
//! network drop.
//!
//! | Response | Outcome |
//! |---|---|
//! | `200` | `Authorized` |
//! | `401` | `Unauthorized` |
//! | any other status | `Unknown` |
//! | no response (transport error, timeout) | `Unknown` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header};

use crate::application::ports::LivenessProbe;
use crate::domain::connection::{Credential, Liveness};
use crate::infrastructure::backend::endpoints::BackendEndpoints;
use crate::infrastructure::metrics;

/// Default bound on a single probe request.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the HTTP client shared by probe, fingerprint and login requests.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("gallery-feed/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Liveness probe backed by the keepalive endpoint.
#[derive(Debug, Clone)]
pub struct HttpLivenessProbe {
    client: Client,
    url: Url,
}

impl HttpLivenessProbe {
    /// Create a probe against the backend's keepalive endpoint.
    #[must_use]
    pub fn new(client: Client, endpoints: &BackendEndpoints) -> Self {
        Self {
            client,
            url: endpoints.keepalive(),
        }
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    #[tracing::instrument(level = "debug", skip_all)]
    async fn probe(&self, credential: &Credential) -> Liveness {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::AUTHORIZATION, credential.bearer_header())
            .send()
            .await;

        let liveness = match response {
            Ok(response) => {
                let status = response.status().as_u16();
                let liveness = Liveness::from_status(status);
                tracing::debug!(status, liveness = liveness.as_str(), "Probe answered");
                liveness
            }
            Err(e) => {
                tracing::debug!(
                    error = %e,
                    timeout = e.is_timeout(),
                    "Probe failed without response"
                );
                Liveness::Unknown
            }
        };

        metrics::record_probe(liveness);
        liveness
    }
}

//! Build Fingerprint
//!
//! `GET /backend/frontend_hash` returns an opaque string identifying the
//! deployed build. The feed fetches it after every open; a change means the
//! backend was redeployed underneath the session.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use crate::application::ports::FingerprintSource;
use crate::infrastructure::backend::endpoints::BackendEndpoints;

/// Fingerprint source backed by the build-hash endpoint.
#[derive(Debug, Clone)]
pub struct HttpFingerprintSource {
    client: Client,
    url: Url,
}

impl HttpFingerprintSource {
    /// Create a fingerprint source for the backend.
    #[must_use]
    pub fn new(client: Client, endpoints: &BackendEndpoints) -> Self {
        Self {
            client,
            url: endpoints.fingerprint(),
        }
    }
}

#[async_trait]
impl FingerprintSource for HttpFingerprintSource {
    async fn fingerprint(&self) -> Option<String> {
        let response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(error = %e, "Fingerprint request failed");
                return None;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(status = response.status().as_u16(), "Fingerprint unavailable");
            return None;
        }

        match response.text().await {
            Ok(body) => {
                let body = body.trim();
                (!body.is_empty()).then(|| body.to_string())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Fingerprint body unreadable");
                None
            }
        }
    }
}

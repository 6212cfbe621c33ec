//! Backend Authentication
//!
//! Login exchanges a username and password for a bearer token:
//!
//! | Route | Request | Response |
//! |---|---|---|
//! | `POST /backend/login` | `{"username","password"}` | `200` token body, `401` bad credentials, `503` restarting |
//! | `POST /backend/logout` | `Authorization: Bearer <token>` | `200` |

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header};

use crate::application::ports::{AuthError, Authenticator};
use crate::domain::connection::Credential;
use crate::infrastructure::backend::endpoints::BackendEndpoints;
use crate::infrastructure::backend::messages::LoginRequest;

/// Authenticator backed by the login/logout endpoints.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    client: Client,
    login_url: Url,
    logout_url: Url,
}

impl HttpAuthenticator {
    /// Create an authenticator for the backend.
    #[must_use]
    pub fn new(client: Client, endpoints: &BackendEndpoints) -> Self {
        Self {
            client,
            login_url: endpoints.login(),
            logout_url: endpoints.logout(),
        }
    }
}

fn status_error(status: StatusCode) -> AuthError {
    match status {
        StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials,
        StatusCode::SERVICE_UNAVAILABLE => AuthError::Unavailable,
        other => AuthError::UnexpectedStatus(other.as_u16()),
    }
}

#[async_trait]
impl Authenticator for HttpAuthenticator {
    #[tracing::instrument(skip(self, password))]
    async fn login(&self, username: &str, password: &str) -> Result<Credential, AuthError> {
        let response = self
            .client
            .post(self.login_url.clone())
            .json(&LoginRequest { username, password })
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(status_error(response.status()));
        }

        let token = response
            .text()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;
        let credential = Credential::new(token);

        if credential.is_empty() {
            return Err(AuthError::Request("empty token in login response".to_string()));
        }

        tracing::info!("Logged in");
        Ok(credential)
    }

    async fn logout(&self, credential: &Credential) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.logout_url.clone())
            .header(header::AUTHORIZATION, credential.bearer_header())
            .send()
            .await
            .map_err(|e| AuthError::Request(e.to_string()))?;

        if response.status().is_success() {
            tracing::info!("Logged out");
            Ok(())
        } else {
            Err(status_error(response.status()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::backend::probe::http_client;
    use wiremock::matchers::{body_json, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn authenticator_for(server: &MockServer) -> HttpAuthenticator {
        let endpoints = BackendEndpoints::new(&server.uri()).unwrap();
        HttpAuthenticator::new(http_client(Duration::from_secs(2)).unwrap(), &endpoints)
    }

    #[tokio::test]
    async fn login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backend/login"))
            .and(body_json(serde_json::json!({"username": "alice", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("tok-42"))
            .expect(1)
            .mount(&server)
            .await;

        let auth = authenticator_for(&server).await;
        let credential = auth.login("alice", "pw").await.unwrap();
        assert_eq!(credential.token(), "tok-42");
    }

    #[tokio::test]
    async fn login_maps_rejections() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backend/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let auth = authenticator_for(&server).await;
        assert!(matches!(
            auth.login("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn login_while_restarting_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backend/login"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let auth = authenticator_for(&server).await;
        assert!(matches!(
            auth.login("alice", "pw").await,
            Err(AuthError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn logout_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/backend/logout"))
            .and(header_eq("authorization", "Bearer tok-42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let auth = authenticator_for(&server).await;
        auth.logout(&Credential::new("tok-42")).await.unwrap();
    }

    #[test]
    fn unexpected_status_keeps_code() {
        assert!(matches!(
            status_error(StatusCode::IM_A_TEAPOT),
            AuthError::UnexpectedStatus(418)
        ));
    }
}

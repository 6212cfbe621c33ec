//! WebSocket Transport
//!
//! Opens `/backend/ws` with the credential in the upgrade request's
//! `Authorization: Bearer <token>` header.
//!
//! The backend also accepts the token as the subprotocol pair
//! `bearer, <token>`, but it never echoes a subprotocol back, and
//! tungstenite rejects a handshake whose offered subprotocol is not echoed.
//! No subprotocol is offered.

use async_trait::async_trait;
use futures_util::{StreamExt, future};
use reqwest::Url;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;

use crate::application::ports::{FeedConnector, FrameStream, InboundFrame, TransportError};
use crate::domain::connection::Credential;
use crate::infrastructure::backend::endpoints::BackendEndpoints;

/// WebSocket connector for the gallery change feed.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: Url,
}

impl WsConnector {
    /// Create a connector for the backend's feed endpoint.
    #[must_use]
    pub fn new(endpoints: &BackendEndpoints) -> Self {
        Self {
            url: endpoints.websocket(),
        }
    }

    /// Feed URL this connector dials.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

fn to_frame(message: Message) -> Option<InboundFrame> {
    match message {
        Message::Text(text) => Some(InboundFrame::Text(text.as_str().to_owned())),
        Message::Close(frame) => Some(InboundFrame::Close(
            frame.map(|f| f.reason.as_str().to_owned()),
        )),
        // Ping/pong are answered by tungstenite; binary frames are not part of the feed.
        _ => None,
    }
}

#[async_trait]
impl FeedConnector for WsConnector {
    async fn connect(&self, credential: &Credential) -> Result<FrameStream, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidEndpoint(e.to_string()))?;

        let authorization = HeaderValue::from_str(&credential.bearer_header())
            .map_err(|e| TransportError::InvalidEndpoint(format!("credential header: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        tracing::debug!(url = %self.url, "Opening feed connection");

        let (stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let frames = stream.filter_map(|message| {
            future::ready(match message {
                Ok(message) => to_frame(message).map(Ok),
                Err(e) => Some(Err(TransportError::Stream(e.to_string()))),
            })
        });

        Ok(frames.boxed())
    }
}

//! Gallery Backend Adapters
//!
//! Everything that talks to the gallery backend:
//!
//! - **Feed**: WebSocket change feed, delta codec, session state machine and
//!   its async driver
//! - **Liveness**: `checkauth` probe and keepalive scheduling
//! - **Auth**: login/logout and the build fingerprint

pub mod auth;
pub mod client;
pub mod codec;
pub mod endpoints;
pub mod fingerprint;
pub mod keepalive;
pub mod messages;
pub mod probe;
pub mod reconnect;
pub mod session;
pub mod status;
pub mod transport;

pub use auth::HttpAuthenticator;
pub use client::{FeedClientConfig, FeedClientError, FeedOutcome, FeedPorts, GalleryFeedClient};
pub use codec::{CodecError, DeltaCodec};
pub use endpoints::{BackendEndpoints, EndpointError};
pub use fingerprint::HttpFingerprintSource;
pub use keepalive::{KeepaliveConfig, TaggedTimer};
pub use messages::{ChangeMessage, LoginRequest, WireTimestamp};
pub use probe::{DEFAULT_PROBE_TIMEOUT, HttpLivenessProbe, http_client};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use session::{FeedCommand, FeedInput, FeedSession, Generation, ProbePurpose};
pub use status::{FeedStatus, SharedFeedStatus};
pub use transport::WsConnector;

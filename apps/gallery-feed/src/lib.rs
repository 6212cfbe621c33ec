#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Gallery Feed - Live Image Gallery Client
//!
//! Keeps an ordered view of an image gallery in sync with its backend. The
//! backend pushes add/remove deltas over a persistent WebSocket; this crate
//! applies them to a collection sorted newest-first, reconnects with bounded
//! exponential backoff when the socket drops, and probes the credential so a
//! revoked session ends the feed instead of reconnecting forever.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Gallery items and connection vocabulary
//!   - `gallery`: Items, deltas and the ordered collection
//!   - `connection`: Connection state, liveness outcomes, credentials
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the connection, probes, login and token store
//!   - `services`: Credential session lifecycle
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `backend`: Feed session, client driver, WebSocket and HTTP adapters
//!   - `config`: Configuration from the environment
//!   - `credentials`: Token file store
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! backend WS ──► WsConnector ──► FeedSession ──► ItemCollection ──► watch subscribers
//!                                    │
//!                     checkauth ◄────┘ (on close, every keepalive interval)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Gallery types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::connection::{ConnectionState, Credential, Liveness};
pub use domain::gallery::{DeltaOutcome, GalleryDelta, Item, ItemCollection, ItemName, Timestamp};

// Application services
pub use application::services::{CredentialSession, Login, SessionError};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, FeedSettings, GalleryConfig, LoginSettings, ServerSettings,
};

// Feed client
pub use infrastructure::backend::{
    BackendEndpoints, FeedClientConfig, FeedClientError, FeedOutcome, FeedPorts, FeedStatus,
    GalleryFeedClient, SharedFeedStatus,
};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};

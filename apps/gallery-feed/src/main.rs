//! Gallery Feed Binary
//!
//! Follows a gallery backend and logs every change to the item list.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin gallery-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `GALLERY_BASE_URL`: Backend base URL (http:// or https://)
//!
//! ## Optional
//! - `GALLERY_USER` / `GALLERY_PASSWORD`: Login used when no token is stored
//! - `GALLERY_TOKEN_FILE`: Token file (default: .gallery-token)
//! - `GALLERY_RELOGIN`: Log in again after the session ends (default: true)
//! - `GALLERY_LOGOUT_ON_EXIT`: Revoke and delete the token on shutdown (default: false)
//! - `GALLERY_RECONNECT_DELAY_BASE_MS`: First reconnect delay (default: 500)
//! - `GALLERY_RECONNECT_DELAY_MAX_MS`: Reconnect delay cap (default: 3000)
//! - `GALLERY_RECONNECT_DELAY_MULTIPLIER`: Backoff multiplier (default: 2.0)
//! - `GALLERY_RECONNECT_JITTER`: Backoff jitter factor (default: 0.0)
//! - `GALLERY_KEEPALIVE_INTERVAL_MS`: Keepalive probe interval (default: 60000)
//! - `GALLERY_PROBE_TIMEOUT_MS`: HTTP request timeout (default: 10000)
//! - `GALLERY_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry export (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use anyhow::Context;
use gallery_feed::application::ports::{
    Authenticator, CredentialStore, FeedConnector, FingerprintSource, LivenessProbe,
    SessionHandler,
};
use gallery_feed::infrastructure::backend::{
    HttpAuthenticator, HttpFingerprintSource, HttpLivenessProbe, ReconnectPolicy, WsConnector,
    http_client,
};
use gallery_feed::infrastructure::credentials::FileCredentialStore;
use gallery_feed::infrastructure::health::{HealthServer, HealthServerState};
use gallery_feed::infrastructure::telemetry;
use gallery_feed::{
    BackendEndpoints, CredentialSession, FeedClientConfig, FeedOutcome, FeedPorts, FeedStatus,
    GalleryConfig, GalleryFeedClient, ItemCollection, Login, SessionError, SharedFeedStatus,
    init_metrics,
};
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting Gallery Feed");

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = GalleryConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(await_shutdown(shutdown_token.clone()));

    let http = http_client(config.feed.probe_timeout).context("failed to build HTTP client")?;
    let endpoints: &BackendEndpoints = &config.endpoints;

    let authenticator: Arc<dyn Authenticator> =
        Arc::new(HttpAuthenticator::new(http.clone(), endpoints));
    let store: Arc<dyn CredentialStore> =
        Arc::new(FileCredentialStore::new(config.token_file.clone()));
    let login = config
        .login
        .as_ref()
        .map(|login| Login::new(login.username(), login.password()));
    let session = Arc::new(CredentialSession::new(authenticator, store, login));

    let connector: Arc<dyn FeedConnector> = Arc::new(WsConnector::new(endpoints));
    let probe: Arc<dyn LivenessProbe> = Arc::new(HttpLivenessProbe::new(http.clone(), endpoints));
    let fingerprint: Arc<dyn FingerprintSource> =
        Arc::new(HttpFingerprintSource::new(http, endpoints));
    let handler: Arc<dyn SessionHandler> = session.clone();
    let ports = FeedPorts {
        connector,
        probe,
        fingerprint,
        handler,
    };

    let status: SharedFeedStatus = Arc::new(FeedStatus::new());

    if config.server.health_port == 0 {
        tracing::info!("Health server disabled");
    } else {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&status),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    let client_config = FeedClientConfig::from_feed_settings(&config.feed);
    // Paces logins: transient login failures and back-to-back relogins.
    let mut login_backoff = ReconnectPolicy::new(client_config.reconnect.clone());

    loop {
        let Some(credential) = session
            .credential_with_retry(|| login_backoff.next_delay(), &shutdown_token)
            .await
            .map_err(describe_session_error)?
        else {
            break;
        };

        let client = GalleryFeedClient::new(
            ports.clone(),
            credential,
            client_config.clone(),
            shutdown_token.child_token(),
        )?
        .with_status(Arc::clone(&status));

        let reporter = tokio::spawn(report_items(
            client.subscribe_items(),
            config.endpoints.clone(),
        ));
        let started_at = chrono::Utc::now();
        let outcome = client.run().await;
        reporter.abort();

        if status
            .last_connected_at()
            .is_some_and(|connected_at| connected_at >= started_at)
        {
            login_backoff.reset();
        }

        match outcome {
            FeedOutcome::Stopped => break,
            FeedOutcome::Terminated if config.relogin && session.can_login() => {
                let delay = login_backoff.next_delay();
                tracing::warn!(
                    delay_ms = delay.as_millis(),
                    "Session terminated, logging in again"
                );
                tokio::select! {
                    () = shutdown_token.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
            FeedOutcome::Terminated => {
                tracing::error!("Session terminated and no login is configured");
                shutdown_token.cancel();
                anyhow::bail!("session terminated");
            }
        }
    }

    if config.logout_on_exit {
        match session.logout().await {
            Ok(()) => tracing::info!("Logged out"),
            Err(e) => tracing::warn!(error = %e, "Logout failed"),
        }
    }

    tracing::info!(
        terminations = session.terminations(),
        backend_changes = session.backend_changes(),
        "Gallery feed stopped"
    );
    Ok(())
}

fn describe_session_error(error: SessionError) -> anyhow::Error {
    anyhow::Error::new(error).context("failed to obtain a credential")
}

/// Log the gallery whenever it changes.
async fn report_items(mut items: watch::Receiver<ItemCollection>, endpoints: BackendEndpoints) {
    while items.changed().await.is_ok() {
        let snapshot = items.borrow_and_update().clone();
        match snapshot.items().first() {
            Some(newest) => tracing::info!(
                items = snapshot.len(),
                newest = newest.name(),
                modified_at = ?newest.modified_at(),
                url = %endpoints.item(newest.name()),
                "Gallery updated"
            ),
            None => tracing::info!(items = 0, "Gallery updated"),
        }
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Log the parsed configuration.
fn log_config(config: &GalleryConfig) {
    tracing::info!(
        base_url = %config.endpoints.base(),
        login = config.login.is_some(),
        relogin = config.relogin,
        logout_on_exit = config.logout_on_exit,
        token_file = %config.token_file.display(),
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        reconnect_delay_base_ms = config.feed.reconnect_delay_base.as_millis(),
        reconnect_delay_max_ms = config.feed.reconnect_delay_max.as_millis(),
        reconnect_delay_multiplier = config.feed.reconnect_delay_multiplier,
        keepalive_interval_secs = config.feed.keepalive_interval.as_secs(),
        probe_timeout_ms = config.feed.probe_timeout.as_millis(),
        websocket = %config.endpoints.websocket(),
        "Feed timing"
    );
}

/// Load .env file from any ancestor directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => return,
    }

    shutdown_token.cancel();
}

//! # session-gate
//!
//! Session-based login, logout, registration and an admin-only route over a JSON
//! document collection of users.
//!
//! ## Architecture
//!
//! - **Users**: JSON document store with an atomic insert-if-email-absent
//! - **Sessions**: in-process store keyed by the `sid` cookie, expired on a TTL and swept periodically
//! - **HTTP**: Axum router with an admin guard, request IDs, and graceful shutdown
//!
//! Passwords are stored and compared in plain text. Admin sessions are never granted by
//! login; they have to be written to the session store out of band.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod config;
mod http;
mod session;
mod users;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Cli};
use crate::http::{router, AppState, CookieSettings};
use crate::session::{MemorySessionStore, SessionStore};
use crate::users::{DocumentStore, UserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    info!(
        bind = %config.bind,
        data_dir = %config.data_dir.display(),
        session_ttl = %humantime::format_duration(config.session_ttl),
        sweep_interval_seconds = config.sweep_interval_seconds,
        max_sessions = config.max_sessions,
        cookie_secure = config.cookie_secure,
        "configuration loaded"
    );

    let users = DocumentStore::open(&config.data_dir)
        .await
        .with_context(|| format!("failed to open users in {}", config.data_dir.display()))?;
    let user_count = users.find_all().await.map(|all| all.len()).unwrap_or(0);
    info!(
        users = user_count,
        path = ?users.path().map(|path| path.display().to_string()),
        "user store ready"
    );

    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(
        config.session_ttl,
        config.max_sessions,
    ));
    spawn_session_sweeper(
        Arc::clone(&sessions),
        Duration::from_secs(config.sweep_interval_seconds),
    );

    let state = AppState {
        users: Arc::new(users),
        sessions,
        cookie: CookieSettings {
            secure: config.cookie_secure,
        },
    };

    let app = router(state);
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %config.bind, "session-gate listening");

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = shutdown.await;
        info!("shutting down gracefully");
    })
    .await
    .context("server exited with error")
}

/// Initialize tracing subscriber with `RUST_LOG` env filter (default: `info`).
fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

/// Spawns a background task that drops expired sessions at the given interval.
/// Logs errors but does not panic.
fn spawn_session_sweeper(sessions: Arc<dyn SessionStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match sessions.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expired sessions purged"),
                Err(err) => error!(error = %err, "session sweep failed"),
            }
        }
    });
}

//! Shelf session host.
//!
//! Signs in against the remote store, seeds the reconciliation engine with
//! the user's bookmarks, keeps it in sync through the push channel, and
//! serves the collection to a UI over HTTP and WebSocket.

mod auth;
mod config;
mod error;
mod handlers;
mod push;
mod remote;
mod routes;
mod session;
mod websocket;

use crate::auth::{HttpIdentity, Identity};
use crate::config::Config;
use crate::push::WsPushSource;
use crate::remote::{HttpClient, HttpRemoteStore, RemoteStore};
use crate::session::{Session, SessionHandle, SessionSettings};
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionHandle,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
    pub identity: Arc<HttpIdentity>,
    pub shutdown: Arc<Notify>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelf=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!("Starting Shelf session host on {}:{}", config.host, config.port);

    // Session presence
    let http = HttpClient::new(&config)?;
    let identity = HttpIdentity::new(http.clone());
    let Some(user) = identity.current_user().await? else {
        tracing::error!("No signed-in user; refresh SHELF_ACCESS_TOKEN");
        return Err("not signed in".into());
    };

    // Initial snapshot
    let store = HttpRemoteStore::new(http);
    let seed = store.list(&user).await?;
    tracing::info!(user = %user, bookmarks = seed.len(), "Loaded collection");

    let (session, session_task) = Session::spawn(
        seed,
        user,
        store,
        WsPushSource::new(&config),
        SessionSettings::from_config(&config),
    );

    // Build application state
    let conn_manager = ConnectionManager::new_shared();
    let forwarder = websocket::spawn_forwarder(&session, Arc::clone(&conn_manager));
    let shutdown = Arc::new(Notify::new());
    let state = AppState {
        session: session.clone(),
        config: Arc::new(config.clone()),
        conn_manager,
        identity: Arc::new(identity),
        shutdown: Arc::clone(&shutdown),
    };

    // Build router
    let app = Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Interrupted"),
                _ = shutdown.notified() => {}
            }
        })
        .await?;

    // Let in-flight actions settle before exiting.
    session.shutdown().await;
    drop(session);
    session_task.await?;
    forwarder.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}

//! Sign-out endpoint.

use axum::{extract::State, http::StatusCode, routing::post, Router};

use crate::auth::{Identity, UiUser};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/logout", post(logout_handler))
}

/// POST /logout - End the session at the identity provider and shut down.
///
/// Pending actions still settle before the process exits.
async fn logout_handler(State(state): State<AppState>, _user: UiUser) -> StatusCode {
    if let Err(e) = state.identity.sign_out().await {
        tracing::warn!(error = %e, "Sign-out at identity provider failed");
    }

    state.session.shutdown().await;
    state.shutdown.notify_one();
    tracing::info!("Signed out, shutting down");

    StatusCode::ACCEPTED
}

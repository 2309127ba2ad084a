//! UI WebSocket endpoint.

use axum::{
    extract::{State, WebSocketUpgrade},
    http::{header::USER_AGENT, HeaderMap},
    response::Response,
    routing::get,
    Router,
};

use crate::auth::UiUser;
use crate::handlers::websocket::handle_websocket_connection;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_handler))
}

/// GET /ws - Upgrade to a live collection stream.
async fn ws_handler(
    State(state): State<AppState>,
    _user: UiUser,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let client = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    ws.on_upgrade(move |socket| {
        handle_websocket_connection(socket, state.session, state.conn_manager, client)
    })
}

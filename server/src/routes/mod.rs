//! HTTP route definitions.

mod bookmarks;
mod health;
mod session;
mod websocket;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(bookmarks::routes())
        .merge(session::routes())
        .merge(websocket::routes())
}

//! Bookmark endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};

use crate::auth::UiUser;
use crate::error::{AppError, Result};
use crate::handlers::{handle_delete, handle_insert, handle_list, InsertRequest, SubmitResponse};
use crate::session::View;
use crate::AppState;

/// Create bookmark routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(list_handler).post(insert_handler))
        .route("/bookmarks/{id}", delete(delete_handler))
}

/// GET /bookmarks - The current collection.
async fn list_handler(State(state): State<AppState>, _user: UiUser) -> Json<View> {
    Json(handle_list(&state.session))
}

/// POST /bookmarks - Add a bookmark.
async fn insert_handler(
    State(state): State<AppState>,
    _user: UiUser,
    payload: std::result::Result<Json<InsertRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let response = handle_insert(&state.session, request).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// DELETE /bookmarks/{id} - Delete a bookmark.
async fn delete_handler(
    State(state): State<AppState>,
    _user: UiUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<SubmitResponse>)> {
    let response = handle_delete(&state.session, id).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

//! Bookmark actions shared by the HTTP routes and the UI socket.

use serde::{Deserialize, Serialize};
use shelf_engine::{BookmarkId, PendingId};

use crate::error::Result;
use crate::session::{SessionHandle, View};

/// Body of an insert request.
#[derive(Debug, Deserialize)]
pub struct InsertRequest {
    pub title: String,
    pub url: String,
}

/// Reply to an accepted action.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Correlates later notices with this action
    pub pending: PendingId,
}

pub fn handle_list(session: &SessionHandle) -> View {
    session.current()
}

pub async fn handle_insert(session: &SessionHandle, request: InsertRequest) -> Result<SubmitResponse> {
    let pending = session.submit_insert(request.title, request.url).await?;
    tracing::info!(pending = %pending, "Insert submitted");
    Ok(SubmitResponse { pending })
}

pub async fn handle_delete(session: &SessionHandle, id: BookmarkId) -> Result<SubmitResponse> {
    let pending = session.submit_delete(id.clone()).await?;
    tracing::info!(pending = %pending, id = %id, "Delete submitted");
    Ok(SubmitResponse { pending })
}

//! Remote store access.
//!
//! The session talks to the store only through [`RemoteStore`], so the
//! reqwest adapter can be swapped for an in-memory one in tests.

mod http;
mod rows;

use std::future::Future;

use shelf_engine::{Bookmark, BookmarkId, Draft, RemoteFailure, UserId};

pub use http::{HttpClient, HttpRemoteStore};
pub use rows::{NewRow, StoreKey, StoreRow};

/// The authoritative bookmark table.
pub trait RemoteStore: Send + Sync + 'static {
    /// Every bookmark owned by `user`, newest first.
    fn list(&self, user: &UserId) -> impl Future<Output = Result<Vec<Bookmark>, RemoteError>> + Send;

    /// Create a row and return it as stored.
    fn insert(
        &self,
        draft: &Draft,
        user: &UserId,
    ) -> impl Future<Output = Result<Bookmark, RemoteError>> + Send;

    /// Delete a row by id.
    fn delete(&self, id: &BookmarkId) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Errors talking to the store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("store returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Collapse into the engine's failure classification.
    pub fn into_failure(self) -> RemoteFailure {
        match self {
            RemoteError::Rejected { status, body } if body.is_empty() => {
                RemoteFailure::Rejected(format!("status {status}"))
            }
            RemoteError::Rejected { body, .. } => RemoteFailure::Rejected(body),
            RemoteError::Transport(msg) => RemoteFailure::Transport(msg),
            RemoteError::Decode(msg) => RemoteFailure::Transport(msg),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else {
            RemoteError::Transport(e.to_string())
        }
    }
}

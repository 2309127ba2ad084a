//! Error types for the Shelf engine.

use crate::BookmarkId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned when a user action is refused before any state changes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("title must not be empty")]
    EmptyTitle,

    #[error("url must not be empty")]
    EmptyUrl,

    // Submission errors
    #[error("bookmark not found: {0}")]
    BookmarkNotFound(BookmarkId),

    #[error("bookmark is still being saved: {0}")]
    ProvisionalRow(String),

    // State errors
    #[error("session is closed")]
    SessionClosed,
}

impl Error {
    /// Whether this error is a validation failure on user input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::EmptyTitle | Error::EmptyUrl)
    }
}

/// Why a remote insert or delete did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum RemoteFailure {
    /// The store answered and refused the request.
    #[error("rejected by store: {0}")]
    Rejected(String),

    /// The request never got a usable answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// No answer within the configured deadline.
    #[error("no response after {0}s")]
    Timeout(u64),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

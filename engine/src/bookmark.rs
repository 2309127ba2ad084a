//! Bookmark types.

use crate::{error::Result, BookmarkId, Error, PendingId, Timestamp};
use serde::{Deserialize, Serialize};

/// A bookmark as the remote store knows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    /// Server-assigned identifier, never reused
    pub id: BookmarkId,
    /// Display title
    pub title: String,
    /// Target URL
    pub url: String,
    /// Creation time in milliseconds since epoch, assigned by the store
    pub created_at: Timestamp,
}

impl Bookmark {
    /// Create a bookmark.
    pub fn new(
        id: impl Into<BookmarkId>,
        title: impl Into<String>,
        url: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            created_at,
        }
    }
}

/// A bookmark the user asked for, before the store assigned it an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub title: String,
    pub url: String,
}

impl Draft {
    /// Validate and normalize user input.
    ///
    /// Both fields are trimmed; an empty field is a validation failure.
    /// URL syntax is checked by the store, not here.
    pub fn new(title: &str, url: &str) -> Result<Self> {
        let title = title.trim();
        let url = url.trim();
        if title.is_empty() {
            return Err(Error::EmptyTitle);
        }
        if url.is_empty() {
            return Err(Error::EmptyUrl);
        }
        Ok(Self {
            title: title.to_string(),
            url: url.to_string(),
        })
    }
}

/// Where a visible row is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RowState {
    /// Shown optimistically; the store has not confirmed it yet.
    Provisional { pending: PendingId },
    /// Known to exist in the store.
    Confirmed,
}

/// A row in the visible collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub bookmark: Bookmark,
    pub state: RowState,
}

impl Entry {
    /// A row confirmed by the store.
    pub fn confirmed(bookmark: Bookmark) -> Self {
        Self {
            bookmark,
            state: RowState::Confirmed,
        }
    }

    /// An optimistic row for a pending insert.
    ///
    /// The provisional bookmark borrows the pending id as its id so the UI has
    /// a stable key to render until the store assigns the real one.
    pub fn provisional(pending: PendingId, draft: Draft, created_at: Timestamp) -> Self {
        Self {
            bookmark: Bookmark::new(pending.clone(), draft.title, draft.url, created_at),
            state: RowState::Provisional { pending },
        }
    }

    /// The pending id if this row is provisional.
    pub fn pending(&self) -> Option<&PendingId> {
        match &self.state {
            RowState::Provisional { pending } => Some(pending),
            RowState::Confirmed => None,
        }
    }

    /// The store id if this row is confirmed.
    pub fn confirmed_id(&self) -> Option<&BookmarkId> {
        match self.state {
            RowState::Confirmed => Some(&self.bookmark.id),
            RowState::Provisional { .. } => None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self.state, RowState::Provisional { .. })
    }
}
